//! Evaluate targeting expressions against a JSON context

use super::CliError;
use crate::{Transforms, Value, compile};

/// Options for the check command
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// The expression to evaluate
    pub expression: String,
    /// JSON context; an empty object when absent
    pub context: Option<String>,
    /// Only validate syntax, don't evaluate
    pub syntax_only: bool,
}

/// Result of a check operation
#[derive(Debug, PartialEq)]
pub enum CheckResult {
    /// Syntax validation passed
    SyntaxValid,
    /// Expression evaluated to this value
    Success(Value),
}

/// Compiles the expression and, unless `syntax_only`, evaluates it with the
/// standard transforms.
pub async fn execute_check(options: &CheckOptions) -> Result<CheckResult, CliError> {
    let expression = compile(&options.expression)?;

    if options.syntax_only {
        return Ok(CheckResult::SyntaxValid);
    }

    let context = match options.context.as_deref().map(str::trim) {
        Some(json) if !json.is_empty() => Value::from(serde_json::from_str::<serde_json::Value>(json)?),
        _ => Value::Object(Default::default()),
    };

    let result = expression.evaluate(&context, &Transforms::standard()).await?;
    Ok(CheckResult::Success(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(expression: &str, context: Option<&str>) -> CheckOptions {
        CheckOptions {
            expression: expression.to_string(),
            context: context.map(str::to_string),
            syntax_only: false,
        }
    }

    #[tokio::test]
    async fn test_check_with_context() {
        let result = execute_check(&options("a.b + 1", Some(r#"{"a": {"b": 41}}"#))).await;
        assert_eq!(result.unwrap(), CheckResult::Success(Value::Integer(42)));
    }

    #[tokio::test]
    async fn test_check_defaults_to_empty_context() {
        let result = execute_check(&options("missing == null", None)).await;
        assert_eq!(result.unwrap(), CheckResult::Success(Value::Boolean(true)));
    }

    #[tokio::test]
    async fn test_syntax_only_skips_evaluation() {
        let mut opts = options("1 / 0", None);
        opts.syntax_only = true;
        assert_eq!(execute_check(&opts).await.unwrap(), CheckResult::SyntaxValid);

        opts.expression = "1 +".to_string();
        assert!(matches!(
            execute_check(&opts).await,
            Err(CliError::Expression(crate::Error::Parse(_)))
        ));
    }

    #[tokio::test]
    async fn test_invalid_context() {
        let result = execute_check(&options("1", Some("{not json"))).await;
        assert!(matches!(result, Err(CliError::Json(_))));
    }
}
