use futures::future::{BoxFuture, FutureExt, try_join_all};
use thiserror::Error;
use tracing::trace;

use crate::{
    ast::{BinOp, Expr},
    sampling::SamplingError,
    transform::Transforms,
    value::Value,
};

/// Errors that can occur during expression evaluation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// Type mismatch or invalid operation for the given type
    #[error("Type error: {0}")]
    TypeError(String),

    /// Division or modulo by zero
    #[error("Division by zero")]
    DivisionByZero,

    /// Pipe to a name missing from the transform registry
    #[error("Unknown transform: '{0}'")]
    UnknownTransform(String),

    /// A transform rejected its input
    #[error("Transform '{name}' failed: {message}")]
    Transform { name: String, message: String },

    #[error("Sampling error: {0}")]
    Sampling(#[from] SamplingError),
}

/// Walks an expression tree against a context.
///
/// The evaluator only borrows its inputs, so one context and one registry
/// can serve any number of evaluations, concurrently or not.
///
/// # Examples
///
/// ```
/// use targex::{Evaluator, Transforms, Value, compile};
/// use serde_json::json;
///
/// let expr = compile("normandy.channel == 'beta'").unwrap();
/// let context = Value::from(json!({"normandy": {"channel": "beta"}}));
/// let transforms = Transforms::new();
///
/// let evaluator = Evaluator::new(&context, &transforms);
/// let result = futures::executor::block_on(evaluator.eval(expr.ast()));
/// assert_eq!(result, Ok(Value::Boolean(true)));
/// ```
pub struct Evaluator<'a> {
    context: &'a Value,
    transforms: &'a Transforms,
}

impl<'a> Evaluator<'a> {
    pub fn new(context: &'a Value, transforms: &'a Transforms) -> Self {
        Evaluator {
            context,
            transforms,
        }
    }

    /// Evaluates `expr` to a value.
    pub async fn eval(&self, expr: &Expr) -> Result<Value, EvalError> {
        let result = self.eval_expr(expr, None).await;
        trace!(?expr, ?result, "evaluated expression");
        result
    }

    /// `relative` is the element tested by the innermost relative filter.
    fn eval_expr<'e>(
        &'e self,
        expr: &'e Expr,
        relative: Option<&'e Value>,
    ) -> BoxFuture<'e, Result<Value, EvalError>> {
        async move {
            match expr {
                Expr::Literal(value) => Ok(value.clone()),

                Expr::Identifier {
                    name,
                    from: None,
                    relative: is_relative,
                } => {
                    // Outside of any filter a relative name reads the context
                    let scope = match (is_relative, relative) {
                        (true, Some(element)) => element,
                        _ => self.context,
                    };
                    Ok(lookup(scope, name))
                }
                Expr::Identifier {
                    name,
                    from: Some(from),
                    ..
                } => {
                    let base = self.eval_expr(from, relative).await?;
                    Ok(lookup(&base, name))
                }

                Expr::Binary {
                    op: BinOp::And,
                    left,
                    right,
                } => {
                    let left = self.eval_expr(left, relative).await?;
                    if !left.is_truthy() {
                        return Ok(left);
                    }
                    self.eval_expr(right, relative).await
                }
                Expr::Binary {
                    op: BinOp::Or,
                    left,
                    right,
                } => {
                    let left = self.eval_expr(left, relative).await?;
                    if left.is_truthy() {
                        return Ok(left);
                    }
                    self.eval_expr(right, relative).await
                }
                Expr::Binary { op, left, right } => {
                    let left = self.eval_expr(left, relative).await?;
                    let right = self.eval_expr(right, relative).await?;
                    op.apply(&left, &right)
                }

                Expr::Unary { op, operand } => {
                    let operand = self.eval_expr(operand, relative).await?;
                    op.apply(&operand)
                }

                Expr::Conditional {
                    test,
                    consequent,
                    alternate,
                } => {
                    if self.eval_expr(test, relative).await?.is_truthy() {
                        self.eval_expr(consequent, relative).await
                    } else {
                        self.eval_expr(alternate, relative).await
                    }
                }

                Expr::Array(elements) => {
                    let values =
                        try_join_all(elements.iter().map(|e| self.eval_expr(e, relative))).await?;
                    Ok(Value::Array(values))
                }

                Expr::Object(entries) => {
                    let values = try_join_all(
                        entries
                            .iter()
                            .map(|(_, e)| self.eval_expr(e, relative)),
                    )
                    .await?;
                    Ok(entries
                        .iter()
                        .map(|(key, _)| key.clone())
                        .zip(values)
                        .collect())
                }

                Expr::Filter {
                    subject,
                    predicate,
                    relative: true,
                } => {
                    let subject = self.eval_expr(subject, relative).await?;
                    self.filter_relative(subject, predicate).await
                }
                Expr::Filter {
                    subject,
                    predicate,
                    relative: false,
                } => {
                    let subject = self.eval_expr(subject, relative).await?;
                    let key = self.eval_expr(predicate, relative).await?;
                    Ok(subscript(&subject, &key))
                }

                Expr::Transform {
                    subject,
                    name,
                    args,
                } => {
                    let subject = self.eval_expr(subject, relative).await?;
                    let args =
                        try_join_all(args.iter().map(|arg| self.eval_expr(arg, relative))).await?;

                    let transform = self
                        .transforms
                        .get(name)
                        .ok_or_else(|| EvalError::UnknownTransform(name.clone()))?;
                    trace!(transform = %name, ?subject, ?args, "applying transform");
                    transform.apply(subject, args).await
                }
            }
        }
        .boxed()
    }

    /// Keeps the elements of `subject` for which `predicate` is truthy.
    async fn filter_relative(&self, subject: Value, predicate: &Expr) -> Result<Value, EvalError> {
        let elements = match subject {
            Value::Null => return Ok(Value::Null),
            Value::Array(elements) => elements,
            other => {
                return Err(EvalError::TypeError(format!(
                    "Relative filter requires an array, got {}",
                    other.type_name()
                )));
            }
        };

        let mut kept = Vec::new();
        for element in elements {
            if self.eval_expr(predicate, Some(&element)).await?.is_truthy() {
                kept.push(element);
            }
        }
        Ok(Value::Array(kept))
    }
}

/// Attribute lookup. Arrays answer for their first element; anything
/// that is not an object has no attributes.
fn lookup(value: &Value, name: &str) -> Value {
    let target = match value {
        Value::Array(elements) => elements.first(),
        other => Some(other),
    };
    target
        .and_then(|v| v.get(name))
        .cloned()
        .unwrap_or_default()
}

/// Static `subject[key]`.
fn subscript(subject: &Value, key: &Value) -> Value {
    match (subject, key) {
        (Value::Array(elements), k) if k.is_number() => k
            .as_int()
            .and_then(|i| resolve_index(elements.len(), i))
            .and_then(|i| elements.get(i))
            .cloned()
            .unwrap_or_default(),
        (Value::String(s), k) if k.is_number() => k
            .as_int()
            .and_then(|i| resolve_index(s.chars().count(), i))
            .and_then(|i| s.chars().nth(i))
            .map(|c| Value::String(c.to_string()))
            .unwrap_or_default(),
        (Value::Object(map), k) => map
            .get(&k.to_display_string())
            .cloned()
            .unwrap_or_default(),
        _ => Value::Null,
    }
}

/// Negative indices count from the end; out of range is `None`.
fn resolve_index(len: usize, index: i64) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let index = if index < 0 { index.checked_add(len)? } else { index };
    if (0..len).contains(&index) {
        usize::try_from(index).ok()
    } else {
        None
    }
}
