//! # targex
//!
//! Targeting expressions and stable sampling.
//!
//! An expression such as
//!
//! ```text
//! normandy.channel in ["beta", "nightly"] && normandy.userId|stableSample(0.1)
//! ```
//!
//! is compiled once and evaluated against a per-client context to decide
//! whether a recipe applies. Sampling transforms hash their input with
//! SHA-256, so the same client gets the same answer every time.
//!
//! ```
//! use targex::{Transforms, Value, compile};
//! use serde_json::json;
//!
//! let expression = compile("normandy.version >= 60 && normandy.locale == 'en-US'").unwrap();
//! let context = Value::from(json!({"normandy": {"version": 120, "locale": "en-US"}}));
//!
//! let result = futures::executor::block_on(expression.evaluate(&context, &Transforms::standard()));
//! assert_eq!(result, Ok(Value::Boolean(true)));
//! ```

pub mod ast;
pub mod branch;
#[cfg(feature = "cli")]
pub mod cli;
pub mod error;
pub mod evaluator;
pub mod grammar;
pub mod lexer;
pub mod output;
pub mod parser;
pub mod sampling;
pub mod transform;
pub mod value;

use std::{fmt, str::FromStr};

use tracing::{debug, warn};

pub use ast::{BinOp, Expr, Token, UnaryOp};
pub use branch::{Branch, choose_branch};
pub use error::{Error, Result};
pub use evaluator::{EvalError, Evaluator};
pub use lexer::{LexError, Lexer, tokenize};
pub use output::{to_json, to_json_pretty};
pub use parser::{ParseError, Parser};
pub use sampling::{DEFAULT_BUCKET_TOTAL, Key, SamplingError};
pub use transform::{FnTransform, Transform, Transforms};
pub use value::Value;

/// A parsed expression, ready to be evaluated any number of times.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    ast: Expr,
}

impl Expression {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ast(&self) -> &Expr {
        &self.ast
    }

    pub async fn evaluate(&self, context: &Value, transforms: &Transforms) -> Result<Value> {
        Ok(Evaluator::new(context, transforms).eval(&self.ast).await?)
    }
}

impl FromStr for Expression {
    type Err = Error;

    fn from_str(source: &str) -> Result<Self> {
        compile(source)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Tokenizes and parses `source`.
pub fn compile(source: &str) -> Result<Expression> {
    let tokens = tokenize(source)?;
    let ast = Parser::new(tokens).parse()?;
    debug!(source, "compiled expression");

    Ok(Expression {
        source: source.to_string(),
        ast,
    })
}

/// Compiles and evaluates `source` in one call.
pub async fn evaluate(source: &str, context: &Value, transforms: &Transforms) -> Result<Value> {
    compile(source)?.evaluate(context, transforms).await
}

/// Whether `source` evaluates to a truthy value.
///
/// Any lex, parse or evaluation error counts as no match.
pub async fn matches(source: &str, context: &Value, transforms: &Transforms) -> bool {
    match evaluate(source, context, transforms).await {
        Ok(value) => value.is_truthy(),
        Err(error) => {
            warn!(source, %error, "targeting expression failed; treating as no match");
            false
        }
    }
}
