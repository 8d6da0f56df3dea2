use thiserror::Error;

use crate::{evaluator::EvalError, lexer::LexError, parser::ParseError};

/// Any failure of compiling or evaluating an expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("Lex error: {0}")]
    Lex(#[from] LexError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Evaluation error: {0}")]
    Eval(#[from] EvalError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
