//! CLI support for targex
//!
//! The `targex` binary is a thin shell over these functions, so they can
//! also be driven from other tools.

mod check;
mod sample;

pub use check::{CheckOptions, CheckResult, execute_check};
pub use sample::{parse_branch_spec, parse_branches};

use std::io;

use thiserror::Error;

use crate::sampling::SamplingError;

/// Errors that can occur during CLI operations
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Expression(#[from] crate::Error),

    #[error("Sampling error: {0}")]
    Sampling(#[from] SamplingError),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// `slug=ratio` argument that does not parse
    #[error("Invalid branch '{0}': expected slug=ratio")]
    InvalidBranch(String),
}
