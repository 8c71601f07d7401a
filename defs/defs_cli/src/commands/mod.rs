//! Command implementations
//!
//! - **definition**: create, show and names
//! - **execution**: run

pub mod definition;
pub mod execution;

use thiserror::Error;

/// Errors in command-line input
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid argument declaration '{0}', expected NAME=TYPE")]
    InvalidArgDeclaration(String),

    #[error("Invalid --args JSON: {0}")]
    InvalidArgsJson(String),
}
