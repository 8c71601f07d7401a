//! The unit script interpreter.

mod backend;
mod evaluation;
mod function;
mod interpreter;
mod intrinsics;
mod scope;

pub use backend::ScriptBackend;

use defs_core::error::{Error, ExecutionError};

fn script_error(message: impl Into<String>) -> Error {
    ExecutionError::Script(message.into()).into()
}
