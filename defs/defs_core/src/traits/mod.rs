//! Core traits that define the seams of the registry.
//!
//! - `Callable`: anything a payload can call, host closures and script
//!   functions alike
//! - `IsolationBackend`: the engine that runs a normalized body against a
//!   binding table

pub mod callable;
pub mod isolation;

pub use callable::{Callable, NativeFunction};
pub use isolation::IsolationBackend;
