//! Isolation trait definitions.
//!
//! The isolation boundary is the only place a payload body runs. The
//! registry never evaluates a body itself; it hands the body and a binding
//! table to an [`IsolationBackend`] and gets a value or an error back.
//!
//! # Isolation Model
//!
//! - The body sees exactly the entries of its [`BindingTable`]
//! - No ambient host state, modules or globals leak into the body
//! - Failures raised by the body come back as `ExecutionError`s
//! - Errors raised by host callables in the table pass through unchanged

use crate::error::Result;
use crate::types::{BindingTable, EvalMode, Value};

/// Core trait for isolation backends.
///
/// # Examples
///
/// ```
/// use defs_core::traits::IsolationBackend;
/// use defs_core::types::{BindingTable, EvalMode, Value};
/// use defs_core::error::Result;
///
/// struct EchoBackend;
///
/// impl IsolationBackend for EchoBackend {
///     fn name(&self) -> &str {
///         "echo"
///     }
///
///     fn evaluate(&self, _body: &str, bindings: BindingTable, _mode: EvalMode) -> Result<Value> {
///         Ok(bindings.args().clone())
///     }
/// }
///
/// let out = EchoBackend
///     .evaluate("", BindingTable::new(Value::from(7.0)), EvalMode::Invoke)
///     .unwrap();
/// assert_eq!(out, Value::Number(7.0));
/// ```
pub trait IsolationBackend: Send + Sync {
    /// A short name for logs.
    fn name(&self) -> &str;

    /// Run a normalized body.
    ///
    /// # Arguments
    ///
    /// * `body` - The normalized body text.
    /// * `bindings` - Everything the body is allowed to see.
    /// * `mode` - Whether to invoke the exported function or return it.
    ///
    /// # Returns
    ///
    /// * `Ok(Value)` - The result of the invocation, or the exported value.
    /// * `Err(ExecutionError)` - If the body failed.
    fn evaluate(&self, body: &str, bindings: BindingTable, mode: EvalMode) -> Result<Value>;
}
