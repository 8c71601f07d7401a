//! Callable values.

use std::fmt;

use crate::error::Result;
use crate::types::Value;

/// Something a payload (or the host) can call.
///
/// Implementations must be shareable across threads because callables can
/// escape an execution as part of its result.
pub trait Callable: Send + Sync {
    /// The callable's name, used in diagnostics.
    fn name(&self) -> Option<&str> {
        None
    }

    /// Call with positional arguments.
    ///
    /// # Arguments
    ///
    /// * `args` - The positional arguments.
    ///
    /// # Returns
    ///
    /// * `Ok(Value)` - The returned value.
    /// * `Err` - Any error, propagated to the caller unchanged.
    fn call(&self, args: Vec<Value>) -> Result<Value>;
}

type NativeFn = dyn Fn(Vec<Value>) -> Result<Value> + Send + Sync;

/// A host closure exposed as a callable.
pub struct NativeFunction {
    name: String,
    f: Box<NativeFn>,
}

impl NativeFunction {
    /// Wrap a closure under a name.
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            f: Box::new(f),
        }
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .finish()
    }
}

impl Callable for NativeFunction {
    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn call(&self, args: Vec<Value>) -> Result<Value> {
        (self.f)(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_function_calls_closure() {
        let double = NativeFunction::new("double", |args| {
            let n = args.first().and_then(Value::as_number).unwrap_or(0.0);
            Ok(Value::Number(n * 2.0))
        });
        assert_eq!(double.name(), Some("double"));
        assert_eq!(
            double.call(vec![Value::Number(21.0)]).unwrap(),
            Value::Number(42.0)
        );
    }
}
