//! State shared by everything one evaluation runs.
//!
//! Closures only hold weak references to their scopes. The [`Evaluation`]
//! owns every scope a closure was created in, so the frames live exactly as
//! long as the evaluation: until `evaluate` returns, or until the last
//! function that escaped in its result is dropped.

use std::sync::Arc;

use defs_core::error::Result;
use defs_core::traits::Callable;
use defs_core::types::{Function, Value};
use parking_lot::Mutex;

use super::scope::Scope;
use crate::resource::ResourceMetering;

pub(crate) struct Evaluation {
    metering: ResourceMetering,
    frames: Mutex<Vec<Scope>>,
}

impl Evaluation {
    pub fn new(metering: ResourceMetering) -> Arc<Self> {
        Arc::new(Self {
            metering,
            frames: Mutex::default(),
        })
    }

    pub fn metering(&self) -> &ResourceMetering {
        &self.metering
    }

    /// Keep `scope` alive for the rest of the evaluation.
    pub fn retain(&self, scope: &Scope) {
        let mut frames = self.frames.lock();
        if !frames.last().is_some_and(|last| last.ptr_eq(scope)) {
            frames.push(scope.clone());
        }
    }

    #[cfg(test)]
    pub fn frame_count(&self) -> usize {
        self.frames.lock().len()
    }
}

/// Make every function inside `value` keep `evaluation` alive.
pub(crate) fn escape(value: Value, evaluation: &Arc<Evaluation>) -> Value {
    match value {
        Value::Function(inner) => Value::Function(Function::new(Escaped {
            inner,
            _evaluation: Arc::clone(evaluation),
        })),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| escape(item, evaluation))
                .collect(),
        ),
        Value::Object(object) => Value::Object(
            object
                .into_iter()
                .map(|(key, item)| (key, escape(item, evaluation)))
                .collect(),
        ),
        other => other,
    }
}

/// A function that outlived the evaluation it was created in.
struct Escaped {
    inner: Function,
    _evaluation: Arc<Evaluation>,
}

impl Callable for Escaped {
    fn name(&self) -> Option<&str> {
        self.inner.name()
    }

    fn call(&self, args: Vec<Value>) -> Result<Value> {
        self.inner.call(args)
    }
}
