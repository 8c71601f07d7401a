//! Lexical scopes.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use defs_core::error::Result;
use defs_core::types::Value;
use parking_lot::Mutex;

use super::script_error;

struct Slot {
    value: Value,
    constant: bool,
}

#[derive(Default)]
struct ScopeInner {
    vars: Mutex<HashMap<String, Slot>>,
    parent: Option<Scope>,
}

/// A chain of variable frames. Cloning shares the frame.
#[derive(Clone, Default)]
pub(crate) struct Scope {
    inner: Arc<ScopeInner>,
}

/// A frame reference that does not keep the frame alive.
///
/// Closures hold their environment this way; a closure stored in its own
/// environment would otherwise never be freed.
#[derive(Clone)]
pub(crate) struct WeakScope {
    inner: Weak<ScopeInner>,
}

impl WeakScope {
    pub fn upgrade(&self) -> Option<Scope> {
        self.inner.upgrade().map(|inner| Scope { inner })
    }
}

impl Scope {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn child(&self) -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                vars: Mutex::default(),
                parent: Some(self.clone()),
            }),
        }
    }

    pub fn downgrade(&self) -> WeakScope {
        WeakScope {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn ptr_eq(&self, other: &Scope) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Bind a name in this frame, failing if it is already bound here.
    pub fn declare(&self, name: &str, value: Value, constant: bool) -> Result<()> {
        let mut vars = self.inner.vars.lock();
        if vars.contains_key(name) {
            return Err(script_error(format!(
                "Identifier '{}' has already been declared",
                name
            )));
        }
        vars.insert(name.to_string(), Slot { value, constant });
        Ok(())
    }

    /// Bind a name in this frame, replacing any previous binding.
    pub fn define(&self, name: &str, value: Value) {
        self.inner.vars.lock().insert(
            name.to_string(),
            Slot {
                value,
                constant: false,
            },
        );
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        let mut scope = Some(self);
        while let Some(current) = scope {
            if let Some(slot) = current.inner.vars.lock().get(name) {
                return Some(slot.value.clone());
            }
            scope = current.inner.parent.as_ref();
        }
        None
    }

    /// Update the nearest binding of `name`.
    pub fn assign(&self, name: &str, value: Value) -> Result<()> {
        let mut scope = Some(self);
        while let Some(current) = scope {
            if let Some(slot) = current.inner.vars.lock().get_mut(name) {
                if slot.constant {
                    return Err(script_error(format!(
                        "Assignment to constant variable '{}'",
                        name
                    )));
                }
                slot.value = value;
                return Ok(());
            }
            scope = current.inner.parent.as_ref();
        }
        Err(script_error(format!("{} is not defined", name)))
    }
}
