//! Binding tables handed to the isolation boundary.
//!
//! A binding table is the complete set of names an executed body can see.
//! The executor fills it with one entry per declared dependency, the
//! dynamic-import lookup and the call arguments.

use indexmap::IndexMap;

use crate::types::Value;

/// Name under which the call arguments are bound.
pub const ARGS_BINDING: &str = "args";

/// Name of the host lookup that replaces dynamic imports.
pub const DYNAMIC_IMPORT_BINDING: &str = "require";

/// Slot a normalized body assigns its exported function to.
pub const EXPORT_SLOT: &str = "exports";

/// The names visible to an executed body.
#[derive(Debug, Clone, Default)]
pub struct BindingTable {
    entries: IndexMap<String, Value>,
}

impl BindingTable {
    /// Create a table holding only the call arguments.
    pub fn new(args: Value) -> Self {
        let mut entries = IndexMap::new();
        entries.insert(ARGS_BINDING.to_string(), args);
        Self { entries }
    }

    /// Bind a name, replacing any previous binding.
    pub fn bind(&mut self, name: impl Into<String>, value: Value) -> &mut Self {
        self.entries.insert(name.into(), value);
        self
    }

    /// Look up a binding.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    /// The call arguments, `null` when none were bound.
    pub fn args(&self) -> &Value {
        const NULL: &Value = &Value::Null;
        self.entries.get(ARGS_BINDING).unwrap_or(NULL)
    }

    /// Iterate over every binding in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What the isolation boundary returns after running a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalMode {
    /// Call the exported function with the bound arguments and return its result
    Invoke,

    /// Return the exported value itself without calling it
    Export,
}

impl EvalMode {
    /// The mode matching an `eval` flag.
    pub fn from_eval(eval: bool) -> Self {
        if eval {
            Self::Invoke
        } else {
            Self::Export
        }
    }
}
