//! Key namespaces.
//!
//! Definitions and aliases share one backend; their keys are kept apart by
//! prefix.

/// A key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Namespace {
    prefix: &'static str,
}

/// Definition records, keyed by content id.
pub const DEFS: Namespace = Namespace::new("defs/");

/// Name aliases, keyed by name.
pub const NAMES: Namespace = Namespace::new("names/");

impl Namespace {
    /// Create a namespace. The prefix should end with `/`.
    pub const fn new(prefix: &'static str) -> Self {
        Self { prefix }
    }

    /// The raw prefix.
    pub fn prefix(&self) -> &'static str {
        self.prefix
    }

    /// The backend key for `name` in this namespace.
    pub fn key(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// The name a backend key refers to, if the key is in this namespace.
    pub fn strip<'a>(&self, key: &'a str) -> Option<&'a str> {
        key.strip_prefix(self.prefix)
    }
}
