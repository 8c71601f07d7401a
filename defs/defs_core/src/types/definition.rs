//! Persisted definition records.
//!
//! These are the records the store keeps under a content id. They are
//! serialized as JSON objects tagged with a `type` field so that more unit
//! kinds can be added without breaking existing records.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::id::{ContentFields, DefId};
use crate::types::TypeTag;

/// Declared argument types, in declaration order.
pub type Arguments = IndexMap<String, TypeTag>;

/// Local binding name → content id of the dependency.
pub type Requires = IndexMap<String, DefId>;

/// The unit of storage: a normalized, executable function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDefinition {
    /// Content address, derived from the identity fields
    pub id: DefId,

    /// Normalized executable body
    pub implementation: String,

    /// Declared argument types; absent for zero-arity functions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Arguments>,

    /// Declared output type
    pub output_type: TypeTag,

    /// Leading documentation comment of the raw source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsdoc: Option<String>,

    /// Dependencies by the local name used inside `implementation`.
    ///
    /// Not part of the identity hash.
    #[serde(default)]
    pub requires: Requires,

    /// Human-readable alias written at creation time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Creation metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<DefinitionMeta>,
}

impl FunctionDefinition {
    /// The fields this definition's id is computed from.
    pub fn content_fields(&self) -> ContentFields<'_> {
        ContentFields::new(
            &self.implementation,
            self.arguments.as_ref(),
            self.jsdoc.as_deref(),
            self.output_type,
        )
    }

    /// Number of declared arguments.
    pub fn arity(&self) -> usize {
        self.arguments.as_ref().map_or(0, IndexMap::len)
    }
}

/// Metadata attached to a definition when it is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionMeta {
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl DefinitionMeta {
    /// Metadata stamped with the current time.
    pub fn now() -> Self {
        Self {
            created_at: Utc::now(),
        }
    }
}

/// A unit with named exports.
///
/// The registry can store these but nothing executes them yet; resolving one
/// fails with `NotAFunction`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDefinition {
    /// Named export → content id
    pub exports: IndexMap<String, DefId>,

    /// Module body
    pub implementation: String,

    /// Content ids this module depends on
    #[serde(default)]
    pub requires: Vec<DefId>,
}

/// Any unit the store can hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Definition {
    /// An executable function
    #[serde(rename = "functionDef")]
    Function(FunctionDefinition),

    /// A module of named exports
    #[serde(rename = "moduleDef")]
    Module(ModuleDefinition),
}

impl Definition {
    /// The tag this unit is stored under.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Function(_) => "functionDef",
            Self::Module(_) => "moduleDef",
        }
    }

    /// Take the function definition out, if this is one.
    pub fn into_function(self) -> Option<FunctionDefinition> {
        match self {
            Self::Function(def) => Some(def),
            Self::Module(_) => None,
        }
    }
}

impl From<FunctionDefinition> for Definition {
    fn from(def: FunctionDefinition) -> Self {
        Self::Function(def)
    }
}

impl From<ModuleDefinition> for Definition {
    fn from(def: ModuleDefinition) -> Self {
        Self::Module(def)
    }
}
