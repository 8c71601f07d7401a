//! Identifiers for the defs registry.
//!
//! Two kinds of identifier live here:
//!
//! - [`DefId`], the content address of a definition. It is derived from the
//!   normalized content of a function and is therefore deterministic: the
//!   same normalized body and signature always produce the same id.
//! - [`Id<T>`], a random UUID with a phantom marker type. It is used for
//!   transient things such as a single execution, where a content address
//!   would make no sense.
//!
//! # Examples
//!
//! ```
//! use defs_core::id::{ContentFields, DefId};
//! use defs_core::types::TypeTag;
//!
//! let fields = ContentFields::new("exports = fn one() { return 1; };", None, None, TypeTag::Number);
//! let id = DefId::from_content(&fields).unwrap();
//!
//! assert!(DefId::is_def_id(id.as_str()));
//! assert_eq!(id, DefId::from_content(&fields).unwrap());
//! ```

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Result;
use crate::types::{Arguments, TypeTag};

/// Textual prefix shared by every content id.
pub const DEF_ID_PREFIX: &str = "defs_";

/// The content address of a function definition.
///
/// A `DefId` is `defs_` followed by the URL-safe base64 encoding (without
/// padding) of a SHA-256 digest over the canonical [`ContentFields`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DefId(String);

impl DefId {
    /// Compute the content id for a set of normalized fields.
    ///
    /// # Arguments
    ///
    /// * `content` - The normalized body and signature.
    ///
    /// # Returns
    ///
    /// * `Ok(DefId)` - The deterministic id for this content.
    /// * `Err(Error::Serialization)` - If the canonical form could not be encoded.
    pub fn from_content(content: &ContentFields<'_>) -> Result<Self> {
        let canonical = serde_json::to_vec(content)?;
        let digest = Sha256::digest(&canonical);

        Ok(Self(format!(
            "{}{}",
            DEF_ID_PREFIX,
            URL_SAFE_NO_PAD.encode(digest)
        )))
    }

    /// Check whether a token has the content-id shape.
    ///
    /// This is a shape check only; it says nothing about whether a definition
    /// with that id exists.
    pub fn is_def_id(token: &str) -> bool {
        token.starts_with(DEF_ID_PREFIX)
    }

    /// Interpret a token as a content id if it has the content-id shape.
    pub fn parse(token: &str) -> Option<Self> {
        Self::is_def_id(token).then(|| Self(token.to_string()))
    }

    /// The id as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DefId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Returned when text without the content-id shape is used as a [`DefId`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Not a def id: {0}")]
pub struct InvalidDefId(pub String);

impl TryFrom<String> for DefId {
    type Error = InvalidDefId;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        if Self::is_def_id(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidDefId(value))
        }
    }
}

impl From<DefId> for String {
    fn from(id: DefId) -> Self {
        id.0
    }
}

impl FromStr for DefId {
    type Err = InvalidDefId;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::try_from(s.to_string())
    }
}

/// The fields that make up a definition's identity.
///
/// The dependency map (`requires`), the alias and the metadata are
/// not part of the identity: two definitions that differ only in how their
/// imports are wired share one id, and the later write wins in the store.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentFields<'a> {
    /// The normalized executable body
    pub implementation: &'a str,

    /// Declared argument types, sorted by name
    pub arguments: Option<BTreeMap<&'a str, TypeTag>>,

    /// The captured documentation comment
    pub jsdoc: Option<&'a str>,

    /// Declared output type
    pub output_type: TypeTag,
}

impl<'a> ContentFields<'a> {
    /// Build the canonical field set.
    ///
    /// Argument names are sorted so that declaration order does not affect
    /// the id, while an absent argument map still differs from an empty one.
    pub fn new(
        implementation: &'a str,
        arguments: Option<&'a Arguments>,
        jsdoc: Option<&'a str>,
        output_type: TypeTag,
    ) -> Self {
        Self {
            implementation,
            arguments: arguments.map(|args| {
                args.iter()
                    .map(|(name, tag)| (name.as_str(), *tag))
                    .collect()
            }),
            jsdoc,
            output_type,
        }
    }
}

/// A type-safe random identifier.
///
/// The phantom parameter `T` keeps identifiers for different entity types
/// from being mixed up even though they share the same UUID structure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct Id<T> {
    uuid: Uuid,
    #[serde(skip)]
    _marker: std::marker::PhantomData<T>,
}

impl<T> Id<T> {
    /// Create a new random identifier.
    pub fn new() -> Self {
        Self {
            uuid: Uuid::new_v4(),
            _marker: std::marker::PhantomData,
        }
    }

    /// Create an identifier from a specific UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self {
            uuid,
            _marker: std::marker::PhantomData,
        }
    }

    /// Get the underlying UUID.
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }
}

impl<T> Default for Id<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uuid)
    }
}

impl<T> FromStr for Id<T> {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self {
            uuid: Uuid::parse_str(s)?,
            _marker: std::marker::PhantomData,
        })
    }
}

/// Marker type for executions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExecutionMarker;
/// Identifier for one top-level execution, used to correlate log lines.
pub type ExecutionId = Id<ExecutionMarker>;
