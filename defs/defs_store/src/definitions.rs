//! The definition store.
//!
//! Definition records are JSON under `defs/<id>`; aliases are the bare id
//! text under `names/<name>`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use defs_core::error::{Error, Result, StoreError};
use defs_core::id::{ContentFields, DefId};
use defs_core::types::{
    Arguments, Definition, DefinitionMeta, FunctionDefinition, Requires, TypeTag,
};
use tracing::{debug, info, trace, warn};

use crate::backend::StorageBackend;
use crate::namespace::{DEFS, NAMES};

/// The fields of a function definition before its id is known.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDefinition {
    /// Normalized executable body
    pub implementation: String,

    /// Declared argument types
    pub arguments: Option<Arguments>,

    /// Declared output type
    pub output_type: TypeTag,

    /// Documentation comment
    pub jsdoc: Option<String>,

    /// Dependency wiring, not part of the id
    pub requires: Requires,

    /// Alias to write alongside the record
    pub name: Option<String>,

    /// Creation time; defaults to now
    pub created_at: Option<DateTime<Utc>>,
}

impl NewDefinition {
    /// A definition with only a body and an output type.
    pub fn new(implementation: impl Into<String>, output_type: TypeTag) -> Self {
        Self {
            implementation: implementation.into(),
            arguments: None,
            output_type,
            jsdoc: None,
            requires: Requires::new(),
            name: None,
            created_at: None,
        }
    }

    /// The fields the id is computed from.
    pub fn content_fields(&self) -> ContentFields<'_> {
        ContentFields::new(
            &self.implementation,
            self.arguments.as_ref(),
            self.jsdoc.as_deref(),
            self.output_type,
        )
    }
}

/// Reads and writes definitions and aliases over a [`StorageBackend`].
#[derive(Clone)]
pub struct DefinitionStore {
    backend: Arc<dyn StorageBackend>,
}

impl DefinitionStore {
    /// Create a store over a backend.
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// The underlying backend.
    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    /// Persist a function definition under its content id.
    ///
    /// Creating the same content twice overwrites the same record, including
    /// its `requires`, and rewrites the alias. A name that cannot be an alias
    /// (one shaped like a def id) is kept in the record but not aliased.
    ///
    /// # Returns
    ///
    /// * `Ok(DefId)` - The content id.
    /// * `Err` - If the id could not be computed or a write failed.
    pub async fn create(&self, def: NewDefinition) -> Result<DefId> {
        let id = DefId::from_content(&def.content_fields())?;
        let meta = DefinitionMeta {
            created_at: def.created_at.unwrap_or_else(Utc::now),
        };
        let alias = def.name.clone().filter(|name| {
            let valid = is_alias_name(name);
            if !valid {
                warn!(%id, name = name.as_str(), "Name looks like a def id; not aliasing it");
            }
            valid
        });

        let record = FunctionDefinition {
            id: id.clone(),
            implementation: def.implementation,
            arguments: def.arguments,
            output_type: def.output_type,
            jsdoc: def.jsdoc,
            requires: def.requires,
            name: def.name,
            meta: Some(meta),
        };
        self.put(&id, &Definition::Function(record)).await?;

        if let Some(name) = &alias {
            self.set_alias(name, &id).await?;
        }

        info!(%id, name = alias.as_deref().unwrap_or(""), "Created definition");
        Ok(id)
    }

    /// Write any definition record under `id`.
    pub async fn put(&self, id: &DefId, def: &Definition) -> Result<()> {
        let bytes = serde_json::to_vec(def)?;
        self.backend.set(&DEFS.key(id.as_str()), &bytes).await?;
        debug!(%id, kind = def.kind(), "Stored definition");
        Ok(())
    }

    /// Read the definition stored under `id`.
    ///
    /// # Returns
    ///
    /// * `Ok(Definition)` - The stored record.
    /// * `Err(StoreError::NotFound)` - If nothing is stored under `id`.
    pub async fn get(&self, id: &DefId) -> Result<Definition> {
        match self.backend.get(&DEFS.key(id.as_str())).await? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Err(StoreError::NotFound(id.to_string()).into()),
        }
    }

    /// Turn a token into a content id.
    ///
    /// Id-shaped tokens are returned as they are, without reading the store
    /// or checking that the id exists. Anything else is looked up as a name
    /// with exactly one read.
    pub async fn resolve_token(&self, token: &str) -> Result<DefId> {
        if let Some(id) = DefId::parse(token) {
            trace!(token, "Token is a def id");
            return Ok(id);
        }

        let bytes = match self.backend.get(&NAMES.key(token)).await {
            Ok(bytes) => bytes,
            // A token the backend cannot store as a key was never aliased
            Err(Error::Store(StoreError::InvalidKey(_))) => None,
            Err(err) => return Err(err),
        }
        .ok_or_else(|| StoreError::NotFound(token.to_string()))?;
        let id = parse_alias(token, bytes)?;
        trace!(token, %id, "Resolved name");
        Ok(id)
    }

    /// Point `name` at `id`, replacing any previous target.
    pub async fn set_alias(&self, name: &str, id: &DefId) -> Result<()> {
        if !is_alias_name(name) {
            return Err(StoreError::InvalidKey(format!("alias name {:?}", name)).into());
        }
        self.backend
            .set(&NAMES.key(name), id.as_str().as_bytes())
            .await
    }

    /// Every alias and the id it points at, sorted by name.
    pub async fn names(&self) -> Result<Vec<(String, DefId)>> {
        let mut names = Vec::new();
        for key in self.backend.keys(NAMES.prefix()).await? {
            let Some(name) = NAMES.strip(&key) else {
                continue;
            };
            if let Some(bytes) = self.backend.get(&key).await? {
                names.push((name.to_string(), parse_alias(name, bytes)?));
            }
        }
        Ok(names)
    }

    /// Every stored definition id, sorted.
    pub async fn ids(&self) -> Result<Vec<DefId>> {
        let keys = self.backend.keys(DEFS.prefix()).await?;
        Ok(keys
            .iter()
            .filter_map(|key| DEFS.strip(key))
            .filter_map(DefId::parse)
            .collect())
    }
}

fn is_alias_name(name: &str) -> bool {
    !name.is_empty() && !DefId::is_def_id(name)
}

fn parse_alias(name: &str, bytes: Vec<u8>) -> Result<DefId> {
    String::from_utf8(bytes)
        .ok()
        .and_then(|text| DefId::parse(text.trim()))
        .ok_or_else(|| StoreError::Backend(format!("Alias {} is corrupt", name)).into())
}
