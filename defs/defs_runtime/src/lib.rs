//! Defs Runtime - the registry's create / resolve / execute pipeline
//!
//! This crate ties the pieces of the registry together:
//!
//! - **canon**: normalizes raw source into a canonical body
//! - **contracts**: runtime checks of declared argument and output types
//! - **resolve**: builds execution trees from the store
//! - **execute**: runs execution trees inside the isolation backend
//! - **system**: configuration
//!
//! [`Runtime`] is the facade most callers want.

pub mod canon;
pub mod contracts;
pub mod execute;
pub mod resolve;
pub mod system;

use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use defs_core::error::ExecutionError;
use defs_core::id::DefId;
use defs_core::traits::IsolationBackend;
use defs_core::types::{Arguments, Definition, Requires, TypeTag, Value};
use defs_isolation::{ExecutionLimits, ScriptBackend};
use defs_store::{DefinitionStore, FileStorage, MemoryStorage, NewDefinition, StorageBackend};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, info, Span};

pub use canon::{normalize, NormalizeOptions, Normalized};
pub use execute::{ExecuteOptions, Executor};
pub use resolve::{ExecutionContext, Resolver};
pub use system::config::{RuntimeConfig, StorageKind};

/// Raw input for [`Runtime::create_fn`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewFunction {
    /// Raw unit-script source with one default export
    pub implementation: String,

    /// Declared argument types
    pub arguments: Option<Arguments>,

    /// Declared output type
    pub output_type: TypeTag,

    /// Creation time; defaults to now
    pub created_at: Option<DateTime<Utc>>,

    /// Overrides the configured strict mode for this definition
    pub strict: Option<bool>,
}

impl NewFunction {
    /// A definition with no declared arguments.
    pub fn new(implementation: impl Into<String>, output_type: TypeTag) -> Self {
        Self {
            implementation: implementation.into(),
            arguments: None,
            output_type,
            created_at: None,
            strict: None,
        }
    }

    /// Declare one argument.
    pub fn arg(mut self, name: impl Into<String>, tag: TypeTag) -> Self {
        self.arguments
            .get_or_insert_with(Arguments::new)
            .insert(name.into(), tag);
        self
    }
}

/// Runtime facade that provides a unified interface to the registry.
pub struct Runtime {
    config: RuntimeConfig,
    store: DefinitionStore,
    resolver: Resolver,
    executor: Executor,
}

impl Runtime {
    /// Create a runtime from configuration.
    ///
    /// Must be called inside a tokio runtime; dynamic imports block on it.
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        config.validate()?;

        let storage: Arc<dyn StorageBackend> = match config.storage.backend {
            StorageKind::Memory => Arc::new(MemoryStorage::new()),
            StorageKind::File => {
                let path = config
                    .storage
                    .path
                    .clone()
                    .context("File storage requires a path")?;
                info!("Using file storage at {}", path.display());
                Arc::new(FileStorage::new(path))
            }
        };
        let isolation = Arc::new(ScriptBackend::new(ExecutionLimits::new(
            config.isolation.max_call_depth,
            config.isolation.max_operations,
        )));

        Self::with_backends(config, storage, isolation)
    }

    /// Create a runtime from a configuration file, or defaults.
    pub async fn load(config_path: Option<&std::path::Path>) -> Result<Self> {
        let config = RuntimeConfig::load(config_path).await?;
        Self::new(config)
    }

    /// Create a runtime over explicit backends.
    pub fn with_backends(
        config: RuntimeConfig,
        storage: Arc<dyn StorageBackend>,
        isolation: Arc<dyn IsolationBackend>,
    ) -> Result<Self> {
        info!("Initializing defs runtime");

        let handle = Handle::try_current().context("The defs runtime needs a tokio runtime")?;
        let store = DefinitionStore::new(storage);
        let resolver = Resolver::new(store.clone(), config.resolver);
        let executor = Executor::new(isolation, resolver.clone(), handle, &config.execution);

        info!("Defs runtime initialized with {} isolation", executor.isolation().name());

        Ok(Self {
            config,
            store,
            resolver,
            executor,
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// The definition store.
    pub fn store(&self) -> &DefinitionStore {
        &self.store
    }

    /// Execute options following the configured defaults.
    pub fn default_options(&self) -> ExecuteOptions {
        ExecuteOptions {
            runtime_type_checks: self.config.execution.runtime_type_checks,
            eval: true,
        }
    }

    /// Normalize, identify and store a function.
    ///
    /// Import sources that are names are pinned to the id they point at now.
    /// Nothing is written if normalization or pinning fails.
    ///
    /// # Returns
    ///
    /// * `Ok(DefId)` - The content id.
    /// * `Err(Error::Canonical)` - If the source is rejected.
    /// * `Err(StoreError::NotFound)` - If an imported name has no alias.
    pub async fn create_fn(&self, def: NewFunction) -> defs_core::Result<DefId> {
        let strict = def.strict.unwrap_or(self.config.canonicalizer.strict);
        let normalized = normalize(&def.implementation, NormalizeOptions { strict })?;

        let mut requires = Requires::new();
        for (local, source) in normalized.requires {
            let id = self.store.resolve_token(&source).await?;
            requires.insert(local, id);
        }

        let id = self
            .store
            .create(NewDefinition {
                implementation: normalized.body,
                arguments: def.arguments,
                output_type: def.output_type,
                jsdoc: normalized.jsdoc,
                requires,
                name: normalized.exported_name,
                created_at: def.created_at,
            })
            .await?;
        Ok(id)
    }

    /// Read a stored definition.
    pub async fn get(&self, id: &DefId) -> defs_core::Result<Definition> {
        self.store.get(id).await
    }

    /// Turn a name or id into an id.
    pub async fn resolve_token(&self, token: &str) -> defs_core::Result<DefId> {
        self.resolver.resolve_token(token).await
    }

    /// Build the execution tree of `id`.
    pub async fn resolve(&self, id: &DefId) -> defs_core::Result<ExecutionContext> {
        self.resolver.resolve(id).await
    }

    /// Execute a resolved tree on its own thread.
    ///
    /// The thread gets the configured stack size, so payloads recursing up to
    /// the configured call depth cannot exhaust the host stack.
    pub async fn execute(
        &self,
        context: ExecutionContext,
        args: Value,
        options: ExecuteOptions,
    ) -> defs_core::Result<Value> {
        let executor = self.executor.clone();
        let span = Span::current();
        let (tx, rx) = oneshot::channel();

        thread::Builder::new()
            .name("defs-execute".to_string())
            .stack_size(self.config.execution.stack_size())
            .spawn(move || {
                let _enter = span.enter();
                let _ = tx.send(executor.execute(context, args, options));
            })
            .map_err(|err| {
                ExecutionError::Script(format!("Failed to start execution thread: {}", err))
            })?;

        rx.await.map_err(|_| {
            ExecutionError::Script("Execution thread stopped without a result".to_string())
        })?
    }

    /// Resolve a name or id and execute it.
    pub async fn run(
        &self,
        token: &str,
        args: Value,
        options: ExecuteOptions,
    ) -> defs_core::Result<Value> {
        let id = self.resolve_token(token).await?;
        let context = self.resolve(&id).await?;
        debug!(%id, token, "Running definition");
        self.execute(context, args, options).await
    }

    /// Every alias and its id.
    pub async fn names(&self) -> defs_core::Result<Vec<(String, DefId)>> {
        self.store.names().await
    }

    /// Read the definition a name or id points at.
    pub async fn show(&self, token: &str) -> defs_core::Result<Definition> {
        let id = self.resolve_token(token).await?;
        self.get(&id).await
    }
}
