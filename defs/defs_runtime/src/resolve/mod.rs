//! Dependency resolution.
//!
//! The resolver turns a content id into an [`ExecutionContext`]: the stored
//! definition plus, recursively, a context for every id in its `requires`.
//! Direct dependencies are fetched concurrently and the parent waits for all
//! of them.
//!
//! There is no cycle detection. A definition that requires itself, directly
//! or through a chain, recurses until [`ResolverConfig::max_depth`] is
//! reached and fails with `ResolveError::DepthExhausted`. Nothing is cached
//! either: siblings that share a dependency each resolve their own copy.

pub mod context;

pub use context::ExecutionContext;

use defs_core::error::{ResolveError, Result};
use defs_core::id::DefId;
use defs_core::types::Definition;
use defs_store::DefinitionStore;
use futures::future::{try_join_all, BoxFuture, FutureExt};
use tracing::{debug, trace};

use crate::system::config::ResolverConfig;

/// Builds execution trees from the definition store.
#[derive(Clone)]
pub struct Resolver {
    store: DefinitionStore,
    config: ResolverConfig,
}

impl Resolver {
    /// Create a resolver over a store.
    pub fn new(store: DefinitionStore, config: ResolverConfig) -> Self {
        Self { store, config }
    }

    /// The store definitions are read from.
    pub fn store(&self) -> &DefinitionStore {
        &self.store
    }

    /// Turn a name or id into an id. See [`DefinitionStore::resolve_token`].
    pub async fn resolve_token(&self, token: &str) -> Result<DefId> {
        self.store.resolve_token(token).await
    }

    /// Resolve an id into a full execution tree.
    ///
    /// # Returns
    ///
    /// * `Ok(ExecutionContext)` - The tree rooted at `id`.
    /// * `Err(StoreError::NotFound)` - If `id` or any dependency is missing;
    ///   the error names the missing id.
    /// * `Err(ResolveError::NotAFunction)` - If a node is not a function.
    /// * `Err(ResolveError::DepthExhausted)` - If the tree is deeper than the
    ///   configured limit, which is always the case for cyclic graphs.
    pub async fn resolve(&self, id: &DefId) -> Result<ExecutionContext> {
        let context = self.resolve_at(id.clone(), 0).await?;
        debug!(%id, nodes = context.node_count(), "Resolved execution tree");
        Ok(context)
    }

    fn resolve_at(&self, id: DefId, depth: usize) -> BoxFuture<'_, Result<ExecutionContext>> {
        async move {
            if depth >= self.config.max_depth {
                return Err(ResolveError::DepthExhausted {
                    id,
                    depth: self.config.max_depth,
                }
                .into());
            }

            let definition = match self.store.get(&id).await? {
                Definition::Function(definition) => definition,
                Definition::Module(_) => return Err(ResolveError::NotAFunction(id).into()),
            };

            let mut dependencies: Vec<&DefId> = Vec::with_capacity(definition.requires.len());
            for dependency in definition.requires.values() {
                if !dependencies.contains(&dependency) {
                    dependencies.push(dependency);
                }
            }
            trace!(%id, depth, dependencies = dependencies.len(), "Resolving dependencies");

            let children = try_join_all(
                dependencies
                    .into_iter()
                    .map(|dependency| self.resolve_at(dependency.clone(), depth + 1)),
            )
            .await?;

            let subtree = children
                .into_iter()
                .map(|child| (child.id.clone(), child))
                .collect();

            Ok(ExecutionContext {
                id,
                definition,
                subtree,
            })
        }
        .boxed()
    }
}
