//! Execution contexts.

use defs_core::id::DefId;
use defs_core::types::FunctionDefinition;
use indexmap::IndexMap;

/// A definition together with every definition it transitively requires.
///
/// Built fresh for each resolution and never persisted. A dependency that
/// appears under several parents is resolved and held once per parent.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionContext {
    /// Id of this node's definition
    pub id: DefId,

    /// The resolved definition
    pub definition: FunctionDefinition,

    /// Dependency id → its own resolved context
    pub subtree: IndexMap<DefId, ExecutionContext>,
}

impl ExecutionContext {
    /// The direct dependency with the given id.
    pub fn child(&self, id: &DefId) -> Option<&ExecutionContext> {
        self.subtree.get(id)
    }

    /// Follow a path of dependency ids down from this node.
    ///
    /// An empty path addresses this node.
    pub fn descend(&self, path: &[DefId]) -> Option<&ExecutionContext> {
        path.iter().try_fold(self, |node, id| node.child(id))
    }

    /// Number of nodes in the tree, this one included.
    pub fn node_count(&self) -> usize {
        1 + self.subtree.values().map(Self::node_count).sum::<usize>()
    }

    /// Length of the longest path from this node to a leaf, in nodes.
    pub fn depth(&self) -> usize {
        1 + self.subtree.values().map(Self::depth).max().unwrap_or(0)
    }
}
