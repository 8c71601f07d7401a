//! # Defs Store
//!
//! Persistence for the defs registry.
//!
//! - **backend**: The byte-level [`StorageBackend`] trait with an in-memory
//!   and a file-backed implementation
//! - **namespace**: Key prefixes separating definitions from name aliases
//! - **definitions**: [`DefinitionStore`], which computes content ids and
//!   reads and writes definition records and aliases

pub mod backend;
pub mod definitions;
pub mod namespace;

pub use backend::{FileStorage, MemoryStorage, StorageBackend};
pub use definitions::{DefinitionStore, NewDefinition};
pub use namespace::{Namespace, DEFS, NAMES};
