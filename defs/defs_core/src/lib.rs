//! # Defs Core
//!
//! `defs_core` provides the fundamental building blocks shared by every crate
//! of the defs registry: error types, identifiers, the persisted data model,
//! runtime values and the traits that separate the registry from the engine
//! that actually runs payloads.
//!
//! ## Core Principles
//!
//! 1. **Content Addressing**: A function definition is named by a hash of its
//!    normalized content. Two definitions with the same normalized body and
//!    signature share an id, whatever their dependency wiring.
//!
//! 2. **Explicit Capabilities**: An executed body sees exactly its declared
//!    dependencies, the dynamic-import lookup and its arguments. Nothing else
//!    from the host crosses the boundary.
//!
//! 3. **Pluggable Isolation**: The engine that evaluates a body is reached
//!    only through [`IsolationBackend`], so the registry never compiles a
//!    payload into its own trust domain.
//!
//! 4. **Opt-in Contracts**: Declared argument and output types are checked at
//!    runtime only when a caller asks for it.
//!
//! ## Crate Structure
//!
//! - **error**: Error types for all defs components
//! - **id**: Content ids and execution ids
//! - **traits**: Callable values and the isolation boundary
//! - **types**: Definitions, runtime values and binding tables
//! - **utils**: Logging helpers

pub mod error;
pub mod id;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export key types and traits for convenience
pub use error::{
    CanonicalError, ContractError, Error, ExecutionError, ResolveError, Result, StoreError,
};
pub use id::{ContentFields, DefId, ExecutionId};
pub use traits::{Callable, IsolationBackend, NativeFunction};
pub use types::{
    Arguments, BindingTable, Definition, DefinitionMeta, EvalMode, Function, FunctionDefinition,
    ModuleDefinition, Object, Requires, TypeTag, Value,
};
pub use utils::LogLevel;
