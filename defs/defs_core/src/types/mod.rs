//! Data structures used throughout the registry.
//!
//! - `definition`: the persisted records
//! - `value`: runtime values crossing the isolation boundary
//! - `binding`: the binding tables an executed body sees

pub mod binding;
pub mod definition;
pub mod value;

pub use binding::{BindingTable, EvalMode, ARGS_BINDING, DYNAMIC_IMPORT_BINDING, EXPORT_SLOT};
pub use definition::{
    Arguments, Definition, DefinitionMeta, FunctionDefinition, ModuleDefinition, Requires,
};
pub use value::{format_number, Function, Object, TypeTag, Value};
