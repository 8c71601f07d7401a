//! Error types for the defs registry.
//!
//! The errors are organized by subsystem: canonicalization, storage,
//! resolution, type contracts and execution. The root error type, `Error`,
//! wraps each of them so callers can handle failures uniformly while still
//! matching on the precise cause.
//!
//! None of these errors is retried anywhere in the system. A failure deep in
//! a dependency chain surfaces as that dependency's own error rather than a
//! generic wrapper.

use crate::id::DefId;
use crate::types::TypeTag;
use thiserror::Error;

/// Root error type for the defs registry.
#[derive(Debug, Error)]
pub enum Error {
    /// Raw source could not be turned into a normalized unit
    #[error("Canonicalization error: {0}")]
    Canonical(#[from] CanonicalError),

    /// Storage lookups and writes
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Building an execution tree failed
    #[error("Resolution error: {0}")]
    Resolve(#[from] ResolveError),

    /// Arguments passed to a dependency violate its declared signature
    #[error("Argument type error calling {id}: {source}")]
    ArgumentType {
        /// The dependency being called
        id: DefId,

        /// The violated contract
        source: ContractError,
    },

    /// A dependency returned a value of the wrong type
    #[error("Output type error returning from {id}: {source}")]
    OutputType {
        /// The dependency that returned the value
        id: DefId,

        /// The violated contract
        source: ContractError,
    },

    /// The payload failed inside the isolation boundary
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Errors raised while normalizing raw definition source.
#[derive(Debug, Error)]
pub enum CanonicalError {
    /// The source is not valid unit script
    #[error("Syntax error at {line}:{column}: {message}")]
    Syntax {
        /// 1-based line of the offending token
        line: usize,

        /// 1-based column of the offending token
        column: usize,

        /// What the parser expected
        message: String,
    },

    /// The module has no `export default` item
    #[error("Expected a default export")]
    MissingDefaultExport,

    /// The module has more than one `export default` item
    #[error("Only one default export is allowed")]
    DuplicateDefaultExport,

    /// The default export is not a function declaration
    #[error("Expected function declaration, got {0}")]
    InvalidExport(String),

    /// Strict mode: an import source does not look like a content id
    #[error("Expected {0} to be a def id")]
    InvalidDependencySource(String),

    /// An import binds a name the executor reserves for itself
    #[error("Cannot import into reserved binding '{0}'")]
    ReservedBinding(String),
}

/// Errors related to the definition store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No definition or alias exists under the given id or name
    #[error("Def not found: {0}")]
    NotFound(String),

    /// The key cannot be mapped onto the backend
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    /// The backend failed to read or write
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Errors raised while turning an id into an execution tree.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The stored unit is not a function-kind definition
    #[error("Def is not a function: {0}")]
    NotAFunction(DefId),

    /// Resolution nested deeper than the configured limit.
    ///
    /// The resolver has no cycle detection, so a cyclic `requires` graph
    /// always ends here.
    #[error("Resolution depth limit of {depth} exhausted at {id}")]
    DepthExhausted {
        /// The definition being resolved when the limit was hit
        id: DefId,

        /// The configured limit
        depth: usize,
    },
}

/// Violations of a declared argument or output type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    /// The number of supplied arguments differs from the declaration
    #[error("Expected {expected} arguments, got {actual}")]
    ArityMismatch {
        /// Declared argument count
        expected: usize,

        /// Supplied argument count
        actual: usize,
    },

    /// An argument was supplied that the definition does not declare
    #[error("Unexpected argument {0}")]
    UnexpectedArgument(String),

    /// A value's runtime type differs from the declared tag
    #[error("Expected {} to be of type {expected}, but got {actual}", describe_slot(.key))]
    TypeMismatch {
        /// The argument name, or `None` for the output value
        key: Option<String>,

        /// Declared type
        expected: TypeTag,

        /// Runtime type of the value
        actual: TypeTag,
    },
}

fn describe_slot(key: &Option<String>) -> String {
    match key {
        Some(key) => format!("arguments[{}]", key),
        None => "output".to_string(),
    }
}

/// Failures inside the isolation boundary.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The payload raised an error itself
    #[error("{0}")]
    Raised(String),

    /// The payload performed an invalid operation
    #[error("Script error: {0}")]
    Script(String),

    /// A value that is not a function was called
    #[error("{0} is not a function")]
    NotCallable(String),

    /// A depth, call or operation limit was exceeded
    #[error("Resource limit exceeded: {0}")]
    ResourceExhausted(String),
}

/// Result type used throughout the defs registry.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let err: Error = StoreError::NotFound("defs_abc".into()).into();
        assert!(matches!(err, Error::Store(StoreError::NotFound(_))));

        let err: Error = CanonicalError::MissingDefaultExport.into();
        assert!(matches!(
            err,
            Error::Canonical(CanonicalError::MissingDefaultExport)
        ));

        let err: Error = ExecutionError::Raised("boom".into()).into();
        assert!(matches!(err, Error::Execution(ExecutionError::Raised(_))));
    }

    #[test]
    fn test_not_found_names_the_key() {
        let err: Error = StoreError::NotFound("defs_missing".into()).into();
        assert!(err.to_string().contains("defs_missing"));
    }

    #[test]
    fn test_contract_display() {
        let err = ContractError::TypeMismatch {
            key: Some("x".into()),
            expected: TypeTag::Number,
            actual: TypeTag::String,
        };
        assert_eq!(
            err.to_string(),
            "Expected arguments[x] to be of type number, but got string"
        );

        let err = ContractError::TypeMismatch {
            key: None,
            expected: TypeTag::String,
            actual: TypeTag::Number,
        };
        assert_eq!(
            err.to_string(),
            "Expected output to be of type string, but got number"
        );
    }

    #[test]
    fn test_raised_keeps_original_message() {
        let err: Error = ExecutionError::Raised("payload said no".into()).into();
        assert_eq!(err.to_string(), "Execution error: payload said no");
    }
}
