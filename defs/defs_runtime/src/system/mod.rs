//! System management for the defs runtime
//!
//! This module provides configuration loading and validation.

pub mod config;

// Re-export key types for convenience
pub use config::{
    CanonicalizerConfig, ExecutionConfig, IsolationConfig, LoggingConfig, ResolverConfig,
    RuntimeConfig, StorageConfig, StorageKind,
};
