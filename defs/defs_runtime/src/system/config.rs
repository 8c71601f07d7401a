//! Configuration for the defs runtime
//!
//! Handles loading and validating runtime configuration from TOML.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use defs_core::utils::LogLevel;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};

/// Errors that can occur in configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Which storage backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Process-local, lost on exit
    #[default]
    Memory,

    /// One file per key under `path`
    File,
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend kind
    #[serde(default)]
    pub backend: StorageKind,

    /// Base directory of the file backend
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Canonicalizer configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CanonicalizerConfig {
    /// Reject imports whose source is not a content id
    #[serde(default)]
    pub strict: bool,
}

/// Resolver configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Deepest dependency chain that resolves, in nodes
    #[serde(default = "default_resolver_max_depth")]
    pub max_depth: usize,
}

fn default_resolver_max_depth() -> usize {
    128
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_depth: default_resolver_max_depth(),
        }
    }
}

/// Executor configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Default for `ExecuteOptions::runtime_type_checks`
    #[serde(default)]
    pub runtime_type_checks: bool,

    /// Deepest chain of nested executions (dependency calls and dynamic imports)
    #[serde(default = "default_execution_max_depth")]
    pub max_depth: usize,

    /// Stack size of the thread each execution runs on, in MiB
    #[serde(default = "default_stack_size_mb")]
    pub stack_size_mb: usize,
}

fn default_execution_max_depth() -> usize {
    64
}

fn default_stack_size_mb() -> usize {
    256
}

impl ExecutionConfig {
    /// Stack size of the execution thread, in bytes.
    pub fn stack_size(&self) -> usize {
        self.stack_size_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            runtime_type_checks: false,
            max_depth: default_execution_max_depth(),
            stack_size_mb: default_stack_size_mb(),
        }
    }
}

/// Limits of the script isolation backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsolationConfig {
    /// Deepest chain of script function calls in one execution, nested
    /// dependency calls and dynamic imports included
    #[serde(default = "default_max_call_depth")]
    pub max_call_depth: usize,

    /// Operation budget per evaluation; unbounded when absent
    #[serde(default)]
    pub max_operations: Option<u64>,
}

fn default_max_call_depth() -> usize {
    128
}

impl Default for IsolationConfig {
    fn default() -> Self {
        Self {
            max_call_depth: default_max_call_depth(),
            max_operations: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Lowest level that is emitted
    #[serde(default)]
    pub level: LogLevel,
}

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Canonicalizer configuration
    #[serde(default)]
    pub canonicalizer: CanonicalizerConfig,

    /// Resolver configuration
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Executor configuration
    #[serde(default)]
    pub execution: ExecutionConfig,

    /// Isolation backend configuration
    #[serde(default)]
    pub isolation: IsolationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RuntimeConfig {
    /// Load configuration from a file
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = RuntimeConfig::default();

        if let Some(path) = path {
            info!("Loading configuration from {}", path.display());

            if !path.exists() {
                warn!("Configuration file not found: {}", path.display());
                return Ok(config);
            }

            let content = fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;

            config = Self::from_toml(&content)
                .with_context(|| format!("Failed to parse configuration file: {}", path.display()))?;
        } else {
            info!("No configuration file specified, using defaults");
        }

        config.validate()?;

        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|err| ConfigError::ParseFailed(err.to_string()).into())
    }

    /// Use a file backend rooted at `path`
    pub fn with_file_storage(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage.backend = StorageKind::File;
        self.storage.path = Some(path.into());
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.storage.backend == StorageKind::File && self.storage.path.is_none() {
            return Err(
                ConfigError::Invalid("File storage requires a path".to_string()).into(),
            );
        }

        if self.resolver.max_depth == 0 {
            return Err(
                ConfigError::Invalid("Resolver max depth cannot be zero".to_string()).into(),
            );
        }

        if self.execution.max_depth == 0 {
            return Err(
                ConfigError::Invalid("Execution max depth cannot be zero".to_string()).into(),
            );
        }

        if self.execution.stack_size_mb == 0 {
            return Err(ConfigError::Invalid(
                "Execution stack size cannot be zero".to_string(),
            )
            .into());
        }

        if self.isolation.max_call_depth == 0 {
            return Err(
                ConfigError::Invalid("Isolation max call depth cannot be zero".to_string()).into(),
            );
        }

        if self.isolation.max_operations == Some(0) {
            warn!("Isolation operation budget is zero; every body will be rejected");
        }

        Ok(())
    }
}
