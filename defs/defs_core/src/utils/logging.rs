//! Log level names.
//!
//! The registry logs through `tracing`. Configuration files and the command
//! line name a level with one of the strings accepted by [`LogLevel`]'s
//! `FromStr` and serde implementations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The lowest severity a subscriber emits.
///
/// Variants are ordered from most to least verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Per-node execution and resolution detail
    Trace,

    /// Per-execution summaries
    Debug,

    /// Lifecycle events such as created definitions
    #[default]
    Info,

    /// Recoverable oddities such as a missing configuration file
    #[serde(alias = "warn")]
    Warning,

    /// Failures only
    Error,
}

impl LogLevel {
    /// The lowercase name used in configuration.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }

    /// The matching `tracing` level.
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warning => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let level = match s.to_ascii_lowercase().as_str() {
            "trace" => Self::Trace,
            "debug" => Self::Debug,
            "info" => Self::Info,
            "warn" | "warning" => Self::Warning,
            "err" | "error" => Self::Error,
            other => return Err(format!("Unknown log level: {}", other)),
        };
        Ok(level)
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
