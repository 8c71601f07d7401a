//! Resource limiter.
//!
//! This module provides the limits enforced on a running payload.

use defs_core::error::{ExecutionError, Result};

use crate::resource::usage::ResourceUsage;

/// A resource limiter.
///
/// A resource limiter decides whether the usage of an evaluation is still
/// acceptable.
pub trait ResourceLimiter: Send + Sync {
    /// Check if an evaluation is within resource limits.
    ///
    /// # Arguments
    ///
    /// * `usage` - The current resource usage.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the evaluation is within limits.
    /// * `Err(ExecutionError::ResourceExhausted)` - If a limit was exceeded.
    fn check_limits(&self, usage: &ResourceUsage) -> Result<()>;

    /// The maximum depth of nested script calls.
    fn max_call_depth(&self) -> usize;

    /// The maximum number of operations, if bounded.
    fn max_operations(&self) -> Option<u64>;
}

/// Limits applied to every evaluation of a [`ScriptBackend`](crate::ScriptBackend).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionLimits {
    /// The maximum depth of nested script calls on one thread, counting the
    /// calls of nested evaluations.
    pub max_call_depth: usize,

    /// The maximum number of operations; `None` means unbounded.
    pub max_operations: Option<u64>,
}

impl ExecutionLimits {
    /// Create a new set of limits.
    pub fn new(max_call_depth: usize, max_operations: Option<u64>) -> Self {
        Self {
            max_call_depth,
            max_operations,
        }
    }
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            max_call_depth: 128,
            max_operations: None,
        }
    }
}

impl ResourceLimiter for ExecutionLimits {
    fn check_limits(&self, usage: &ResourceUsage) -> Result<()> {
        if usage.call_depth > self.max_call_depth {
            return Err(ExecutionError::ResourceExhausted(format!(
                "Call depth ({}) exceeds limit ({})",
                usage.call_depth, self.max_call_depth
            ))
            .into());
        }

        if let Some(limit) = self.max_operations {
            if usage.operations > limit {
                return Err(ExecutionError::ResourceExhausted(format!(
                    "Operation count ({}) exceeds limit ({})",
                    usage.operations, limit
                ))
                .into());
            }
        }

        Ok(())
    }

    fn max_call_depth(&self) -> usize {
        self.max_call_depth
    }

    fn max_operations(&self) -> Option<u64> {
        self.max_operations
    }
}
