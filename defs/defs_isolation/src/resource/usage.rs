//! Resource usage.

use std::time::{Duration, Instant};

/// Resources used by one evaluation.
#[derive(Debug, Clone)]
pub struct ResourceUsage {
    /// Script functions currently on this thread's call stack
    pub call_depth: usize,

    /// Deepest call stack seen so far
    pub peak_call_depth: usize,

    /// Statements executed plus calls made
    pub operations: u64,

    /// Script function invocations
    pub function_calls: u64,

    /// When the evaluation started
    pub started_at: Instant,
}

impl Default for ResourceUsage {
    fn default() -> Self {
        Self {
            call_depth: 0,
            peak_call_depth: 0,
            operations: 0,
            function_calls: 0,
            started_at: Instant::now(),
        }
    }
}

impl ResourceUsage {
    /// Time since the evaluation started.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let usage = ResourceUsage::default();

        assert_eq!(usage.call_depth, 0);
        assert_eq!(usage.peak_call_depth, 0);
        assert_eq!(usage.operations, 0);
        assert_eq!(usage.function_calls, 0);
    }
}
