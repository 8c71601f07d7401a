//! Resource metering.
//!
//! This module tracks the resources used by an evaluation and enforces a
//! [`ResourceLimiter`] as they grow.
//!
//! Call depth is counted per thread rather than per evaluation. Nested
//! evaluations (a dependency called from a running body) run on the same
//! thread and share its stack, so they share one depth budget.

use std::cell::Cell;
use std::sync::Arc;

use defs_core::error::Result;
use parking_lot::Mutex;

use crate::resource::{ResourceLimiter, ResourceUsage};

thread_local! {
    static CALL_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Script functions currently running on this thread, across evaluations.
pub fn thread_call_depth() -> usize {
    CALL_DEPTH.with(Cell::get)
}

/// Resource metering.
///
/// One metering is shared by every script function created during an
/// evaluation, including functions that escape it.
pub struct ResourceMetering {
    /// The resource limiter.
    limiter: Arc<dyn ResourceLimiter>,

    /// The current resource usage.
    usage: Mutex<ResourceUsage>,
}

impl ResourceMetering {
    /// Create a new resource metering.
    pub fn new(limiter: Arc<dyn ResourceLimiter>) -> Self {
        Self {
            limiter,
            usage: Mutex::new(ResourceUsage::default()),
        }
    }

    /// A snapshot of the current resource usage.
    pub fn usage(&self) -> ResourceUsage {
        self.usage.lock().clone()
    }

    /// Record entry into a script function.
    ///
    /// The returned guard records the exit when dropped.
    ///
    /// # Returns
    ///
    /// * `Ok(CallGuard)` - If the deeper stack is within limits.
    /// * `Err(ExecutionError::ResourceExhausted)` - If the call would exceed them.
    pub fn enter_call(&self) -> Result<CallGuard<'_>> {
        let depth = CALL_DEPTH.with(|depth| {
            depth.set(depth.get() + 1);
            depth.get()
        });
        let guard = CallGuard { metering: self };

        {
            let mut usage = self.usage.lock();
            usage.call_depth = depth;
            usage.function_calls += 1;
            usage.operations += 1;
            usage.peak_call_depth = usage.peak_call_depth.max(depth);
            self.limiter.check_limits(&usage)?;
        }
        Ok(guard)
    }

    /// Record one operation.
    pub fn tick(&self) -> Result<()> {
        let mut usage = self.usage.lock();
        usage.operations += 1;
        self.limiter.check_limits(&usage)
    }

    /// Check if the resource usage is within limits.
    pub fn check_limits(&self) -> Result<()> {
        self.limiter.check_limits(&self.usage.lock())
    }

    fn exit_call(&self) {
        let depth = CALL_DEPTH.with(|depth| {
            depth.set(depth.get().saturating_sub(1));
            depth.get()
        });
        self.usage.lock().call_depth = depth;
    }
}

/// Marks a script function as on the call stack.
pub struct CallGuard<'a> {
    metering: &'a ResourceMetering,
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.metering.exit_call();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ExecutionLimits;

    #[test]
    fn test_call_guards_track_depth() {
        let metering = ResourceMetering::new(Arc::new(ExecutionLimits::default()));

        {
            let _outer = metering.enter_call().unwrap();
            let _inner = metering.enter_call().unwrap();
            assert_eq!(metering.usage().call_depth, 2);
        }

        let usage = metering.usage();
        assert_eq!(usage.call_depth, 0);
        assert_eq!(usage.peak_call_depth, 2);
        assert_eq!(usage.function_calls, 2);
    }

    #[test]
    fn test_enter_call_over_limit() {
        let metering = ResourceMetering::new(Arc::new(ExecutionLimits::new(1, None)));

        let _first = metering.enter_call().unwrap();
        assert!(metering.enter_call().is_err());
        assert_eq!(metering.usage().call_depth, 1);
        assert_eq!(thread_call_depth(), 1);
    }

    #[test]
    fn test_depth_is_shared_across_meterings() {
        let limits = Arc::new(ExecutionLimits::new(2, None));
        let outer = ResourceMetering::new(limits.clone());
        let inner = ResourceMetering::new(limits);

        {
            let _a = outer.enter_call().unwrap();
            let _b = inner.enter_call().unwrap();
            assert_eq!(inner.usage().call_depth, 2);
            assert!(inner.enter_call().is_err());
            assert!(outer.enter_call().is_err());
        }

        assert_eq!(thread_call_depth(), 0);
        assert!(inner.enter_call().is_ok());
    }

    #[test]
    fn test_tick_over_limit() {
        let metering = ResourceMetering::new(Arc::new(ExecutionLimits::new(8, Some(2))));

        assert!(metering.tick().is_ok());
        assert!(metering.tick().is_ok());
        assert!(metering.tick().is_err());
        assert!(metering.check_limits().is_err());
    }
}
