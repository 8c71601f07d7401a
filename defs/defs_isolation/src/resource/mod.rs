//! Resource limiting.
//!
//! This module bounds how deep a payload may recurse and how many steps it
//! may take.

mod limiter;
mod metering;
mod usage;

pub use limiter::{ExecutionLimits, ResourceLimiter};
pub use metering::{thread_call_depth, CallGuard, ResourceMetering};
pub use usage::ResourceUsage;
