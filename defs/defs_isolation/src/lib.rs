//! # Defs Isolation
//!
//! `defs_isolation` provides the isolation boundary of the defs registry: a
//! sandboxed interpreter for normalized unit script bodies.
//!
//! Key concepts:
//!
//! 1. **Script Backend**: An [`IsolationBackend`](defs_core::IsolationBackend)
//!    that parses a normalized body and runs it against a binding table.
//!
//! 2. **Sandbox**: The root scope holds the binding table entries and the
//!    `exports` slot. Everything else a body can reach is a pure intrinsic.
//!
//! 3. **Resource Limiter**: Call depth and operation budgets that turn
//!    runaway payloads into `ResourceExhausted` errors.

pub mod resource;
pub mod script;

// Re-export key types and traits for convenience
pub use resource::{
    thread_call_depth, CallGuard, ExecutionLimits, ResourceLimiter, ResourceMetering, ResourceUsage,
};
pub use script::ScriptBackend;
