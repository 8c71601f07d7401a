//! Utility types.
//!
//! This module provides the log level type shared by configuration and the
//! command-line front end.

pub mod logging;

pub use logging::LogLevel;
