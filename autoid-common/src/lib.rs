//! Auto-ID Common
//!
//! Shared utilities for the Auto-ID identity engine.
//!
//! This crate provides:
//! - Component-based structured logging with an identity label
//! - Logging level configuration applied to the `log` facade

pub mod logging;

pub use logging::{Component, LogLevel, Logger, LoggingConfig};
