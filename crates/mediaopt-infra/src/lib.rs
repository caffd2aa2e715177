//! MediaOpt Infrastructure Library
//!
//! Shared process-level infrastructure for MediaOpt binaries:
//! - Telemetry initialization (tracing subscriber)

#[cfg(feature = "observability-basic")]
pub mod telemetry;

#[cfg(feature = "observability-basic")]
pub use telemetry::{init_telemetry, shutdown_telemetry, DEFAULT_LOG_FILTER};
