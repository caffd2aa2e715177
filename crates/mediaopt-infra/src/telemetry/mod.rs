//! Telemetry initialization
//!
//! Installs the global tracing subscriber used by every MediaOpt binary.

mod init_basic;

pub use init_basic::{init_telemetry, shutdown_telemetry, DEFAULT_LOG_FILTER};
