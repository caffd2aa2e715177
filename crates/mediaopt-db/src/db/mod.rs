//! Record store implementations
//
// Port definition shared by every backend
pub mod record_store;
//
// PostgreSQL backend, pool setup and embedded migrations
pub mod pool;
pub mod postgres;
pub mod transaction;
//
// In-memory backend for tests
#[cfg(feature = "memory")]
pub mod memory;
