//! Mediaopt Storage Library
//!
//! This crate provides the object store abstraction used by the pipeline and its
//! implementations for S3-compatible stores, the local filesystem and memory.
//!
//! # Object addressing
//!
//! Objects are addressed by `(bucket, path)` exactly as the upload event names them.
//! Every object carries a content type and a flat map of string metadata. Paths must
//! not contain `..` or a leading `/`.

pub mod factory;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-memory")]
pub mod memory;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use mediaopt_core::StorageBackend;
#[cfg(feature = "storage-memory")]
pub use memory::{InMemoryStorage, StoredObject};
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{ObjectInfo, Storage, StorageError, StorageResult};
