//! Object storage backend for S3-compatible stores.
//!
//! This module provides:
//! - The `ObjectClient` contract the backend drives (head/put/get/delete/presign)
//! - Validated, immutable backend configuration
//! - `ObjectStorage`, the `StorageBackend` implementation over any client
//! - An in-memory client for tests and local development

pub mod client;
pub mod config;
pub mod memory;
pub mod storage;

pub use client::{ObjectClient, ObjectHead, PutObject};
pub use config::ObjectStorageConfig;
pub use memory::MemoryObjectClient;
pub use storage::ObjectStorage;
