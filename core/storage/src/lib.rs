//! Pluggable file storage for Stowage.
//!
//! This crate provides a trait-based interface over interchangeable storage
//! backends (local filesystem, S3-compatible object stores, in-memory) and a
//! backend registry for dynamic resolution.
//!
//! # Design Principles
//! - Backend isolation: callers only see the `StorageBackend` operations
//! - Shared naming policy: key normalization and collision resolution are
//!   plain functions every backend composes, not per-backend logic
//! - Honest existence checks: only an explicit not-found counts as "free"
//! - Immutable configuration: validated once at construction

pub mod backend;
pub mod collision;
pub mod local;
pub mod naming;
pub mod object;
pub mod registry;

pub use backend::{ByteStream, ObjectMetadata, StorageBackend};
pub use local::{FileSystemStorage, LocalConfig};
pub use naming::normalize;
pub use object::{MemoryObjectClient, ObjectClient, ObjectHead, ObjectStorage, ObjectStorageConfig, PutObject};
pub use registry::{create_default_registry, BackendFactory, BackendRegistry};
