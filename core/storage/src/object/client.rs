//! Object store client contract.
//!
//! The wire client for a concrete provider (S3, MinIO, R2, ...) lives outside
//! this crate. `ObjectStorage` only needs the handful of primitives below.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use stowage_common::Result;

/// Object metadata as reported by a HEAD request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectHead {
    /// Content length in bytes.
    pub size: u64,
    /// Stored content type, if the provider returned one.
    pub content_type: Option<String>,
    /// Last modification time.
    pub last_modified: Option<DateTime<Utc>>,
    /// Entity tag.
    pub etag: Option<String>,
}

/// Upload request.
#[derive(Debug, Clone)]
pub struct PutObject {
    /// Target bucket.
    pub bucket: String,
    /// Target key.
    pub key: String,
    /// Object content.
    pub body: Vec<u8>,
    /// Content type stored with the object.
    pub content_type: String,
    /// Canned ACL, e.g. `public-read`. Provider default when `None`.
    pub acl: Option<String>,
}

/// Primitive object store operations.
///
/// Implementations report a missing object as `Error::NotFound` and nothing
/// else; timeouts, auth failures and server errors are `Error::Transport`.
/// Callers rely on that split to tell an absent object from a failed check.
#[async_trait]
pub trait ObjectClient: Send + Sync {
    /// Fetch object metadata.
    ///
    /// # Errors
    /// - `Error::NotFound` if the object does not exist
    /// - `Error::Transport` for any other failure
    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectHead>;

    /// Upload an object, replacing any object under the same key.
    ///
    /// Either the whole object is stored or an error is returned.
    async fn put_object(&self, request: PutObject) -> Result<()>;

    /// Download object content.
    ///
    /// # Errors
    /// - `Error::NotFound` if the object does not exist
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;

    /// Delete an object. Deleting an absent object succeeds.
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;

    /// Produce a time-limited signed GET URL.
    async fn presign_get(&self, bucket: &str, key: &str, expires_in: Duration) -> Result<String>;
}
