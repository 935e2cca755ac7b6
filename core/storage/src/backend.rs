//! Storage backend trait definition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use stowage_common::Result;

use crate::{collision, naming};

/// Byte stream type for upload operations.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>>> + Send>>;

/// Characters left as-is when a key segment is placed in a URL path.
const KEY_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Metadata for a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    /// Storage key the object lives under.
    pub key: String,
    /// Size in bytes.
    pub size: u64,
    /// MIME type of the content.
    pub content_type: String,
    /// Last modification time, if the backend tracks it.
    pub modified: Option<DateTime<Utc>>,
    /// ETag or revision marker.
    pub etag: Option<String>,
}

/// Storage backend trait implemented once per provider.
///
/// Every operation takes a logical name and addresses the object stored under
/// `get_name(name)`. Implementations hold only immutable configuration, so a
/// backend can be shared across tasks behind an `Arc`.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Get the provider name (e.g., "local", "object").
    fn name(&self) -> &str;

    /// Map a logical name to its storage key.
    ///
    /// Pure: performs no I/O.
    fn get_name(&self, name: &str) -> Result<String> {
        naming::normalize(name)
    }

    /// Get a locator (URL or filesystem path) for retrieving the object.
    ///
    /// Depends only on configuration, though some providers call out to the
    /// transport to sign the URL.
    async fn get_path(&self, name: &str) -> Result<String>;

    /// Fetch object metadata.
    ///
    /// # Errors
    /// - `Error::NotFound` if the object does not exist
    async fn metadata(&self, name: &str) -> Result<ObjectMetadata>;

    /// Get the object size in bytes.
    ///
    /// # Errors
    /// - `Error::NotFound` if the object does not exist
    async fn get_size(&self, name: &str) -> Result<u64> {
        Ok(self.metadata(name).await?.size)
    }

    /// Check whether an object exists under the name's key.
    ///
    /// Returns `Ok(false)` only when the provider explicitly reports the object
    /// as absent. A failed check is an error, never a `false`.
    async fn exists(&self, name: &str) -> Result<bool>;

    /// Write content under `get_name(name)` and return that key.
    ///
    /// The content type is guessed from the key's extension. An existing
    /// object at the same key is overwritten; call `generate_new_filename`
    /// first to avoid that.
    async fn write(&self, name: &str, data: Vec<u8>) -> Result<String>;

    /// Write streamed content. Same contract as [`StorageBackend::write`].
    async fn write_stream(&self, name: &str, mut stream: ByteStream) -> Result<String> {
        let mut data = Vec::new();

        while let Some(chunk) = stream.next().await {
            data.extend_from_slice(&chunk?);
        }

        self.write(name, data).await
    }

    /// Read the full object content.
    ///
    /// # Errors
    /// - `Error::NotFound` if the object does not exist
    async fn read(&self, name: &str) -> Result<Vec<u8>>;

    /// Delete the object. Behaviour for an absent object is documented by
    /// each implementation.
    async fn delete(&self, name: &str) -> Result<()>;

    /// Produce a logical name that does not collide with an existing object.
    ///
    /// Only valid at the time of the call; see [`collision::resolve`].
    async fn generate_new_filename(&self, name: &str) -> Result<String> {
        collision::resolve(name, |key| async move { self.exists(&key).await }).await
    }

    /// Pick a free name and write content under it.
    ///
    /// Not atomic: a concurrent writer can claim the same key between the
    /// probe and the upload.
    async fn save(&self, name: &str, data: Vec<u8>) -> Result<String> {
        let name = self.generate_new_filename(name).await?;
        self.write(&name, data).await
    }
}

/// Guess the content type of a key from its extension.
pub fn content_type_for(key: &str) -> String {
    mime_guess::from_path(key).first_or_octet_stream().to_string()
}

/// Percent-encode a key for use in a URL path, keeping `/` separators.
pub fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| utf8_percent_encode(segment, KEY_SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("a.png"), "image/png");
        assert_eq!(content_type_for("docs/readme.txt"), "text/plain");
        assert_eq!(content_type_for("blob.zzunknown"), "application/octet-stream");
        assert_eq!(content_type_for("README"), "application/octet-stream");
    }

    #[test]
    fn test_encode_key() {
        assert_eq!(encode_key("uploads/a.png"), "uploads/a.png");
        assert_eq!(encode_key("my docs/a b.png"), "my%20docs/a%20b.png");
        assert_eq!(encode_key("caf\u{e9}/x.txt"), "caf%C3%A9/x.txt");
    }

    #[test]
    fn test_metadata_serialization() {
        let metadata = ObjectMetadata {
            key: "uploads/a.png".to_string(),
            size: 1024,
            content_type: "image/png".to_string(),
            modified: Some(Utc::now()),
            etag: Some("abc123".to_string()),
        };

        let json = serde_json::to_string(&metadata).unwrap();
        let deserialized: ObjectMetadata = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized, metadata);
    }
}
