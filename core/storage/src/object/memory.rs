//! In-memory object store client for testing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use stowage_common::{Error, Result};

use super::client::{ObjectClient, ObjectHead, PutObject};
use crate::backend::encode_key;

/// Stored object.
#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    content_type: String,
    acl: Option<String>,
    modified: DateTime<Utc>,
    etag: String,
}

/// In-memory object store client.
///
/// Useful for testing and development. All data is stored in memory and lost
/// on drop. [`MemoryObjectClient::set_offline`] simulates an outage: every
/// call then fails with `Error::Transport`.
pub struct MemoryObjectClient {
    objects: RwLock<HashMap<(String, String), StoredObject>>,
    offline: AtomicBool,
}

impl MemoryObjectClient {
    /// Create a new empty client.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            offline: AtomicBool::new(false),
        }
    }

    /// Simulate the store becoming unreachable (or reachable again).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of stored objects across all buckets.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read_objects()?.len())
    }

    /// Check if no objects are stored.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// ACL an object was uploaded with.
    pub fn acl(&self, bucket: &str, key: &str) -> Result<Option<String>> {
        let objects = self.read_objects()?;
        objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|object| object.acl.clone())
            .ok_or_else(|| not_found(bucket, key))
    }

    fn ensure_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Transport("Object store is unreachable".to_string()));
        }
        Ok(())
    }

    fn read_objects(&self) -> Result<RwLockReadGuard<'_, HashMap<(String, String), StoredObject>>> {
        self.objects
            .read()
            .map_err(|_| Error::Transport("Object map lock poisoned".to_string()))
    }

    fn write_objects(
        &self,
    ) -> Result<RwLockWriteGuard<'_, HashMap<(String, String), StoredObject>>> {
        self.objects
            .write()
            .map_err(|_| Error::Transport("Object map lock poisoned".to_string()))
    }
}

impl Default for MemoryObjectClient {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(bucket: &str, key: &str) -> Error {
    Error::NotFound(format!("Object not found: {}/{}", bucket, key))
}

#[async_trait]
impl ObjectClient for MemoryObjectClient {
    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectHead> {
        self.ensure_online()?;
        let objects = self.read_objects()?;

        objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|object| ObjectHead {
                size: object.data.len() as u64,
                content_type: Some(object.content_type.clone()),
                last_modified: Some(object.modified),
                etag: Some(object.etag.clone()),
            })
            .ok_or_else(|| not_found(bucket, key))
    }

    async fn put_object(&self, request: PutObject) -> Result<()> {
        self.ensure_online()?;

        let object = StoredObject {
            etag: format!("{:08x}", crc32fast::hash(&request.body)),
            data: request.body,
            content_type: request.content_type,
            acl: request.acl,
            modified: Utc::now(),
        };

        self.write_objects()?
            .insert((request.bucket, request.key), object);
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        self.ensure_online()?;
        let objects = self.read_objects()?;

        objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|object| object.data.clone())
            .ok_or_else(|| not_found(bucket, key))
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.ensure_online()?;
        self.write_objects()?
            .remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }

    async fn presign_get(&self, bucket: &str, key: &str, expires_in: Duration) -> Result<String> {
        self.ensure_online()?;

        let expires = expires_in.as_secs();
        let signature = crc32fast::hash(format!("GET\n{}\n{}\n{}", bucket, key, expires).as_bytes());

        Ok(format!(
            "memory://{}/{}?expires={}&signature={:08x}",
            utf8_percent_encode(bucket, NON_ALPHANUMERIC),
            encode_key(key),
            expires,
            signature
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put(bucket: &str, key: &str, body: &[u8]) -> PutObject {
        PutObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            body: body.to_vec(),
            content_type: "text/plain".to_string(),
            acl: None,
        }
    }

    #[tokio::test]
    async fn test_put_head_get() {
        let client = MemoryObjectClient::new();

        client.put_object(put("b", "k.txt", b"hello")).await.unwrap();

        let head = client.head_object("b", "k.txt").await.unwrap();
        assert_eq!(head.size, 5);
        assert_eq!(head.content_type.as_deref(), Some("text/plain"));
        assert_eq!(client.get_object("b", "k.txt").await.unwrap(), b"hello".to_vec());
    }

    #[tokio::test]
    async fn test_buckets_are_separate() {
        let client = MemoryObjectClient::new();

        client.put_object(put("a", "k", b"1")).await.unwrap();

        assert!(matches!(
            client.head_object("b", "k").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete() {
        let client = MemoryObjectClient::new();

        client.put_object(put("b", "k", b"1")).await.unwrap();
        client.delete_object("b", "k").await.unwrap();
        client.delete_object("b", "k").await.unwrap();

        assert!(client.is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_offline() {
        let client = MemoryObjectClient::new();
        client.put_object(put("b", "k", b"1")).await.unwrap();

        client.set_offline(true);
        assert!(matches!(
            client.head_object("b", "k").await,
            Err(Error::Transport(_))
        ));
        assert!(matches!(
            client.put_object(put("b", "k2", b"2")).await,
            Err(Error::Transport(_))
        ));

        client.set_offline(false);
        assert_eq!(client.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_presign_is_deterministic() {
        let client = MemoryObjectClient::new();
        let expiry = Duration::from_secs(60);

        let first = client.presign_get("b", "dir/k.png", expiry).await.unwrap();
        let second = client.presign_get("b", "dir/k.png", expiry).await.unwrap();
        let other = client.presign_get("b", "dir/other.png", expiry).await.unwrap();

        assert_eq!(first, second);
        assert_ne!(first, other);
        assert!(first.starts_with("memory://b/dir/k.png?expires=60&signature="));
    }
}
