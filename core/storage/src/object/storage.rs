//! Object storage backend.

use async_trait::async_trait;
use tracing::{debug, info};

use stowage_common::Result;

use super::client::{ObjectClient, PutObject};
use super::config::ObjectStorageConfig;
use crate::backend::{content_type_for, encode_key, ObjectMetadata, StorageBackend};

/// Storage backend for S3-compatible object stores.
///
/// All provider traffic goes through the injected [`ObjectClient`]. Deleting
/// an absent object succeeds silently, as the object store does.
pub struct ObjectStorage<C> {
    config: ObjectStorageConfig,
    client: C,
}

impl<C: ObjectClient> ObjectStorage<C> {
    /// Create a new object storage backend.
    ///
    /// # Errors
    /// - `Error::Configuration` if the configuration does not validate; no
    ///   backend is built in that case
    pub fn new(config: ObjectStorageConfig, client: C) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, client })
    }

    /// Backend configuration.
    pub fn config(&self) -> &ObjectStorageConfig {
        &self.config
    }

    /// Underlying object store client.
    pub fn client(&self) -> &C {
        &self.client
    }

    fn bucket(&self) -> &str {
        &self.config.bucket
    }
}

#[async_trait]
impl<C: ObjectClient> StorageBackend for ObjectStorage<C> {
    fn name(&self) -> &str {
        "object"
    }

    async fn get_path(&self, name: &str) -> Result<String> {
        let key = self.get_name(name)?;
        let scheme = self.config.scheme();

        if let Some(domain) = &self.config.custom_domain {
            return Ok(format!(
                "{}://{}/{}",
                scheme,
                domain.trim().trim_end_matches('/'),
                encode_key(&key)
            ));
        }

        if self.config.querystring_auth {
            return self
                .client
                .presign_get(self.bucket(), &key, self.config.presign_expiry())
                .await;
        }

        Ok(format!(
            "{}://{}/{}/{}",
            scheme,
            self.config.endpoint.trim().trim_end_matches('/'),
            self.bucket(),
            encode_key(&key)
        ))
    }

    async fn metadata(&self, name: &str) -> Result<ObjectMetadata> {
        let key = self.get_name(name)?;
        let head = self.client.head_object(self.bucket(), &key).await?;

        Ok(ObjectMetadata {
            content_type: head.content_type.unwrap_or_else(|| content_type_for(&key)),
            size: head.size,
            modified: head.last_modified,
            etag: head.etag,
            key,
        })
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        let key = self.get_name(name)?;
        match self.client.head_object(self.bucket(), &key).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn write(&self, name: &str, data: Vec<u8>) -> Result<String> {
        let key = self.get_name(name)?;
        let content_type = content_type_for(&key);
        let size = data.len();

        debug!(%key, %content_type, size, "Uploading object");
        self.client
            .put_object(PutObject {
                bucket: self.config.bucket.clone(),
                key: key.clone(),
                body: data,
                content_type,
                acl: self.config.default_acl.clone(),
            })
            .await?;
        info!(%key, bucket = %self.config.bucket, "Stored object");

        Ok(key)
    }

    async fn read(&self, name: &str) -> Result<Vec<u8>> {
        let key = self.get_name(name)?;
        self.client.get_object(self.bucket(), &key).await
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let key = self.get_name(name)?;
        self.client.delete_object(self.bucket(), &key).await?;
        info!(%key, bucket = %self.config.bucket, "Deleted object");
        Ok(())
    }
}
