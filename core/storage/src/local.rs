//! Local filesystem storage backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

use crate::backend::{content_type_for, encode_key, ByteStream, ObjectMetadata, StorageBackend};
use stowage_common::{Error, Result};

/// Local backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalConfig {
    /// Directory objects are stored under.
    pub root: PathBuf,
    /// Public URL the root directory is served from, if any.
    #[serde(default)]
    pub base_url: Option<String>,
}

impl LocalConfig {
    /// Create a configuration for the given root directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            base_url: None,
        }
    }

    /// Serve objects from a public base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

/// Local filesystem storage backend.
///
/// Keys map to files below the root directory, one directory level per key
/// prefix segment. Deleting an absent object fails with `Error::NotFound`.
pub struct FileSystemStorage {
    root: PathBuf,
    base_url: Option<Url>,
}

impl FileSystemStorage {
    /// Create a new local backend.
    ///
    /// # Postconditions
    /// - Root directory is created if it doesn't exist
    ///
    /// # Errors
    /// - `Error::Configuration` for an empty root or a base URL that cannot
    ///   carry paths
    /// - I/O errors creating the root
    pub fn new(config: LocalConfig) -> Result<Self> {
        if config.root.as_os_str().is_empty() {
            return Err(Error::Configuration(
                "Local backend requires a root directory".to_string(),
            ));
        }

        let base_url = config.base_url.as_deref().map(parse_base_url).transpose()?;

        // Create root if it doesn't exist (sync for constructor)
        if !config.root.exists() {
            std::fs::create_dir_all(&config.root)?;
        }

        Ok(Self {
            root: config.root,
            base_url,
        })
    }

    /// Root directory of this backend.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Convert a storage key to a filesystem path.
    fn to_fs_path(&self, key: &str) -> PathBuf {
        let mut fs_path = self.root.clone();
        for component in key.split('/') {
            fs_path.push(component);
        }
        fs_path
    }

    /// Write the stream to a hidden file next to `target`, then rename it into
    /// place. The temporary file is removed if anything fails.
    async fn commit(&self, target: &Path, mut stream: ByteStream) -> Result<()> {
        let parent = target
            .parent()
            .ok_or_else(|| Error::InvalidInput("Key has no parent directory".to_string()))?;
        fs::create_dir_all(parent).await?;

        let staging = parent.join(format!(".{}.tmp", Uuid::new_v4()));

        let result = async {
            let mut file = fs::File::create(&staging).await?;
            while let Some(chunk) = stream.next().await {
                file.write_all(&chunk?).await?;
            }
            file.flush().await?;
            file.sync_all().await?;
            drop(file);

            fs::rename(&staging, target).await?;
            Ok::<(), Error>(())
        }
        .await;

        if result.is_err() {
            // Best-effort; the staging file may never have been created.
            let _ = fs::remove_file(&staging).await;
        }
        result
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let mut raw = raw.trim().to_string();
    if !raw.ends_with('/') {
        raw.push('/');
    }

    let url = Url::parse(&raw)
        .map_err(|e| Error::Configuration(format!("Invalid base URL {:?}: {}", raw, e)))?;
    if url.cannot_be_a_base() {
        return Err(Error::Configuration(format!(
            "Base URL cannot carry paths: {}",
            raw
        )));
    }
    Ok(url)
}

/// Map a filesystem error for `key`, turning a missing file into `NotFound`.
fn map_io(err: std::io::Error, key: &str) -> Error {
    if err.kind() == std::io::ErrorKind::NotFound {
        Error::NotFound(format!("Object not found: {}", key))
    } else {
        Error::Io(err)
    }
}

#[async_trait]
impl StorageBackend for FileSystemStorage {
    fn name(&self) -> &str {
        "local"
    }

    async fn get_path(&self, name: &str) -> Result<String> {
        let key = self.get_name(name)?;

        match &self.base_url {
            Some(base) => {
                let url = base
                    .join(&encode_key(&key))
                    .map_err(|e| Error::InvalidName(format!("Cannot build URL for {}: {}", key, e)))?;
                Ok(url.to_string())
            }
            None => Ok(self.to_fs_path(&key).to_string_lossy().into_owned()),
        }
    }

    async fn metadata(&self, name: &str) -> Result<ObjectMetadata> {
        let key = self.get_name(name)?;
        let fs_meta = fs::metadata(self.to_fs_path(&key))
            .await
            .map_err(|e| map_io(e, &key))?;

        if !fs_meta.is_file() {
            return Err(Error::NotFound(format!("Object not found: {}", key)));
        }

        let modified: Option<DateTime<Utc>> = fs_meta.modified().ok().map(|t| t.into());
        let etag = modified.map(|m| format!("{}-{}", m.timestamp(), fs_meta.len()));

        Ok(ObjectMetadata {
            content_type: content_type_for(&key),
            size: fs_meta.len(),
            modified,
            etag,
            key,
        })
    }

    /// Any filesystem entry counts, directories included: a directory is not
    /// an object, but a file cannot be written over it, so its name is taken.
    async fn exists(&self, name: &str) -> Result<bool> {
        let key = self.get_name(name)?;
        Ok(fs::try_exists(self.to_fs_path(&key)).await?)
    }

    async fn write(&self, name: &str, data: Vec<u8>) -> Result<String> {
        let stream = stream::once(async move { Ok::<_, Error>(data) });
        self.write_stream(name, Box::pin(stream)).await
    }

    async fn write_stream(&self, name: &str, stream: ByteStream) -> Result<String> {
        let key = self.get_name(name)?;
        let target = self.to_fs_path(&key);

        debug!(%key, path = %target.display(), "Writing object");
        self.commit(&target, stream).await?;
        info!(%key, "Stored object");

        Ok(key)
    }

    async fn read(&self, name: &str) -> Result<Vec<u8>> {
        let key = self.get_name(name)?;
        let fs_path = self.to_fs_path(&key);

        if fs_path.is_dir() {
            return Err(Error::NotFound(format!("Object not found: {}", key)));
        }

        fs::read(&fs_path).await.map_err(|e| map_io(e, &key))
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let key = self.get_name(name)?;

        fs::remove_file(self.to_fs_path(&key))
            .await
            .map_err(|e| map_io(e, &key))?;

        info!(%key, "Deleted object");
        Ok(())
    }
}
