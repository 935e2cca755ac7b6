//! Backend registry for dynamic backend resolution.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use stowage_common::{Error, Result};

use crate::backend::StorageBackend;
use crate::local::{FileSystemStorage, LocalConfig};
use crate::object::{MemoryObjectClient, ObjectStorage, ObjectStorageConfig};

/// Factory function type for creating backends.
pub type BackendFactory = Box<dyn Fn(Value) -> Result<Arc<dyn StorageBackend>> + Send + Sync>;

/// Registry for storage backend factories.
///
/// Allows dynamic registration and resolution of storage backends
/// by name and configuration.
pub struct BackendRegistry {
    factories: HashMap<String, BackendFactory>,
}

impl BackendRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a backend factory.
    ///
    /// # Errors
    /// - `Error::AlreadyExists` if name is already registered
    pub fn register(&mut self, name: impl Into<String>, factory: BackendFactory) -> Result<()> {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(Error::AlreadyExists(format!(
                "Backend '{}' is already registered",
                name
            )));
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    /// Resolve a backend by name and configuration.
    ///
    /// # Errors
    /// - `Error::NotFound` if the backend is not registered
    /// - `Error::Configuration` if the configuration is invalid
    pub fn resolve(&self, name: &str, config: Value) -> Result<Arc<dyn StorageBackend>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("Backend '{}' is not registered", name)))?;
        factory(config)
    }

    /// Get list of registered backend names.
    pub fn backends(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    /// Check if a backend is registered.
    pub fn has_backend(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_config<T: DeserializeOwned>(backend: &str, config: Value) -> Result<T> {
    serde_json::from_value(config)
        .map_err(|e| Error::Configuration(format!("Invalid {} config: {}", backend, e)))
}

/// Create a registry with the built-in backends.
///
/// - `local`: [`FileSystemStorage`] from a [`LocalConfig`]
/// - `memory`: [`ObjectStorage`] over a fresh [`MemoryObjectClient`] from an
///   [`ObjectStorageConfig`]; every resolution starts empty
pub fn create_default_registry() -> BackendRegistry {
    let mut registry = BackendRegistry::new();

    let local: BackendFactory = Box::new(|config| {
        let config: LocalConfig = parse_config("local", config)?;
        Ok(Arc::new(FileSystemStorage::new(config)?))
    });
    registry.factories.insert("local".to_string(), local);

    let memory: BackendFactory = Box::new(|config| {
        let config: ObjectStorageConfig = parse_config("memory", config)?;
        Ok(Arc::new(ObjectStorage::new(config, MemoryObjectClient::new())?))
    });
    registry.factories.insert("memory".to_string(), memory);

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn memory_config() -> Value {
        json!({
            "endpoint": "s3.example.com",
            "bucket": "media",
            "credentials": { "access_key_id": "id", "secret_access_key": "secret" }
        })
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = BackendRegistry::new();

        registry
            .register(
                "test",
                Box::new(|config| {
                    let config: ObjectStorageConfig = parse_config("test", config)?;
                    Ok(Arc::new(ObjectStorage::new(config, MemoryObjectClient::new())?))
                }),
            )
            .unwrap();

        let backend = registry.resolve("test", memory_config()).unwrap();
        assert_eq!(backend.name(), "object");
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = create_default_registry();

        let result = registry.register(
            "local",
            Box::new(|_| Err(Error::Configuration("unused".to_string()))),
        );
        assert!(matches!(result, Err(Error::AlreadyExists(_))));
    }

    #[test]
    fn test_resolve_unknown_fails() {
        let registry = BackendRegistry::new();
        let result = registry.resolve("unknown", Value::Null);
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_default_backends() {
        let registry = create_default_registry();

        assert!(registry.has_backend("local"));
        assert!(registry.has_backend("memory"));
        assert_eq!(registry.backends().len(), 2);
    }

    #[tokio::test]
    async fn test_resolve_local() {
        let temp = TempDir::new().unwrap();
        let registry = create_default_registry();

        let backend = registry
            .resolve("local", json!({ "root": temp.path() }))
            .unwrap();
        let key = backend.write("a b.txt", b"hi".to_vec()).await.unwrap();

        assert_eq!(backend.name(), "local");
        assert_eq!(key, "a_b.txt");
        assert_eq!(backend.get_size(&key).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_resolve_memory() {
        let registry = create_default_registry();
        let backend = registry.resolve("memory", memory_config()).unwrap();

        backend.write("a.png", vec![1]).await.unwrap();
        backend.write("a_1.png", vec![1]).await.unwrap();

        assert_eq!(backend.generate_new_filename("a.png").await.unwrap(), "a_2.png");
    }

    #[test]
    fn test_invalid_config_fails() {
        let registry = create_default_registry();

        let result = registry.resolve("local", json!({ "invalid": "config" }));
        assert!(matches!(result, Err(Error::Configuration(_))));

        let result = registry.resolve(
            "memory",
            json!({
                "endpoint": "https://s3.example.com",
                "bucket": "media",
                "credentials": { "access_key_id": "id", "secret_access_key": "secret" }
            }),
        );
        assert!(matches!(result, Err(Error::Configuration(_))));
    }
}
