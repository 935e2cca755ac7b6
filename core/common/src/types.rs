//! Common types used throughout Stowage.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroize;

/// Secret string that zeroizes on drop and never prints its value.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize, Zeroize)]
#[serde(transparent)]
#[zeroize(drop)]
pub struct SecretString(String);

impl SecretString {
    /// Wrap a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the secret.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretString([REDACTED])")
    }
}

/// Access credentials for an object store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Access key identifier.
    pub access_key_id: String,
    /// Secret access key.
    pub secret_access_key: SecretString,
}

impl Credentials {
    /// Create credentials from a key pair.
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: SecretString::new(secret_access_key),
        }
    }

    /// Validate that both halves of the key pair are present.
    ///
    /// # Errors
    /// - `Error::Configuration` if either value is empty
    pub fn validate(&self) -> crate::Result<()> {
        if self.access_key_id.trim().is_empty() {
            return Err(crate::Error::Configuration(
                "Access key ID is required".to_string(),
            ));
        }
        if self.secret_access_key.is_empty() {
            return Err(crate::Error::Configuration(
                "Secret access key is required".to_string(),
            ));
        }
        Ok(())
    }
}
