//! Object storage configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use stowage_common::{Credentials, Error, Result};

fn default_use_ssl() -> bool {
    true
}

fn default_presign_expiry_secs() -> u64 {
    3600
}

/// Object storage backend configuration.
///
/// Fixed at construction; the backend never re-reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStorageConfig {
    /// Endpoint host (and optional port), without protocol, e.g. `s3.eu-west-1.amazonaws.com`.
    pub endpoint: String,
    /// Bucket objects are stored in.
    pub bucket: String,
    /// Use `https` (default) or `http`.
    #[serde(default = "default_use_ssl")]
    pub use_ssl: bool,
    /// Access credentials.
    #[serde(default)]
    pub credentials: Credentials,
    /// Canned ACL applied on upload, e.g. `public-read`. Objects stay private when unset.
    #[serde(default)]
    pub default_acl: Option<String>,
    /// Custom domain serving the bucket, without protocol.
    #[serde(default)]
    pub custom_domain: Option<String>,
    /// Hand out signed URLs instead of plain ones.
    #[serde(default)]
    pub querystring_auth: bool,
    /// Lifetime of signed URLs, in seconds.
    #[serde(default = "default_presign_expiry_secs")]
    pub presign_expiry_secs: u64,
}

impl ObjectStorageConfig {
    /// Create a configuration with defaults for the optional settings.
    pub fn new(
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            bucket: bucket.into(),
            use_ssl: default_use_ssl(),
            credentials,
            default_acl: None,
            custom_domain: None,
            querystring_auth: false,
            presign_expiry_secs: default_presign_expiry_secs(),
        }
    }

    /// Enable or disable TLS.
    pub fn with_ssl(mut self, use_ssl: bool) -> Self {
        self.use_ssl = use_ssl;
        self
    }

    /// Set the ACL applied on upload.
    pub fn with_default_acl(mut self, acl: impl Into<String>) -> Self {
        self.default_acl = Some(acl.into());
        self
    }

    /// Serve objects from a custom domain.
    pub fn with_custom_domain(mut self, domain: impl Into<String>) -> Self {
        self.custom_domain = Some(domain.into());
        self
    }

    /// Enable or disable signed URLs.
    pub fn with_querystring_auth(mut self, enabled: bool) -> Self {
        self.querystring_auth = enabled;
        self
    }

    /// Set the lifetime of signed URLs.
    pub fn with_presign_expiry(mut self, expiry: Duration) -> Self {
        self.presign_expiry_secs = expiry.as_secs();
        self
    }

    /// URL scheme implied by `use_ssl`.
    pub fn scheme(&self) -> &'static str {
        if self.use_ssl {
            "https"
        } else {
            "http"
        }
    }

    /// Lifetime of signed URLs.
    pub fn presign_expiry(&self) -> Duration {
        Duration::from_secs(self.presign_expiry_secs)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    /// - `Error::Configuration` for a missing bucket or credentials, whitespace
    ///   in the bucket or a host, an endpoint or custom domain that carries a
    ///   protocol or does not parse, or a zero signed-URL lifetime with signed
    ///   URLs enabled
    pub fn validate(&self) -> Result<()> {
        self.validate_host("Endpoint", &self.endpoint)?;

        if let Some(domain) = &self.custom_domain {
            self.validate_host("Custom domain", domain)?;
        }

        if self.bucket.trim().is_empty() {
            return Err(Error::Configuration("Bucket name is required".to_string()));
        }
        if self.bucket.contains('/') || self.bucket.chars().any(char::is_whitespace) {
            return Err(Error::Configuration(format!(
                "Bucket name cannot contain '/' or whitespace: {:?}",
                self.bucket
            )));
        }

        self.credentials.validate()?;

        if self.querystring_auth && self.presign_expiry_secs == 0 {
            return Err(Error::Configuration(
                "Signed URL lifetime must be positive".to_string(),
            ));
        }

        Ok(())
    }

    fn validate_host(&self, what: &str, host: &str) -> Result<()> {
        if host.trim().is_empty() {
            return Err(Error::Configuration(format!("{} is required", what)));
        }
        // The value is used verbatim in URLs.
        if host.chars().any(char::is_whitespace) {
            return Err(Error::Configuration(format!(
                "{} cannot contain whitespace: {:?}",
                what, host
            )));
        }

        let lower = host.to_ascii_lowercase();
        if host.contains("://") || lower.starts_with("http:") || lower.starts_with("https:") {
            return Err(Error::Configuration(format!(
                "{} should not contain protocol: {}",
                what, host
            )));
        }

        let url = Url::parse(&format!("{}://{}", self.scheme(), host))
            .map_err(|e| Error::Configuration(format!("Invalid {}: {}: {}", what, host, e)))?;
        if url.host_str().map_or(true, str::is_empty) {
            return Err(Error::Configuration(format!("{} has no host: {}", what, host)));
        }

        Ok(())
    }
}
