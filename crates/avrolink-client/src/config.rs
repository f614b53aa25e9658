//! Registry Client Configuration
//!
//! This module defines everything a client needs to reach the registry.
//!
//! ## RegistryConfig
//!
//! - **endpoints**: base URLs of equivalent registry replicas (required)
//! - **retries**: additional attempts after the first one (default: endpoint count)
//! - **request_timeout_ms**: per-attempt HTTP timeout (default: 10s)
//! - **auth**: optional basic-auth credentials sent with every request
//! - **tls**: optional CA / client identity settings
//!
//! All values are fixed once the client is built.
//!
//! ## Usage
//!
//! ```ignore
//! use avrolink_client::{RegistryConfig, TlsOptions};
//!
//! // Two replicas, default retries (2), basic auth
//! let config = RegistryConfig::new(vec![
//!     "https://registry-a:8081".to_string(),
//!     "https://registry-b:8081".to_string(),
//! ])
//! .with_basic_auth("svc-orders", "s3cret")
//! .with_tls(TlsOptions::default().with_ca_cert("/etc/ssl/registry-ca.pem"));
//!
//! // From SCHEMA_REGISTRY_* environment variables
//! let config = RegistryConfig::from_env()?;
//! ```

use crate::error::{RegistryError, Result};
use crate::tls::TlsOptions;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Basic-auth credentials.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Registry base URLs; any member can serve any request
    pub endpoints: Vec<String>,

    /// Additional attempts after the first (default: number of endpoints)
    #[serde(default)]
    pub retries: Option<usize>,

    /// Per-attempt timeout in milliseconds (default: 10s)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Basic-auth credentials
    #[serde(default)]
    pub auth: Option<BasicAuth>,

    /// TLS settings
    #[serde(default)]
    pub tls: Option<TlsOptions>,
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl RegistryConfig {
    pub fn new(endpoints: Vec<String>) -> Self {
        Self {
            endpoints: endpoints
                .into_iter()
                .map(|e| e.trim_end_matches('/').to_string())
                .collect(),
            retries: None,
            request_timeout_ms: default_request_timeout_ms(),
            auth: None,
            tls: None,
        }
    }

    pub fn with_retries(mut self, retries: usize) -> Self {
        self.retries = Some(retries);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some(BasicAuth {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    pub fn with_tls(mut self, tls: TlsOptions) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Retry budget actually used: explicit value or one per endpoint.
    pub fn effective_retries(&self) -> usize {
        self.retries.unwrap_or(self.endpoints.len())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.endpoints.is_empty() {
            return Err(RegistryError::Config(
                "at least one registry endpoint is required".to_string(),
            ));
        }
        if let Some(endpoint) = self.endpoints.iter().find(|e| e.trim().is_empty()) {
            return Err(RegistryError::Config(format!(
                "invalid registry endpoint '{}'",
                endpoint
            )));
        }
        if self.request_timeout_ms == 0 {
            return Err(RegistryError::Config(
                "request_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if let Some(ref tls) = self.tls {
            tls.validate()?;
        }
        Ok(())
    }

    /// Load configuration from `SCHEMA_REGISTRY_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let urls = lookup("SCHEMA_REGISTRY_URLS").ok_or_else(|| {
            RegistryError::Config("SCHEMA_REGISTRY_URLS is not set".to_string())
        })?;
        let endpoints = urls
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();

        let mut config = Self::new(endpoints);

        if let Some(retries) = lookup("SCHEMA_REGISTRY_RETRIES") {
            let retries = retries.parse().map_err(|_| {
                RegistryError::Config(format!("invalid SCHEMA_REGISTRY_RETRIES '{}'", retries))
            })?;
            config.retries = Some(retries);
        }

        if let Some(timeout) = lookup("SCHEMA_REGISTRY_TIMEOUT_MS") {
            config.request_timeout_ms = timeout.parse().map_err(|_| {
                RegistryError::Config(format!("invalid SCHEMA_REGISTRY_TIMEOUT_MS '{}'", timeout))
            })?;
        }

        if let Some(username) = lookup("SCHEMA_REGISTRY_USERNAME") {
            let password = lookup("SCHEMA_REGISTRY_PASSWORD").unwrap_or_default();
            config = config.with_basic_auth(username, password);
        }

        let tls = TlsOptions {
            ca_cert_path: lookup("SCHEMA_REGISTRY_CA_CERT_PATH").map(Into::into),
            client_cert_path: lookup("SCHEMA_REGISTRY_CLIENT_CERT_PATH").map(Into::into),
            client_key_path: lookup("SCHEMA_REGISTRY_CLIENT_KEY_PATH").map(Into::into),
            insecure_skip_verify: lookup("SCHEMA_REGISTRY_TLS_INSECURE")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        };
        if tls != TlsOptions::default() {
            config.tls = Some(tls);
        }

        config.validate()?;
        Ok(config)
    }
}
