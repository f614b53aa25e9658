//! TLS options for registry connections
//!
//! Supports verifying the registry against an extra CA and presenting a client
//! certificate (mTLS). Options are static for the lifetime of a client.
//!
//! ## Usage
//!
//! ### Private CA
//! ```ignore
//! let tls = TlsOptions::default().with_ca_cert("ca.crt");
//! ```
//!
//! ### mTLS (Mutual TLS)
//! ```ignore
//! let tls = TlsOptions::default()
//!     .with_ca_cert("ca.crt")
//!     .with_client_identity("client.crt", "client.key");
//! ```
//!
//! ## Environment Variables
//!
//! - `SCHEMA_REGISTRY_CA_CERT_PATH`: CA certificate used to verify the registry (PEM)
//! - `SCHEMA_REGISTRY_CLIENT_CERT_PATH`: client certificate chain (PEM)
//! - `SCHEMA_REGISTRY_CLIENT_KEY_PATH`: client private key (PEM)
//! - `SCHEMA_REGISTRY_TLS_INSECURE`: set to "true" to skip server verification

use crate::error::{RegistryError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// TLS configuration for the registry HTTP client
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsOptions {
    /// Additional trusted root certificate (PEM)
    #[serde(default)]
    pub ca_cert_path: Option<PathBuf>,

    /// Client certificate chain for mutual TLS (PEM)
    #[serde(default)]
    pub client_cert_path: Option<PathBuf>,

    /// Client private key for mutual TLS (PEM)
    #[serde(default)]
    pub client_key_path: Option<PathBuf>,

    /// Accept any server certificate. Development only.
    #[serde(default)]
    pub insecure_skip_verify: bool,
}

impl TlsOptions {
    pub fn with_ca_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_cert_path = Some(path.into());
        self
    }

    pub fn with_client_identity(
        mut self,
        cert_path: impl Into<PathBuf>,
        key_path: impl Into<PathBuf>,
    ) -> Self {
        self.client_cert_path = Some(cert_path.into());
        self.client_key_path = Some(key_path.into());
        self
    }

    pub fn with_insecure_skip_verify(mut self, skip: bool) -> Self {
        self.insecure_skip_verify = skip;
        self
    }

    /// Certificate and key must be supplied together.
    pub fn validate(&self) -> Result<()> {
        match (&self.client_cert_path, &self.client_key_path) {
            (Some(_), None) => Err(RegistryError::Config(
                "client certificate configured without a private key".to_string(),
            )),
            (None, Some(_)) => Err(RegistryError::Config(
                "client private key configured without a certificate".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Apply these options to a reqwest client builder.
    pub(crate) fn apply(
        &self,
        mut builder: reqwest::ClientBuilder,
    ) -> Result<reqwest::ClientBuilder> {
        self.validate()?;

        if let Some(ref ca_path) = self.ca_cert_path {
            let pem = read_pem(ca_path)?;
            let cert = reqwest::Certificate::from_pem(&pem).map_err(|e| {
                RegistryError::Config(format!(
                    "Failed to parse CA certificate {}: {}",
                    ca_path.display(),
                    e
                ))
            })?;
            builder = builder.add_root_certificate(cert);
        }

        if let (Some(cert_path), Some(key_path)) = (&self.client_cert_path, &self.client_key_path)
        {
            // reqwest wants certificate chain and key in a single PEM buffer
            let mut pem = read_pem(cert_path)?;
            pem.push(b'\n');
            pem.extend(read_pem(key_path)?);

            let identity = reqwest::Identity::from_pem(&pem).map_err(|e| {
                RegistryError::Config(format!("Failed to load client identity: {}", e))
            })?;
            builder = builder.identity(identity);
        }

        if self.insecure_skip_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        Ok(builder)
    }
}

fn read_pem(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        RegistryError::Config(format!("Failed to read {}: {}", path.display(), e))
    })
}
