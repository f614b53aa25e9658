//! Error types for schema-registry client operations.
//!
//! This module defines every error the transport, cache and resolver can
//! return. Errors are categorized by where they originate so callers can decide
//! whether to abort, skip the message, or retry the higher-level send/receive.
//!
//! ## Error Handling Strategy
//!
//! - **Retriable errors**: `Transport`, `Timeout`, `Server` (the failover loop
//!   moves on to the next registry endpoint)
//! - **Registry rejections**: `Client` (4xx, surfaced with the registry's code)
//! - **Data errors**: `Decode`, `Frame`, `UnsupportedMagicByte`, `Encode`,
//!   `SchemaCompile`
//! - **Setup errors**: `Config`
//!
//! No error is ever cached: a failed lookup is retried against the network the
//! next time the same key is requested.
//!
//! ## Examples
//!
//! ```ignore
//! use avrolink_client::{RegistryApi, RegistryError};
//!
//! match registry.check_registered("orders-value", &schema).await {
//!     Ok(id) => println!("already registered as {}", id),
//!     Err(e) if e.is_not_found() => println!("not registered yet"),
//!     Err(e) => eprintln!("registry failure: {}", e),
//! }
//! ```

use std::fmt;
use thiserror::Error;

/// Convenience type alias for `Result<T, RegistryError>`.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Error type for registry, cache and codec operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The HTTP request never produced a response.
    ///
    /// ## Causes
    /// - Registry replica is down or unreachable
    /// - DNS resolution failure
    /// - TLS handshake failure
    ///
    /// ## Resolution
    /// - Retried automatically against the next endpoint
    /// - Check network connectivity and TLS settings if all endpoints fail
    #[error("Transport error talking to {endpoint}: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// A single attempt exceeded the configured request timeout.
    ///
    /// Counts as a retriable failure; the overall operation fails only once
    /// the retry budget is spent.
    #[error("Request to {endpoint} timed out")]
    Timeout { endpoint: String },

    /// The registry answered with a 5xx status.
    #[error("Registry server error {status}: {message}")]
    Server {
        status: u16,
        error_code: Option<i32>,
        message: String,
    },

    /// The registry answered with a 4xx status.
    ///
    /// ## Causes
    /// - Subject, version or schema id does not exist (404)
    /// - Schema is incompatible with the subject's history (409)
    /// - Schema is rejected as invalid (422)
    /// - Credentials missing or wrong (401/403)
    ///
    /// ## Resolution
    /// - Not retried; inspect `error_code` and `message`
    #[error("Registry rejected request with {status}: {message}")]
    Client {
        status: u16,
        error_code: Option<i32>,
        message: String,
    },

    /// A response body or Avro payload could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The framed payload was shorter than the wire header.
    #[error(transparent)]
    Frame(#[from] avrolink_core::Error),

    /// The frame carries a magic byte from a format this client does not read.
    #[error("Unsupported wire format: magic byte 0x{0:02x}")]
    UnsupportedMagicByte(u8),

    /// The supplied schema text is not a valid Avro schema.
    #[error("Schema compile error: {0}")]
    SchemaCompile(String),

    /// The value could not be encoded with the schema.
    ///
    /// ## Causes
    /// - Value does not conform to the schema
    /// - Textual value is not valid JSON
    #[error("Encode error: {0}")]
    Encode(String),

    /// Invalid client configuration.
    ///
    /// ## Causes
    /// - Empty endpoint list
    /// - Unreadable CA certificate or client identity files
    /// - Client certificate supplied without a private key (or vice versa)
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RegistryError {
    /// Whether the failover loop should try the next endpoint.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            RegistryError::Transport { .. }
                | RegistryError::Timeout { .. }
                | RegistryError::Server { .. }
        )
    }

    /// Whether the registry reported the requested resource as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::Client { status: 404, .. })
    }

    /// Registry-specific error code, when the response body carried one.
    pub fn error_code(&self) -> Option<i32> {
        match self {
            RegistryError::Server { error_code, .. } | RegistryError::Client { error_code, .. } => {
                *error_code
            }
            _ => None,
        }
    }

    pub(crate) fn from_reqwest(endpoint: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            RegistryError::Timeout {
                endpoint: endpoint.to_string(),
            }
        } else {
            RegistryError::Transport {
                endpoint: endpoint.to_string(),
                source,
            }
        }
    }

    /// Build a status error from a non-2xx response.
    ///
    /// Bodies of the form `{"error_code": .., "message": ..}` are unpacked;
    /// anything else becomes the message verbatim.
    pub(crate) fn from_status(status: u16, body: &[u8]) -> Self {
        let (error_code, message) = match serde_json::from_slice::<ErrorBody>(body) {
            Ok(parsed) => (parsed.error_code, parsed.message),
            Err(_) => (None, String::from_utf8_lossy(body).into_owned()),
        };

        if status >= 500 {
            RegistryError::Server {
                status,
                error_code,
                message,
            }
        } else {
            RegistryError::Client {
                status,
                error_code,
                message,
            }
        }
    }

    pub(crate) fn decode(what: impl fmt::Display) -> Self {
        RegistryError::Decode(what.to_string())
    }
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    error_code: Option<i32>,
    #[serde(default)]
    message: String,
}
