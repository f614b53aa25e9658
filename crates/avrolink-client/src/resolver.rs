//! Schema Resolver
//!
//! The entry point for producers and consumers: turns application values into
//! framed bytes and back.
//!
//! ## Write Path
//!
//! ```text
//! value + schema text
//!     │ Schema::parse, Avro binary encode
//!     ▼
//! CachedRegistryClient::register_and_get_id ──(miss)──▶ registry POST
//!     │ schema id
//!     ▼
//! wire::encode ──▶ [0x00][id BE][payload]
//! ```
//!
//! A value that does not conform to its schema fails before anything is
//! registered.
//!
//! ## Read Path
//!
//! ```text
//! [0x00][id BE][payload]
//!     │ wire::decode (magic must be 0x00)
//!     ▼
//! CachedRegistryClient::get_schema ──(miss)──▶ registry GET
//!     │ schema
//!     ▼
//! Avro binary decode ──▶ DecodedRecord { schema_id, value, text }
//! ```
//!
//! Both paths touch the network only on a cache miss.

use crate::api::RegistryApi;
use crate::cache::CachedRegistryClient;
use crate::config::RegistryConfig;
use crate::error::{RegistryError, Result};
use crate::schema::Schema;
use crate::transport::HttpRegistryClient;
use apache_avro::types::Value;
use avrolink_core::{wire, SchemaId};
use bytes::Bytes;
use std::sync::Arc;
use tracing::debug;

/// A payload decoded from the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRecord {
    /// Schema id read from the frame header
    pub schema_id: SchemaId,
    /// Native Avro value
    pub value: Value,
    /// JSON textual projection of `value`, for logging and debugging
    pub text: String,
}

/// Encodes values for sending and decodes received payloads.
#[derive(Clone)]
pub struct SchemaResolver {
    registry: CachedRegistryClient,
}

impl SchemaResolver {
    /// Resolver backed by the HTTP registry client.
    pub fn new(config: RegistryConfig) -> Result<Self> {
        let transport = HttpRegistryClient::new(config)?;
        Ok(Self::with_registry(Arc::new(transport)))
    }

    /// Resolver backed by any registry implementation.
    pub fn with_registry(registry: Arc<dyn RegistryApi>) -> Self {
        Self {
            registry: CachedRegistryClient::new(registry),
        }
    }

    /// The cached registry, for the pass-through operations.
    pub fn registry(&self) -> &CachedRegistryClient {
        &self.registry
    }

    /// Encode a native value and frame it with its schema id.
    pub async fn encode_for_send(
        &self,
        subject: &str,
        schema_text: &str,
        value: &Value,
    ) -> Result<Bytes> {
        let schema = Schema::parse(schema_text)?;
        let payload = schema.encode(value)?;
        let schema_id = self.registry.register_and_get_id(subject, &schema).await?;

        debug!(
            schema_id = schema_id,
            subject = subject,
            payload_len = payload.len(),
            "Encoded value for send"
        );
        Ok(wire::encode(schema_id, &payload))
    }

    /// Encode a value given in JSON textual form.
    pub async fn encode_json_for_send(
        &self,
        subject: &str,
        schema_text: &str,
        json: &str,
    ) -> Result<Bytes> {
        let schema = Schema::parse(schema_text)?;
        let payload = schema.encode(&schema.parse_json_value(json)?)?;
        let schema_id = self.registry.register_and_get_id(subject, &schema).await?;

        Ok(wire::encode(schema_id, &payload))
    }

    /// Unframe a received payload and decode it with the schema it names.
    pub async fn decode_received(&self, bytes: &[u8]) -> Result<DecodedRecord> {
        let frame = wire::decode(bytes)?;
        if !frame.is_current_format() {
            return Err(RegistryError::UnsupportedMagicByte(frame.magic));
        }

        let schema = self.registry.get_schema(frame.schema_id).await?;
        let value = schema.decode(frame.payload)?;
        let text = schema.to_json_text(&value)?;

        debug!(schema_id = frame.schema_id, "Decoded received payload");
        Ok(DecodedRecord {
            schema_id: frame.schema_id,
            value,
            text,
        })
    }
}
