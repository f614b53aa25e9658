//! avrolink Client - Schema Registry, Cache and Resolver
//!
//! This crate lets producers and consumers exchange compact Avro payloads
//! whose schemas live in a shared, Confluent-compatible schema registry. It
//! handles endpoint failover, authentication, caching of schema lookups, and
//! the wire framing that tags every payload with its schema id.
//!
//! # Examples
//!
//! ## Producer side
//!
//! ```ignore
//! use avrolink_client::{RegistryConfig, SchemaResolver};
//!
//! let resolver = SchemaResolver::new(RegistryConfig::new(vec![
//!     "http://registry-a:8081".to_string(),
//!     "http://registry-b:8081".to_string(),
//! ]))?;
//!
//! let bytes = resolver
//!     .encode_json_for_send("orders-value", ORDER_SCHEMA, r#"{"id": 7}"#)
//!     .await?;
//! transport.publish("orders", bytes).await?;
//! ```
//!
//! ## Consumer side
//!
//! ```ignore
//! let record = resolver.decode_received(&message.value).await?;
//! println!("schema {} -> {}", record.schema_id, record.text);
//! ```
//!
//! ## Registry administration
//!
//! ```ignore
//! use avrolink_client::RegistryApi;
//!
//! let registry = resolver.registry();
//! for subject in registry.list_subjects().await? {
//!     println!("{}: {:?}", subject, registry.list_versions(&subject).await?);
//! }
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod resolver;
pub mod retry;
pub mod schema;
pub mod tls;
pub mod transport;

pub use api::{RegistryApi, Version};
pub use avrolink_core::{wire, SchemaId};
pub use cache::CachedRegistryClient;
pub use config::{BasicAuth, RegistryConfig};
pub use error::{RegistryError, Result};
pub use resolver::{DecodedRecord, SchemaResolver};
pub use retry::FailoverPolicy;
pub use schema::Schema;
pub use tls::TlsOptions;
pub use transport::{HttpRegistryClient, CONTENT_TYPE_V1};
