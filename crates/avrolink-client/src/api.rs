//! Registry Capability Trait
//!
//! [`RegistryApi`] is the set of operations a schema registry offers. It is
//! implemented by:
//!
//! - [`HttpRegistryClient`](crate::HttpRegistryClient): talks to the registry
//!   over HTTP with endpoint failover
//! - [`CachedRegistryClient`](crate::CachedRegistryClient): memoizes id and
//!   registration lookups in front of any other implementation
//! - test doubles
//!
//! The request/response bodies of the registry's JSON API live here too, since
//! every implementation speaks in terms of them.

use crate::error::Result;
use crate::schema::Schema;
use async_trait::async_trait;
use avrolink_core::SchemaId;
use serde::{Deserialize, Serialize};

/// Version number of a schema within a subject.
pub type Version = u32;

/// Operations offered by a schema registry.
#[async_trait]
pub trait RegistryApi: Send + Sync {
    /// Schema registered under a global id.
    async fn fetch_schema_by_id(&self, id: SchemaId) -> Result<Schema>;

    /// All subject names.
    async fn list_subjects(&self) -> Result<Vec<String>>;

    /// Version numbers registered under a subject.
    async fn list_versions(&self, subject: &str) -> Result<Vec<Version>>;

    /// Schema bound to a specific version of a subject.
    async fn fetch_schema_by_version(&self, subject: &str, version: Version) -> Result<Schema>;

    /// Schema bound to the highest version of a subject.
    async fn fetch_latest_schema(&self, subject: &str) -> Result<Schema>;

    /// Register a schema under a subject and return its id.
    ///
    /// Idempotent: registering identical text again returns the same id.
    async fn register_schema(&self, subject: &str, schema: &Schema) -> Result<SchemaId>;

    /// Id of a schema already registered under a subject.
    ///
    /// Fails with a 404 client error when the schema is not registered.
    async fn check_registered(&self, subject: &str, schema: &Schema) -> Result<SchemaId>;

    /// Delete a subject; returns the versions that were deleted.
    async fn delete_subject(&self, subject: &str) -> Result<Vec<Version>>;

    /// Delete one version of a subject; returns the deleted version.
    async fn delete_version(&self, subject: &str, version: Version) -> Result<Version>;
}

/// Body of `GET /schemas/ids/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaByIdResponse {
    pub schema: String,
}

/// Body of `GET /subjects/{subject}/versions/{version}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaVersionResponse {
    pub schema: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub version: Option<Version>,
    #[serde(default)]
    pub id: Option<SchemaId>,
}

/// Body of register and lookup requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaRequest {
    pub schema: String,
}

/// Body of register and lookup responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdResponse {
    pub id: SchemaId,
}
