//! Schema Caching Layer
//!
//! [`CachedRegistryClient`] wraps any [`RegistryApi`] and memoizes the two
//! lookups that sit on the hot path of every send and receive:
//!
//! - **id → schema** (`fetch_schema_by_id`), used when decoding a payload
//! - **schema text → id** (`register_schema`), used when encoding a payload
//!
//! ## Why No TTL?
//!
//! Once the registry assigns an id to a schema that binding never changes and
//! the id is never reused. Entries are therefore populated once and never
//! invalidated or evicted; the maps grow only with the number of distinct
//! schemas the process actually uses.
//!
//! ## What Is Not Cached
//!
//! Subject listings, version listings, by-version and latest lookups,
//! registration checks and deletions all pass straight through. They describe
//! live registry state that other clients can change. Deletions have nothing
//! local to invalidate.
//!
//! ## Concurrency
//!
//! The two maps are independent, each behind its own `RwLock`:
//!
//! ```text
//!   read lock ── hit ──▶ return
//!       │
//!      miss
//!       │ (read lock dropped)
//!       ▼
//!   registry call ── error ──▶ return Err (nothing stored)
//!       │
//!       ▼
//!   write lock ──▶ insert ──▶ return
//! ```
//!
//! No lock is held across the network call, so two callers missing on the
//! same key at the same time may both reach the registry. That is harmless:
//! fetch and registration are idempotent and both writers store the same
//! value. Single-flight is the common case, not a guarantee.

use crate::api::{RegistryApi, Version};
use crate::error::Result;
use crate::schema::Schema;
use async_trait::async_trait;
use avrolink_core::SchemaId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Registry client that caches id and registration lookups.
#[derive(Clone)]
pub struct CachedRegistryClient {
    inner: Arc<dyn RegistryApi>,
    schemas_by_id: Arc<RwLock<HashMap<SchemaId, Schema>>>,
    ids_by_text: Arc<RwLock<HashMap<Arc<str>, SchemaId>>>,
}

impl CachedRegistryClient {
    pub fn new(inner: Arc<dyn RegistryApi>) -> Self {
        Self {
            inner,
            schemas_by_id: Arc::new(RwLock::new(HashMap::new())),
            ids_by_text: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Schema for an id, fetched from the registry at most once per id.
    pub async fn get_schema(&self, id: SchemaId) -> Result<Schema> {
        if let Some(schema) = self.schemas_by_id.read().await.get(&id) {
            debug!(schema_id = id, "Schema cache hit");
            return Ok(schema.clone());
        }

        debug!(schema_id = id, "Schema cache miss");
        let schema = self.inner.fetch_schema_by_id(id).await?;

        self.schemas_by_id
            .write()
            .await
            .insert(id, schema.clone());
        Ok(schema)
    }

    /// Id for a schema, registered under `subject` at most once per schema text.
    pub async fn register_and_get_id(&self, subject: &str, schema: &Schema) -> Result<SchemaId> {
        if let Some(&id) = self.ids_by_text.read().await.get(schema.text()) {
            debug!(schema_id = id, subject = subject, "Schema id cache hit");
            return Ok(id);
        }

        debug!(subject = subject, "Schema id cache miss, registering");
        let id = self.inner.register_schema(subject, schema).await?;

        self.ids_by_text
            .write()
            .await
            .insert(Arc::from(schema.text()), id);
        Ok(id)
    }

    /// Number of schemas cached by id.
    pub async fn cached_schema_count(&self) -> usize {
        self.schemas_by_id.read().await.len()
    }

    /// Number of schema texts with a cached id.
    pub async fn cached_id_count(&self) -> usize {
        self.ids_by_text.read().await.len()
    }
}

#[async_trait]
impl RegistryApi for CachedRegistryClient {
    async fn fetch_schema_by_id(&self, id: SchemaId) -> Result<Schema> {
        self.get_schema(id).await
    }

    async fn list_subjects(&self) -> Result<Vec<String>> {
        self.inner.list_subjects().await
    }

    async fn list_versions(&self, subject: &str) -> Result<Vec<Version>> {
        self.inner.list_versions(subject).await
    }

    async fn fetch_schema_by_version(&self, subject: &str, version: Version) -> Result<Schema> {
        self.inner.fetch_schema_by_version(subject, version).await
    }

    async fn fetch_latest_schema(&self, subject: &str) -> Result<Schema> {
        self.inner.fetch_latest_schema(subject).await
    }

    async fn register_schema(&self, subject: &str, schema: &Schema) -> Result<SchemaId> {
        self.register_and_get_id(subject, schema).await
    }

    async fn check_registered(&self, subject: &str, schema: &Schema) -> Result<SchemaId> {
        self.inner.check_registered(subject, schema).await
    }

    async fn delete_subject(&self, subject: &str) -> Result<Vec<Version>> {
        self.inner.delete_subject(subject).await
    }

    async fn delete_version(&self, subject: &str, version: Version) -> Result<Version> {
        self.inner.delete_version(subject, version).await
    }
}
