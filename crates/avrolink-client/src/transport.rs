//! HTTP client for the schema registry
//!
//! Issues authenticated JSON-over-HTTP calls to one of several equivalent
//! registry replicas. Each logical operation starts at a random replica and
//! fails over round-robin on transport errors and 5xx responses (see
//! [`retry`](crate::retry)).
//!
//! ## Endpoints
//!
//! | Operation | Method | Path |
//! |---|---|---|
//! | fetch schema by id | GET | `/schemas/ids/{id}` |
//! | list subjects | GET | `/subjects` |
//! | list versions | GET | `/subjects/{subject}/versions` |
//! | fetch by version | GET | `/subjects/{subject}/versions/{version\|latest}` |
//! | register schema | POST | `/subjects/{subject}/versions` |
//! | check registered | POST | `/subjects/{subject}` |
//! | delete subject | DELETE | `/subjects/{subject}` |
//! | delete version | DELETE | `/subjects/{subject}/versions/{version}` |
//!
//! Path parameters are percent-encoded as single segments, so a subject such
//! as `team/orders` is sent as `team%2Forders`.

use crate::api::{
    IdResponse, RegistryApi, SchemaByIdResponse, SchemaRequest, SchemaVersionResponse, Version,
};
use crate::config::{BasicAuth, RegistryConfig};
use crate::error::{RegistryError, Result};
use crate::retry::{random_start, with_failover, FailoverPolicy};
use crate::schema::Schema;
use async_trait::async_trait;
use avrolink_core::SchemaId;
use bytes::Bytes;
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

/// Content type for every registry request.
pub const CONTENT_TYPE_V1: &str = "application/vnd.schemaregistry.v1+json";

const SCHEMAS: &str = "schemas";
const IDS: &str = "ids";
const SUBJECTS: &str = "subjects";
const VERSIONS: &str = "versions";
const LATEST_VERSION: &str = "latest";

fn schema_by_id_path(id: SchemaId) -> Vec<String> {
    vec![SCHEMAS.to_string(), IDS.to_string(), id.to_string()]
}

fn subjects_path() -> Vec<String> {
    vec![SUBJECTS.to_string()]
}

fn subject_path(subject: &str) -> Vec<String> {
    vec![SUBJECTS.to_string(), subject.to_string()]
}

fn versions_path(subject: &str) -> Vec<String> {
    let mut path = subject_path(subject);
    path.push(VERSIONS.to_string());
    path
}

fn version_path(subject: &str, version: &str) -> Vec<String> {
    let mut path = versions_path(subject);
    path.push(version.to_string());
    path
}

/// Append percent-encoded path segments to an endpoint base URL.
fn endpoint_url(base: &Url, segments: &[String]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| {
            RegistryError::Config(format!("registry endpoint '{}' cannot be a base URL", base))
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn parse_endpoint(endpoint: &str) -> Result<Url> {
    let url = Url::parse(endpoint).map_err(|e| {
        RegistryError::Config(format!("invalid registry endpoint '{}': {}", endpoint, e))
    })?;
    if url.cannot_be_a_base() {
        return Err(RegistryError::Config(format!(
            "registry endpoint '{}' cannot be a base URL",
            endpoint
        )));
    }
    Ok(url)
}

/// Registry client over HTTP with endpoint failover.
#[derive(Debug, Clone)]
pub struct HttpRegistryClient {
    endpoints: Vec<Url>,
    policy: FailoverPolicy,
    auth: Option<BasicAuth>,
    http_client: reqwest::Client,
}

impl HttpRegistryClient {
    /// Build a client from configuration.
    ///
    /// Fails with [`RegistryError::Config`] on an empty endpoint list, an
    /// endpoint that is not a URL, or unreadable TLS material.
    pub fn new(config: RegistryConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = reqwest::Client::builder().timeout(config.request_timeout());
        if let Some(ref tls) = config.tls {
            builder = tls.apply(builder)?;
        }
        let http_client = builder
            .build()
            .map_err(|e| RegistryError::Config(format!("Failed to create HTTP client: {}", e)))?;

        let endpoints = config
            .endpoints
            .iter()
            .map(|e| parse_endpoint(e.trim_end_matches('/')))
            .collect::<Result<Vec<_>>>()?;
        let policy = FailoverPolicy::new(config.effective_retries());

        info!(
            endpoints = endpoints.len(),
            retries = policy.retries,
            basic_auth = config.auth.is_some(),
            tls = config.tls.is_some(),
            "Schema registry client created"
        );

        Ok(Self {
            endpoints,
            policy,
            auth: config.auth,
            http_client,
        })
    }

    pub fn endpoints(&self) -> &[Url] {
        &self.endpoints
    }

    pub fn retries(&self) -> usize {
        self.policy.retries
    }

    /// Perform one logical call and return the raw 2xx body.
    async fn call(&self, method: Method, path: &[String], body: Option<Bytes>) -> Result<Bytes> {
        let start = random_start(self.endpoints.len());

        with_failover(&self.endpoints, self.policy, start, |endpoint| {
            let endpoint_name = endpoint.to_string();
            let request = endpoint_url(endpoint, path).map(|url| {
                let mut request = self
                    .http_client
                    .request(method.clone(), url)
                    .header(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_V1))
                    .header(ACCEPT, HeaderValue::from_static(CONTENT_TYPE_V1));
                if let Some(ref auth) = self.auth {
                    request = request.basic_auth(&auth.username, Some(&auth.password));
                }
                if let Some(ref body) = body {
                    request = request.body(body.clone());
                }
                request
            });

            async move {
                let endpoint = endpoint_name;
                let response = request?
                    .send()
                    .await
                    .map_err(|e| RegistryError::from_reqwest(&endpoint, e))?;

                let status = response.status();
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| RegistryError::from_reqwest(&endpoint, e))?;

                if !status.is_success() {
                    return Err(RegistryError::from_status(status.as_u16(), &bytes));
                }

                debug!(endpoint = %endpoint, status = status.as_u16(), "Registry call succeeded");
                Ok(bytes)
            }
        })
        .await
    }

    async fn get<T: DeserializeOwned>(&self, path: &[String]) -> Result<T> {
        let body = self.call(Method::GET, path, None).await?;
        parse(&body)
    }

    async fn post_schema(&self, path: &[String], schema: &Schema) -> Result<SchemaId> {
        let request = SchemaRequest {
            schema: schema.text().to_string(),
        };
        let payload = serde_json::to_vec(&request)
            .map_err(|e| RegistryError::Encode(format!("Failed to encode request: {}", e)))?;

        let body = self
            .call(Method::POST, path, Some(Bytes::from(payload)))
            .await?;
        let response: IdResponse = parse(&body)?;
        Ok(response.id)
    }

    async fn schema_by_version(&self, subject: &str, version: &str) -> Result<Schema> {
        let response: SchemaVersionResponse = self.get(&version_path(subject, version)).await?;
        Schema::parse(&response.schema)
    }
}

fn parse<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body)
        .map_err(|e| RegistryError::Decode(format!("Failed to parse registry response: {}", e)))
}

#[async_trait]
impl RegistryApi for HttpRegistryClient {
    async fn fetch_schema_by_id(&self, id: SchemaId) -> Result<Schema> {
        let response: SchemaByIdResponse = self.get(&schema_by_id_path(id)).await?;
        let schema = Schema::parse(&response.schema)?;

        debug!(schema_id = id, "Schema retrieved successfully");
        Ok(schema)
    }

    async fn list_subjects(&self) -> Result<Vec<String>> {
        self.get(&subjects_path()).await
    }

    async fn list_versions(&self, subject: &str) -> Result<Vec<Version>> {
        self.get(&versions_path(subject)).await
    }

    async fn fetch_schema_by_version(&self, subject: &str, version: Version) -> Result<Schema> {
        self.schema_by_version(subject, &version.to_string()).await
    }

    async fn fetch_latest_schema(&self, subject: &str) -> Result<Schema> {
        self.schema_by_version(subject, LATEST_VERSION).await
    }

    async fn register_schema(&self, subject: &str, schema: &Schema) -> Result<SchemaId> {
        let id = self.post_schema(&versions_path(subject), schema).await?;

        debug!(schema_id = id, subject = subject, "Schema registered successfully");
        Ok(id)
    }

    async fn check_registered(&self, subject: &str, schema: &Schema) -> Result<SchemaId> {
        self.post_schema(&subject_path(subject), schema).await
    }

    async fn delete_subject(&self, subject: &str) -> Result<Vec<Version>> {
        let body = self.call(Method::DELETE, &subject_path(subject), None).await?;
        parse(&body)
    }

    async fn delete_version(&self, subject: &str, version: Version) -> Result<Version> {
        let body = self
            .call(
                Method::DELETE,
                &version_path(subject, &version.to_string()),
                None,
            )
            .await?;
        parse(&body)
    }
}
