//! OpenSearch REST client and the process-wide client factory.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::OnceCell;

use crate::error::VectorStoreError;
use crate::models::ConnectionConfig;

#[derive(Debug, Deserialize)]
struct CatIndex {
    index: String,
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: u64,
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    #[serde(default)]
    errors: bool,
    #[serde(default)]
    items: Vec<Value>,
}

/// Search response, reduced to the fields the store reads.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub hits: SearchHits,
}

#[derive(Debug, Deserialize)]
pub struct SearchHits {
    #[serde(default)]
    pub hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
pub struct SearchHit {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(rename = "_score", default)]
    pub score: Option<f64>,
    #[serde(rename = "_source", default)]
    pub source: Map<String, Value>,
}

/// Thin client over the OpenSearch REST API.
#[derive(Debug, Clone)]
pub struct OpenSearchClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
}

impl OpenSearchClient {
    /// Build a client bound to the given address, credentials and TLS policy.
    pub fn new(config: &ConnectionConfig) -> Result<Self, VectorStoreError> {
        if config.base_url.trim().is_empty() {
            return Err(VectorStoreError::ConnectionError(
                "base URL must not be empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(config.ignore_ssl_issues)
            .build()
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let builder = self.client.request(method, url);
        if self.username.is_empty() {
            builder
        } else {
            builder.basic_auth(&self.username, Some(&self.password))
        }
    }

    async fn send(builder: RequestBuilder) -> Result<Response, VectorStoreError> {
        builder.send().await.map_err(|e| {
            if e.is_connect() {
                VectorStoreError::ConnectionError(e.to_string())
            } else {
                VectorStoreError::RequestError(e)
            }
        })
    }

    /// Fail with `on_error` when the response is not a success, carrying the body.
    async fn check(
        response: Response,
        on_error: fn(String) -> VectorStoreError,
    ) -> Result<Response, VectorStoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(on_error(format!("status {}: {}", status, body)))
    }

    /// Names of all indices in the cluster.
    pub async fn cat_indices(&self) -> Result<Vec<String>, VectorStoreError> {
        let response = Self::send(self.request(Method::GET, "_cat/indices?format=json")).await?;
        let response = Self::check(response, VectorStoreError::IndexError).await?;
        let indices: Vec<CatIndex> = response
            .json()
            .await
            .map_err(|e| VectorStoreError::InvalidResponse(e.to_string()))?;
        Ok(indices.into_iter().map(|i| i.index).collect())
    }

    pub async fn index_exists(&self, index: &str) -> Result<bool, VectorStoreError> {
        let response = Self::send(self.request(Method::HEAD, index)).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(VectorStoreError::IndexError(format!(
                "checking index '{}' returned status {}",
                index, status
            ))),
        }
    }

    /// Create an index. An index that already exists is not an error.
    pub async fn create_index(&self, index: &str, body: &Value) -> Result<(), VectorStoreError> {
        let response = Self::send(self.request(Method::PUT, index).json(body)).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let text = response.text().await.unwrap_or_default();
        if status == StatusCode::BAD_REQUEST && text.contains("resource_already_exists_exception") {
            return Ok(());
        }
        Err(VectorStoreError::IndexError(format!(
            "creating index '{}' returned status {}: {}",
            index, status, text
        )))
    }

    /// Send an NDJSON bulk body and refresh so the writes are searchable.
    pub async fn bulk(&self, body: String) -> Result<usize, VectorStoreError> {
        let builder = self
            .request(Method::POST, "_bulk?refresh=true")
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(body);
        let response = Self::send(builder).await?;
        let response = Self::check(response, VectorStoreError::BulkError).await?;
        let bulk: BulkResponse = response
            .json()
            .await
            .map_err(|e| VectorStoreError::InvalidResponse(e.to_string()))?;

        if bulk.errors {
            return Err(VectorStoreError::BulkError(first_bulk_error(&bulk.items)));
        }
        Ok(bulk.items.len())
    }

    pub async fn search(&self, index: &str, body: &Value) -> Result<SearchResponse, VectorStoreError> {
        let path = format!("{}/_search", index);
        let response = Self::send(self.request(Method::POST, &path).json(body)).await?;
        let response = Self::check(response, VectorStoreError::SearchError).await?;
        response
            .json()
            .await
            .map_err(|e| VectorStoreError::InvalidResponse(e.to_string()))
    }

    /// Document count across the cluster. Used to verify credentials.
    pub async fn count(&self) -> Result<u64, VectorStoreError> {
        let response = Self::send(self.request(Method::GET, "_count?human=false")).await?;
        let response = Self::check(response, VectorStoreError::ConnectionError).await?;
        let count: CountResponse = response
            .json()
            .await
            .map_err(|e| VectorStoreError::InvalidResponse(e.to_string()))?;
        Ok(count.count)
    }
}

fn first_bulk_error(items: &[Value]) -> String {
    items
        .iter()
        .filter_map(|item| item.as_object()?.values().next())
        .find_map(|result| {
            let error = result.get("error")?;
            let id = result.get("_id").and_then(Value::as_str).unwrap_or("?");
            let reason = error
                .get("reason")
                .and_then(Value::as_str)
                .map(ToString::to_string)
                .unwrap_or_else(|| error.to_string());
            Some(format!("document {id}: {reason}"))
        })
        .unwrap_or_else(|| "bulk request reported errors".to_string())
}

/// Hands out a single shared [`OpenSearchClient`].
///
/// The first call builds the client from its configuration; every later call
/// returns the same handle and ignores the configuration passed in. Concurrent
/// first calls are serialized so only one client is ever built.
#[derive(Debug, Default)]
pub struct ClientFactory {
    client: OnceCell<Arc<OpenSearchClient>>,
}

impl ClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// The factory shared by the whole process.
    pub fn shared() -> Arc<ClientFactory> {
        static SHARED: OnceLock<Arc<ClientFactory>> = OnceLock::new();
        Arc::clone(SHARED.get_or_init(|| Arc::new(ClientFactory::new())))
    }

    pub async fn get_client(
        &self,
        config: &ConnectionConfig,
    ) -> Result<Arc<OpenSearchClient>, VectorStoreError> {
        if let Some(client) = self.client.get() {
            return Ok(Arc::clone(client));
        }

        self.client
            .get_or_try_init(|| async {
                let client = OpenSearchClient::new(config)?;
                tracing::info!(
                    base_url = %client.base_url(),
                    ignore_ssl_issues = config.ignore_ssl_issues,
                    "created OpenSearch client"
                );
                Ok::<_, VectorStoreError>(Arc::new(client))
            })
            .await
            .cloned()
    }

    pub fn is_initialized(&self) -> bool {
        self.client.initialized()
    }
}
