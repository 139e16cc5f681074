//! Embedding providers the node embeds queries and documents with.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::EmbeddingError;
use crate::models::EmbeddingConfig;

/// Converts text into fixed-length vectors.
///
/// `embed_documents` must return one vector per input text, in input order.
#[async_trait]
pub trait Embeddings: Send + Sync {
    /// Embed a search query.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Embed document texts for storage.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Tells the server whether it is embedding stored text or a query.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InstructionType {
    Document,
    Query,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    inputs: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    truncate: Option<bool>,
    instruction_type: InstructionType,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse(Vec<Vec<f32>>);

#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub model_id: Option<String>,
}

/// Embedding provider backed by an HTTP server exposing `/embed` and `/health`.
///
/// Inputs larger than `batch_size` are sent in consecutive requests and the
/// vectors concatenated in input order.
#[derive(Debug, Clone)]
pub struct HttpEmbeddings {
    http: Client,
    base_url: String,
    batch_size: usize,
}

fn send_error(err: reqwest::Error) -> EmbeddingError {
    if err.is_timeout() {
        EmbeddingError::Timeout
    } else if err.is_connect() {
        EmbeddingError::ConnectionError(err.to_string())
    } else {
        EmbeddingError::RequestError(err)
    }
}

impl HttpEmbeddings {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmbeddingError::ConnectionError(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            batch_size: (config.batch_size as usize).max(1),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn embed_all(
        &self,
        texts: &[String],
        instruction_type: InstructionType,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let received = self.post_embed(batch, instruction_type).await?;
            if received.len() != batch.len() {
                return Err(EmbeddingError::InvalidResponse(format!(
                    "sent {} texts but received {} vectors",
                    batch.len(),
                    received.len()
                )));
            }
            vectors.extend(received);
        }
        Ok(vectors)
    }

    async fn post_embed(
        &self,
        inputs: &[String],
        instruction_type: InstructionType,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        tracing::debug!(count = inputs.len(), ?instruction_type, "requesting embeddings");

        let body = EmbedRequest {
            inputs,
            truncate: Some(true),
            instruction_type,
        };
        let resp = self
            .http
            .post(format!("{}/embed", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(send_error)?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(EmbeddingError::ServerError(format!("{status}: {detail}")));
        }

        resp.json::<EmbedResponse>()
            .await
            .map(|r| r.0)
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))
    }

    /// Probe `/health`. A 200 whose body is not the expected JSON still counts as healthy.
    pub async fn health_check(&self) -> Result<HealthResponse, EmbeddingError> {
        let resp = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .map_err(send_error)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(EmbeddingError::ServerError(format!("health probe returned {status}")));
        }

        let body = resp.text().await.unwrap_or_default();
        Ok(serde_json::from_str(&body).unwrap_or(HealthResponse {
            status: Some("healthy".to_string()),
            model_id: None,
        }))
    }
}

#[async_trait]
impl Embeddings for HttpEmbeddings {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let query = [text.to_string()];
        self.embed_all(&query, InstructionType::Query)
            .await?
            .pop()
            .ok_or_else(|| EmbeddingError::InvalidResponse("no vector for query".to_string()))
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.embed_all(texts, InstructionType::Document).await
    }
}
