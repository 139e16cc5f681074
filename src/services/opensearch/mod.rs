//! Vector storage on OpenSearch.
//!
//! [`VectorStore`] is the contract the operation handlers write against.
//! [`OpenSearchVectorStore`] implements it on top of the k-NN plugin through
//! the REST API, sharing one [`OpenSearchClient`] handed out by
//! [`ClientFactory`].

mod client;
mod store;

pub use client::{ClientFactory, OpenSearchClient, SearchHit, SearchResponse};
pub use store::OpenSearchVectorStore;

use async_trait::async_trait;

use crate::error::VectorStoreError;
use crate::models::{Document, MetadataFilter, ScoredDocument};

/// Operations the node needs from a vector index.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Embed and store documents. Returns the ids they were stored under.
    async fn add_documents(&self, documents: &[Document]) -> Result<Vec<String>, VectorStoreError>;

    /// Store pre-computed vectors. Records with an id that already exists are
    /// replaced. Ids are generated when `ids` is `None`.
    async fn add_vectors(
        &self,
        vectors: Vec<Vec<f32>>,
        documents: &[Document],
        ids: Option<Vec<String>>,
    ) -> Result<Vec<String>, VectorStoreError>;

    /// The `k` nearest documents to `query`, best first.
    async fn similarity_search_vector_with_score(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredDocument>, VectorStoreError>;

    async fn list_indices(&self) -> Result<Vec<String>, VectorStoreError>;
}
