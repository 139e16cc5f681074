//! In-memory collaborators for unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use crate::context::CancelSignal;
use crate::error::{EmbeddingError, ExtractError, NodeError, VectorStoreError};
use crate::models::{Document, MetadataFilter, ScoredDocument, WorkItem};
use crate::operations::StoreResolver;
use crate::services::{DocumentExtractor, Embeddings, VectorStore};

/// Embeds text as `[len, index, 0, ...]` and records every call.
pub struct FakeEmbeddings {
    dimension: usize,
    fail: bool,
    pub queries: Mutex<Vec<String>>,
    pub document_batches: Mutex<Vec<Vec<String>>>,
}

impl FakeEmbeddings {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(2),
            fail: false,
            queries: Mutex::new(Vec::new()),
            document_batches: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(2)
        }
    }

    fn vector(&self, text: &str, index: usize) -> Vec<f32> {
        let mut vector = vec![0.0; self.dimension];
        vector[0] = text.len() as f32;
        vector[1] = index as f32;
        vector
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn batch_count(&self) -> usize {
        self.document_batches.lock().unwrap().len()
    }
}

#[async_trait]
impl Embeddings for FakeEmbeddings {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.queries.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(EmbeddingError::ServerError("embedding failed".to_string()));
        }
        Ok(self.vector(text, 0))
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.document_batches.lock().unwrap().push(texts.to_vec());
        if self.fail {
            return Err(EmbeddingError::ServerError("embedding failed".to_string()));
        }
        Ok(texts
            .iter()
            .enumerate()
            .map(|(i, t)| self.vector(t, i))
            .collect())
    }
}

/// One `add_vectors` call.
#[derive(Debug, Clone)]
pub struct VectorWrite {
    pub vectors: Vec<Vec<f32>>,
    pub documents: Vec<Document>,
    pub ids: Option<Vec<String>>,
}

/// One similarity search call.
#[derive(Debug, Clone)]
pub struct SearchCall {
    pub query: Vec<f32>,
    pub k: usize,
    pub filter: Option<MetadataFilter>,
}

#[derive(Default)]
struct Recorded {
    added: Vec<Vec<Document>>,
    vector_writes: Vec<VectorWrite>,
    searches: Vec<SearchCall>,
}

/// A vector store that records calls and answers searches from a fixed list.
#[derive(Default)]
pub struct RecordingStore {
    recorded: Mutex<Recorded>,
    results: Vec<ScoredDocument>,
    indices: Vec<String>,
    fail: bool,
    cancel_after: Option<(usize, CancelSignal)>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_results(mut self, results: Vec<ScoredDocument>) -> Self {
        self.results = results;
        self
    }

    pub fn with_indices(mut self, indices: &[&str]) -> Self {
        self.indices = indices.iter().map(ToString::to_string).collect();
        self
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Set `signal` once `adds` calls to `add_documents` have completed.
    pub fn cancel_after(mut self, adds: usize, signal: CancelSignal) -> Self {
        self.cancel_after = Some((adds, signal));
        self
    }

    pub fn added(&self) -> Vec<Vec<Document>> {
        self.recorded.lock().unwrap().added.clone()
    }

    pub fn vector_writes(&self) -> Vec<VectorWrite> {
        self.recorded.lock().unwrap().vector_writes.clone()
    }

    pub fn searches(&self) -> Vec<SearchCall> {
        self.recorded.lock().unwrap().searches.clone()
    }

    fn check(&self) -> Result<(), VectorStoreError> {
        if self.fail {
            return Err(VectorStoreError::BulkError("store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for RecordingStore {
    async fn add_documents(&self, documents: &[Document]) -> Result<Vec<String>, VectorStoreError> {
        self.check()?;
        let mut recorded = self.recorded.lock().unwrap();
        recorded.added.push(documents.to_vec());
        if let Some((adds, signal)) = &self.cancel_after
            && recorded.added.len() >= *adds
        {
            signal.cancel();
        }
        Ok((0..documents.len()).map(|i| format!("doc-{i}")).collect())
    }

    async fn add_vectors(
        &self,
        vectors: Vec<Vec<f32>>,
        documents: &[Document],
        ids: Option<Vec<String>>,
    ) -> Result<Vec<String>, VectorStoreError> {
        self.check()?;
        let returned = ids
            .clone()
            .unwrap_or_else(|| (0..documents.len()).map(|i| format!("doc-{i}")).collect());
        self.recorded.lock().unwrap().vector_writes.push(VectorWrite {
            vectors,
            documents: documents.to_vec(),
            ids,
        });
        Ok(returned)
    }

    async fn similarity_search_vector_with_score(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredDocument>, VectorStoreError> {
        self.check()?;
        self.recorded.lock().unwrap().searches.push(SearchCall {
            query: query.to_vec(),
            k,
            filter: filter.cloned(),
        });
        Ok(self.results.iter().take(k).cloned().collect())
    }

    async fn list_indices(&self) -> Result<Vec<String>, VectorStoreError> {
        self.check()?;
        Ok(self.indices.clone())
    }
}

/// Resolves every item to the same store and records the item indices asked for.
pub struct FixedResolver {
    pub store: Arc<RecordingStore>,
    pub requested: Mutex<Vec<usize>>,
    unresolvable: bool,
}

impl FixedResolver {
    pub fn new(store: RecordingStore) -> Self {
        Self {
            store: Arc::new(store),
            requested: Mutex::new(Vec::new()),
            unresolvable: false,
        }
    }

    /// Fails every lookup the way a missing index name does.
    pub fn unresolvable() -> Self {
        Self {
            unresolvable: true,
            ..Self::new(RecordingStore::new())
        }
    }
}

#[async_trait]
impl StoreResolver for FixedResolver {
    async fn store_for_item(&self, item_index: usize) -> Result<Arc<dyn VectorStore>, NodeError> {
        self.requested.lock().unwrap().push(item_index);
        if self.unresolvable {
            return Err(NodeError::item_configuration(
                item_index,
                "parameter 'index_name' is required",
            ));
        }
        let store: Arc<dyn VectorStore> = self.store.clone();
        Ok(store)
    }
}

/// Yields `counts[item_index]` documents for each item.
pub struct FixedExtractor {
    counts: Vec<usize>,
    fail: bool,
}

impl FixedExtractor {
    pub fn per_item(counts: Vec<usize>) -> Self {
        Self { counts, fail: false }
    }

    pub fn failing() -> Self {
        Self {
            counts: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl DocumentExtractor for FixedExtractor {
    async fn process_item(
        &self,
        _item: &WorkItem,
        item_index: usize,
    ) -> Result<Vec<Document>, ExtractError> {
        if self.fail {
            return Err(ExtractError::InvalidJson("unreadable item".to_string()));
        }
        let count = self.counts.get(item_index).copied().unwrap_or(1);
        Ok((0..count)
            .map(|n| {
                Document::new(format!("item {item_index} doc {n}"))
                    .with_meta("item", json!(item_index))
            })
            .collect())
    }
}

pub fn scored(content: &str, score: f64) -> ScoredDocument {
    ScoredDocument {
        document: Document::new(content).with_meta("source", "test"),
        score,
    }
}
