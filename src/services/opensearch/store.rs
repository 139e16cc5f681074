use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use uuid::Uuid;

use super::VectorStore;
use super::client::{OpenSearchClient, SearchHit};
use crate::error::VectorStoreError;
use crate::models::{
    Document, FieldNames, FilterCondition, KnnIndexOptions, MetadataFilter, ScoredDocument,
};
use crate::services::Embeddings;

/// A k-NN index on OpenSearch, bound to one index name and field mapping.
pub struct OpenSearchVectorStore {
    client: Arc<OpenSearchClient>,
    embeddings: Arc<dyn Embeddings>,
    index_name: String,
    fields: FieldNames,
    knn: KnnIndexOptions,
}

impl OpenSearchVectorStore {
    pub fn new(
        client: Arc<OpenSearchClient>,
        embeddings: Arc<dyn Embeddings>,
        index_name: impl Into<String>,
        fields: FieldNames,
    ) -> Self {
        Self {
            client,
            embeddings,
            index_name: index_name.into(),
            fields,
            knn: KnnIndexOptions::default(),
        }
    }

    pub fn with_knn_options(mut self, knn: KnnIndexOptions) -> Self {
        self.knn = knn;
        self
    }

    pub fn client(&self) -> &Arc<OpenSearchClient> {
        &self.client
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn fields(&self) -> &FieldNames {
        &self.fields
    }

    /// Settings and mappings for a new index holding `dimension`-sized vectors.
    fn index_body(&self, dimension: usize) -> Value {
        json!({
            "settings": {
                "index": {
                    "number_of_shards": self.knn.number_of_shards,
                    "number_of_replicas": self.knn.number_of_replicas,
                    "knn": true,
                    "knn.algo_param.ef_search": self.knn.ef_search
                }
            },
            "mappings": {
                "properties": {
                    self.fields.text_field_name.as_str(): { "type": "text" },
                    self.fields.metadata_field_name.as_str(): { "type": "object" },
                    self.fields.vector_field_name.as_str(): {
                        "type": "knn_vector",
                        "dimension": dimension,
                        "method": {
                            "name": "hnsw",
                            "engine": self.knn.engine,
                            "space_type": self.knn.space_type,
                            "parameters": {
                                "ef_construction": self.knn.ef_construction,
                                "m": self.knn.m
                            }
                        }
                    }
                }
            }
        })
    }

    /// NDJSON body with one `index` action per document.
    fn bulk_body(
        &self,
        vectors: &[Vec<f32>],
        documents: &[Document],
        ids: &[String],
    ) -> Result<String, VectorStoreError> {
        let mut body = String::new();
        for ((vector, document), id) in vectors.iter().zip(documents).zip(ids) {
            let action = json!({ "index": { "_index": self.index_name, "_id": id } });
            let mut source = Map::new();
            source.insert(self.fields.vector_field_name.clone(), json!(vector));
            source.insert(
                self.fields.text_field_name.clone(),
                Value::String(document.page_content.clone()),
            );
            source.insert(
                self.fields.metadata_field_name.clone(),
                Value::Object(document.metadata.clone()),
            );

            for line in [action, Value::Object(source)] {
                let encoded = serde_json::to_string(&line)
                    .map_err(|e| VectorStoreError::InvalidResponse(e.to_string()))?;
                body.push_str(&encoded);
                body.push('\n');
            }
        }
        Ok(body)
    }

    fn search_body(&self, query: &[f32], k: usize, filter: Option<&MetadataFilter>) -> Value {
        let knn = json!({
            "knn": {
                self.fields.vector_field_name.as_str(): { "vector": query, "k": k }
            }
        });

        let mut bool_query = Map::new();
        bool_query.insert("must".to_string(), json!([knn]));
        if let Some(filter) = filter.filter(|f| !f.is_empty()) {
            bool_query.insert("filter".to_string(), Value::Array(self.filter_clauses(filter)));
        }

        json!({
            "size": k,
            "_source": { "excludes": [self.fields.vector_field_name] },
            "query": { "bool": bool_query }
        })
    }

    fn filter_clauses(&self, filter: &MetadataFilter) -> Vec<Value> {
        filter
            .iter()
            .map(|(key, condition)| {
                let field = format!("{}.{}", self.fields.metadata_field_name, key);
                match condition {
                    FilterCondition::Equals(value) => json!({ "term": { field: value } }),
                    FilterCondition::AnyOf(values) => json!({ "terms": { field: values } }),
                    FilterCondition::Range(bounds) => json!({ "range": { field: bounds } }),
                }
            })
            .collect()
    }

    fn parse_hit(&self, hit: SearchHit) -> ScoredDocument {
        let mut source = hit.source;
        let page_content = match source.remove(&self.fields.text_field_name) {
            Some(Value::String(text)) => text,
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        let metadata = match source.remove(&self.fields.metadata_field_name) {
            Some(Value::Object(metadata)) => metadata,
            _ => Map::new(),
        };

        ScoredDocument {
            document: Document {
                page_content,
                metadata,
            },
            score: hit.score.unwrap_or_default(),
        }
    }

    async fn ensure_index(&self, dimension: usize) -> Result<(), VectorStoreError> {
        if self.client.index_exists(&self.index_name).await? {
            return Ok(());
        }
        self.client
            .create_index(&self.index_name, &self.index_body(dimension))
            .await?;
        tracing::info!(index = %self.index_name, dimension, "created k-NN index");
        Ok(())
    }
}

#[async_trait]
impl VectorStore for OpenSearchVectorStore {
    async fn add_documents(&self, documents: &[Document]) -> Result<Vec<String>, VectorStoreError> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }
        let texts: Vec<String> = documents.iter().map(|d| d.page_content.clone()).collect();
        let vectors = self.embeddings.embed_documents(&texts).await?;
        self.add_vectors(vectors, documents, None).await
    }

    async fn add_vectors(
        &self,
        vectors: Vec<Vec<f32>>,
        documents: &[Document],
        ids: Option<Vec<String>>,
    ) -> Result<Vec<String>, VectorStoreError> {
        if vectors.len() != documents.len() {
            return Err(VectorStoreError::MismatchedInput(format!(
                "{} vectors for {} documents",
                vectors.len(),
                documents.len()
            )));
        }
        let ids = match ids {
            Some(ids) if ids.len() != documents.len() => {
                return Err(VectorStoreError::MismatchedInput(format!(
                    "{} ids for {} documents",
                    ids.len(),
                    documents.len()
                )));
            }
            Some(ids) => ids,
            None => documents.iter().map(|_| Uuid::new_v4().to_string()).collect(),
        };
        let Some(dimension) = vectors.first().map(Vec::len) else {
            return Ok(ids);
        };

        self.ensure_index(dimension).await?;
        let body = self.bulk_body(&vectors, documents, &ids)?;
        let written = self.client.bulk(body).await?;
        tracing::debug!(index = %self.index_name, written, "stored vectors");
        Ok(ids)
    }

    async fn similarity_search_vector_with_score(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredDocument>, VectorStoreError> {
        let body = self.search_body(query, k, filter);
        let response = self.client.search(&self.index_name, &body).await?;
        Ok(response
            .hits
            .hits
            .into_iter()
            .map(|hit| self.parse_hit(hit))
            .collect())
    }

    async fn list_indices(&self) -> Result<Vec<String>, VectorStoreError> {
        self.client.cat_indices().await
    }
}
