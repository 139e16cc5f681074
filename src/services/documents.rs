//! Turning work items into documents.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ExtractError;
use crate::models::{Document, OutputRecord, WorkItem};

/// Extracts zero or more documents from a single work item.
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    async fn process_item(
        &self,
        item: &WorkItem,
        item_index: usize,
    ) -> Result<Vec<Document>, ExtractError>;
}

/// The document input connected to the node.
#[derive(Clone)]
pub enum DocumentSource {
    /// Documents built upstream. The whole list is used for every item.
    Prebuilt(Arc<[Document]>),
    /// Documents produced from each item.
    Extractable(Arc<dyn DocumentExtractor>),
}

impl DocumentSource {
    pub fn prebuilt(documents: Vec<Document>) -> Self {
        DocumentSource::Prebuilt(documents.into())
    }

    pub fn extractor(extractor: impl DocumentExtractor + 'static) -> Self {
        DocumentSource::Extractable(Arc::new(extractor))
    }
}

impl std::fmt::Debug for DocumentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentSource::Prebuilt(docs) => f.debug_tuple("Prebuilt").field(&docs.len()).finish(),
            DocumentSource::Extractable(_) => f.write_str("Extractable"),
        }
    }
}

/// Documents obtained for one item together with their echo records.
#[derive(Debug, Clone)]
pub struct ProcessedDocuments {
    pub documents: Vec<Document>,
    pub echo: Vec<OutputRecord>,
}

/// Resolve the documents for `item` and build one echo record per document.
pub async fn process_document(
    source: &DocumentSource,
    item: &WorkItem,
    item_index: usize,
) -> Result<ProcessedDocuments, ExtractError> {
    let documents = match source {
        DocumentSource::Prebuilt(docs) => docs.to_vec(),
        DocumentSource::Extractable(extractor) => extractor.process_item(item, item_index).await?,
    };

    let echo = documents
        .iter()
        .map(|doc| OutputRecord::echo(doc, item_index))
        .collect();

    Ok(ProcessedDocuments { documents, echo })
}
