use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A piece of text plus its metadata, as stored in and returned from the index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub page_content: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Document {
    pub fn new(page_content: impl Into<String>) -> Self {
        Self {
            page_content: page_content.into(),
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Insert a single metadata entry.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A search hit: the stored document and the score reported by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    pub document: Document,
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_serializes_page_content() {
        let doc = Document::new("hello").with_meta("source", "json");
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            value,
            json!({ "pageContent": "hello", "metadata": { "source": "json" } })
        );
    }

    #[test]
    fn test_document_metadata_defaults_to_empty() {
        let doc: Document = serde_json::from_value(json!({ "pageContent": "x" })).unwrap();
        assert!(doc.metadata.is_empty());
    }
}
