//! Document extractors for structured and binary work items.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Map, Value};

use super::documents::DocumentExtractor;
use super::splitter::TextSplitter;
use crate::error::ExtractError;
use crate::models::{Document, WorkItem};

/// MIME types the binary loader reads as UTF-8 text besides `text/*`.
const TEXT_MIME_TYPES: &[&str] = &[
    "application/json",
    "application/xml",
    "application/x-ndjson",
    "application/csv",
    "application/yaml",
];

/// Which part of the item's JSON becomes document text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum JsonMode {
    /// The whole item JSON.
    #[default]
    AllInputData,
    /// One field, by dotted path.
    Field(String),
}

/// Builds documents from an item's JSON.
///
/// Without pointers the selected value becomes a single document (strings as-is,
/// anything else serialized). With JSON pointers every string found under each
/// pointer becomes its own document.
#[derive(Debug, Clone, Default)]
pub struct JsonLoader {
    mode: JsonMode,
    pointers: Vec<String>,
    metadata: Map<String, Value>,
    splitter: Option<TextSplitter>,
}

impl JsonLoader {
    pub fn new(mode: JsonMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn with_pointers(mut self, pointers: Vec<String>) -> Self {
        self.pointers = pointers;
        self
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_splitter(mut self, splitter: TextSplitter) -> Self {
        self.splitter = Some(splitter);
        self
    }

    fn selected_value(&self, item: &WorkItem) -> Result<Value, ExtractError> {
        match &self.mode {
            JsonMode::AllInputData => Ok(Value::Object(item.json.clone())),
            JsonMode::Field(path) => item
                .field(path)
                .cloned()
                .ok_or_else(|| ExtractError::InvalidJson(format!("field '{path}' not found"))),
        }
    }

    fn texts(&self, value: &Value) -> Result<Vec<String>, ExtractError> {
        if self.pointers.is_empty() {
            let text = match value {
                Value::String(s) => s.clone(),
                other => serde_json::to_string(other)
                    .map_err(|e| ExtractError::InvalidJson(e.to_string()))?,
            };
            return Ok(vec![text]);
        }

        let mut texts = Vec::new();
        for pointer in &self.pointers {
            if let Some(found) = value.pointer(pointer) {
                collect_strings(found, &mut texts);
            }
        }
        Ok(texts)
    }
}

fn collect_strings(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Array(values) => values.iter().for_each(|v| collect_strings(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_strings(v, out)),
        _ => {}
    }
}

fn finish(documents: Vec<Document>, splitter: Option<&TextSplitter>) -> Vec<Document> {
    match splitter {
        Some(splitter) => documents
            .iter()
            .flat_map(|doc| splitter.split_document(doc))
            .collect(),
        None => documents,
    }
}

#[async_trait]
impl DocumentExtractor for JsonLoader {
    async fn process_item(
        &self,
        item: &WorkItem,
        item_index: usize,
    ) -> Result<Vec<Document>, ExtractError> {
        let value = self.selected_value(item)?;
        let documents: Vec<Document> = self
            .texts(&value)?
            .into_iter()
            .map(|text| {
                let mut metadata = self.metadata.clone();
                metadata.insert("source".to_string(), Value::from("json"));
                Document {
                    page_content: text,
                    metadata,
                }
            })
            .collect();

        tracing::debug!(item_index, documents = documents.len(), "extracted JSON documents");
        Ok(finish(documents, self.splitter.as_ref()))
    }
}

/// Builds a document from a text-like binary attachment.
#[derive(Debug, Clone)]
pub struct BinaryLoader {
    binary_property: String,
    metadata: Map<String, Value>,
    splitter: Option<TextSplitter>,
}

impl Default for BinaryLoader {
    fn default() -> Self {
        Self::new("data")
    }
}

impl BinaryLoader {
    pub fn new(binary_property: impl Into<String>) -> Self {
        Self {
            binary_property: binary_property.into(),
            metadata: Map::new(),
            splitter: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_splitter(mut self, splitter: TextSplitter) -> Self {
        self.splitter = Some(splitter);
        self
    }

    fn is_text_mime(mime_type: &str) -> bool {
        let essence = mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        essence.starts_with("text/") || TEXT_MIME_TYPES.contains(&essence.as_str())
    }
}

#[async_trait]
impl DocumentExtractor for BinaryLoader {
    async fn process_item(
        &self,
        item: &WorkItem,
        item_index: usize,
    ) -> Result<Vec<Document>, ExtractError> {
        let binary = item
            .binary
            .as_ref()
            .and_then(|b| b.get(&self.binary_property))
            .ok_or_else(|| ExtractError::MissingBinary(self.binary_property.clone()))?;

        if !Self::is_text_mime(&binary.mime_type) {
            return Err(ExtractError::UnsupportedMimeType(binary.mime_type.clone()));
        }

        let bytes = STANDARD
            .decode(binary.data.trim())
            .map_err(|e| ExtractError::Decode(e.to_string()))?;
        let text = String::from_utf8(bytes).map_err(|e| ExtractError::Decode(e.to_string()))?;

        let mut metadata = self.metadata.clone();
        metadata.insert("source".to_string(), Value::from("blob"));
        metadata.insert("blobType".to_string(), Value::from(binary.mime_type.clone()));
        if let Some(ref file_name) = binary.file_name {
            metadata.insert("fileName".to_string(), Value::from(file_name.clone()));
        }

        tracing::debug!(item_index, mime_type = %binary.mime_type, "extracted binary document");
        Ok(finish(
            vec![Document {
                page_content: text,
                metadata,
            }],
            self.splitter.as_ref(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BinaryData;
    use serde_json::json;

    fn item() -> WorkItem {
        WorkItem::from_value(json!({
            "title": "Cats",
            "body": { "intro": "Cats purr.", "tags": ["pet", 3] }
        }))
    }

    #[tokio::test]
    async fn test_all_input_data_is_one_document() {
        let docs = JsonLoader::default().process_item(&item(), 0).await.unwrap();
        assert_eq!(docs.len(), 1);
        let parsed: Value = serde_json::from_str(&docs[0].page_content).unwrap();
        assert_eq!(parsed["title"], "Cats");
        assert_eq!(docs[0].metadata["source"], "json");
    }

    #[tokio::test]
    async fn test_field_mode_uses_string_value() {
        let loader = JsonLoader::new(JsonMode::Field("body.intro".to_string()));
        let docs = loader.process_item(&item(), 0).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].page_content, "Cats purr.");
    }

    #[tokio::test]
    async fn test_missing_field_is_an_error() {
        let loader = JsonLoader::new(JsonMode::Field("nope".to_string()));
        let err = loader.process_item(&item(), 0).await.unwrap_err();
        assert!(matches!(err, ExtractError::InvalidJson(_)));
    }

    #[tokio::test]
    async fn test_pointers_yield_one_document_per_string() {
        let loader = JsonLoader::default()
            .with_pointers(vec!["/title".to_string(), "/body".to_string(), "/missing".to_string()]);
        let docs = loader.process_item(&item(), 0).await.unwrap();
        let texts: Vec<&str> = docs.iter().map(|d| d.page_content.as_str()).collect();
        assert_eq!(texts, vec!["Cats", "Cats purr.", "pet"]);
    }

    #[tokio::test]
    async fn test_configured_metadata_is_attached() {
        let mut metadata = Map::new();
        metadata.insert("team".to_string(), json!("docs"));
        let docs = JsonLoader::default()
            .with_metadata(metadata)
            .process_item(&item(), 0)
            .await
            .unwrap();
        assert_eq!(docs[0].metadata["team"], "docs");
    }

    #[tokio::test]
    async fn test_binary_text_document() {
        let item = WorkItem::default().with_binary(
            "data",
            BinaryData {
                data: STANDARD.encode("hello from a file"),
                mime_type: "text/plain; charset=utf-8".to_string(),
                file_name: Some("notes.txt".to_string()),
            },
        );
        let docs = BinaryLoader::default().process_item(&item, 2).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].page_content, "hello from a file");
        assert_eq!(docs[0].metadata["blobType"], "text/plain; charset=utf-8");
        assert_eq!(docs[0].metadata["fileName"], "notes.txt");
    }

    #[tokio::test]
    async fn test_binary_errors() {
        let missing = BinaryLoader::default()
            .process_item(&WorkItem::default(), 0)
            .await
            .unwrap_err();
        assert!(matches!(missing, ExtractError::MissingBinary(_)));

        let pdf = WorkItem::default().with_binary(
            "data",
            BinaryData {
                data: STANDARD.encode("%PDF"),
                mime_type: "application/pdf".to_string(),
                file_name: None,
            },
        );
        let unsupported = BinaryLoader::default().process_item(&pdf, 0).await.unwrap_err();
        assert!(matches!(unsupported, ExtractError::UnsupportedMimeType(_)));

        let garbage = WorkItem::default().with_binary(
            "data",
            BinaryData {
                data: "not base64!!".to_string(),
                mime_type: "text/plain".to_string(),
                file_name: None,
            },
        );
        let decode = BinaryLoader::default().process_item(&garbage, 0).await.unwrap_err();
        assert!(matches!(decode, ExtractError::Decode(_)));
    }

    #[tokio::test]
    async fn test_splitter_applies_to_extracted_documents() {
        let item = WorkItem::from_value(json!({ "text": "word ".repeat(100) }));
        let loader = JsonLoader::new(JsonMode::Field("text".to_string()))
            .with_splitter(TextSplitter::new(100, 10));
        let docs = loader.process_item(&item, 0).await.unwrap();
        assert!(docs.len() > 1);
        assert!(docs.iter().all(|d| d.metadata.contains_key("loc")));
    }
}
