//! Workflow items flowing in and out of the node.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::document::Document;

/// Binary attachment of a work item. `data` is base64 encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryData {
    pub data: String,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

/// One unit of workflow input.
///
/// Items carry no explicit index: their position in the input slice is the
/// ordinal used to correlate every output record back to its origin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    #[serde(default)]
    pub json: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary: Option<BTreeMap<String, BinaryData>>,
}

impl WorkItem {
    pub fn from_json(json: Map<String, Value>) -> Self {
        Self { json, binary: None }
    }

    /// Build an item from any JSON value. Non-object values are wrapped as `{ "data": value }`.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => {
                // Accept both `{ "json": {...}, "binary": {...} }` and plain objects.
                if map.contains_key("json")
                    && map.keys().all(|k| k == "json" || k == "binary")
                    && let Ok(item) = serde_json::from_value::<WorkItem>(Value::Object(map.clone()))
                {
                    return item;
                }
                Self::from_json(map)
            }
            other => {
                let mut map = Map::new();
                map.insert("data".to_string(), other);
                Self::from_json(map)
            }
        }
    }

    pub fn with_binary(mut self, property: impl Into<String>, binary: BinaryData) -> Self {
        self.binary
            .get_or_insert_with(BTreeMap::new)
            .insert(property.into(), binary);
        self
    }

    /// Look up a field by dotted path (`a.b.c`); array segments may be numeric.
    pub fn field(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.json.get(first)?;
        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(list) => list.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

/// Correlation tag linking an output record to the input item it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairedItem {
    pub item: usize,
}

/// One record emitted by the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputRecord {
    pub json: Value,
    pub paired_item: PairedItem,
}

impl OutputRecord {
    pub fn new(json: Value, item_index: usize) -> Self {
        Self {
            json,
            paired_item: PairedItem { item: item_index },
        }
    }

    /// Echo record mirroring a processed document.
    pub fn echo(document: &Document, item_index: usize) -> Self {
        let json = serde_json::json!({
            "metadata": document.metadata,
            "pageContent": document.page_content,
        });
        Self::new(json, item_index)
    }

    pub fn item_index(&self) -> usize {
        self.paired_item.item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_lookup() {
        let item = WorkItem::from_value(json!({
            "query": "cats",
            "nested": { "ids": ["a", "b"] }
        }));
        assert_eq!(item.field("query"), Some(&json!("cats")));
        assert_eq!(item.field("nested.ids.1"), Some(&json!("b")));
        assert_eq!(item.field("nested.missing"), None);
        assert_eq!(item.field("query.deeper"), None);
    }

    #[test]
    fn test_from_value_accepts_wrapped_items() {
        let item = WorkItem::from_value(json!({
            "json": { "title": "x" },
            "binary": { "data": { "data": "aGk=", "mimeType": "text/plain" } }
        }));
        assert_eq!(item.json.get("title"), Some(&json!("x")));
        assert!(item.binary.as_ref().is_some_and(|b| b.contains_key("data")));
    }

    #[test]
    fn test_from_value_wraps_scalars() {
        let item = WorkItem::from_value(json!("plain"));
        assert_eq!(item.json.get("data"), Some(&json!("plain")));
    }

    #[test]
    fn test_echo_record_shape() {
        let doc = Document::new("body").with_meta("k", 1);
        let record = OutputRecord::echo(&doc, 4);
        assert_eq!(record.item_index(), 4);
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({
                "json": { "metadata": { "k": 1 }, "pageContent": "body" },
                "pairedItem": { "item": 4 }
            })
        );
    }
}
