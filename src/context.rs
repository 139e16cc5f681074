//! The host side of a node invocation.
//!
//! A workflow host hands the node its input items, per-item parameter values,
//! a cancellation signal and its upstream connections (credentials, embedding
//! provider, document input) through [`ExecutionContext`]. [`StaticContext`] is
//! an in-process host used by the CLI.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;

use crate::error::NodeError;
use crate::models::{ConnectionConfig, DEFAULT_NODE_NAME, WorkItem};
use crate::services::{DocumentSource, Embeddings};

/// Parameter names read by the node.
pub mod params {
    pub const MODE: &str = "mode";
    pub const INDEX_NAME: &str = "index_name";
    pub const PROMPT: &str = "prompt";
    pub const TOP_K: &str = "top_k";
    pub const INCLUDE_METADATA: &str = "include_metadata";
    pub const ID: &str = "id";
    pub const FIELD_NAMES: &str = "field_names";
    pub const METADATA_FILTER: &str = "metadata_filter";
    pub const TOOL_NAME: &str = "tool_name";
    pub const TOOL_DESCRIPTION: &str = "tool_description";
}

/// Cooperative cancellation flag shared between the host and the node.
///
/// Setting it never interrupts in-flight requests; loops that honour it stop
/// at their next item boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal(Arc<AtomicBool>);

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything the node reads from its host during one invocation.
pub trait ExecutionContext: Send + Sync {
    /// Display name of the node, attached to errors.
    fn node_name(&self) -> &str;

    /// Input items. Their positions are the item indices.
    fn input_items(&self) -> &[WorkItem];

    /// Raw value of a parameter for the given item, `None` when unset.
    fn parameter(&self, name: &str, item_index: usize) -> Option<Value>;

    fn cancel_signal(&self) -> &CancelSignal;

    /// Credentials for the vector store.
    fn connection(&self) -> Result<ConnectionConfig, NodeError>;

    /// The connected embedding provider, if any.
    fn embeddings(&self) -> Option<Arc<dyn Embeddings>>;

    /// The connected document input, if any.
    fn document_source(&self) -> Option<DocumentSource>;

    fn string_parameter(&self, name: &str, item_index: usize) -> Result<Option<String>, NodeError> {
        match self.parameter(name, item_index) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(other) => Err(NodeError::item_configuration(
                item_index,
                format!("parameter '{name}' must be a string, got {other}"),
            )),
        }
    }

    fn bool_parameter(&self, name: &str, item_index: usize, default: bool) -> Result<bool, NodeError> {
        match self.parameter(name, item_index) {
            None | Some(Value::Null) => Ok(default),
            Some(Value::Bool(b)) => Ok(b),
            Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(NodeError::item_configuration(
                    item_index,
                    format!("parameter '{name}' must be a boolean, got \"{s}\""),
                )),
            },
            Some(other) => Err(NodeError::item_configuration(
                item_index,
                format!("parameter '{name}' must be a boolean, got {other}"),
            )),
        }
    }

    fn integer_parameter(&self, name: &str, item_index: usize) -> Result<Option<i64>, NodeError> {
        let invalid = |shown: String| {
            NodeError::item_configuration(
                item_index,
                format!("parameter '{name}' must be an integer, got {shown}"),
            )
        };
        match self.parameter(name, item_index) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Ok(Some(i)),
                (None, Some(f)) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                    Ok(Some(f as i64))
                }
                _ => Err(invalid(n.to_string())),
            },
            Some(Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| invalid(format!("\"{s}\""))),
            Some(other) => Err(invalid(other.to_string())),
        }
    }
}

/// Where a parameter value comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    /// The same value for every item.
    Fixed(Value),
    /// A field of the current item's JSON, by dotted path.
    ItemField(String),
}

impl ParameterValue {
    const ITEM_FIELD_PREFIX: &'static str = "$json.";

    /// Parse a command-line value. `$json.<path>` reads from each item, anything
    /// else is a fixed string.
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix(Self::ITEM_FIELD_PREFIX) {
            Some(path) if !path.is_empty() => ParameterValue::ItemField(path.to_string()),
            _ => ParameterValue::Fixed(Value::String(raw.to_string())),
        }
    }

    fn resolve(&self, item: Option<&WorkItem>) -> Option<Value> {
        match self {
            ParameterValue::Fixed(value) => Some(value.clone()),
            ParameterValue::ItemField(path) => item.and_then(|i| i.field(path)).cloned(),
        }
    }
}

impl From<Value> for ParameterValue {
    fn from(value: Value) -> Self {
        ParameterValue::Fixed(value)
    }
}

/// An in-process host with fixed inputs and connections.
pub struct StaticContext {
    node_name: String,
    items: Vec<WorkItem>,
    parameters: HashMap<String, ParameterValue>,
    connection: Option<ConnectionConfig>,
    embeddings: Option<Arc<dyn Embeddings>>,
    document_source: Option<DocumentSource>,
    cancel: CancelSignal,
}

impl StaticContext {
    pub fn new(items: Vec<WorkItem>) -> Self {
        Self {
            node_name: DEFAULT_NODE_NAME.to_string(),
            items,
            parameters: HashMap::new(),
            connection: None,
            embeddings: None,
            document_source: None,
            cancel: CancelSignal::new(),
        }
    }

    pub fn with_node_name(mut self, name: impl Into<String>) -> Self {
        self.node_name = name.into();
        self
    }

    pub fn with_parameter(mut self, name: &str, value: impl Into<ParameterValue>) -> Self {
        self.parameters.insert(name.to_string(), value.into());
        self
    }

    pub fn with_connection(mut self, connection: ConnectionConfig) -> Self {
        self.connection = Some(connection);
        self
    }

    pub fn with_embeddings(mut self, embeddings: Arc<dyn Embeddings>) -> Self {
        self.embeddings = Some(embeddings);
        self
    }

    pub fn with_document_source(mut self, source: DocumentSource) -> Self {
        self.document_source = Some(source);
        self
    }

    pub fn with_cancel_signal(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }
}

impl ExecutionContext for StaticContext {
    fn node_name(&self) -> &str {
        &self.node_name
    }

    fn input_items(&self) -> &[WorkItem] {
        &self.items
    }

    fn parameter(&self, name: &str, item_index: usize) -> Option<Value> {
        self.parameters
            .get(name)
            .and_then(|value| value.resolve(self.items.get(item_index)))
    }

    fn cancel_signal(&self) -> &CancelSignal {
        &self.cancel
    }

    fn connection(&self) -> Result<ConnectionConfig, NodeError> {
        self.connection
            .clone()
            .ok_or_else(|| NodeError::configuration("no OpenSearch credentials configured"))
    }

    fn embeddings(&self) -> Option<Arc<dyn Embeddings>> {
        self.embeddings.clone()
    }

    fn document_source(&self) -> Option<DocumentSource> {
        self.document_source.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn items() -> Vec<WorkItem> {
        vec![
            WorkItem::from_value(json!({ "q": "cats", "k": 2 })),
            WorkItem::from_value(json!({ "q": "dogs" })),
        ]
    }

    #[test]
    fn test_parameter_value_parse() {
        assert_eq!(
            ParameterValue::parse("$json.query"),
            ParameterValue::ItemField("query".to_string())
        );
        assert_eq!(
            ParameterValue::parse("plain"),
            ParameterValue::Fixed(json!("plain"))
        );
        assert_eq!(ParameterValue::parse("$json."), ParameterValue::Fixed(json!("$json.")));
    }

    #[test]
    fn test_item_field_parameters_vary_per_item() {
        let ctx = StaticContext::new(items()).with_parameter(params::PROMPT, ParameterValue::parse("$json.q"));
        assert_eq!(ctx.string_parameter(params::PROMPT, 0).unwrap().as_deref(), Some("cats"));
        assert_eq!(ctx.string_parameter(params::PROMPT, 1).unwrap().as_deref(), Some("dogs"));
        assert_eq!(ctx.string_parameter(params::PROMPT, 5).unwrap(), None);
    }

    #[test]
    fn test_typed_accessors() {
        let ctx = StaticContext::new(items())
            .with_parameter(params::TOP_K, ParameterValue::parse("$json.k"))
            .with_parameter(params::INCLUDE_METADATA, json!("false"))
            .with_parameter(params::ID, json!(42));

        assert_eq!(ctx.integer_parameter(params::TOP_K, 0).unwrap(), Some(2));
        assert_eq!(ctx.integer_parameter(params::TOP_K, 1).unwrap(), None);
        assert!(!ctx.bool_parameter(params::INCLUDE_METADATA, 0, true).unwrap());
        assert!(ctx.bool_parameter("missing", 0, true).unwrap());
        assert_eq!(ctx.string_parameter(params::ID, 0).unwrap().as_deref(), Some("42"));
    }

    #[test]
    fn test_typed_accessors_reject_wrong_types() {
        let ctx = StaticContext::new(items())
            .with_parameter(params::TOP_K, json!(2.5))
            .with_parameter(params::INCLUDE_METADATA, json!([true]))
            .with_parameter(params::PROMPT, json!({ "a": 1 }));

        assert!(ctx.integer_parameter(params::TOP_K, 0).is_err());
        assert!(ctx.bool_parameter(params::INCLUDE_METADATA, 0, true).is_err());
        assert!(ctx.string_parameter(params::PROMPT, 0).is_err());
    }

    #[test]
    fn test_missing_connection_is_configuration_error() {
        let ctx = StaticContext::new(Vec::new());
        assert!(matches!(ctx.connection(), Err(NodeError::Configuration { .. })));
    }

    #[test]
    fn test_cancel_signal_is_shared_between_clones() {
        let signal = CancelSignal::new();
        let clone = signal.clone();
        assert!(!signal.is_cancelled());
        clone.cancel();
        assert!(signal.is_cancelled());
    }
}
