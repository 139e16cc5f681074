//! Building metadata filters from per-item parameters.

use serde_json::Value;

use crate::context::{ExecutionContext, params};
use crate::error::NodeError;
use crate::models::{FilterCondition, MetadataFilter};

/// Read the metadata filter for an item.
///
/// The parameter may be a list of `{ "name", "value" }` pairs, a JSON object,
/// or a string holding either. Returns `None` when no criteria are set so the
/// search is unrestricted.
pub fn build_metadata_filter(
    ctx: &dyn ExecutionContext,
    item_index: usize,
) -> Result<Option<MetadataFilter>, NodeError> {
    let raw = match ctx.parameter(params::METADATA_FILTER, item_index) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => serde_json::from_str(&s).map_err(|e| {
            NodeError::item_configuration(item_index, format!("metadata filter is not valid JSON: {e}"))
        })?,
        Some(other) => other,
    };

    let invalid = |msg: String| NodeError::item_configuration(item_index, format!("invalid metadata filter: {msg}"));

    let filter = match raw {
        Value::Object(object) => MetadataFilter::from_object(object).map_err(invalid)?,
        Value::Array(pairs) => from_pairs(pairs).map_err(invalid)?,
        other => return Err(invalid(format!("expected an object or a list, got {other}"))),
    };

    Ok((!filter.is_empty()).then_some(filter))
}

fn from_pairs(pairs: Vec<Value>) -> Result<MetadataFilter, String> {
    let mut filter = MetadataFilter::new();
    for pair in pairs {
        let Value::Object(mut entry) = pair else {
            return Err("list entries must be objects with 'name' and 'value'".to_string());
        };
        let name = match entry.remove("name") {
            Some(Value::String(name)) if !name.trim().is_empty() => name,
            _ => return Err("every entry needs a non-empty 'name'".to_string()),
        };
        let value = entry.remove("value").unwrap_or(Value::Null);
        let condition = FilterCondition::from_value(value).map_err(|e| format!("field '{name}': {e}"))?;
        filter.insert(name, condition);
    }
    Ok(filter)
}
