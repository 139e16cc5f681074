//! Metadata filters applied during similarity search.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

const RANGE_KEYS: [&str; 4] = ["gt", "gte", "lt", "lte"];

/// Bounds of a range condition. Unset bounds are open.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RangeBounds {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gt: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gte: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lt: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lte: Option<Value>,
}

/// Expected value of one metadata field.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterCondition {
    Equals(Value),
    AnyOf(Vec<Value>),
    Range(RangeBounds),
}

impl FilterCondition {
    /// Interpret a JSON value as a condition.
    ///
    /// Arrays match any of their elements, objects made only of `gt`/`gte`/`lt`/`lte`
    /// are ranges, scalars match exactly. Other objects and `null` are rejected.
    pub fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Null => Err("filter value cannot be null".to_string()),
            Value::Array(values) => Ok(FilterCondition::AnyOf(values)),
            Value::Object(map) => {
                if map.is_empty() || !map.keys().all(|k| RANGE_KEYS.contains(&k.as_str())) {
                    return Err(format!(
                        "object filter values must only use {}",
                        RANGE_KEYS.join("/")
                    ));
                }
                let mut bounds = RangeBounds::default();
                for (key, bound) in map {
                    match key.as_str() {
                        "gt" => bounds.gt = Some(bound),
                        "gte" => bounds.gte = Some(bound),
                        "lt" => bounds.lt = Some(bound),
                        _ => bounds.lte = Some(bound),
                    }
                }
                Ok(FilterCondition::Range(bounds))
            }
            scalar => Ok(FilterCondition::Equals(scalar)),
        }
    }
}

/// Field name to condition. All conditions must hold (AND).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataFilter {
    conditions: BTreeMap<String, FilterCondition>,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, condition: FilterCondition) -> Self {
        self.insert(field, condition);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, condition: FilterCondition) {
        self.conditions.insert(field.into(), condition);
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn get(&self, field: &str) -> Option<&FilterCondition> {
        self.conditions.get(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FilterCondition)> {
        self.conditions.iter()
    }

    /// Build a filter from a JSON object of field to value.
    pub fn from_object(object: Map<String, Value>) -> Result<Self, String> {
        let mut filter = Self::new();
        for (field, value) in object {
            let condition =
                FilterCondition::from_value(value).map_err(|e| format!("field '{field}': {e}"))?;
            filter.insert(field, condition);
        }
        Ok(filter)
    }
}
