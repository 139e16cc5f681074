//! Operation handlers and the per-item parameters they run with.
//!
//! Every handler walks the input items in order and tags what it emits with
//! the index of the item it came from. Parameters are resolved into typed
//! structs before a handler calls any collaborator, so a misconfigured item
//! fails without side effects.

mod insert;
mod load;
mod update;

pub use insert::handle_insert;
pub use load::{handle_load, load, search};
pub use update::handle_update;

use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::{ExecutionContext, params};
use crate::error::NodeError;
use crate::models::{DEFAULT_TOP_K, MetadataFilter};
use crate::services::{VectorStore, build_metadata_filter};

/// Supplies the vector store an item's operation runs against.
#[async_trait]
pub trait StoreResolver: Send + Sync {
    async fn store_for_item(&self, item_index: usize) -> Result<Arc<dyn VectorStore>, NodeError>;
}

/// How a similarity search is run and reported.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    pub top_k: NonZeroUsize,
    pub include_metadata: bool,
    pub filter: Option<MetadataFilter>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            include_metadata: true,
            filter: None,
        }
    }
}

fn default_top_k() -> NonZeroUsize {
    NonZeroUsize::new(DEFAULT_TOP_K as usize).unwrap_or(NonZeroUsize::MIN)
}

impl SearchOptions {
    pub fn resolve(ctx: &dyn ExecutionContext, item_index: usize) -> Result<Self, NodeError> {
        let top_k = match ctx.integer_parameter(params::TOP_K, item_index)? {
            None => default_top_k(),
            Some(k) => usize::try_from(k)
                .ok()
                .and_then(NonZeroUsize::new)
                .ok_or_else(|| {
                    NodeError::item_configuration(
                        item_index,
                        format!("parameter '{}' must be a positive integer, got {k}", params::TOP_K),
                    )
                })?,
        };

        Ok(Self {
            top_k,
            include_metadata: ctx.bool_parameter(params::INCLUDE_METADATA, item_index, true)?,
            filter: build_metadata_filter(ctx, item_index)?,
        })
    }
}

/// Inputs of one load operation.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadParameters {
    pub prompt: String,
    pub search: SearchOptions,
}

impl LoadParameters {
    pub fn resolve(ctx: &dyn ExecutionContext, item_index: usize) -> Result<Self, NodeError> {
        let prompt = required_string(ctx, params::PROMPT, item_index)?;
        Ok(Self {
            prompt,
            search: SearchOptions::resolve(ctx, item_index)?,
        })
    }
}

/// Inputs of one update operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateParameters {
    pub id: String,
}

impl UpdateParameters {
    pub fn resolve(ctx: &dyn ExecutionContext, item_index: usize) -> Result<Self, NodeError> {
        Ok(Self {
            id: required_string(ctx, params::ID, item_index)?,
        })
    }
}

pub(crate) fn required_string(
    ctx: &dyn ExecutionContext,
    name: &str,
    item_index: usize,
) -> Result<String, NodeError> {
    match ctx.string_parameter(name, item_index)? {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(NodeError::item_configuration(
            item_index,
            format!("parameter '{name}' is required"),
        )),
    }
}
