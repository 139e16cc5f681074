//! The vector store node: mode dispatch for both ways a host can run it.
//!
//! [`VectorStoreNode::execute`] runs `load`, `insert` and `update` over the
//! input items and returns item-tagged records. [`VectorStoreNode::supply_data`]
//! hands a configured store (`retrieve`) or a search tool
//! (`retrieve-as-tool`) to a downstream consumer.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::context::{ExecutionContext, params};
use crate::error::{ExecutionError, NodeError, VectorStoreError};
use crate::models::{
    ConnectionConfig, ExecuteMode, FieldNames, KnnIndexOptions, OperationMode, OutputRecord,
    SupplyMode,
};
use crate::operations::{
    SearchOptions, StoreResolver, handle_insert, handle_load, handle_update, required_string,
    search,
};
use crate::services::{
    ClientFactory, Embeddings, JsonLoader, OpenSearchVectorStore, VectorStore,
};

const DEFAULT_TOOL_NAME: &str = "opensearch_vector_store";
const DEFAULT_TOOL_DESCRIPTION: &str =
    "Retrieve documents from the OpenSearch vector store that are relevant to the query";

/// What the data-supply path hands to its consumer.
pub enum SupplyData {
    VectorStore(Arc<dyn VectorStore>),
    Tool(VectorStoreTool),
}

/// A named search over the configured store, for use by an agent.
pub struct VectorStoreTool {
    name: String,
    description: String,
    store: Arc<dyn VectorStore>,
    embeddings: Arc<dyn Embeddings>,
    options: SearchOptions,
    item_index: usize,
}

impl VectorStoreTool {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Search for `query`, returning `{ document, score }` values best first.
    pub async fn call(&self, query: &str) -> Result<Vec<Value>, NodeError> {
        search(
            self.store.as_ref(),
            self.embeddings.as_ref(),
            query,
            &self.options,
            self.item_index,
        )
        .await
    }
}

pub struct VectorStoreNode {
    factory: Arc<ClientFactory>,
    knn: KnnIndexOptions,
}

impl Default for VectorStoreNode {
    fn default() -> Self {
        Self::new()
    }
}

impl VectorStoreNode {
    /// A node using the process-wide client factory.
    pub fn new() -> Self {
        Self::with_factory(ClientFactory::shared())
    }

    pub fn with_factory(factory: Arc<ClientFactory>) -> Self {
        Self {
            factory,
            knn: KnnIndexOptions::default(),
        }
    }

    pub fn with_knn_options(mut self, knn: KnnIndexOptions) -> Self {
        self.knn = knn;
        self
    }

    pub async fn execute(
        &self,
        ctx: &dyn ExecutionContext,
    ) -> Result<Vec<OutputRecord>, ExecutionError> {
        self.try_execute(ctx)
            .await
            .map_err(|e| ExecutionError::new(ctx.node_name(), raw_mode(ctx), e))
    }

    pub async fn supply_data(
        &self,
        ctx: &dyn ExecutionContext,
        item_index: usize,
    ) -> Result<SupplyData, ExecutionError> {
        self.try_supply_data(ctx, item_index)
            .await
            .map_err(|e| ExecutionError::new(ctx.node_name(), raw_mode(ctx), e))
    }

    /// Names of the indices on the cluster.
    pub async fn list_indices(
        &self,
        connection: &ConnectionConfig,
    ) -> Result<Vec<String>, VectorStoreError> {
        self.factory.get_client(connection).await?.cat_indices().await
    }

    /// Check that the cluster accepts the credentials. Returns its document count.
    pub async fn test_connection(&self, connection: &ConnectionConfig) -> Result<u64, VectorStoreError> {
        self.factory.get_client(connection).await?.count().await
    }

    async fn try_execute(&self, ctx: &dyn ExecutionContext) -> Result<Vec<OutputRecord>, NodeError> {
        let mode = execute_mode(ctx)?;
        let embeddings = required_embeddings(ctx)?;
        let resolver = self.resolver(ctx, Arc::clone(&embeddings))?;
        dispatch_execute(ctx, mode, embeddings.as_ref(), &resolver).await
    }

    async fn try_supply_data(
        &self,
        ctx: &dyn ExecutionContext,
        item_index: usize,
    ) -> Result<SupplyData, NodeError> {
        let mode = supply_mode(ctx)?;
        let embeddings = required_embeddings(ctx)?;
        let resolver = self.resolver(ctx, Arc::clone(&embeddings))?;
        dispatch_supply(ctx, mode, item_index, embeddings, &resolver).await
    }

    fn resolver<'a>(
        &'a self,
        ctx: &'a dyn ExecutionContext,
        embeddings: Arc<dyn Embeddings>,
    ) -> Result<OpenSearchResolver<'a>, NodeError> {
        Ok(OpenSearchResolver {
            ctx,
            factory: &self.factory,
            embeddings,
            fields: resolve_field_names(ctx)?,
            knn: &self.knn,
        })
    }
}

fn raw_mode(ctx: &dyn ExecutionContext) -> String {
    ctx.string_parameter(params::MODE, 0)
        .ok()
        .flatten()
        .unwrap_or_default()
}

fn operation_mode(ctx: &dyn ExecutionContext) -> Option<OperationMode> {
    raw_mode(ctx).parse().ok()
}

fn execute_mode(ctx: &dyn ExecutionContext) -> Result<ExecuteMode, NodeError> {
    operation_mode(ctx)
        .and_then(|mode| ExecuteMode::try_from(mode).ok())
        .ok_or_else(|| NodeError::configuration(ExecuteMode::UNSUPPORTED))
}

fn supply_mode(ctx: &dyn ExecutionContext) -> Result<SupplyMode, NodeError> {
    operation_mode(ctx)
        .and_then(|mode| SupplyMode::try_from(mode).ok())
        .ok_or_else(|| NodeError::configuration(SupplyMode::UNSUPPORTED))
}

fn required_embeddings(ctx: &dyn ExecutionContext) -> Result<Arc<dyn Embeddings>, NodeError> {
    ctx.embeddings()
        .ok_or_else(|| NodeError::configuration("No embeddings provider connected"))
}

/// Field names for the whole invocation, read from the first item.
fn resolve_field_names(ctx: &dyn ExecutionContext) -> Result<FieldNames, NodeError> {
    let fields = match ctx.parameter(params::FIELD_NAMES, 0) {
        None | Some(Value::Null) => FieldNames::default(),
        Some(Value::String(raw)) if raw.trim().is_empty() => FieldNames::default(),
        Some(Value::String(raw)) => serde_json::from_str(&raw)
            .map_err(|e| NodeError::configuration(format!("invalid field names: {e}")))?,
        Some(value) => serde_json::from_value(value)
            .map_err(|e| NodeError::configuration(format!("invalid field names: {e}")))?,
    };
    fields
        .validate()
        .map_err(|e| NodeError::configuration(e.to_string()))?;
    Ok(fields)
}

async fn dispatch_execute(
    ctx: &dyn ExecutionContext,
    mode: ExecuteMode,
    embeddings: &dyn Embeddings,
    resolver: &dyn StoreResolver,
) -> Result<Vec<OutputRecord>, NodeError> {
    tracing::debug!(?mode, items = ctx.input_items().len(), "executing");
    match mode {
        ExecuteMode::Load => handle_load(ctx, embeddings, resolver).await,
        ExecuteMode::Insert => {
            let source = ctx
                .document_source()
                .ok_or_else(|| NodeError::configuration("No document input connected"))?;
            handle_insert(ctx, &source, resolver).await
        }
        ExecuteMode::Update => {
            handle_update(ctx, Arc::new(JsonLoader::default()), embeddings, resolver).await
        }
    }
}

async fn dispatch_supply(
    ctx: &dyn ExecutionContext,
    mode: SupplyMode,
    item_index: usize,
    embeddings: Arc<dyn Embeddings>,
    resolver: &dyn StoreResolver,
) -> Result<SupplyData, NodeError> {
    let store = resolver.store_for_item(item_index).await?;
    match mode {
        SupplyMode::Retrieve => Ok(SupplyData::VectorStore(store)),
        SupplyMode::RetrieveAsTool => {
            let name = ctx
                .string_parameter(params::TOOL_NAME, item_index)?
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_TOOL_NAME.to_string());
            let description = ctx
                .string_parameter(params::TOOL_DESCRIPTION, item_index)?
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_TOOL_DESCRIPTION.to_string());
            Ok(SupplyData::Tool(VectorStoreTool {
                name,
                description,
                store,
                embeddings,
                options: SearchOptions::resolve(ctx, item_index)?,
                item_index,
            }))
        }
    }
}

/// Builds an [`OpenSearchVectorStore`] for the index named by each item.
struct OpenSearchResolver<'a> {
    ctx: &'a dyn ExecutionContext,
    factory: &'a ClientFactory,
    embeddings: Arc<dyn Embeddings>,
    fields: FieldNames,
    knn: &'a KnnIndexOptions,
}

#[async_trait]
impl StoreResolver for OpenSearchResolver<'_> {
    async fn store_for_item(&self, item_index: usize) -> Result<Arc<dyn VectorStore>, NodeError> {
        let store: Arc<dyn VectorStore> = Arc::new(self.open_store(item_index).await?);
        Ok(store)
    }
}

impl OpenSearchResolver<'_> {
    async fn open_store(&self, item_index: usize) -> Result<OpenSearchVectorStore, NodeError> {
        let index_name = required_string(self.ctx, params::INDEX_NAME, item_index)?;
        let connection = self.ctx.connection()?;
        let client = self
            .factory
            .get_client(&connection)
            .await
            .map_err(|e| NodeError::vector_store(item_index, e))?;

        Ok(OpenSearchVectorStore::new(
            client,
            Arc::clone(&self.embeddings),
            index_name,
            self.fields.clone(),
        )
        .with_knn_options(self.knn.clone()))
    }
}
