use serde_json::{Value, json};

use super::{LoadParameters, SearchOptions, StoreResolver};
use crate::context::ExecutionContext;
use crate::error::NodeError;
use crate::models::{OutputRecord, ScoredDocument};
use crate::services::{Embeddings, VectorStore};

/// Embed `query` and return the nearest documents as `{ document, score }`
/// values, in the order the store ranked them.
pub async fn search(
    store: &dyn VectorStore,
    embeddings: &dyn Embeddings,
    query: &str,
    options: &SearchOptions,
    item_index: usize,
) -> Result<Vec<Value>, NodeError> {
    let vector = embeddings
        .embed_query(query)
        .await
        .map_err(|e| NodeError::embedding(item_index, e))?;

    let hits = store
        .similarity_search_vector_with_score(&vector, options.top_k.get(), options.filter.as_ref())
        .await
        .map_err(|e| NodeError::vector_store(item_index, e))?;

    Ok(hits
        .into_iter()
        .map(|hit| search_result(hit, options.include_metadata))
        .collect())
}

fn search_result(hit: ScoredDocument, include_metadata: bool) -> Value {
    let document = if include_metadata {
        json!({ "pageContent": hit.document.page_content, "metadata": hit.document.metadata })
    } else {
        json!({ "pageContent": hit.document.page_content })
    };
    json!({ "document": document, "score": hit.score })
}

/// Run one load for an item.
pub async fn load(
    store: &dyn VectorStore,
    embeddings: &dyn Embeddings,
    parameters: &LoadParameters,
    item_index: usize,
) -> Result<Vec<OutputRecord>, NodeError> {
    let results = search(store, embeddings, &parameters.prompt, &parameters.search, item_index).await?;
    tracing::debug!(item_index, results = results.len(), "loaded documents");
    Ok(results
        .into_iter()
        .map(|json| OutputRecord::new(json, item_index))
        .collect())
}

/// Load for every input item, concatenating results in item order.
pub async fn handle_load(
    ctx: &dyn ExecutionContext,
    embeddings: &dyn Embeddings,
    resolver: &dyn StoreResolver,
) -> Result<Vec<OutputRecord>, NodeError> {
    let mut records = Vec::new();
    for item_index in 0..ctx.input_items().len() {
        let parameters = LoadParameters::resolve(ctx, item_index)?;
        let store = resolver.store_for_item(item_index).await?;
        records.extend(load(store.as_ref(), embeddings, &parameters, item_index).await?);
    }
    Ok(records)
}
