use super::StoreResolver;
use crate::context::ExecutionContext;
use crate::error::NodeError;
use crate::models::OutputRecord;
use crate::services::{DocumentSource, process_document};

/// Store the documents of every input item and echo what was stored.
///
/// The cancellation signal is checked before each item; once it is set the
/// records gathered so far are returned and no further item is touched.
pub async fn handle_insert(
    ctx: &dyn ExecutionContext,
    source: &DocumentSource,
    resolver: &dyn StoreResolver,
) -> Result<Vec<OutputRecord>, NodeError> {
    let cancel = ctx.cancel_signal();
    let mut records = Vec::new();

    for (item_index, item) in ctx.input_items().iter().enumerate() {
        if cancel.is_cancelled() {
            tracing::warn!(item_index, "insert cancelled");
            break;
        }

        let processed = process_document(source, item, item_index)
            .await
            .map_err(|e| NodeError::extraction(item_index, e))?;
        records.extend(processed.echo);

        let store = resolver.store_for_item(item_index).await?;
        store
            .add_documents(&processed.documents)
            .await
            .map_err(|e| NodeError::vector_store(item_index, e))?;

        tracing::debug!(item_index, documents = processed.documents.len(), "inserted documents");
    }

    Ok(records)
}
