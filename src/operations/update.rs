use std::sync::Arc;

use super::{StoreResolver, UpdateParameters};
use crate::context::ExecutionContext;
use crate::error::NodeError;
use crate::models::OutputRecord;
use crate::services::{DocumentExtractor, DocumentSource, Embeddings, process_document};

pub const SINGLE_DOCUMENT_EXPECTED: &str = "Single document per item expected";

/// Replace the stored record with id `id` by the document extracted from each item.
///
/// Each item has to yield exactly one document. An item that yields none or
/// several fails the whole run before anything is written for it.
pub async fn handle_update(
    ctx: &dyn ExecutionContext,
    extractor: Arc<dyn DocumentExtractor>,
    embeddings: &dyn Embeddings,
    resolver: &dyn StoreResolver,
) -> Result<Vec<OutputRecord>, NodeError> {
    let source = DocumentSource::Extractable(extractor);
    let mut records = Vec::new();

    for (item_index, item) in ctx.input_items().iter().enumerate() {
        let UpdateParameters { id } = UpdateParameters::resolve(ctx, item_index)?;

        let processed = process_document(&source, item, item_index)
            .await
            .map_err(|e| NodeError::extraction(item_index, e))?;
        let documents = processed.documents;
        if documents.len() != 1 {
            return Err(NodeError::validation(item_index, SINGLE_DOCUMENT_EXPECTED));
        }
        records.extend(processed.echo);

        let store = resolver.store_for_item(item_index).await?;

        let texts = vec![documents[0].page_content.clone()];
        let vectors = embeddings
            .embed_documents(&texts)
            .await
            .map_err(|e| NodeError::embedding(item_index, e))?;

        store
            .add_vectors(vectors, &documents, Some(vec![id.clone()]))
            .await
            .map_err(|e| NodeError::vector_store(item_index, e))?;

        tracing::debug!(item_index, id = %id, "updated document");
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ParameterValue, StaticContext, params};
    use crate::models::WorkItem;
    use crate::services::JsonLoader;
    use crate::testing::{FakeEmbeddings, FixedExtractor, FixedResolver, RecordingStore};
    use serde_json::json;

    fn items() -> Vec<WorkItem> {
        vec![
            WorkItem::from_value(json!({ "id": "doc-1", "text": "first" })),
            WorkItem::from_value(json!({ "id": "doc-2", "text": "second" })),
        ]
    }

    fn ctx() -> StaticContext {
        StaticContext::new(items()).with_parameter(params::ID, ParameterValue::parse("$json.id"))
    }

    #[tokio::test]
    async fn test_update_overwrites_by_id() {
        let resolver = FixedResolver::new(RecordingStore::new());
        let embeddings = FakeEmbeddings::new(3);

        let records = handle_update(&ctx(), Arc::new(JsonLoader::default()), &embeddings, &resolver)
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].item_index(), 1);

        let writes = resolver.store.vector_writes();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0].ids, Some(vec!["doc-1".to_string()]));
        assert_eq!(writes[1].ids, Some(vec!["doc-2".to_string()]));
        assert_eq!(writes[0].documents.len(), 1);
        assert_eq!(writes[0].vectors.len(), 1);
        assert_eq!(writes[0].vectors[0].len(), 3);

        let batches = embeddings.document_batches.lock().unwrap().clone();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0], vec![writes[0].documents[0].page_content.clone()]);
    }

    #[tokio::test]
    async fn test_zero_or_many_documents_fail_without_writes() {
        for counts in [vec![0], vec![2]] {
            let resolver = FixedResolver::new(RecordingStore::new());
            let embeddings = FakeEmbeddings::new(2);
            let extractor = Arc::new(FixedExtractor::per_item(counts));

            let err = handle_update(&ctx(), extractor, &embeddings, &resolver)
                .await
                .unwrap_err();

            assert!(matches!(err, NodeError::Validation { item_index: 0, .. }));
            assert!(err.to_string().contains(SINGLE_DOCUMENT_EXPECTED));
            assert!(resolver.store.vector_writes().is_empty());
            assert_eq!(embeddings.batch_count(), 0);
        }
    }

    #[tokio::test]
    async fn test_second_item_failure_keeps_first_write() {
        let resolver = FixedResolver::new(RecordingStore::new());
        let extractor = Arc::new(FixedExtractor::per_item(vec![1, 3]));

        let err = handle_update(&ctx(), extractor, &FakeEmbeddings::new(2), &resolver)
            .await
            .unwrap_err();

        assert_eq!(err.item_index(), Some(1));
        assert_eq!(resolver.store.vector_writes().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_id_is_configuration_error() {
        let ctx = StaticContext::new(items());
        let resolver = FixedResolver::new(RecordingStore::new());

        let err = handle_update(&ctx, Arc::new(JsonLoader::default()), &FakeEmbeddings::new(2), &resolver)
            .await
            .unwrap_err();

        assert!(matches!(err, NodeError::Configuration { item_index: Some(0), .. }));
        assert!(resolver.store.vector_writes().is_empty());
    }

    #[tokio::test]
    async fn test_embedding_failure_carries_item_index() {
        let resolver = FixedResolver::new(RecordingStore::new());
        let err = handle_update(&ctx(), Arc::new(JsonLoader::default()), &FakeEmbeddings::failing(), &resolver)
            .await
            .unwrap_err();
        assert!(matches!(err, NodeError::Embedding { item_index: 0, .. }));
        assert!(resolver.store.vector_writes().is_empty());
    }

    #[tokio::test]
    async fn test_echo_matches_written_document() {
        let resolver = FixedResolver::new(RecordingStore::new());
        let records = handle_update(
            &ctx(),
            Arc::new(FixedExtractor::per_item(vec![1, 1])),
            &FakeEmbeddings::new(2),
            &resolver,
        )
        .await
        .unwrap();

        let writes = resolver.store.vector_writes();
        assert_eq!(records[0].json["pageContent"], "item 0 doc 0");
        assert_eq!(records[0].json["metadata"]["item"], 0);
        assert_eq!(writes[0].documents[0].page_content, "item 0 doc 0");
        assert_eq!(records[1].item_index(), 1);
    }

    #[tokio::test]
    async fn test_unresolvable_store_fails_before_embedding() {
        let resolver = FixedResolver::unresolvable();
        let embeddings = FakeEmbeddings::new(2);

        let err = handle_update(&ctx(), Arc::new(JsonLoader::default()), &embeddings, &resolver)
            .await
            .unwrap_err();

        assert!(matches!(err, NodeError::Configuration { item_index: Some(0), .. }));
        assert_eq!(embeddings.batch_count(), 0);
        assert!(resolver.store.vector_writes().is_empty());
    }
}
