mod config;
mod document;
mod filter;
mod format;
mod item;
mod mode;

pub use config::{
    Config, ConnectionConfig, DEFAULT_EMBEDDING_URL, DEFAULT_NODE_NAME, DEFAULT_OPENSEARCH_URL,
    DEFAULT_TOP_K, EmbeddingConfig, FieldNames, IndexConfig, KnnIndexOptions, SearchConfig,
};
pub use document::{Document, ScoredDocument};
pub use filter::{FilterCondition, MetadataFilter, RangeBounds};
pub use format::OutputFormat;
pub use item::{BinaryData, OutputRecord, PairedItem, WorkItem};
pub use mode::{ExecuteMode, OperationMode, SupplyMode};
