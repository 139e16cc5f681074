//! Error types for the OpenSearch vector store node.

use thiserror::Error;

/// Errors related to embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to connect to embedding server: {0}")]
    ConnectionError(String),

    #[error("embedding server error: {0}")]
    ServerError(String),

    #[error("embedding request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding timeout")]
    Timeout,
}

/// Errors related to vector store operations.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("failed to connect to OpenSearch: {0}")]
    ConnectionError(String),

    #[error("OpenSearch request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("index error: {0}")]
    IndexError(String),

    #[error("bulk write error: {0}")]
    BulkError(String),

    #[error("search error: {0}")]
    SearchError(String),

    #[error("invalid OpenSearch response: {0}")]
    InvalidResponse(String),

    #[error("mismatched input: {0}")]
    MismatchedInput(String),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),
}

/// Errors raised while turning a work item into documents.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no binary data found for property '{0}'")]
    MissingBinary(String),

    #[error("unsupported mime type: {0}")]
    UnsupportedMimeType(String),

    #[error("failed to decode binary data: {0}")]
    Decode(String),

    #[error("invalid JSON input: {0}")]
    InvalidJson(String),
}

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    PathError(String),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Errors raised by the node while running an operation.
///
/// Collaborator failures keep the original error as their source and record
/// the index of the item being processed when they surfaced.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("{message}")]
    Configuration {
        item_index: Option<usize>,
        message: String,
    },

    #[error("{message} (item {item_index})")]
    Validation { item_index: usize, message: String },

    #[error("embedding failed for item {item_index}: {source}")]
    Embedding {
        item_index: usize,
        #[source]
        source: EmbeddingError,
    },

    #[error("vector store failed for item {item_index}: {source}")]
    VectorStore {
        item_index: usize,
        #[source]
        source: VectorStoreError,
    },

    #[error("document extraction failed for item {item_index}: {source}")]
    Extraction {
        item_index: usize,
        #[source]
        source: ExtractError,
    },
}

impl NodeError {
    pub fn configuration(message: impl Into<String>) -> Self {
        NodeError::Configuration {
            item_index: None,
            message: message.into(),
        }
    }

    pub fn item_configuration(item_index: usize, message: impl Into<String>) -> Self {
        NodeError::Configuration {
            item_index: Some(item_index),
            message: message.into(),
        }
    }

    pub fn validation(item_index: usize, message: impl Into<String>) -> Self {
        NodeError::Validation {
            item_index,
            message: message.into(),
        }
    }

    pub fn embedding(item_index: usize, source: EmbeddingError) -> Self {
        NodeError::Embedding { item_index, source }
    }

    pub fn vector_store(item_index: usize, source: VectorStoreError) -> Self {
        NodeError::VectorStore { item_index, source }
    }

    pub fn extraction(item_index: usize, source: ExtractError) -> Self {
        NodeError::Extraction { item_index, source }
    }

    /// Index of the item that was being processed, if the error is item scoped.
    pub fn item_index(&self) -> Option<usize> {
        match self {
            NodeError::Configuration { item_index, .. } => *item_index,
            NodeError::Validation { item_index, .. }
            | NodeError::Embedding { item_index, .. }
            | NodeError::VectorStore { item_index, .. }
            | NodeError::Extraction { item_index, .. } => Some(*item_index),
        }
    }
}

/// A [`NodeError`] with the identity of the node and mode that raised it.
#[derive(Debug, Error)]
#[error("{node} [{mode}]: {source}")]
pub struct ExecutionError {
    pub node: String,
    pub mode: String,
    #[source]
    pub source: NodeError,
}

impl ExecutionError {
    pub fn new(node: impl Into<String>, mode: impl Into<String>, source: NodeError) -> Self {
        Self {
            node: node.into(),
            mode: mode.into(),
            source,
        }
    }
}
