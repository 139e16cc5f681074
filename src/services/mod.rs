mod documents;
mod embedding;
mod filter;
mod loaders;
mod splitter;

pub mod opensearch;

pub use documents::{DocumentExtractor, DocumentSource, ProcessedDocuments, process_document};
pub use embedding::{Embeddings, HealthResponse, HttpEmbeddings, InstructionType};
pub use filter::build_metadata_filter;
pub use loaders::{BinaryLoader, JsonLoader, JsonMode};
pub use opensearch::{ClientFactory, OpenSearchClient, OpenSearchVectorStore, VectorStore};
pub use splitter::TextSplitter;
