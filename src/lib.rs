pub mod cli;
pub mod context;
pub mod error;
pub mod models;
pub mod node;
pub mod operations;
pub mod services;

#[cfg(test)]
mod testing;

pub use cli::{Cli, Commands};
pub use context::{CancelSignal, ExecutionContext, StaticContext};
pub use error::{ExecutionError, NodeError};
pub use models::{Config, OutputFormat};
pub use node::{SupplyData, VectorStoreNode, VectorStoreTool};
