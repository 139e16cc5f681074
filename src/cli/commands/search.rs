use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;

use super::load_config;
use crate::cli::output::get_formatter;
use crate::context::{StaticContext, params};
use crate::models::{OperationMode, OutputFormat, WorkItem};
use crate::node::{SupplyData, VectorStoreNode};
use crate::services::HttpEmbeddings;

#[derive(Debug, Args)]
pub struct SearchArgs {
    #[arg(required = true, help = "Search query text")]
    pub query: String,

    #[arg(long, short = 'i', help = "Index to search (defaults to index.name)")]
    pub index: Option<String>,

    #[arg(long, short = 'n', help = "Maximum number of results to return")]
    pub limit: Option<u32>,

    #[arg(long, help = "Metadata filter as JSON")]
    pub filter: Option<String>,

    #[arg(long, help = "Leave document metadata out of the results")]
    pub no_metadata: bool,
}

pub async fn handle_search(
    args: SearchArgs,
    config_path: Option<&Path>,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let query = args.query.trim();
    if query.is_empty() {
        anyhow::bail!("search query cannot be empty");
    }

    let config = load_config(config_path)?;
    let formatter = get_formatter(format);
    let start_time = Instant::now();

    let limit = args.limit.unwrap_or(config.search.top_k);
    if limit == 0 {
        anyhow::bail!("limit must be at least 1");
    }
    let index = args
        .index
        .clone()
        .or_else(|| config.index.name.clone())
        .context("no index given; pass --index or set index.name in the config")?;

    let embeddings =
        HttpEmbeddings::new(&config.embedding).context("failed to create embedding client")?;

    let mut ctx = StaticContext::new(vec![WorkItem::default()])
        .with_parameter(params::MODE, Value::from(OperationMode::RetrieveAsTool.as_str()))
        .with_parameter(params::INDEX_NAME, Value::from(index.clone()))
        .with_parameter(params::TOP_K, Value::from(limit))
        .with_parameter(
            params::INCLUDE_METADATA,
            Value::Bool(config.search.include_metadata && !args.no_metadata),
        )
        .with_parameter(params::FIELD_NAMES, serde_json::to_value(&config.index.field_names)?)
        .with_connection(config.connection.clone())
        .with_embeddings(Arc::new(embeddings));
    if let Some(ref filter) = args.filter {
        ctx = ctx.with_parameter(params::METADATA_FILTER, Value::from(filter.clone()));
    }

    if verbose {
        eprintln!("Query: \"{query}\"");
        eprintln!("  Index: {index}");
        eprintln!("  Limit: {limit}");
    }

    let node = VectorStoreNode::new();
    let SupplyData::Tool(tool) = node.supply_data(&ctx, 0).await? else {
        anyhow::bail!("expected a search tool from retrieve-as-tool");
    };
    let results = tool.call(query).await?;

    if verbose {
        eprintln!(
            "  {} results in {}ms",
            results.len(),
            start_time.elapsed().as_millis()
        );
    }
    println!("{}", formatter.format_search_results(query, &results).trim_end());

    Ok(())
}
