use std::path::Path;

use anyhow::Result;

use super::load_config;
use crate::cli::output::{StatusInfo, get_formatter};
use crate::models::OutputFormat;
use crate::node::VectorStoreNode;
use crate::services::HttpEmbeddings;

pub async fn handle_status(config_path: Option<&Path>, format: OutputFormat, verbose: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let formatter = get_formatter(format);

    let (opensearch_connected, document_count, opensearch_error) =
        match VectorStoreNode::new().test_connection(&config.connection).await {
            Ok(count) => (true, Some(count), None),
            Err(e) => (false, None, Some(e.to_string())),
        };

    let health = match HttpEmbeddings::new(&config.embedding) {
        Ok(client) => client.health_check().await.ok(),
        Err(_) => None,
    };

    let status = StatusInfo {
        opensearch_url: config.connection.base_url.clone(),
        opensearch_connected,
        document_count,
        opensearch_error,
        embedding_url: config.embedding.url.clone(),
        embedding_healthy: health.is_some(),
        embedding_model: health.and_then(|h| h.model_id),
    };

    print!("{}", formatter.format_status(&status));
    if format == OutputFormat::Json {
        println!();
    }

    if !status.opensearch_connected {
        eprintln!();
        eprintln!("Warning: OpenSearch not reachable or credentials rejected.");
        if verbose {
            eprintln!("      Check connection.base_url, username and password, or OPENSEARCH_* variables.");
        }
    }
    if !status.embedding_healthy {
        eprintln!("Warning: embedding server not reachable at {}", status.embedding_url);
    }

    Ok(())
}
