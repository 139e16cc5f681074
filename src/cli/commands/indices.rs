use std::path::Path;

use anyhow::{Context, Result};

use super::load_config;
use crate::cli::output::get_formatter;
use crate::models::OutputFormat;
use crate::node::VectorStoreNode;

pub async fn handle_indices(config_path: Option<&Path>, format: OutputFormat) -> Result<()> {
    let config = load_config(config_path)?;
    let formatter = get_formatter(format);

    let mut indices = VectorStoreNode::new()
        .list_indices(&config.connection)
        .await
        .context("failed to list indices")?;
    indices.retain(|name| !name.starts_with('.'));
    indices.sort();

    println!("{}", formatter.format_indices(&indices).trim_end());
    Ok(())
}
