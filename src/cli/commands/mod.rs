mod config;
mod execute;
mod indices;
mod search;
mod status;

use std::path::Path;

use anyhow::{Context, Result};

use crate::models::Config;

pub use config::ConfigCommand;
pub use execute::ExecuteArgs;
pub use search::SearchArgs;

pub use config::handle_config;
pub use execute::handle_execute;
pub use indices::handle_indices;
pub use search::handle_search;
pub use status::handle_status;

/// Load the config file given on the command line, or the default one.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Config::load().context("failed to load config"),
    }
}
