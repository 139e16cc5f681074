use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_EMBEDDING_URL: &str = "http://localhost:11411";
pub const DEFAULT_OPENSEARCH_URL: &str = "https://localhost:9200";
pub const DEFAULT_TOP_K: u32 = 4;
pub const DEFAULT_NODE_NAME: &str = "OpenSearch Vector Store";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub connection: ConnectionConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub search: SearchConfig,
}

impl Config {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("osvector").join("config.toml"))
    }

    /// Load the default config file if it exists, then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => Self::read(&path)?,
            _ => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load an explicit config file, then apply environment overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::PathError(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        let mut config = Self::read(path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Override file values with `OPENSEARCH_*` / `EMBEDDING_URL` variables.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("OPENSEARCH_URL") {
            self.connection.base_url = url;
        }
        if let Some(username) = lookup("OPENSEARCH_USERNAME") {
            self.connection.username = username;
        }
        if let Some(password) = lookup("OPENSEARCH_PASSWORD") {
            self.connection.password = password;
        }
        if let Some(flag) = lookup("OPENSEARCH_IGNORE_SSL") {
            self.connection.ignore_ssl_issues = matches!(
                flag.trim().to_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        if let Some(url) = lookup("EMBEDDING_URL") {
            self.embedding.url = url;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connection.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "connection.base_url must not be empty".to_string(),
            ));
        }
        if self.embedding.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.batch_size must be at least 1".to_string(),
            ));
        }
        if self.search.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "search.top_k must be at least 1".to_string(),
            ));
        }
        self.index.field_names.validate()
    }
}

/// Credentials and transport settings for the OpenSearch cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default = "default_opensearch_url")]
    pub base_url: String,

    #[serde(default)]
    pub username: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,

    #[serde(default)]
    pub ignore_ssl_issues: bool,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_opensearch_url() -> String {
    DEFAULT_OPENSEARCH_URL.to_string()
}

fn default_timeout() -> u64 {
    120
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            base_url: default_opensearch_url(),
            username: String::new(),
            password: String::new(),
            ignore_ssl_issues: false,
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_url")]
    pub url: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
}

fn default_embedding_url() -> String {
    DEFAULT_EMBEDDING_URL.to_string()
}

fn default_batch_size() -> u32 {
    8
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: default_embedding_url(),
            timeout_secs: default_timeout(),
            batch_size: default_batch_size(),
        }
    }
}

/// Names of the fields holding the vector, the text and the metadata in the index.
///
/// The same mapping has to be used for writes and reads against an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldNames {
    #[serde(default = "default_vector_field")]
    pub vector_field_name: String,

    #[serde(default = "default_text_field")]
    pub text_field_name: String,

    #[serde(default = "default_metadata_field")]
    pub metadata_field_name: String,
}

fn default_vector_field() -> String {
    "vector".to_string()
}

fn default_text_field() -> String {
    "text".to_string()
}

fn default_metadata_field() -> String {
    "metadata".to_string()
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            vector_field_name: default_vector_field(),
            text_field_name: default_text_field(),
            metadata_field_name: default_metadata_field(),
        }
    }
}

impl FieldNames {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let names = [
            &self.vector_field_name,
            &self.text_field_name,
            &self.metadata_field_name,
        ];
        if names.iter().any(|n| n.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "index field names must not be empty".to_string(),
            ));
        }
        if names[0] == names[1] || names[0] == names[2] || names[1] == names[2] {
            return Err(ConfigError::ValidationError(format!(
                "index field names must be distinct (vector: {}, text: {}, metadata: {})",
                names[0], names[1], names[2]
            )));
        }
        Ok(())
    }
}

/// Settings used when the k-NN index has to be created on first write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnnIndexOptions {
    #[serde(default = "default_engine")]
    pub engine: String,

    #[serde(default = "default_space_type")]
    pub space_type: String,

    #[serde(default = "default_m")]
    pub m: u32,

    #[serde(default = "default_ef")]
    pub ef_construction: u32,

    #[serde(default = "default_ef")]
    pub ef_search: u32,

    #[serde(default = "default_shards")]
    pub number_of_shards: u32,

    #[serde(default = "default_replicas")]
    pub number_of_replicas: u32,
}

fn default_engine() -> String {
    "nmslib".to_string()
}

fn default_space_type() -> String {
    "l2".to_string()
}

fn default_m() -> u32 {
    16
}

fn default_ef() -> u32 {
    512
}

fn default_shards() -> u32 {
    5
}

fn default_replicas() -> u32 {
    1
}

impl Default for KnnIndexOptions {
    fn default() -> Self {
        Self {
            engine: default_engine(),
            space_type: default_space_type(),
            m: default_m(),
            ef_construction: default_ef(),
            ef_search: default_ef(),
            number_of_shards: default_shards(),
            number_of_replicas: default_replicas(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub field_names: FieldNames,

    #[serde(default)]
    pub knn: KnnIndexOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_top_k")]
    pub top_k: u32,

    #[serde(default = "default_include_metadata")]
    pub include_metadata: bool,
}

fn default_top_k() -> u32 {
    DEFAULT_TOP_K
}

fn default_include_metadata() -> bool {
    true
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            include_metadata: default_include_metadata(),
        }
    }
}
