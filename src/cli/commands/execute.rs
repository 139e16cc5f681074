//! Execute command: runs the node over items read from a file or stdin.

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;

use super::load_config;
use crate::cli::output::get_formatter;
use crate::context::{CancelSignal, ParameterValue, StaticContext, params};
use crate::models::{Config, Document, OutputFormat, WorkItem};
use crate::node::VectorStoreNode;
use crate::services::{
    BinaryLoader, DocumentSource, HttpEmbeddings, JsonLoader, JsonMode, TextSplitter,
};

/// Arguments for the execute command.
///
/// Values starting with `$json.` are read from each item, e.g. `--prompt '$json.question'`.
#[derive(Debug, Args)]
pub struct ExecuteArgs {
    /// Operation mode: load, insert or update
    #[arg(long, short = 'm')]
    pub mode: String,

    /// Path to a JSON or JSONL file of items (use - for stdin). Without it a single empty item is used
    #[arg()]
    pub file: Option<PathBuf>,

    /// Index to operate on (defaults to index.name from the config)
    #[arg(long, short = 'i')]
    pub index: Option<String>,

    /// Search prompt for load
    #[arg(long, short = 'p')]
    pub prompt: Option<String>,

    /// Number of results per load
    #[arg(long, short = 'k')]
    pub top_k: Option<String>,

    /// Leave document metadata out of load results
    #[arg(long)]
    pub no_metadata: bool,

    /// Id of the record to replace in update mode
    #[arg(long)]
    pub id: Option<String>,

    /// Metadata filter as JSON, e.g. '{"category": "pets", "year": {"gte": 2020}}'
    #[arg(long)]
    pub filter: Option<String>,

    /// JSON array of pre-built documents to insert for every item
    #[arg(long, conflicts_with = "binary")]
    pub documents: Option<PathBuf>,

    /// Read each item's text from this binary property instead of its JSON
    #[arg(long)]
    pub binary: Option<String>,

    /// Use only this field of each item's JSON as the document text
    #[arg(long, conflicts_with = "binary")]
    pub field: Option<String>,

    /// JSON pointer selecting text to extract (repeatable)
    #[arg(long = "pointer")]
    pub pointers: Vec<String>,

    /// Split extracted text into chunks of this many characters
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Overlap between chunks in characters
    #[arg(long, default_value_t = 200)]
    pub chunk_overlap: usize,
}

pub async fn handle_execute(
    args: ExecuteArgs,
    config_path: Option<&Path>,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let formatter = get_formatter(format);

    let items = read_items(args.file.as_deref())?;
    let item_count = items.len();
    let embeddings =
        HttpEmbeddings::new(&config.embedding).context("failed to create embedding client")?;

    let cancel = CancelSignal::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, stopping before the next item");
                cancel.cancel();
            }
        })
    };

    let ctx = build_context(&args, &config, items)?
        .with_connection(config.connection.clone())
        .with_embeddings(Arc::new(embeddings))
        .with_cancel_signal(cancel);

    let node = VectorStoreNode::new().with_knn_options(config.index.knn.clone());
    let result = node.execute(&ctx).await;
    watcher.abort();
    let records = result?;

    if verbose {
        eprintln!("{} records from {} items", records.len(), item_count);
    }
    println!("{}", formatter.format_records(&records).trim_end());

    Ok(())
}

/// Map command-line arguments and config defaults onto node parameters.
fn build_context(args: &ExecuteArgs, config: &Config, items: Vec<WorkItem>) -> Result<StaticContext> {
    let mut ctx = StaticContext::new(items)
        .with_parameter(params::MODE, Value::from(args.mode.clone()))
        .with_parameter(
            params::INCLUDE_METADATA,
            Value::Bool(config.search.include_metadata && !args.no_metadata),
        )
        .with_parameter(
            params::FIELD_NAMES,
            serde_json::to_value(&config.index.field_names)
                .context("failed to encode field names")?,
        )
        .with_document_source(document_source(args)?);

    ctx = match args.top_k {
        Some(ref top_k) => ctx.with_parameter(params::TOP_K, ParameterValue::parse(top_k)),
        None => ctx.with_parameter(params::TOP_K, Value::from(config.search.top_k)),
    };

    let index = args.index.as_ref().or(config.index.name.as_ref());
    let optional = [
        (params::INDEX_NAME, index),
        (params::PROMPT, args.prompt.as_ref()),
        (params::ID, args.id.as_ref()),
        (params::METADATA_FILTER, args.filter.as_ref()),
    ];
    for (name, value) in optional {
        if let Some(value) = value {
            ctx = ctx.with_parameter(name, ParameterValue::parse(value));
        }
    }

    Ok(ctx)
}

fn document_source(args: &ExecuteArgs) -> Result<DocumentSource> {
    if let Some(ref path) = args.documents {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read documents from {}", path.display()))?;
        let documents: Vec<Document> =
            serde_json::from_str(&content).context("failed to parse documents JSON array")?;
        return Ok(DocumentSource::prebuilt(documents));
    }

    let splitter = args
        .chunk_size
        .map(|size| TextSplitter::new(size, args.chunk_overlap));

    if let Some(ref property) = args.binary {
        let mut loader = BinaryLoader::new(property.clone());
        if let Some(splitter) = splitter {
            loader = loader.with_splitter(splitter);
        }
        return Ok(DocumentSource::extractor(loader));
    }

    let mode = match args.field {
        Some(ref field) => JsonMode::Field(field.clone()),
        None => JsonMode::AllInputData,
    };
    let mut loader = JsonLoader::new(mode).with_pointers(args.pointers.clone());
    if let Some(splitter) = splitter {
        loader = loader.with_splitter(splitter);
    }
    Ok(DocumentSource::extractor(loader))
}

fn read_items(file: Option<&Path>) -> Result<Vec<WorkItem>> {
    let input = match file {
        None => return Ok(vec![WorkItem::default()]),
        Some(path) if path.to_string_lossy() != "-" => {
            std::fs::read_to_string(path).context("failed to read items file")?
        }
        Some(_) => {
            let mut input = String::new();
            io::stdin()
                .read_to_string(&mut input)
                .context("failed to read stdin")?;
            input
        }
    };
    parse_items(&input)
}

/// Parse items from a JSON array, a single JSON object or JSONL.
fn parse_items(input: &str) -> Result<Vec<WorkItem>> {
    let input = input.trim();

    if input.is_empty() {
        return Ok(Vec::new());
    }

    if input.starts_with('[') {
        let values: Vec<Value> = serde_json::from_str(input).context("failed to parse JSON array")?;
        return Ok(values.into_iter().map(WorkItem::from_value).collect());
    }

    if let Ok(value) = serde_json::from_str::<Value>(input) {
        return Ok(vec![WorkItem::from_value(value)]);
    }

    let mut items = Vec::new();
    for (i, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line)
            .with_context(|| format!("failed to parse JSON at line {}", i + 1))?;
        items.push(WorkItem::from_value(value));
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use crate::context::ExecutionContext;
    use clap::Parser;
    use serde_json::json;
    use std::io::Write;

    fn args(extra: &[&str]) -> ExecuteArgs {
        let mut argv = vec!["osvector", "execute"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Execute(args) => args,
            _ => panic!("expected execute"),
        }
    }

    #[test]
    fn test_parse_items_formats() {
        let array = parse_items(r#"[{"a": 1}, {"a": 2}]"#).unwrap();
        assert_eq!(array.len(), 2);

        let single = parse_items(r#"{"a": 1}"#).unwrap();
        assert_eq!(single.len(), 1);

        let jsonl = parse_items("{\"a\": 1}\n\n{\"a\": 2}\n{\"a\": 3}\n").unwrap();
        assert_eq!(jsonl.len(), 3);
        assert_eq!(jsonl[2].field("a"), Some(&json!(3)));

        assert!(parse_items("   ").unwrap().is_empty());
        assert!(parse_items("{\"a\": 1}\nnot json").is_err());
    }

    #[test]
    fn test_no_file_means_one_empty_item() {
        let items = read_items(None).unwrap();
        assert_eq!(items.len(), 1);
        assert!(items[0].json.is_empty());
    }

    #[test]
    fn test_build_context_maps_arguments() {
        let items = vec![WorkItem::from_value(json!({ "q": "cats" }))];
        let args = args(&["--mode", "load", "--prompt", "$json.q", "--no-metadata"]);
        let config = Config {
            index: crate::models::IndexConfig {
                name: Some("docs".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };

        let ctx = build_context(&args, &config, items).unwrap();

        assert_eq!(ctx.string_parameter(params::MODE, 0).unwrap().as_deref(), Some("load"));
        assert_eq!(ctx.string_parameter(params::PROMPT, 0).unwrap().as_deref(), Some("cats"));
        assert_eq!(ctx.string_parameter(params::INDEX_NAME, 0).unwrap().as_deref(), Some("docs"));
        assert_eq!(ctx.integer_parameter(params::TOP_K, 0).unwrap(), Some(4));
        assert!(!ctx.bool_parameter(params::INCLUDE_METADATA, 0, true).unwrap());
        assert_eq!(ctx.parameter(params::FIELD_NAMES, 0).unwrap()["vector_field_name"], "vector");
        assert_eq!(ctx.parameter(params::ID, 0), None);
    }

    #[test]
    fn test_index_argument_overrides_config() {
        let args = args(&["--mode", "insert", "--index", "other", "--top-k", "7"]);
        let config = Config {
            index: crate::models::IndexConfig {
                name: Some("docs".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };

        let ctx = build_context(&args, &config, vec![WorkItem::default()]).unwrap();
        assert_eq!(ctx.string_parameter(params::INDEX_NAME, 0).unwrap().as_deref(), Some("other"));
        assert_eq!(ctx.integer_parameter(params::TOP_K, 0).unwrap(), Some(7));
    }

    #[test]
    fn test_document_source_selection() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"pageContent": "a"}}, {{"pageContent": "b", "metadata": {{"k": 1}}}}]"#)
            .unwrap();
        let path = file.path().to_string_lossy().to_string();

        let prebuilt = document_source(&args(&["--mode", "insert", "--documents", &path])).unwrap();
        assert!(matches!(prebuilt, DocumentSource::Prebuilt(ref docs) if docs.len() == 2));

        let binary = document_source(&args(&["--mode", "insert", "--binary", "data"])).unwrap();
        assert!(matches!(binary, DocumentSource::Extractable(_)));

        let json = document_source(&args(&["--mode", "insert"])).unwrap();
        assert!(matches!(json, DocumentSource::Extractable(_)));
    }

    #[tokio::test]
    async fn test_field_and_pointer_arguments_reach_the_loader() {
        let args = args(&["--mode", "insert", "--pointer", "/title", "--pointer", "/body"]);
        let DocumentSource::Extractable(extractor) = document_source(&args).unwrap() else {
            panic!("expected an extractor");
        };
        let item = WorkItem::from_value(json!({ "title": "T", "body": "B", "other": "O" }));
        let docs = extractor.process_item(&item, 0).await.unwrap();
        let texts: Vec<&str> = docs.iter().map(|d| d.page_content.as_str()).collect();
        assert_eq!(texts, vec!["T", "B"]);
    }
}
