use std::fmt::Write as FmtWrite;

use serde_json::Value;

use crate::models::{OutputFormat, OutputRecord};

pub trait Formatter {
    fn format_records(&self, records: &[OutputRecord]) -> String;
    fn format_search_results(&self, query: &str, results: &[Value]) -> String;
    fn format_indices(&self, indices: &[String]) -> String;
    fn format_status(&self, status: &StatusInfo) -> String;
    fn format_message(&self, message: &str) -> String;
    fn format_error(&self, error: &str) -> String;
}

#[derive(Debug, Clone)]
pub struct StatusInfo {
    pub opensearch_url: String,
    pub opensearch_connected: bool,
    pub document_count: Option<u64>,
    pub opensearch_error: Option<String>,
    pub embedding_url: String,
    pub embedding_healthy: bool,
    pub embedding_model: Option<String>,
}

pub struct TextFormatter;

fn preview(text: &str, limit: usize) -> String {
    let head: String = text.chars().take(limit).collect();
    if text.chars().count() > limit {
        format!("{head}...")
    } else {
        head
    }
}

impl Formatter for TextFormatter {
    fn format_records(&self, records: &[OutputRecord]) -> String {
        if records.is_empty() {
            return "No records.\n".to_string();
        }

        let mut output = String::new();
        for record in records {
            let _ = writeln!(output, "[item {}] {}", record.item_index(), record.json);
        }
        output
    }

    fn format_search_results(&self, query: &str, results: &[Value]) -> String {
        if results.is_empty() {
            return format!("No results found for: {query}\n");
        }

        let mut output = String::new();
        let _ = writeln!(output, "Search results for: \"{query}\"\n");
        for (i, result) in results.iter().enumerate() {
            let score = result["score"].as_f64().unwrap_or_default();
            let _ = writeln!(output, "{}. [Score: {:.3}]", i + 1, score);
            if let Some(metadata) = result["document"].get("metadata") {
                let _ = writeln!(output, "   Metadata: {metadata}");
            }
            let _ = writeln!(output, "   ---");
            let content = result["document"]["pageContent"].as_str().unwrap_or_default();
            for line in preview(content, 200).lines() {
                let _ = writeln!(output, "   {line}");
            }
            let _ = writeln!(output);
        }
        output
    }

    fn format_indices(&self, indices: &[String]) -> String {
        if indices.is_empty() {
            return "No indices found.\n".to_string();
        }

        let mut output = String::new();
        let _ = writeln!(output, "Indices");
        let _ = writeln!(output, "-------");
        for index in indices {
            let _ = writeln!(output, "  {index}");
        }
        output
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "Status");
        let _ = writeln!(output, "------");

        let opensearch = if status.opensearch_connected {
            "[CONNECTED]"
        } else {
            "[DISCONNECTED]"
        };
        let _ = writeln!(output, "OpenSearch:    {opensearch}");
        let _ = writeln!(output, "  URL:         {}", status.opensearch_url);
        if let Some(count) = status.document_count {
            let _ = writeln!(output, "  Documents:   {count}");
        }
        if let Some(ref error) = status.opensearch_error {
            let _ = writeln!(output, "  Error:       {error}");
        }
        let _ = writeln!(output);

        let embedding = if status.embedding_healthy {
            "[RUNNING]"
        } else {
            "[STOPPED]"
        };
        let _ = writeln!(output, "Embeddings:    {embedding}");
        let _ = writeln!(output, "  URL:         {}", status.embedding_url);
        if let Some(ref model) = status.embedding_model {
            let _ = writeln!(output, "  Model:       {model}");
        }
        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("Error: {}\n", error)
    }
}

pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render(&self, json: &Value) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(json)
        } else {
            serde_json::to_string(json)
        };
        rendered.unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string())
    }
}

impl Formatter for JsonFormatter {
    fn format_records(&self, records: &[OutputRecord]) -> String {
        let json = serde_json::to_value(records)
            .unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }));
        self.render(&json)
    }

    fn format_search_results(&self, query: &str, results: &[Value]) -> String {
        self.render(&serde_json::json!({ "query": query, "results": results }))
    }

    fn format_indices(&self, indices: &[String]) -> String {
        self.render(&serde_json::json!({ "indices": indices }))
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        self.render(&serde_json::json!({
            "opensearch": {
                "url": status.opensearch_url,
                "connected": status.opensearch_connected,
                "documents": status.document_count,
                "error": status.opensearch_error,
            },
            "embedding": {
                "url": status.embedding_url,
                "healthy": status.embedding_healthy,
                "model": status.embedding_model,
            }
        }))
    }

    fn format_message(&self, message: &str) -> String {
        serde_json::json!({"message": message}).to_string()
    }

    fn format_error(&self, error: &str) -> String {
        serde_json::json!({"error": error}).to_string()
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
    }
}
