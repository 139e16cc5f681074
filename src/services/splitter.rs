//! Character-window text splitting with overlap.

use serde_json::json;

use crate::models::Document;

/// Splits document text into overlapping chunks at natural break points.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    /// Target chunk size in characters
    chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    overlap: usize,
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self::new(1000, 200)
    }
}

impl TextSplitter {
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
        }
    }

    /// Split a document. Every chunk keeps the source metadata and gains
    /// `loc.lines.from` / `loc.lines.to`.
    pub fn split_document(&self, document: &Document) -> Vec<Document> {
        self.split_text(&document.page_content)
            .into_iter()
            .map(|(content, line_start, line_end)| {
                let mut metadata = document.metadata.clone();
                metadata.insert(
                    "loc".to_string(),
                    json!({ "lines": { "from": line_start, "to": line_end } }),
                );
                Document {
                    page_content: content,
                    metadata,
                }
            })
            .collect()
    }

    /// Split content into chunks with their first and last line numbers.
    pub fn split_text(&self, content: &str) -> Vec<(String, u32, u32)> {
        let chars: Vec<char> = content.chars().collect();
        let total_chars = chars.len();
        let mut chunks = Vec::new();

        if content.trim().is_empty() {
            return chunks;
        }

        let mut line_count = 1u32;
        let mut char_to_line: Vec<u32> = Vec::with_capacity(total_chars);
        for c in &chars {
            char_to_line.push(line_count);
            if *c == '\n' {
                line_count += 1;
            }
        }

        let mut start = 0;
        while start < total_chars {
            let end = (start + self.chunk_size).min(total_chars);
            let adjusted_end = self.find_break_point(&chars, start, end, total_chars);

            let chunk_content: String = chars[start..adjusted_end].iter().collect();
            let line_start = char_to_line.get(start).copied().unwrap_or(1);
            let line_end = char_to_line
                .get(adjusted_end.saturating_sub(1))
                .copied()
                .unwrap_or(line_start);

            if !chunk_content.trim().is_empty() {
                chunks.push((chunk_content, line_start, line_end));
            }

            if adjusted_end >= total_chars {
                break;
            }

            // Overlap is measured back from the actual break, but always advance.
            start = adjusted_end.saturating_sub(self.overlap).max(start + 1);
        }

        chunks
    }

    /// Find a natural break point near the target end position.
    fn find_break_point(&self, chars: &[char], start: usize, target_end: usize, total: usize) -> usize {
        if target_end >= total {
            return total;
        }

        // Look for a natural break point within the last 20% of the chunk
        let search_start = target_end
            .saturating_sub(self.chunk_size / 5)
            .max(start + 1);
        if search_start >= target_end {
            return target_end;
        }
        let search_range = &chars[search_start..target_end];

        // Priority: double newline > single newline > period+space > space
        let mut best_break = None;
        let mut last_newline = None;
        let mut last_sentence = None;
        let mut last_space = None;

        for (i, c) in search_range.iter().enumerate() {
            let pos = search_start + i;
            match c {
                '\n' => {
                    if i > 0 && search_range.get(i - 1) == Some(&'\n') {
                        best_break = Some(pos + 1);
                    }
                    last_newline = Some(pos + 1);
                }
                '.' | '!' | '?' => {
                    if search_range.get(i + 1).is_some_and(|c| c.is_whitespace()) {
                        last_sentence = Some(pos + 1);
                    }
                }
                ' ' | '\t' => {
                    last_space = Some(pos + 1);
                }
                _ => {}
            }
        }

        best_break
            .or(last_newline)
            .or(last_sentence)
            .or(last_space)
            .unwrap_or(target_end)
    }
}
