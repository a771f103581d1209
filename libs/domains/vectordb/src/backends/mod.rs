//! Backend implementations of [`VectorDatabase`](crate::database::VectorDatabase).

pub mod memory;
pub mod milvus;
pub mod weaviate;

pub use memory::InMemoryDatabase;
pub use milvus::{MilvusConfig, MilvusDatabase};
pub use weaviate::{WeaviateConfig, WeaviateDatabase};

use std::fmt::Write;

use serde_json::Value;

use crate::models::{Document, Metadata, SearchResult};

/// Characters of document text shown per hit in a query summary.
const SUMMARY_SNIPPET_CHARS: usize = 100;

/// Render search results as the text block returned by the `query` tool.
pub fn summarize(query: &str, results: &[SearchResult]) -> String {
    if results.is_empty() {
        return format!("No relevant documents found for query '{}'", query);
    }

    let mut summary = format!(
        "Found {} relevant documents for query '{}':\n",
        results.len(),
        query
    );
    for (i, result) in results.iter().enumerate() {
        let text = &result.document.text;
        let snippet = match text.char_indices().nth(SUMMARY_SNIPPET_CHARS) {
            Some((cut, _)) => format!("{}...", &text[..cut]),
            None => text.clone(),
        };
        // Writing into a String cannot fail.
        let _ = writeln!(summary, "{}. {} (Score: {:.2})", i + 1, snippet, result.score);
    }
    summary
}

/// Build a [`Document`] from a loosely typed backend row.
///
/// `metadata` may arrive as an object or as a JSON-encoded string.
pub(crate) fn document_from_row(id: Option<String>, row: &Value) -> Document {
    let field = |name: &str| row.get(name).and_then(Value::as_str).unwrap_or_default().to_string();

    let metadata = match row.get("metadata") {
        Some(Value::Object(map)) => map.clone(),
        Some(Value::String(raw)) => serde_json::from_str::<Metadata>(raw).unwrap_or_default(),
        _ => Metadata::new(),
    };

    Document {
        id,
        url: field("url"),
        text: field("text"),
        metadata,
        vector: None,
    }
}

/// Quote a string for use inside a backend filter expression.
pub(crate) fn quote_filter_value(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hit(text: &str, score: f32) -> SearchResult {
        SearchResult {
            document: Document::new("u", text),
            score,
        }
    }

    #[test]
    fn test_summarize_lists_hits_in_order() {
        let summary = summarize("rust", &[hit("Rust is fast", 0.9), hit("Go is simple", 0.1)]);

        assert_eq!(
            summary,
            "Found 2 relevant documents for query 'rust':\n\
             1. Rust is fast (Score: 0.90)\n\
             2. Go is simple (Score: 0.10)\n"
        );
    }

    #[test]
    fn test_summarize_truncates_long_text_on_char_boundary() {
        let long = "é".repeat(150);
        let summary = summarize("q", &[hit(&long, 0.5)]);

        assert!(summary.contains(&format!("1. {}... (Score: 0.50)", "é".repeat(100))));
    }

    #[test]
    fn test_summarize_empty() {
        assert_eq!(summarize("x", &[]), "No relevant documents found for query 'x'");
    }

    #[test]
    fn test_document_from_row_accepts_string_metadata() {
        let row = json!({"url": "u", "text": "t", "metadata": "{\"lang\":\"en\"}"});
        let doc = document_from_row(Some("1".into()), &row);

        assert_eq!(doc.id.as_deref(), Some("1"));
        assert_eq!(doc.metadata["lang"], "en");
    }

    #[test]
    fn test_quote_filter_value_escapes() {
        assert_eq!(quote_filter_value(r#"a"b\c"#), r#""a\"b\\c""#);
    }
}
