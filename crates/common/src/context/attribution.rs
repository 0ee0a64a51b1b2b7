//! Source Attribution - Labels the inputs a response appears to draw on
//!
//! Lexical overlap only: a label means terms overlapped, not that the
//! response actually cites the source.

use crate::models::SearchResult;

/// Sentinel returned when no other source matched
pub const KNOWLEDGE_BASE_SOURCE: &str = "LLM Knowledge Base";

/// Strategy for attributing a response to its inputs
pub trait SourceAttributor: Send + Sync {
    /// Ordered source labels for `response`
    ///
    /// `document` is the label of the document supplied to the call, if any.
    fn attribute(
        &self,
        response: &str,
        search_results: &[SearchResult],
        document: Option<&str>,
    ) -> Vec<String>;
}

/// Title-word overlap attributor
#[derive(Debug, Clone, Default)]
pub struct LexicalAttributor;

impl LexicalAttributor {
    /// Title words must be longer than this to count
    const MIN_WORD_CHARS: usize = 4;

    fn title_overlaps(title: &str, response_lower: &str) -> bool {
        title
            .to_lowercase()
            .split_whitespace()
            .filter(|word| word.chars().count() > Self::MIN_WORD_CHARS)
            .any(|word| response_lower.contains(word))
    }
}

impl SourceAttributor for LexicalAttributor {
    fn attribute(
        &self,
        response: &str,
        search_results: &[SearchResult],
        document: Option<&str>,
    ) -> Vec<String> {
        let mut sources = Vec::new();

        if let Some(label) = document {
            sources.push(format!("Document: {}", label));
        }

        let response_lower = response.to_lowercase();
        sources.extend(
            search_results
                .iter()
                .filter(|r| Self::title_overlaps(&r.title, &response_lower))
                .map(|r| format!("Web: {} ({})", r.title, r.url)),
        );

        if sources.is_empty() {
            sources.push(KNOWLEDGE_BASE_SOURCE.to_string());
        }
        sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_inputs_yields_knowledge_base() {
        let sources = LexicalAttributor.attribute("anything at all", &[], None);
        assert_eq!(sources, vec!["LLM Knowledge Base".to_string()]);
    }

    #[test]
    fn test_document_label_comes_first() {
        let results = vec![SearchResult::new("Photosynthesis explained", "https://p.example", "")];
        let sources = LexicalAttributor.attribute(
            "Photosynthesis converts light",
            &results,
            Some("notes.pdf"),
        );
        assert_eq!(
            sources,
            vec![
                "Document: notes.pdf".to_string(),
                "Web: Photosynthesis explained (https://p.example)".to_string(),
            ]
        );
    }

    #[test]
    fn test_short_title_words_are_ignored() {
        let results = vec![SearchResult::new("The Big Cat", "https://c.example", "")];
        let sources = LexicalAttributor.attribute("the big cat sat", &results, None);
        assert_eq!(sources, vec![KNOWLEDGE_BASE_SOURCE.to_string()]);
    }

    #[test]
    fn test_overlap_is_substring_based() {
        let results = vec![SearchResult::new("Quantum", "https://q.example", "")];
        let sources = LexicalAttributor.attribute("Advances in QUANTUMCOMPUTING", &results, None);
        assert_eq!(sources.len(), 1);
        assert!(sources[0].starts_with("Web: Quantum"));
    }
}
