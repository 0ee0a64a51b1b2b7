//! Query Classifier - Lexical analysis of user queries
//!
//! Provides:
//! - Complexity scoring against indicator phrases
//! - Recency (search) and analysis signals
//! - Query type detection with fixed priority

use crate::models::QueryType;
use serde::{Deserialize, Serialize};

/// Phrases that suggest a query needs more than one reasoning step
const COMPLEXITY_INDICATORS: &[&str] = &[
    "compare", "analyze", "explain why", "what causes", "how does",
    "relationship between", "impact of", "differences", "similarities",
    "pros and cons", "advantages", "disadvantages", "evaluate",
    "synthesize", "summarize", "research", "investigate",
];

const RECENCY_TERMS: &[&str] = &[
    "recent", "current", "latest", "new", "today", "2024", "2025", "now",
];

const ANALYSIS_TERMS: &[&str] = &["analyze", "compare", "evaluate", "synthesize", "explain"];

/// Type keywords in priority order; the first matching category wins
const TYPE_KEYWORDS: &[(QueryType, &[&str])] = &[
    (QueryType::Comparison, &["compare", "vs", "versus", "difference"]),
    (QueryType::Analysis, &["analyze", "analysis", "examine"]),
    (QueryType::Explanation, &["explain", "why", "how", "what causes"]),
    (QueryType::Synthesis, &["synthesize", "combine", "integrate"]),
    (QueryType::Research, &["research", "investigate", "find out"]),
];

/// Classification result for one query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryAnalysis {
    /// Number of indicator phrases present
    pub complexity_score: usize,

    pub needs_multi_step: bool,

    /// Query mentions recency ("latest", "today", ...)
    pub needs_search: bool,

    pub needs_analysis: bool,

    pub query_type: QueryType,
}

/// Keyword-based query classifier
///
/// Matching is case-insensitive substring search, so "how" also matches
/// inside "show". That is accepted.
#[derive(Debug, Clone, Default)]
pub struct QueryClassifier;

impl QueryClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Analyze a query
    pub fn analyze(&self, query: &str) -> QueryAnalysis {
        let query_lower = query.to_lowercase();

        let complexity_score = COMPLEXITY_INDICATORS
            .iter()
            .filter(|indicator| query_lower.contains(*indicator))
            .count();

        QueryAnalysis {
            complexity_score,
            needs_multi_step: complexity_score >= 2,
            needs_search: contains_any(&query_lower, RECENCY_TERMS),
            needs_analysis: contains_any(&query_lower, ANALYSIS_TERMS),
            query_type: Self::detect_type(&query_lower),
        }
    }

    /// Classify the query type only
    pub fn classify(&self, query: &str) -> QueryType {
        Self::detect_type(&query.to_lowercase())
    }

    fn detect_type(query_lower: &str) -> QueryType {
        TYPE_KEYWORDS
            .iter()
            .find(|(_, keywords)| contains_any(query_lower, keywords))
            .map(|(query_type, _)| *query_type)
            .unwrap_or(QueryType::General)
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}
