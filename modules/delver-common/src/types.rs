use serde::{Deserialize, Serialize};

/// One fan-out unit at a recursion level. Produced by insight extraction,
/// consumed immediately by retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubQuery {
    pub query_text: String,
    pub research_goal: String,
}

/// Atomic unit of extracted knowledge with its source attribution.
/// Immutable once created; accumulated by concatenation across the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Learning {
    pub insight: String,
    pub source_title: String,
    pub source_url: String,
}

/// Recommendation candidate. Deduplicated by URL with last-write-wins
/// semantics when sibling branches merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopUrlCandidate {
    pub url: String,
    pub description: String,
}

/// Result of scraping one URL. A missing summary marks the scrape as failed
/// for that URL; `is_query_related` drives both learning extraction and
/// secondary relevance fetches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeOutcome {
    pub url: String,
    pub summary: Option<String>,
    pub is_query_related: bool,
    pub related_urls: Vec<String>,
}

impl ScrapeOutcome {
    /// A failed outcome: no summary, not related, no links.
    pub fn failed(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            summary: None,
            is_query_related: false,
            related_urls: Vec::new(),
        }
    }
}

/// Learnings and follow-up directions extracted from one sub-query's
/// scraped batch.
#[derive(Debug, Clone, Default)]
pub struct ProcessedResult {
    pub learnings: Vec<Learning>,
    pub follow_up_questions: Vec<String>,
    pub top_urls: Vec<TopUrlCandidate>,
}

/// Clarifying questions generated before a run starts.
#[derive(Debug, Clone)]
pub struct FeedbackQuestions {
    pub questions: Vec<String>,
    pub detected_language: String,
}
