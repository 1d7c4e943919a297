use delver_common::ScrapeOutcome;
use serde::{Deserialize, Serialize};

/// Search timeframe constraint, widened step by step when a query comes back
/// thin. `None` in a ladder position means no timeframe constraint at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeframe {
    Day,
    Week,
    Month,
    Year,
}

impl Timeframe {
    pub fn as_param(&self) -> &'static str {
        match self {
            Timeframe::Day => "day",
            Timeframe::Week => "week",
            Timeframe::Month => "month",
            Timeframe::Year => "year",
        }
    }

    fn broader(&self) -> Option<Timeframe> {
        match self {
            Timeframe::Day => Some(Timeframe::Week),
            Timeframe::Week => Some(Timeframe::Month),
            Timeframe::Month => Some(Timeframe::Year),
            Timeframe::Year => None,
        }
    }
}

/// Query terms that suggest the caller wants fresh material.
const RECENCY_KEYWORDS: [&str; 7] = [
    "latest",
    "recent",
    "news",
    "today",
    "current",
    "this week",
    "this month",
];

/// Heuristic starting timeframe: a recency-flavored query starts narrow,
/// everything else starts at the broader default window.
pub fn initial_timeframe(query: &str) -> Timeframe {
    let lowered = query.to_lowercase();
    if RECENCY_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
        Timeframe::Week
    } else {
        Timeframe::Month
    }
}

/// The ordered fallback ladder: the starting window, each successively
/// broader window, and finally no timeframe constraint.
pub fn widening_ladder(start: Timeframe) -> Vec<Option<Timeframe>> {
    let mut ladder = vec![Some(start)];
    let mut current = start;
    while let Some(broader) = current.broader() {
        ladder.push(Some(broader));
        current = broader;
    }
    ladder.push(None);
    ladder
}

// --- Wire types ---

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub results: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ScrapeRequest {
    pub urls: Vec<String>,
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScrapeResponse {
    #[serde(default)]
    pub scraped: Vec<ScrapedItem>,
}

/// One scraped page as the gateway reports it. The gateway emits Go-style
/// field casing for the analysis fields; `status`/`error` are per-item
/// fetch diagnostics.
#[derive(Debug, Deserialize)]
pub(crate) struct ScrapedItem {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(rename = "Summary", default)]
    pub summary: Option<String>,
    #[serde(rename = "IsQueryRelated", default)]
    pub is_query_related: bool,
    #[serde(rename = "relatedURLs", default)]
    pub related_urls: Vec<String>,
}

impl ScrapedItem {
    /// An item with a fetch error or an empty summary counts as failed for
    /// that URL; relevance and related links only carry over with a summary.
    pub fn into_outcome(self) -> ScrapeOutcome {
        let summary = match self.error {
            Some(_) => None,
            None => self.summary.filter(|s| !s.trim().is_empty()),
        };
        if summary.is_none() {
            return ScrapeOutcome::failed(self.url);
        }
        ScrapeOutcome {
            url: self.url,
            summary,
            is_query_related: self.is_query_related,
            related_urls: self.related_urls,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recency_query_starts_narrow() {
        assert_eq!(initial_timeframe("latest rust releases"), Timeframe::Week);
        assert_eq!(initial_timeframe("Breaking NEWS on fusion"), Timeframe::Week);
        assert_eq!(initial_timeframe("history of the silk road"), Timeframe::Month);
    }

    #[test]
    fn ladder_widens_to_unconstrained() {
        assert_eq!(
            widening_ladder(Timeframe::Month),
            vec![Some(Timeframe::Month), Some(Timeframe::Year), None]
        );
        assert_eq!(
            widening_ladder(Timeframe::Week),
            vec![
                Some(Timeframe::Week),
                Some(Timeframe::Month),
                Some(Timeframe::Year),
                None
            ]
        );
    }

    #[test]
    fn scraped_item_wire_casing() {
        let raw = r#"{
            "url": "https://example.org/a",
            "status": "ok",
            "Summary": "A summary.",
            "IsQueryRelated": true,
            "relatedURLs": ["https://example.org/b"]
        }"#;
        let item: ScrapedItem = serde_json::from_str(raw).expect("valid item");
        let outcome = item.into_outcome();
        assert_eq!(outcome.summary.as_deref(), Some("A summary."));
        assert!(outcome.is_query_related);
        assert_eq!(outcome.related_urls, vec!["https://example.org/b"]);
    }

    #[test]
    fn item_with_error_is_failed() {
        let raw = r#"{
            "url": "https://example.org/broken",
            "status": "error",
            "error": "connection refused",
            "Summary": "stale cache text",
            "IsQueryRelated": true
        }"#;
        let item: ScrapedItem = serde_json::from_str(raw).expect("valid item");
        let outcome = item.into_outcome();
        assert!(outcome.summary.is_none());
        assert!(!outcome.is_query_related);
        assert!(outcome.related_urls.is_empty());
    }

    #[test]
    fn blank_summary_is_failed() {
        let raw = r#"{"url": "https://example.org/x", "status": "ok", "Summary": "  "}"#;
        let item: ScrapedItem = serde_json::from_str(raw).expect("valid item");
        assert!(item.into_outcome().summary.is_none());
    }
}
