pub mod claude;
pub mod fallback;

mod unavailable;

pub use claude::Claude;
pub use unavailable::UnavailableInsight;

use anyhow::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::debug;

use delver_common::{
    FeedbackQuestions, Learning, ProcessedResult, ScrapeOutcome, SubQuery, TopUrlCandidate,
};

/// Language-model-backed insight extraction capability.
///
/// Implementations may fail on transport or parse errors; callers always
/// wrap these operations with the deterministic substitutes in [`fallback`],
/// so no failure here ever reaches past the orchestration engine.
#[async_trait]
pub trait InsightModel: Send + Sync {
    /// Generate up to `count` sub-queries advancing `query`, informed by
    /// prior learnings.
    async fn generate_sub_queries(
        &self,
        query: &str,
        count: usize,
        prior_learnings: &[Learning],
    ) -> Result<Vec<SubQuery>>;

    /// Distill a scraped batch into learnings, follow-up questions, and
    /// (optionally) recommended URLs.
    async fn extract_learnings(
        &self,
        query: &str,
        summaries: &[ScrapeOutcome],
        num_learnings: usize,
        num_follow_ups: usize,
        include_top_urls: bool,
    ) -> Result<ProcessedResult>;

    async fn summarize(&self, text: &str) -> Result<String>;

    async fn write_final_report(
        &self,
        query: &str,
        executive_summary: &str,
        learnings: &[Learning],
        language: &str,
    ) -> Result<String>;

    async fn generate_feedback_questions(
        &self,
        query: &str,
        count: usize,
    ) -> Result<FeedbackQuestions>;
}

// --- Prompts ---

const SUB_QUERY_SYSTEM: &str = "\
You are a research planner. \
Generate distinct, targeted web search queries that advance the research topic. \
Give each query a short research goal describing what it should uncover. \
Do NOT generate near-duplicate queries or queries already answered by the prior learnings.";

const EXTRACTION_SYSTEM: &str = "\
You extract insights from scraped web content. \
Return concise, information-dense learnings with source attribution, \
plus follow-up questions that would deepen the research. \
Only use facts present in the provided summaries.";

const SUMMARY_SYSTEM: &str = "\
Condense the provided research material into a short executive summary. \
Keep concrete facts and figures, drop filler.";

const REPORT_SYSTEM: &str = "\
You write final research reports in markdown. \
Structure: title, executive summary, detailed findings with source links, conclusion. \
Write the entire report in the requested language.";

const FEEDBACK_SYSTEM: &str = "\
Generate clarifying questions that would sharpen an ambiguous research request. \
Detect the language the request is written in and ask in that language.";

/// How many prior learnings are surfaced to the query planner.
const MAX_PRIOR_LEARNINGS: usize = 30;

// --- LLM structured output types ---

#[derive(Debug, Deserialize, JsonSchema)]
struct GeneratedQueries {
    queries: Vec<GeneratedQuery>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct GeneratedQuery {
    query: String,
    research_goal: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ExtractedBatch {
    learnings: Vec<ExtractedLearning>,
    #[serde(default)]
    follow_up_questions: Vec<String>,
    #[serde(default)]
    top_urls: Vec<ExtractedTopUrl>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ExtractedLearning {
    insight: String,
    #[serde(default)]
    source_title: String,
    #[serde(default)]
    source_url: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ExtractedTopUrl {
    url: String,
    description: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct GeneratedFeedback {
    questions: Vec<String>,
    #[serde(default)]
    detected_language: String,
}

// --- Claude-backed implementation ---

pub struct ClaudeInsight {
    claude: Claude,
}

impl ClaudeInsight {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            claude: Claude::new(api_key, model),
        }
    }

    pub fn model(&self) -> &str {
        self.claude.model()
    }
}

#[async_trait]
impl InsightModel for ClaudeInsight {
    async fn generate_sub_queries(
        &self,
        query: &str,
        count: usize,
        prior_learnings: &[Learning],
    ) -> Result<Vec<SubQuery>> {
        let user_prompt = format!(
            "Topic: {query}\nNumber of queries: {count}\n\nPrior learnings:\n{}",
            learnings_block(prior_learnings),
        );

        let generated: GeneratedQueries =
            self.claude.extract(SUB_QUERY_SYSTEM, user_prompt).await?;

        debug!(count = generated.queries.len(), "Sub-queries generated");

        Ok(generated
            .queries
            .into_iter()
            .take(count)
            .map(|q| SubQuery {
                query_text: q.query,
                research_goal: q.research_goal,
            })
            .collect())
    }

    async fn extract_learnings(
        &self,
        query: &str,
        summaries: &[ScrapeOutcome],
        num_learnings: usize,
        num_follow_ups: usize,
        include_top_urls: bool,
    ) -> Result<ProcessedResult> {
        let top_url_instruction = if include_top_urls {
            "Also list the most recommendable source URLs with a one-line description each."
        } else {
            "Leave top_urls empty."
        };
        let user_prompt = format!(
            "Query: {query}\nExtract up to {num_learnings} learnings and up to {num_follow_ups} follow-up questions. {top_url_instruction}\n\nSources:\n{}",
            summaries_block(summaries),
        );

        let mut batch: ExtractedBatch =
            self.claude.extract(EXTRACTION_SYSTEM, user_prompt).await?;

        batch.learnings.truncate(num_learnings);
        batch.follow_up_questions.truncate(num_follow_ups);

        Ok(ProcessedResult {
            learnings: batch
                .learnings
                .into_iter()
                .map(|l| Learning {
                    insight: l.insight,
                    source_title: l.source_title,
                    source_url: l.source_url,
                })
                .collect(),
            follow_up_questions: batch.follow_up_questions,
            top_urls: if include_top_urls {
                batch
                    .top_urls
                    .into_iter()
                    .map(|t| TopUrlCandidate {
                        url: t.url,
                        description: t.description,
                    })
                    .collect()
            } else {
                Vec::new()
            },
        })
    }

    async fn summarize(&self, text: &str) -> Result<String> {
        self.claude.chat_completion(SUMMARY_SYSTEM, text).await
    }

    async fn write_final_report(
        &self,
        query: &str,
        executive_summary: &str,
        learnings: &[Learning],
        language: &str,
    ) -> Result<String> {
        let user_prompt = format!(
            "Research query: {query}\nLanguage: {language}\n\nExecutive summary draft:\n{executive_summary}\n\nLearnings:\n{}",
            learnings_block(learnings),
        );
        self.claude.chat_completion(REPORT_SYSTEM, user_prompt).await
    }

    async fn generate_feedback_questions(
        &self,
        query: &str,
        count: usize,
    ) -> Result<FeedbackQuestions> {
        let user_prompt = format!("Research request: {query}\nNumber of questions: {count}");

        let mut generated: GeneratedFeedback =
            self.claude.extract(FEEDBACK_SYSTEM, user_prompt).await?;

        generated.questions.truncate(count);
        if generated.detected_language.is_empty() {
            generated.detected_language = "English".to_string();
        }

        Ok(FeedbackQuestions {
            questions: generated.questions,
            detected_language: generated.detected_language,
        })
    }
}

/// Bullet list of the most recent prior learnings for prompt context.
fn learnings_block(learnings: &[Learning]) -> String {
    if learnings.is_empty() {
        return "(none)".to_string();
    }
    let start = learnings.len().saturating_sub(MAX_PRIOR_LEARNINGS);
    learnings[start..]
        .iter()
        .map(|l| format!("- {}", l.insight))
        .collect::<Vec<_>>()
        .join("\n")
}

/// URL + summary pairs for the extraction prompt.
fn summaries_block(summaries: &[ScrapeOutcome]) -> String {
    summaries
        .iter()
        .filter_map(|outcome| {
            outcome
                .summary
                .as_deref()
                .map(|s| format!("URL: {}\nSummary: {}\n", outcome.url, s))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn learnings_block_caps_at_most_recent() {
        let learnings: Vec<Learning> = (0..40)
            .map(|i| Learning {
                insight: format!("insight {i}"),
                source_title: String::new(),
                source_url: String::new(),
            })
            .collect();
        let block = learnings_block(&learnings);
        assert!(!block.contains("insight 9\n"));
        assert!(block.contains("insight 10"));
        assert!(block.contains("insight 39"));
    }

    #[test]
    fn empty_learnings_block_is_explicit() {
        assert_eq!(learnings_block(&[]), "(none)");
    }

    #[test]
    fn summaries_block_skips_failed_outcomes() {
        let outcomes = vec![
            ScrapeOutcome {
                url: "https://a.example".to_string(),
                summary: Some("Alpha.".to_string()),
                is_query_related: true,
                related_urls: Vec::new(),
            },
            ScrapeOutcome::failed("https://b.example"),
        ];
        let block = summaries_block(&outcomes);
        assert!(block.contains("https://a.example"));
        assert!(!block.contains("https://b.example"));
    }
}
