use anyhow::Result;
use async_trait::async_trait;

use delver_common::{FeedbackQuestions, Learning, ProcessedResult, ScrapeOutcome, SubQuery};

use crate::fallback;
use crate::InsightModel;

/// Insight capability stand-in for when no model provider is configured.
/// Every operation returns its deterministic fallback and never errors.
pub struct UnavailableInsight;

#[async_trait]
impl InsightModel for UnavailableInsight {
    async fn generate_sub_queries(
        &self,
        query: &str,
        count: usize,
        _prior_learnings: &[Learning],
    ) -> Result<Vec<SubQuery>> {
        Ok(fallback::sub_queries(query, count))
    }

    async fn extract_learnings(
        &self,
        query: &str,
        _summaries: &[ScrapeOutcome],
        _num_learnings: usize,
        _num_follow_ups: usize,
        _include_top_urls: bool,
    ) -> Result<ProcessedResult> {
        Ok(ProcessedResult {
            learnings: fallback::learnings(query),
            follow_up_questions: fallback::follow_up_questions(query),
            top_urls: Vec::new(),
        })
    }

    async fn summarize(&self, text: &str) -> Result<String> {
        Ok(fallback::summary(text))
    }

    async fn write_final_report(
        &self,
        query: &str,
        executive_summary: &str,
        learnings: &[Learning],
        _language: &str,
    ) -> Result<String> {
        Ok(fallback::report(query, executive_summary, learnings))
    }

    async fn generate_feedback_questions(
        &self,
        query: &str,
        count: usize,
    ) -> Result<FeedbackQuestions> {
        Ok(fallback::feedback_questions(query, count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_operation_returns_a_value() {
        let insight = UnavailableInsight;

        let subs = insight.generate_sub_queries("q", 4, &[]).await.unwrap();
        assert_eq!(subs.len(), 4);

        let processed = insight.extract_learnings("q", &[], 3, 3, true).await.unwrap();
        assert_eq!(processed.learnings.len(), 3);
        assert_eq!(processed.follow_up_questions.len(), 3);
        assert!(processed.top_urls.is_empty());

        assert!(!insight.summarize("some text").await.unwrap().is_empty());
        assert!(!insight
            .write_final_report("q", "", &[], "English")
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            insight.generate_feedback_questions("q", 3).await.unwrap().questions.len(),
            3
        );
    }
}
