use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};
use tracing::{info, warn};
use uuid::Uuid;

use delver_common::{
    CancelToken, DelverError, Learning, ProcessedResult, SubQuery, TopUrlCandidate,
};
use insight_client::{fallback, InsightModel};

use crate::merge;
use crate::policy;
use crate::retrieval::Retriever;
use crate::types::{ResearchOutput, ResearchTask};

/// Search results requested per sub-query.
const MAX_SEARCH_RESULTS: usize = 10;
/// Learnings and follow-up questions requested per extraction.
const NUM_LEARNINGS: usize = 3;
const NUM_FOLLOW_UPS: usize = 3;

/// The recursive tree walker: expands a query into sub-queries, drives
/// retrieval and extraction per sub-query under the concurrency admission
/// policy, recurses on follow-up directions, and merges sibling results
/// bottom-up.
///
/// Collaborator failures never fail a run: retrieval and extraction calls
/// are wrapped with deterministic fallbacks, and any other error inside a
/// branch is caught at the branch boundary as an empty contribution. Only
/// the shared cancellation token unwinds the tree.
pub struct ResearchEngine {
    retriever: Arc<dyn Retriever>,
    insight: Arc<dyn InsightModel>,
    model: String,
    concurrency: usize,
    site_filter: Vec<String>,
}

impl ResearchEngine {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        insight: Arc<dyn InsightModel>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            retriever,
            insight,
            model: model.into(),
            concurrency: policy::DEFAULT_MAX_CONCURRENCY,
            site_filter: Vec::new(),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_site_filter(mut self, sites: Vec<String>) -> Self {
        self.site_filter = sites;
        self
    }

    /// Run one recursion level (and everything below it).
    ///
    /// Boxed because the branch work recurses back into `run`; depth
    /// strictly decreases each call, so the tree is finite.
    pub fn run<'a>(
        &'a self,
        task: ResearchTask,
    ) -> BoxFuture<'a, Result<ResearchOutput, DelverError>> {
        async move {
            if task.cancel.is_cancelled() {
                return Err(DelverError::Cancelled);
            }

            let effective = self
                .concurrency
                .min(policy::max_concurrency_for_model(&self.model))
                .max(1);

            info!(
                query = task.query.as_str(),
                breadth = task.breadth,
                depth = task.depth,
                concurrency = effective,
                "Expanding research level"
            );

            let sub_queries = match self
                .insight
                .generate_sub_queries(&task.query, task.breadth, &task.learnings)
                .await
            {
                Ok(subs) if !subs.is_empty() => {
                    subs.into_iter().take(task.breadth).collect::<Vec<_>>()
                }
                Ok(_) => {
                    warn!(
                        query = task.query.as_str(),
                        "Sub-query generation returned nothing, using templates"
                    );
                    fallback::sub_queries(&task.query, task.breadth)
                }
                Err(e) => {
                    warn!(
                        query = task.query.as_str(),
                        error = %e,
                        "Sub-query generation failed, using templates"
                    );
                    fallback::sub_queries(&task.query, task.breadth)
                }
            };

            let task_ref = &task;
            let branch_results: Vec<Result<ResearchOutput, DelverError>> =
                stream::iter(
                    sub_queries
                        .into_iter()
                        .map(|sub| async move { self.run_branch(task_ref, sub).await }),
                )
                .buffer_unordered(effective)
                .collect()
                .await;

            let mut outputs = Vec::new();
            for result in branch_results {
                match result {
                    Ok(output) => outputs.push(output),
                    // Fail-fast: cancellation discards sibling results and
                    // unwinds through every pending ancestor fan-in.
                    Err(DelverError::Cancelled) => return Err(DelverError::Cancelled),
                    Err(e) => {
                        warn!(error = %e, "Branch failed, contributing empty result");
                        outputs.push(ResearchOutput::default());
                    }
                }
            }

            let mut merged = merge::merge_branch_outputs(outputs);
            if !merged.top_url_candidates.is_empty() {
                merged
                    .top_url_candidates
                    .truncate(merge::recommended_count(&task.query));
            }

            Ok(merged)
        }
        .boxed()
    }

    /// One sub-query's search → scrape → extract → (recurse) unit of work.
    async fn run_branch(
        &self,
        parent: &ResearchTask,
        sub: SubQuery,
    ) -> Result<ResearchOutput, DelverError> {
        if parent.cancel.is_cancelled() {
            return Err(DelverError::Cancelled);
        }

        let urls = self
            .retriever
            .search(&sub.query_text, MAX_SEARCH_RESULTS, &self.site_filter)
            .await
            .map_err(|e| DelverError::Search(e.to_string()))?;

        let outcomes = self
            .retriever
            .scrape(&urls, &sub.query_text)
            .await
            .map_err(|e| DelverError::Scrape(e.to_string()))?;

        let valid: Vec<_> = outcomes.into_iter().filter(|o| o.summary.is_some()).collect();
        let branch_urls: Vec<String> = valid.iter().map(|o| o.url.clone()).collect();

        let mut local_candidates: Vec<TopUrlCandidate> = Vec::new();
        let mut relevant_urls: Vec<String> = Vec::new();
        for outcome in &valid {
            if outcome.is_query_related {
                relevant_urls.push(outcome.url.clone());
                if let Some(summary) = &outcome.summary {
                    local_candidates.push(TopUrlCandidate {
                        url: outcome.url.clone(),
                        description: summary.clone(),
                    });
                }
            }
        }

        let processed = match self
            .insight
            .extract_learnings(&sub.query_text, &valid, NUM_LEARNINGS, NUM_FOLLOW_UPS, true)
            .await
        {
            Ok(processed) => processed,
            Err(e) => {
                warn!(
                    query = sub.query_text.as_str(),
                    error = %e,
                    "Extraction failed, using generic learnings"
                );
                ProcessedResult {
                    learnings: fallback::learnings(&sub.query_text),
                    follow_up_questions: fallback::follow_up_questions(&sub.query_text),
                    top_urls: Vec::new(),
                }
            }
        };

        // Extraction-proposed recommendations win; otherwise keep the
        // relevance-flagged candidates computed from the scrape.
        let candidates = if processed.top_urls.is_empty() {
            local_candidates
        } else {
            processed.top_urls
        };

        let mut all_learnings = parent.learnings.clone();
        all_learnings.extend(processed.learnings);
        let all_visited = merge::merge_url_sets(parent.visited_urls.clone(), branch_urls);

        if parent.depth > 1 {
            let next_task = ResearchTask {
                query: next_query_text(&sub.research_goal, &processed.follow_up_questions),
                breadth: parent.breadth.div_ceil(2).max(1),
                depth: parent.depth - 1,
                learnings: all_learnings,
                visited_urls: all_visited,
                cancel: parent.cancel.clone(),
            };

            // Cancellation from the child propagates uncaught; everything
            // else was already absorbed below this point.
            let child = self.run(next_task).await?;

            let mut top_url_candidates = candidates;
            merge::merge_top_candidates(&mut top_url_candidates, child.top_url_candidates);
            Ok(ResearchOutput {
                learnings: child.learnings,
                visited_urls: child.visited_urls,
                top_url_candidates,
                relevant_urls: merge::merge_url_sets(relevant_urls, child.relevant_urls),
            })
        } else {
            Ok(ResearchOutput {
                learnings: all_learnings,
                visited_urls: all_visited,
                top_url_candidates: candidates,
                relevant_urls,
            })
        }
    }
}

/// Next level's query: the branch's research goal plus every follow-up
/// direction the extraction produced.
fn next_query_text(research_goal: &str, follow_ups: &[String]) -> String {
    let mut text = format!("Previous research goal: {research_goal}");
    if !follow_ups.is_empty() {
        text.push_str("\nFollow-up research directions:");
        for question in follow_ups {
            text.push_str(&format!("\n- {question}"));
        }
    }
    text
}

/// Engine entry point: assemble the root task, run the tree, log the run
/// under a fresh run id.
#[allow(clippy::too_many_arguments)]
pub async fn run_research(
    retriever: Arc<dyn Retriever>,
    insight: Arc<dyn InsightModel>,
    model: &str,
    query: &str,
    breadth: usize,
    depth: usize,
    prior_learnings: Vec<Learning>,
    concurrency: usize,
    site_filter: Vec<String>,
    cancel: CancelToken,
) -> Result<ResearchOutput, DelverError> {
    let run_id = Uuid::new_v4();
    info!(%run_id, query, breadth, depth, "Research run starting");

    let engine = ResearchEngine::new(retriever, insight, model)
        .with_concurrency(concurrency)
        .with_site_filter(site_filter);

    let mut task = ResearchTask::new(query, breadth, depth, cancel);
    task.learnings = prior_learnings;

    let result = engine.run(task).await;
    match &result {
        Ok(output) => info!(
            %run_id,
            learnings = output.learnings.len(),
            visited_urls = output.visited_urls.len(),
            top_urls = output.top_url_candidates.len(),
            "Research run complete"
        ),
        Err(e) => warn!(%run_id, error = %e, "Research run failed"),
    }
    result
}
