use anyhow::Result;
use async_trait::async_trait;

use delver_common::ScrapeOutcome;
use webscout_client::WebScoutClient;

/// Retrieval seam the engine drives. The production client absorbs every
/// provider failure and always returns `Ok`; test stand-ins may return `Err`
/// to exercise the engine's branch-boundary handling.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn search(&self, query: &str, max_results: usize, sites: &[String])
        -> Result<Vec<String>>;

    async fn scrape(&self, urls: &[String], query: &str) -> Result<Vec<ScrapeOutcome>>;
}

#[async_trait]
impl Retriever for WebScoutClient {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        sites: &[String],
    ) -> Result<Vec<String>> {
        Ok(WebScoutClient::search(self, query, max_results, sites).await)
    }

    async fn scrape(&self, urls: &[String], query: &str) -> Result<Vec<ScrapeOutcome>> {
        Ok(WebScoutClient::scrape(self, urls, query).await)
    }
}
