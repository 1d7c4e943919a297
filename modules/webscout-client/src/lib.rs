pub mod error;
pub mod pool;
pub mod types;

mod gateway;

pub use error::WebScoutError;
pub use pool::EndpointPool;
pub use types::{initial_timeframe, widening_ladder, Timeframe};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{info, warn};

use delver_common::{RateGate, ScrapeOutcome};

use gateway::{Gateway, HttpGateway};
use types::{ScrapeRequest, ScrapedItem};

/// Below this many merged results, the search keeps widening its timeframe
/// through the fallback ladder.
const MIN_SEARCH_RESULTS: usize = 3;

/// Client for the WebScout search/scrape gateway.
///
/// Both public operations absorb every provider failure and return a usable
/// value; neither ever surfaces an error to the caller.
pub struct WebScoutClient {
    gateway: Arc<dyn Gateway>,
    pool: Arc<EndpointPool>,
    gate: Arc<RateGate>,
    enabled: bool,
}

impl WebScoutClient {
    pub fn new(pool: Arc<EndpointPool>, gate: Arc<RateGate>, api_key: Option<String>) -> Self {
        let (gateway, enabled) = match api_key {
            Some(key) => (Arc::new(HttpGateway::new(key)) as Arc<dyn Gateway>, true),
            None => {
                warn!("WEBSCOUT_API_KEY not set, retrieval disabled");
                (Arc::new(HttpGateway::new(String::new())) as Arc<dyn Gateway>, false)
            }
        };
        Self {
            gateway,
            pool,
            gate,
            enabled,
        }
    }

    #[cfg(test)]
    fn with_gateway(gateway: Arc<dyn Gateway>, pool: Arc<EndpointPool>, gate: Arc<RateGate>) -> Self {
        Self {
            gateway,
            pool,
            gate,
            enabled: true,
        }
    }

    /// Relevance search. Starts from a heuristic timeframe and widens through
    /// the fallback ladder while the merged result count stays under
    /// threshold; each attempted step's results are union-merged preserving
    /// first-seen order, then truncated to `max_results`. A failed step skips
    /// its contribution; total provider failure yields an empty list.
    pub async fn search(&self, query: &str, max_results: usize, sites: &[String]) -> Vec<String> {
        if !self.enabled {
            return Vec::new();
        }

        let ladder = widening_ladder(initial_timeframe(query));
        let mut seen = HashSet::new();
        let mut merged: Vec<String> = Vec::new();

        for (step, timeframe) in ladder.into_iter().enumerate() {
            if step > 0 && merged.len() >= MIN_SEARCH_RESULTS {
                break;
            }

            self.gate.acquire().await;
            let endpoint = self.pool.next();
            match self
                .gateway
                .search(endpoint, query, max_results, timeframe, sites)
                .await
            {
                Ok(resp) => {
                    for url in resp.results {
                        if seen.insert(url.clone()) {
                            merged.push(url);
                        }
                    }
                }
                Err(e) => {
                    warn!(query, ?timeframe, error = %e, "Search ladder step failed, skipping");
                }
            }
        }

        merged.truncate(max_results);
        info!(query, results = merged.len(), "Search complete");
        merged
    }

    /// Scrape a URL batch with the originating query for relevance scoring.
    ///
    /// One bulk request; a gateway timeout falls back to one request per URL
    /// merged positionally; any other failure marks the whole batch failed.
    /// On success, related URLs reported across outcomes (minus the primary
    /// batch) are fetched in one consolidated secondary call whose outcomes
    /// are merged only for URLs not already present.
    pub async fn scrape(&self, urls: &[String], query: &str) -> Vec<ScrapeOutcome> {
        if urls.is_empty() {
            return Vec::new();
        }
        if !self.enabled {
            return urls.iter().map(|u| ScrapeOutcome::failed(u.clone())).collect();
        }

        let mut outcomes = self.scrape_batch(urls, query).await;

        let primary: HashSet<&str> = urls.iter().map(String::as_str).collect();
        let mut seen = HashSet::new();
        let mut related: Vec<String> = Vec::new();
        for outcome in &outcomes {
            for raw in &outcome.related_urls {
                if primary.contains(raw.as_str()) || !is_fetchable(raw) {
                    continue;
                }
                if seen.insert(raw.clone()) {
                    related.push(raw.clone());
                }
            }
        }

        if !related.is_empty() {
            info!(count = related.len(), "Following related URLs with secondary scrape");
            let secondary = self.scrape_batch(&related, query).await;
            let existing: HashSet<String> = outcomes.iter().map(|o| o.url.clone()).collect();
            for outcome in secondary {
                if !existing.contains(&outcome.url) {
                    outcomes.push(outcome);
                }
            }
        }

        outcomes
    }

    async fn scrape_batch(&self, urls: &[String], query: &str) -> Vec<ScrapeOutcome> {
        self.gate.acquire().await;
        let endpoint = self.pool.next();
        let request = ScrapeRequest {
            urls: urls.to_vec(),
            query: query.to_string(),
        };

        match self.gateway.scrape(endpoint, &request).await {
            Ok(resp) => align_outcomes(urls, resp.scraped),
            Err(e) if e.is_gateway_timeout() => {
                warn!(
                    urls = urls.len(),
                    "Bulk scrape hit gateway timeout, retrying one URL at a time"
                );
                self.scrape_each(urls, query).await
            }
            Err(e) => {
                warn!(urls = urls.len(), error = %e, "Bulk scrape failed, marking batch failed");
                urls.iter().map(|u| ScrapeOutcome::failed(u.clone())).collect()
            }
        }
    }

    /// Per-URL fallback after a bulk gateway timeout. Each request still
    /// rotates the endpoint pool and passes the rate gate; outcomes keep the
    /// input order.
    async fn scrape_each(&self, urls: &[String], query: &str) -> Vec<ScrapeOutcome> {
        let futures = urls.iter().map(|url| async move {
            self.gate.acquire().await;
            let endpoint = self.pool.next();
            let request = ScrapeRequest {
                urls: vec![url.clone()],
                query: query.to_string(),
            };
            match self.gateway.scrape(endpoint, &request).await {
                Ok(resp) => match resp.scraped.into_iter().next() {
                    Some(item) => {
                        let mut outcome = item.into_outcome();
                        if outcome.url.is_empty() {
                            outcome.url = url.clone();
                        }
                        outcome
                    }
                    None => ScrapeOutcome::failed(url.clone()),
                },
                Err(e) => {
                    warn!(url = url.as_str(), error = %e, "Per-URL scrape failed");
                    ScrapeOutcome::failed(url.clone())
                }
            }
        });

        futures::future::join_all(futures).await
    }
}

/// Align response items to the requested batch order; URLs the gateway did
/// not report come back as failed outcomes.
fn align_outcomes(urls: &[String], items: Vec<ScrapedItem>) -> Vec<ScrapeOutcome> {
    let mut by_url: HashMap<String, ScrapeOutcome> = items
        .into_iter()
        .map(|item| {
            let outcome = item.into_outcome();
            (outcome.url.clone(), outcome)
        })
        .collect();

    urls.iter()
        .map(|u| by_url.remove(u).unwrap_or_else(|| ScrapeOutcome::failed(u.clone())))
        .collect()
}

fn is_fetchable(raw: &str) -> bool {
    url::Url::parse(raw)
        .map(|u| u.scheme() == "http" || u.scheme() == "https")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::error::Result;
    use crate::types::{ScrapeResponse, SearchResponse};

    /// Scripted gateway: fixed search tiers, configurable scrape failures,
    /// per-URL related links. Records every call for assertions.
    #[derive(Default)]
    struct StubGateway {
        timeframed_results: Vec<String>,
        unconstrained_results: Vec<String>,
        bulk_504_over: Option<usize>,
        scrape_status: Option<u16>,
        related: HashMap<String, Vec<String>>,
        search_calls: Mutex<Vec<(String, Option<Timeframe>)>>,
        scrape_calls: Mutex<Vec<Vec<String>>>,
    }

    impl StubGateway {
        fn item(&self, url: &str) -> ScrapedItem {
            ScrapedItem {
                url: url.to_string(),
                status: "ok".to_string(),
                error: None,
                summary: Some(format!("Summary of {url}")),
                is_query_related: true,
                related_urls: self.related.get(url).cloned().unwrap_or_default(),
            }
        }
    }

    #[async_trait]
    impl Gateway for StubGateway {
        async fn search(
            &self,
            endpoint: &str,
            _query: &str,
            _max_results: usize,
            timeframe: Option<Timeframe>,
            _sites: &[String],
        ) -> Result<SearchResponse> {
            self.search_calls
                .lock()
                .unwrap()
                .push((endpoint.to_string(), timeframe));
            let results = if timeframe.is_some() {
                self.timeframed_results.clone()
            } else {
                self.unconstrained_results.clone()
            };
            Ok(SearchResponse { results })
        }

        async fn scrape(&self, _endpoint: &str, request: &ScrapeRequest) -> Result<ScrapeResponse> {
            self.scrape_calls.lock().unwrap().push(request.urls.clone());
            if let Some(status) = self.scrape_status {
                return Err(WebScoutError::Api {
                    status,
                    message: "scripted failure".to_string(),
                });
            }
            if let Some(limit) = self.bulk_504_over {
                if request.urls.len() > limit {
                    return Err(WebScoutError::Api {
                        status: 504,
                        message: "gateway timeout".to_string(),
                    });
                }
            }
            Ok(ScrapeResponse {
                scraped: request.urls.iter().map(|u| self.item(u)).collect(),
            })
        }
    }

    fn client_with(stub: Arc<StubGateway>) -> WebScoutClient {
        let pool = Arc::new(EndpointPool::new(vec![
            "https://a.example".to_string(),
            "https://b.example".to_string(),
        ]));
        let gate = Arc::new(RateGate::new(1000, Duration::from_secs(60)));
        WebScoutClient::with_gateway(stub, pool, gate)
    }

    fn urls(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn search_widens_until_threshold_met() {
        let stub = Arc::new(StubGateway {
            timeframed_results: urls(&["https://x.example/1", "https://x.example/2"]),
            unconstrained_results: urls(&[
                "https://x.example/1",
                "https://x.example/2",
                "https://x.example/3",
                "https://x.example/4",
                "https://x.example/5",
            ]),
            ..Default::default()
        });
        let client = client_with(stub.clone());

        let results = client.search("ancient roman aqueducts", 10, &[]).await;

        // Non-recency query: month -> year -> unconstrained, every tier
        // attempted because the first two stay under threshold.
        let calls = stub.search_calls.lock().unwrap();
        assert_eq!(
            calls.iter().map(|(_, tf)| *tf).collect::<Vec<_>>(),
            vec![Some(Timeframe::Month), Some(Timeframe::Year), None]
        );
        // Union of both tiers, first-seen order preserved.
        assert_eq!(results, urls(&[
            "https://x.example/1",
            "https://x.example/2",
            "https://x.example/3",
            "https://x.example/4",
            "https://x.example/5",
        ]));
    }

    #[tokio::test]
    async fn search_stops_at_first_sufficient_tier() {
        let stub = Arc::new(StubGateway {
            timeframed_results: urls(&[
                "https://x.example/1",
                "https://x.example/2",
                "https://x.example/3",
            ]),
            ..Default::default()
        });
        let client = client_with(stub.clone());

        let results = client.search("ancient roman aqueducts", 10, &[]).await;

        assert_eq!(results.len(), 3);
        assert_eq!(stub.search_calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn search_truncates_to_max_results() {
        let stub = Arc::new(StubGateway {
            timeframed_results: urls(&[
                "https://x.example/1",
                "https://x.example/2",
                "https://x.example/3",
                "https://x.example/4",
            ]),
            ..Default::default()
        });
        let client = client_with(stub);

        let results = client.search("ancient roman aqueducts", 2, &[]).await;
        assert_eq!(results, urls(&["https://x.example/1", "https://x.example/2"]));
    }

    #[tokio::test]
    async fn search_rotates_endpoints_round_robin() {
        let stub = Arc::new(StubGateway::default());
        let client = client_with(stub.clone());

        client.search("ancient roman aqueducts", 10, &[]).await;

        let calls = stub.search_calls.lock().unwrap();
        let endpoints: Vec<&str> = calls.iter().map(|(e, _)| e.as_str()).collect();
        assert_eq!(endpoints, vec!["https://a.example", "https://b.example", "https://a.example"]);
    }

    #[tokio::test]
    async fn bulk_504_falls_back_to_per_url_requests() {
        let stub = Arc::new(StubGateway {
            bulk_504_over: Some(1),
            ..Default::default()
        });
        let client = client_with(stub.clone());

        let batch = urls(&["https://x.example/1", "https://x.example/2"]);
        let outcomes = client.scrape(&batch, "aqueducts").await;

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].url, "https://x.example/1");
        assert_eq!(outcomes[1].url, "https://x.example/2");
        assert!(outcomes.iter().all(|o| o.summary.is_some()));

        // One failed bulk attempt, then one call per URL.
        let calls = stub.scrape_calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].len(), 2);
        assert_eq!(calls[1].len(), 1);
        assert_eq!(calls[2].len(), 1);
    }

    #[tokio::test]
    async fn non_timeout_failure_marks_batch_failed() {
        let stub = Arc::new(StubGateway {
            scrape_status: Some(500),
            ..Default::default()
        });
        let client = client_with(stub);

        let batch = urls(&["https://x.example/1", "https://x.example/2"]);
        let outcomes = client.scrape(&batch, "aqueducts").await;

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.summary.is_none() && !o.is_query_related));
    }

    #[tokio::test]
    async fn related_urls_fetched_in_one_secondary_call() {
        let mut related = HashMap::new();
        related.insert(
            "https://x.example/1".to_string(),
            urls(&[
                "https://x.example/2",      // already in primary batch, skipped
                "https://y.example/extra",  // followed
                "ftp://y.example/ignored",  // not http(s), skipped
            ]),
        );
        let stub = Arc::new(StubGateway {
            related,
            ..Default::default()
        });
        let client = client_with(stub.clone());

        let batch = urls(&["https://x.example/1", "https://x.example/2"]);
        let outcomes = client.scrape(&batch, "aqueducts").await;

        let calls = stub.scrape_calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1], urls(&["https://y.example/extra"]));

        let outcome_urls: Vec<&str> = outcomes.iter().map(|o| o.url.as_str()).collect();
        assert_eq!(
            outcome_urls,
            vec!["https://x.example/1", "https://x.example/2", "https://y.example/extra"]
        );
    }

    #[tokio::test]
    async fn missing_credential_degrades_to_empty() {
        let pool = Arc::new(EndpointPool::new(vec!["https://a.example".to_string()]));
        let gate = Arc::new(RateGate::new(1000, Duration::from_secs(60)));
        let client = WebScoutClient::new(pool, gate, None);

        assert!(client.search("anything", 10, &[]).await.is_empty());

        let batch = urls(&["https://x.example/1"]);
        let outcomes = client.scrape(&batch, "anything").await;
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].summary.is_none());
    }
}
