use async_trait::async_trait;
use tracing::debug;

use crate::error::{Result, WebScoutError};
use crate::types::{ScrapeRequest, ScrapeResponse, SearchResponse, Timeframe};

/// Transport seam for the WebScout gateway. The HTTP implementation talks to
/// the real provider; tests script this trait directly.
#[async_trait]
pub(crate) trait Gateway: Send + Sync {
    async fn search(
        &self,
        endpoint: &str,
        query: &str,
        max_results: usize,
        timeframe: Option<Timeframe>,
        sites: &[String],
    ) -> Result<SearchResponse>;

    async fn scrape(&self, endpoint: &str, request: &ScrapeRequest) -> Result<ScrapeResponse>;
}

pub(crate) struct HttpGateway {
    client: reqwest::Client,
    api_key: String,
}

impl HttpGateway {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
        }
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn search(
        &self,
        endpoint: &str,
        query: &str,
        max_results: usize,
        timeframe: Option<Timeframe>,
        sites: &[String],
    ) -> Result<SearchResponse> {
        let url = format!("{endpoint}/search");
        let mut params: Vec<(&str, String)> = vec![
            ("query", query.to_string()),
            ("max_results", max_results.to_string()),
        ];
        if let Some(tf) = timeframe {
            params.push(("timeframe", tf.as_param().to_string()));
        }
        if !sites.is_empty() {
            params.push(("sites", sites.join(",")));
        }

        debug!(endpoint, query, ?timeframe, "WebScout search request");

        let resp = self
            .client
            .get(&url)
            .header("X-API-Key", &self.api_key)
            .query(&params)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(WebScoutError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(resp.json().await?)
    }

    async fn scrape(&self, endpoint: &str, request: &ScrapeRequest) -> Result<ScrapeResponse> {
        let url = format!("{endpoint}/scrape");

        debug!(endpoint, urls = request.urls.len(), "WebScout scrape request");

        let resp = self
            .client
            .post(&url)
            .header("X-API-Key", &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(WebScoutError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(resp.json().await?)
    }
}
