//! HTTP-backed article search with per-article engagement enrichment.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{ArticleSource, SearchQuery};
use crate::config::ScrapeConfig;
use crate::models::{EngagementStats, RawArticle};
use crate::pipeline::BatchExecutor;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    articles: Vec<RawArticle>,
}

/// Article source speaking to a JSON search service.
///
/// `GET {base}/search?q=&type=&page=` returns `{"articles": [...]}`;
/// `GET {base}/stats?url=` returns `{"reads": n, "likes": n}`.
pub struct HttpArticleSource {
    config: ScrapeConfig,
    http_client: reqwest::Client,
    enrichment: BatchExecutor,
}

impl HttpArticleSource {
    pub fn new(config: ScrapeConfig, enrichment_concurrency: usize) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            config,
            http_client,
            enrichment: BatchExecutor::new(enrichment_concurrency),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let request = self.http_client.get(self.url(path));
        match self.config.api_key {
            Some(ref key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn fetch_stats(&self, article_url: &str) -> Result<EngagementStats> {
        let response = self
            .get("stats")
            .query(&[("url", article_url)])
            .send()
            .await
            .context("Stats request failed")?
            .error_for_status()
            .context("Stats request rejected")?;

        response
            .json::<EngagementStats>()
            .await
            .context("Failed to parse stats response")
    }

    /// Attach engagement stats; missing stats stay at zero.
    async fn enrich(&self, articles: Vec<RawArticle>) -> Vec<RawArticle> {
        let urls: Vec<String> = articles.iter().map(|a| a.url.clone()).collect();
        let stats = self
            .enrichment
            .run(urls, |url| async move { self.fetch_stats(&url).await })
            .await;

        articles
            .into_iter()
            .zip(stats)
            .map(|(mut article, stats)| {
                article.stats = stats.unwrap_or_default();
                article
            })
            .collect()
    }
}

#[async_trait]
impl ArticleSource for HttpArticleSource {
    async fn fetch_articles(&self, query: &SearchQuery, page: u32) -> Result<Vec<RawArticle>> {
        let page_param = page.to_string();
        let response = self
            .get("search")
            .query(&[
                ("q", query.keyword.as_str()),
                ("type", query.search_type.as_str()),
                ("page", page_param.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow::anyhow!("Search timed out after {}s", self.config.timeout_seconds)
                } else if e.is_connect() {
                    anyhow::anyhow!("Cannot connect to search service at {}", self.config.base_url)
                } else {
                    anyhow::anyhow!("Failed to send search request: {}", e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Search API error {}: {}", status, body));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .context("Failed to parse search response")?;

        debug!(page, count = parsed.articles.len(), "Fetched search page");

        Ok(self.enrich(parsed.articles).await)
    }
}
