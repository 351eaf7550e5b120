//! Scrape collaborator.
//!
//! Sources return one page of raw articles at a time; [`collect_articles`]
//! walks the pages for a job.

mod http;

pub use http::HttpArticleSource;

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::models::{RawArticle, SearchType};

/// What to search for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub keyword: String,
    pub search_type: SearchType,
}

/// A paginated source of raw articles.
#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// Fetch one page (1-indexed). An empty page means no more results.
    async fn fetch_articles(&self, query: &SearchQuery, page: u32) -> Result<Vec<RawArticle>>;
}

/// Fetch up to `max_pages` pages, de-duplicating by source URL.
///
/// A failure on the first page is returned to the caller. A failure on a
/// later page ends pagination and keeps what was already collected.
pub async fn collect_articles(
    source: &dyn ArticleSource,
    query: &SearchQuery,
    max_pages: u32,
) -> Result<Vec<RawArticle>> {
    let mut seen = HashSet::new();
    let mut articles = Vec::new();

    for page in 1..=max_pages.max(1) {
        let batch = match source.fetch_articles(query, page).await {
            Ok(batch) => batch,
            Err(e) if page > 1 => {
                warn!(page, error = %e, "Stopping pagination after page failure");
                break;
            }
            Err(e) => return Err(e),
        };

        if batch.is_empty() {
            break;
        }

        for article in batch {
            if seen.insert(article.url.clone()) {
                articles.push(article);
            }
        }
    }

    info!(
        keyword = %query.keyword,
        count = articles.len(),
        "Collected articles"
    );

    Ok(articles)
}
