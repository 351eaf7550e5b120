//! Fakes shared by the unit tests.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::ai::{ChatMessage, CompletionClient};
use crate::models::RawArticle;
use crate::scrape::{ArticleSource, SearchQuery};

type Handler = dyn Fn(&[ChatMessage]) -> Result<String> + Send + Sync;

/// Completion client answering from a closure and counting calls.
pub struct ScriptedAi {
    handler: Box<Handler>,
    calls: AtomicUsize,
}

impl ScriptedAi {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&[ChatMessage]) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionClient for ScriptedAi {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        (self.handler)(&messages)
    }
}

/// Source returning one page of articles, one per slug.
pub struct FixedSource {
    articles: Vec<RawArticle>,
}

#[async_trait]
impl ArticleSource for FixedSource {
    async fn fetch_articles(&self, _query: &SearchQuery, page: u32) -> Result<Vec<RawArticle>> {
        Ok(if page == 1 {
            self.articles.clone()
        } else {
            Vec::new()
        })
    }
}

pub fn fixed_source(slugs: &[&str]) -> Arc<dyn ArticleSource> {
    fixed_source_with(
        slugs
            .iter()
            .map(|slug| RawArticle {
                title: format!("Article {}", slug),
                url: format!("https://source.example.com/{}", slug),
                digest: format!("Digest {}", slug),
                content: format!("<p>Body of {}</p>", slug),
                ..RawArticle::default()
            })
            .collect(),
    )
}

pub fn fixed_source_with(articles: Vec<RawArticle>) -> Arc<dyn ArticleSource> {
    Arc::new(FixedSource { articles })
}

struct FailingSource {
    message: String,
}

#[async_trait]
impl ArticleSource for FailingSource {
    async fn fetch_articles(&self, _query: &SearchQuery, _page: u32) -> Result<Vec<RawArticle>> {
        Err(anyhow::anyhow!(self.message.clone()))
    }
}

pub fn failing_source(message: &str) -> Arc<dyn ArticleSource> {
    Arc::new(FailingSource {
        message: message.to_string(),
    })
}

pub fn summary_json(text: &str) -> String {
    serde_json::json!({
        "summary": text,
        "keyPoints": ["point"],
        "keywords": ["keyword"],
        "highlights": [],
        "contentType": "review",
    })
    .to_string()
}

pub fn insights_json(titles: &[&str]) -> String {
    let insights: Vec<_> = titles
        .iter()
        .map(|title| {
            serde_json::json!({
                "title": title,
                "description": "description",
                "evidence": "evidence",
                "suggestedTopics": ["topic"],
                "relatedArticles": [],
            })
        })
        .collect();
    serde_json::json!({ "insights": insights }).to_string()
}
