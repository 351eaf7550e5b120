//! Multi-platform publishing.
//!
//! Each (article, platform) pair moves from unpublished to either success or
//! failure. Preconditions are checked before the adapter is touched, and
//! content is reshaped for the platform's format on the way out.

mod adapter;
mod platform;
pub mod transform;

pub use adapter::{AdapterFailure, HttpPlatformAdapter, PlatformAdapter, PublishPayload, PublishResponse};
pub use platform::{ContentFormat, Platform, PlatformProfile};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{resolve, EnvDefaults, PlatformSettings, StoredOverrides};
use crate::error::{PipelineError, PipelineResult};
use crate::models::{
    Article, ArticleId, PlatformPublishStatus, PlatformResult,
};
use crate::store::Store;

/// Per-call publish options.
#[derive(Debug, Clone, Default)]
pub struct PublishParams {
    /// The caller's saved settings, resolved against the environment defaults.
    pub overrides: StoredOverrides,
}

/// Returned when a platform accepts an article.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishReceipt {
    pub article_id: ArticleId,
    pub platform: Platform,
    pub external_ref: String,
    pub published_at: DateTime<Utc>,
}

pub struct Publisher {
    store: Arc<dyn Store>,
    adapters: HashMap<Platform, Arc<dyn PlatformAdapter>>,
    defaults: EnvDefaults,
}

impl Publisher {
    pub fn new(store: Arc<dyn Store>, defaults: EnvDefaults) -> Self {
        Self {
            store,
            adapters: HashMap::new(),
            defaults,
        }
    }

    /// Register the adapter used for a platform.
    pub fn with_adapter(mut self, platform: Platform, adapter: Arc<dyn PlatformAdapter>) -> Self {
        self.adapters.insert(platform, adapter);
        self
    }

    /// Register one adapter for every supported platform.
    pub fn with_shared_adapter(mut self, adapter: Arc<dyn PlatformAdapter>) -> Self {
        for platform in Platform::ALL {
            self.adapters.insert(platform, adapter.clone());
        }
        self
    }

    /// Store a manually written draft with no owning job.
    pub async fn create_draft(
        &self,
        title: &str,
        html: &str,
        cover_image: Option<String>,
    ) -> PipelineResult<Article> {
        let title = title.trim();
        if title.is_empty() {
            return Err(PipelineError::Validation("title must not be empty".to_string()));
        }

        let mut article = Article::draft(title, html);
        article.cover_image = cover_image.filter(|c| !c.trim().is_empty());
        article.images = article.cover_image.iter().cloned().collect();

        self.store.save_article(article.clone()).await?;
        info!(article_id = %article.id, "Draft created");
        Ok(article)
    }

    /// Publish one article to one platform.
    ///
    /// A failed precondition returns before any adapter call. An adapter
    /// failure is recorded on the article and returned as-is; the article's
    /// global status is only changed by a success.
    pub async fn publish(
        &self,
        article_id: ArticleId,
        platform: Platform,
        params: PublishParams,
    ) -> PipelineResult<PublishReceipt> {
        let article = self
            .store
            .get_article(article_id)
            .await?
            .ok_or_else(|| PipelineError::not_found("article", article_id))?;

        let effective = resolve(&self.defaults, &params.overrides);
        let settings = effective.platform(platform);

        let adapter = self.adapters.get(&platform).ok_or_else(|| {
            precondition(platform, "no adapter registered for this platform")
        })?;
        check_preconditions(&article, platform, settings)?;

        let payload = build_payload(&article, platform, settings);
        let outcome = adapter.publish(&payload, settings).await;

        // Only this platform's entry is written back; concurrent publishes
        // of the same article to other platforms keep their results.
        let now = Utc::now();
        match outcome {
            Ok(response) => {
                let result = PlatformResult {
                    status: PlatformPublishStatus::Success,
                    published_at: Some(now),
                    external_ref: Some(response.external_ref.clone()),
                    error: None,
                };
                self.store
                    .record_publish(article_id, platform.as_str(), result, true)
                    .await?;

                info!(article_id = %article_id, platform = %platform, external_ref = %response.external_ref, "Article published");
                Ok(PublishReceipt {
                    article_id,
                    platform,
                    external_ref: response.external_ref,
                    published_at: now,
                })
            }
            Err(failure) => {
                let result = PlatformResult {
                    status: PlatformPublishStatus::Failed,
                    published_at: None,
                    external_ref: None,
                    error: Some(failure.to_string()),
                };
                self.store
                    .record_publish(article_id, platform.as_str(), result, false)
                    .await?;

                warn!(article_id = %article_id, platform = %platform, code = %failure.code, "Publish rejected: {}", failure.message);
                Err(PipelineError::upstream(failure.code, failure.message))
            }
        }
    }
}

fn precondition(platform: Platform, reason: &str) -> PipelineError {
    PipelineError::Precondition {
        platform: platform.to_string(),
        reason: reason.to_string(),
    }
}

fn check_preconditions(
    article: &Article,
    platform: Platform,
    settings: &PlatformSettings,
) -> PipelineResult<()> {
    let profile = platform.profile();

    if article.title.trim().is_empty() {
        return Err(precondition(platform, "title is empty"));
    }
    if transform::html_to_plain_text(&article.content).is_empty() {
        return Err(precondition(platform, "content is empty"));
    }
    if profile.requires_cover
        && article
            .cover_image
            .as_deref()
            .map_or(true, |c| c.trim().is_empty())
    {
        return Err(precondition(platform, "cover image required"));
    }
    if !settings.is_configured() {
        return Err(precondition(platform, "endpoint and api key must be configured"));
    }
    Ok(())
}

fn build_payload(article: &Article, platform: Platform, settings: &PlatformSettings) -> PublishPayload {
    let profile = platform.profile();

    let title = match profile.title_limit {
        Some(limit) => article.title.trim().chars().take(limit).collect(),
        None => article.title.trim().to_string(),
    };
    let content = match profile.format {
        ContentFormat::PlainText => transform::html_to_plain_text(&article.content),
        ContentFormat::RichHtml => transform::render_styled_html(&article.content),
    };

    PublishPayload {
        platform,
        title,
        content,
        digest: article.digest.clone(),
        cover_image: article.cover_image.clone(),
        images: article.images.clone(),
        author: settings.author.clone().or_else(|| article.author.clone()),
        source_url: article.source_url.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, PlatformOverride};
    use crate::models::ArticleStatus;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Adapter recording every payload and answering from a queue.
    struct RecordingAdapter {
        payloads: Mutex<Vec<PublishPayload>>,
        replies: Mutex<Vec<Result<PublishResponse, AdapterFailure>>>,
    }

    impl RecordingAdapter {
        fn replying(replies: Vec<Result<PublishResponse, AdapterFailure>>) -> Arc<Self> {
            Arc::new(Self {
                payloads: Mutex::new(Vec::new()),
                replies: Mutex::new(replies.into_iter().rev().collect()),
            })
        }

        fn calls(&self) -> usize {
            self.payloads.lock().unwrap().len()
        }

        fn last_payload(&self) -> PublishPayload {
            self.payloads.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl PlatformAdapter for RecordingAdapter {
        async fn publish(
            &self,
            payload: &PublishPayload,
            _settings: &PlatformSettings,
        ) -> Result<PublishResponse, AdapterFailure> {
            self.payloads.lock().unwrap().push(payload.clone());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(AdapterFailure::new("exhausted", "no scripted reply")))
        }
    }

    /// Adapter that takes a while to answer, echoing the platform back.
    struct SlowAdapter;

    #[async_trait]
    impl PlatformAdapter for SlowAdapter {
        async fn publish(
            &self,
            payload: &PublishPayload,
            _settings: &PlatformSettings,
        ) -> Result<PublishResponse, AdapterFailure> {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(PublishResponse {
                external_ref: format!("{}-ref", payload.platform),
            })
        }
    }

    fn ok(external_ref: &str) -> Result<PublishResponse, AdapterFailure> {
        Ok(PublishResponse {
            external_ref: external_ref.to_string(),
        })
    }

    fn configured_defaults() -> EnvDefaults {
        let mut config = Config::default();
        for platform in Platform::ALL {
            let settings = config.platforms.get_mut(platform);
            settings.endpoint = format!("https://publish.example.com/{}", platform);
            settings.api_key = Some("env-key".to_string());
        }
        config.env_defaults()
    }

    fn publisher_with(
        adapter: Arc<RecordingAdapter>,
        defaults: EnvDefaults,
    ) -> (Arc<MemoryStore>, Publisher) {
        let store = Arc::new(MemoryStore::new());
        let publisher = Publisher::new(store.clone(), defaults).with_shared_adapter(adapter);
        (store, publisher)
    }

    #[tokio::test]
    async fn test_missing_cover_fails_before_adapter_call() {
        let adapter = RecordingAdapter::replying(vec![ok("never")]);
        let (store, publisher) = publisher_with(adapter.clone(), configured_defaults());
        let draft = publisher
            .create_draft("No cover", "<p>Body</p>", None)
            .await
            .unwrap();

        let err = publisher
            .publish(draft.id, Platform::Wechat, PublishParams::default())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Precondition { .. }));
        assert_eq!(adapter.calls(), 0);
        let stored = store.get_article(draft.id).await.unwrap().unwrap();
        assert!(stored.published_platforms.is_empty());
        assert_eq!(stored.status, ArticleStatus::Draft);
    }

    #[tokio::test]
    async fn test_platform_without_adapter_fails_precondition() {
        let adapter = RecordingAdapter::replying(vec![ok("never")]);
        let publisher = Publisher::new(Arc::new(MemoryStore::new()), configured_defaults())
            .with_adapter(Platform::Webhook, adapter.clone());
        let draft = publisher
            .create_draft("Title", "<p>Body</p>", Some("https://img/c.png".to_string()))
            .await
            .unwrap();

        let err = publisher
            .publish(draft.id, Platform::Wechat, PublishParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Precondition { .. }));
        assert_eq!(adapter.calls(), 0);
    }

    #[tokio::test]
    async fn test_unconfigured_platform_fails_before_adapter_call() {
        let adapter = RecordingAdapter::replying(vec![ok("never")]);
        let (_store, publisher) = publisher_with(adapter.clone(), EnvDefaults::default());
        let draft = publisher
            .create_draft("Title", "<p>Body</p>", None)
            .await
            .unwrap();

        let err = publisher
            .publish(draft.id, Platform::Webhook, PublishParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Precondition { .. }));
        assert_eq!(adapter.calls(), 0);
    }

    #[tokio::test]
    async fn test_stored_overrides_supply_missing_settings() {
        let adapter = RecordingAdapter::replying(vec![ok("hook-1")]);
        let (_store, publisher) = publisher_with(adapter.clone(), EnvDefaults::default());
        let draft = publisher
            .create_draft("Title", "<p>Body</p>", None)
            .await
            .unwrap();

        let mut overrides = StoredOverrides::default();
        overrides.platforms.insert(
            Platform::Webhook,
            PlatformOverride {
                endpoint: Some("https://hooks.example.com".to_string()),
                api_key: Some("user-key".to_string()),
                author: Some("Desk".to_string()),
            },
        );

        let receipt = publisher
            .publish(draft.id, Platform::Webhook, PublishParams { overrides })
            .await
            .unwrap();
        assert_eq!(receipt.external_ref, "hook-1");
        assert_eq!(adapter.last_payload().author.as_deref(), Some("Desk"));
    }

    #[tokio::test]
    async fn test_success_marks_article_published() {
        let adapter = RecordingAdapter::replying(vec![ok("media-1")]);
        let (store, publisher) = publisher_with(adapter.clone(), configured_defaults());
        let draft = publisher
            .create_draft(
                "Weekly notes",
                "<h2>Intro</h2><p>Hello</p>",
                Some("https://img.example.com/c.png".to_string()),
            )
            .await
            .unwrap();

        let receipt = publisher
            .publish(draft.id, Platform::Wechat, PublishParams::default())
            .await
            .unwrap();

        assert_eq!(receipt.external_ref, "media-1");
        let stored = store.get_article(draft.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ArticleStatus::Published);
        let entry = &stored.published_platforms["wechat"];
        assert_eq!(entry.status, PlatformPublishStatus::Success);
        assert_eq!(entry.external_ref.as_deref(), Some("media-1"));
        assert_eq!(entry.published_at, Some(receipt.published_at));

        let payload = adapter.last_payload();
        assert!(payload.content.contains("<h2 style="));
        assert_eq!(payload.images, vec!["https://img.example.com/c.png".to_string()]);
    }

    #[tokio::test]
    async fn test_publish_twice_overwrites_platform_result() {
        let adapter = RecordingAdapter::replying(vec![ok("first"), ok("second")]);
        let (store, publisher) = publisher_with(adapter.clone(), configured_defaults());
        let draft = publisher
            .create_draft("Again", "<p>Body</p>", None)
            .await
            .unwrap();

        let first = publisher
            .publish(draft.id, Platform::Webhook, PublishParams::default())
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = publisher
            .publish(draft.id, Platform::Webhook, PublishParams::default())
            .await
            .unwrap();

        // No re-publish guard: both calls reach the adapter.
        assert_eq!(adapter.calls(), 2);
        let stored = store.get_article(draft.id).await.unwrap().unwrap();
        assert_eq!(stored.published_platforms.len(), 1);
        let entry = &stored.published_platforms["webhook"];
        assert_eq!(entry.external_ref.as_deref(), Some("second"));
        assert_eq!(entry.published_at, Some(second.published_at));
        assert!(second.published_at > first.published_at);
    }

    #[tokio::test]
    async fn test_adapter_failure_is_returned_verbatim() {
        let adapter =
            RecordingAdapter::replying(vec![Err(AdapterFailure::new("40007", "invalid media_id"))]);
        let (store, publisher) = publisher_with(adapter.clone(), configured_defaults());
        let draft = publisher
            .create_draft("Broken", "<p>Body</p>", Some("https://img/c.png".to_string()))
            .await
            .unwrap();

        let err = publisher
            .publish(draft.id, Platform::Wechat, PublishParams::default())
            .await
            .unwrap_err();

        match err {
            PipelineError::Upstream { code, message } => {
                assert_eq!(code, "40007");
                assert_eq!(message, "invalid media_id");
            }
            other => panic!("expected upstream error, got {:?}", other),
        }
        assert_eq!(adapter.calls(), 1);

        let stored = store.get_article(draft.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ArticleStatus::Draft);
        assert_eq!(
            stored.published_platforms["wechat"].status,
            PlatformPublishStatus::Failed
        );
    }

    #[tokio::test]
    async fn test_overlapping_publishes_keep_every_platform_result() {
        let store = Arc::new(MemoryStore::new());
        let publisher = Publisher::new(store.clone(), configured_defaults())
            .with_shared_adapter(Arc::new(SlowAdapter));
        let draft = publisher
            .create_draft("Shared", "<p>Body</p>", Some("https://img/c.png".to_string()))
            .await
            .unwrap();

        let (wechat, webhook) = tokio::join!(
            publisher.publish(draft.id, Platform::Wechat, PublishParams::default()),
            publisher.publish(draft.id, Platform::Webhook, PublishParams::default()),
        );
        assert_eq!(wechat.unwrap().external_ref, "wechat-ref");
        assert_eq!(webhook.unwrap().external_ref, "webhook-ref");

        let stored = store.get_article(draft.id).await.unwrap().unwrap();
        assert_eq!(stored.published_platforms.len(), 2);
        assert_eq!(
            stored.published_platforms["wechat"].external_ref.as_deref(),
            Some("wechat-ref")
        );
        assert_eq!(
            stored.published_platforms["webhook"].external_ref.as_deref(),
            Some("webhook-ref")
        );
        assert_eq!(stored.status, ArticleStatus::Published);
    }

    #[tokio::test]
    async fn test_any_success_sets_single_global_status() {
        let adapter = RecordingAdapter::replying(vec![
            ok("hook-1"),
            Err(AdapterFailure::new("500", "down")),
        ]);
        let (store, publisher) = publisher_with(adapter, configured_defaults());
        let draft = publisher
            .create_draft("Shared", "<p>Body</p>", Some("https://img/c.png".to_string()))
            .await
            .unwrap();

        publisher
            .publish(draft.id, Platform::Webhook, PublishParams::default())
            .await
            .unwrap();
        assert!(publisher
            .publish(draft.id, Platform::Xiaohongshu, PublishParams::default())
            .await
            .is_err());

        // One platform failed, the article still reads as published.
        let stored = store.get_article(draft.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ArticleStatus::Published);
        assert_eq!(
            stored.published_platforms["xiaohongshu"].status,
            PlatformPublishStatus::Failed
        );
    }

    #[tokio::test]
    async fn test_plain_text_platform_payload() {
        let adapter = RecordingAdapter::replying(vec![ok("note-1")]);
        let (_store, publisher) = publisher_with(adapter.clone(), configured_defaults());
        let draft = publisher
            .create_draft(
                "这是一个非常非常长的标题用于测试小红书的标题长度限制",
                "<p>第一段&amp;内容</p><p>第二段</p>",
                Some("https://img/c.png".to_string()),
            )
            .await
            .unwrap();

        publisher
            .publish(draft.id, Platform::Xiaohongshu, PublishParams::default())
            .await
            .unwrap();

        let payload = adapter.last_payload();
        assert_eq!(payload.title.chars().count(), 20);
        assert_eq!(payload.content, "第一段&内容\n\n第二段");
    }

    #[tokio::test]
    async fn test_unknown_article_and_blank_draft() {
        let adapter = RecordingAdapter::replying(vec![]);
        let (_store, publisher) = publisher_with(adapter, configured_defaults());

        assert!(matches!(
            publisher
                .publish(uuid::Uuid::new_v4(), Platform::Webhook, PublishParams::default())
                .await,
            Err(PipelineError::NotFound { .. })
        ));
        assert!(matches!(
            publisher.create_draft("  ", "<p>x</p>", None).await,
            Err(PipelineError::Validation(_))
        ));
    }
}
