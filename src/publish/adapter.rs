//! Platform adapter seam and its HTTP implementation.

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::Platform;
use crate::config::PlatformSettings;

/// Content as handed to a platform, already shaped for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishPayload {
    pub platform: Platform,
    pub title: String,
    pub content: String,
    pub digest: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    pub images: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishResponse {
    /// Platform-side identifier or URL of the published item.
    pub external_ref: String,
}

/// A platform rejection, carried back to the caller verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{code}] {message}")]
pub struct AdapterFailure {
    pub code: String,
    pub message: String,
}

impl AdapterFailure {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    async fn publish(
        &self,
        payload: &PublishPayload,
        settings: &PlatformSettings,
    ) -> Result<PublishResponse, AdapterFailure>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishAck {
    #[serde(default)]
    external_ref: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

impl PublishAck {
    fn into_ref(self) -> Option<String> {
        self.external_ref.or(self.id).or(self.url)
    }
}

#[derive(Debug, Deserialize)]
struct PublishRejection {
    #[serde(alias = "errcode")]
    code: serde_json::Value,
    #[serde(alias = "errmsg")]
    message: String,
}

/// Adapter posting the payload as JSON to the configured endpoint.
pub struct HttpPlatformAdapter {
    http_client: reqwest::Client,
}

impl HttpPlatformAdapter {
    pub fn new(timeout_seconds: u64) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl PlatformAdapter for HttpPlatformAdapter {
    async fn publish(
        &self,
        payload: &PublishPayload,
        settings: &PlatformSettings,
    ) -> Result<PublishResponse, AdapterFailure> {
        debug!(platform = %payload.platform, endpoint = %settings.endpoint, "Posting article");

        let mut request = self.http_client.post(&settings.endpoint).json(payload);
        if let Some(ref key) = settings.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                AdapterFailure::new("timeout", "platform request timed out")
            } else if e.is_connect() {
                AdapterFailure::new("unreachable", format!("cannot connect to {}", settings.endpoint))
            } else {
                AdapterFailure::new("network", e.to_string())
            }
        })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(rejection_from(status.as_u16(), &body));
        }

        // Some platforms answer 200 with an error envelope.
        if let Ok(rejection) = serde_json::from_str::<PublishRejection>(&body) {
            if !is_zero(&rejection.code) {
                return Err(AdapterFailure::new(code_text(&rejection.code), rejection.message));
            }
        }

        serde_json::from_str::<PublishAck>(&body)
            .ok()
            .and_then(PublishAck::into_ref)
            .map(|external_ref| PublishResponse { external_ref })
            .ok_or_else(|| AdapterFailure::new("bad_response", format!("unexpected response: {}", body)))
    }
}

fn rejection_from(status: u16, body: &str) -> AdapterFailure {
    match serde_json::from_str::<PublishRejection>(body) {
        Ok(rejection) => AdapterFailure::new(code_text(&rejection.code), rejection.message),
        Err(_) => AdapterFailure::new(status.to_string(), body.trim().to_string()),
    }
}

fn code_text(code: &serde_json::Value) -> String {
    match code {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_zero(code: &serde_json::Value) -> bool {
    code.as_i64() == Some(0) || code.as_str() == Some("0")
}
