//! Configuration file handling.
//!
//! This module loads `.topicpress.toml`, merges CLI/environment values on
//! top of it, and resolves the effective per-operation settings from those
//! defaults plus a user's stored overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::publish::Platform;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// AI completion settings.
    #[serde(default)]
    pub ai: AiConfig,

    /// Scrape source settings.
    #[serde(default)]
    pub scrape: ScrapeConfig,

    /// Pipeline concurrency settings.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Publish request settings.
    #[serde(default)]
    pub publish: PublishConfig,

    /// Publish endpoints, one table per platform.
    #[serde(default)]
    pub platforms: PlatformsConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// JSON snapshot file backing the store.
    #[serde(default = "default_store_path")]
    pub store_path: String,

    /// Default output file path for reports.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Seconds between status polls while waiting on a job.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            output: default_output(),
            verbose: false,
            poll_interval_seconds: default_poll_interval(),
        }
    }
}

fn default_store_path() -> String {
    "topicpress_state.json".to_string()
}

fn default_output() -> String {
    "topicpress_report.md".to_string()
}

fn default_poll_interval() -> u64 {
    2
}

/// AI model settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiConfig {
    /// Ollama API URL.
    #[serde(default = "default_ai_url")]
    pub url: String,

    /// Model name.
    #[serde(default = "default_model")]
    pub model: String,

    /// Temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds.
    #[serde(default = "default_ai_timeout")]
    pub timeout_seconds: u64,

    /// Article text is cut to this many bytes before prompting.
    #[serde(default = "default_max_content_bytes")]
    pub max_content_bytes: usize,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            url: default_ai_url(),
            model: default_model(),
            temperature: default_temperature(),
            timeout_seconds: default_ai_timeout(),
            max_content_bytes: default_max_content_bytes(),
        }
    }
}

fn default_ai_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "qwen2.5:14b".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_ai_timeout() -> u64 {
    300
}

fn default_max_content_bytes() -> usize {
    12_000
}

/// Scrape source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Base URL of the article search service.
    #[serde(default = "default_scrape_url")]
    pub base_url: String,

    /// Optional bearer key for the search service.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Maximum result pages fetched per job.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Request timeout in seconds.
    #[serde(default = "default_scrape_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            base_url: default_scrape_url(),
            api_key: None,
            max_pages: default_max_pages(),
            timeout_seconds: default_scrape_timeout(),
        }
    }
}

fn default_scrape_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_max_pages() -> u32 {
    2
}

fn default_scrape_timeout() -> u64 {
    30
}

/// Concurrency windows for the batch stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// In-flight summary extractions per batch.
    #[serde(default = "default_summary_concurrency")]
    pub summary_concurrency: usize,

    /// In-flight enrichment fetches per batch.
    #[serde(default = "default_enrichment_concurrency")]
    pub enrichment_concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            summary_concurrency: default_summary_concurrency(),
            enrichment_concurrency: default_enrichment_concurrency(),
        }
    }
}

fn default_summary_concurrency() -> usize {
    3
}

fn default_enrichment_concurrency() -> usize {
    5
}

/// Settings shared by every platform adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Platform request timeout in seconds.
    #[serde(default = "default_publish_timeout")]
    pub timeout_seconds: u64,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_publish_timeout(),
        }
    }
}

fn default_publish_timeout() -> u64 {
    60
}

/// Endpoint settings for a single platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformSettings {
    /// Publish endpoint. Empty means not configured.
    #[serde(default)]
    pub endpoint: String,

    /// Bearer key sent with publish requests.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Author name attached to published articles.
    #[serde(default)]
    pub author: Option<String>,
}

impl PlatformSettings {
    pub fn is_configured(&self) -> bool {
        !self.endpoint.trim().is_empty()
            && self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

/// Publish endpoints for every supported platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformsConfig {
    #[serde(default)]
    pub wechat: PlatformSettings,

    #[serde(default)]
    pub xiaohongshu: PlatformSettings,

    #[serde(default)]
    pub webhook: PlatformSettings,
}

impl PlatformsConfig {
    pub fn get(&self, platform: Platform) -> &PlatformSettings {
        match platform {
            Platform::Wechat => &self.wechat,
            Platform::Xiaohongshu => &self.xiaohongshu,
            Platform::Webhook => &self.webhook,
        }
    }

    pub fn get_mut(&mut self, platform: Platform) -> &mut PlatformSettings {
        match platform {
            Platform::Wechat => &mut self.wechat,
            Platform::Xiaohongshu => &mut self.xiaohongshu,
            Platform::Webhook => &mut self.webhook,
        }
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(".topicpress.toml");

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only values given on the command line or through the environment
    /// override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref url) = args.ai_url {
            self.ai.url = url.clone();
        }
        if let Some(ref model) = args.model {
            self.ai.model = model.clone();
        }
        if let Some(timeout) = args.timeout {
            self.ai.timeout_seconds = timeout;
        }
        if let Some(timeout) = args.publish_timeout {
            self.publish.timeout_seconds = timeout;
        }
        if let Some(ref url) = args.scrape_url {
            self.scrape.base_url = url.clone();
        }
        if let Some(ref key) = args.scrape_key {
            self.scrape.api_key = Some(key.clone());
        }
        if let Some(ref store) = args.store {
            self.general.store_path = store.display().to_string();
        }

        let platform_args = [
            (Platform::Wechat, &args.wechat_endpoint, &args.wechat_key),
            (Platform::Xiaohongshu, &args.xiaohongshu_endpoint, &args.xiaohongshu_key),
            (Platform::Webhook, &args.webhook_endpoint, &args.webhook_key),
        ];
        for (platform, endpoint, key) in platform_args {
            let settings = self.platforms.get_mut(platform);
            if let Some(endpoint) = endpoint {
                settings.endpoint = endpoint.clone();
            }
            if let Some(key) = key {
                settings.api_key = Some(key.clone());
            }
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }

    /// Defaults that per-user overrides are resolved against.
    pub fn env_defaults(&self) -> EnvDefaults {
        EnvDefaults {
            ai: self.ai.clone(),
            platforms: self.platforms.clone(),
        }
    }
}

/// Process-wide defaults coming from the config file and environment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvDefaults {
    pub ai: AiConfig,
    pub platforms: PlatformsConfig,
}

/// Per-platform values a user may have saved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformOverride {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

/// A user's stored settings. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredOverrides {
    #[serde(default)]
    pub ai_url: Option<String>,
    #[serde(default)]
    pub ai_model: Option<String>,
    #[serde(default)]
    pub ai_temperature: Option<f32>,
    #[serde(default)]
    pub platforms: HashMap<Platform, PlatformOverride>,
}

impl StoredOverrides {
    /// Load a user's overrides from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))
    }
}

/// Settings in force for a single operation.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveConfig {
    pub ai: AiConfig,
    pub platforms: PlatformsConfig,
}

impl EffectiveConfig {
    pub fn platform(&self, platform: Platform) -> &PlatformSettings {
        self.platforms.get(platform)
    }
}

/// Resolve the effective settings for one operation.
///
/// Non-empty stored values win over environment defaults; blank strings
/// count as unset.
pub fn resolve(defaults: &EnvDefaults, overrides: &StoredOverrides) -> EffectiveConfig {
    let mut ai = defaults.ai.clone();
    if let Some(url) = non_blank(&overrides.ai_url) {
        ai.url = url;
    }
    if let Some(model) = non_blank(&overrides.ai_model) {
        ai.model = model;
    }
    if let Some(temperature) = overrides.ai_temperature {
        ai.temperature = temperature;
    }

    let mut platforms = defaults.platforms.clone();
    for (platform, stored) in &overrides.platforms {
        let settings = platforms.get_mut(*platform);
        if let Some(endpoint) = non_blank(&stored.endpoint) {
            settings.endpoint = endpoint;
        }
        if let Some(key) = non_blank(&stored.api_key) {
            settings.api_key = Some(key);
        }
        if let Some(author) = non_blank(&stored.author) {
            settings.author = Some(author);
        }
    }

    EffectiveConfig { ai, platforms }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}
