//! Supported publish targets and what each one accepts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PipelineError;

/// How article content must be shaped for a platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentFormat {
    /// Block tags become newlines, entities decoded, no markup.
    PlainText,
    /// HTML normalized through markdown and re-rendered with inline styles.
    RichHtml,
}

/// Static requirements of a platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformProfile {
    pub format: ContentFormat,
    pub requires_cover: bool,
    /// Maximum title length in characters, if the platform enforces one.
    pub title_limit: Option<usize>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Wechat,
    Xiaohongshu,
    Webhook,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Wechat, Platform::Xiaohongshu, Platform::Webhook];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Wechat => "wechat",
            Platform::Xiaohongshu => "xiaohongshu",
            Platform::Webhook => "webhook",
        }
    }

    pub fn profile(&self) -> PlatformProfile {
        match self {
            Platform::Wechat => PlatformProfile {
                format: ContentFormat::RichHtml,
                requires_cover: true,
                title_limit: None,
            },
            Platform::Xiaohongshu => PlatformProfile {
                format: ContentFormat::PlainText,
                requires_cover: true,
                title_limit: Some(20),
            },
            Platform::Webhook => PlatformProfile {
                format: ContentFormat::RichHtml,
                requires_cover: false,
                title_limit: None,
            },
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| PipelineError::Validation(format!("unsupported platform: {}", s)))
    }
}
