//! Command-line interface argument parsing.
//!
//! Global options configure the AI, scrape and platform collaborators;
//! subcommands drive one operation each against the snapshot store.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::publish::Platform;

/// TopicPress - keyword analysis and multi-platform publishing
///
/// Search articles for a keyword, summarize them with a local model,
/// synthesize topic insights, then publish drafts to content platforms.
///
/// Examples:
///   topicpress analyze "AI写作"
///   topicpress analyze rustlang --search-type account --format json
///   topicpress status 6f1c...
///   topicpress regenerate 6f1c... --force
///   topicpress draft --title "Weekly notes" --html-file notes.html --cover https://img/c.png
///   topicpress publish 9a2b... --platform wechat
///   topicpress --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .topicpress.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// JSON snapshot file holding jobs and articles
    #[arg(long, value_name = "FILE", env = "TOPICPRESS_STORE", global = true)]
    pub store: Option<PathBuf>,

    /// Ollama API endpoint URL
    #[arg(long, value_name = "URL", env = "TOPICPRESS_AI_URL", global = true)]
    pub ai_url: Option<String>,

    /// Model used for summaries and insights
    #[arg(short, long, env = "TOPICPRESS_MODEL", global = true)]
    pub model: Option<String>,

    /// AI request timeout in seconds
    #[arg(long, value_name = "SECS", global = true)]
    pub timeout: Option<u64>,

    /// Platform publish request timeout in seconds
    #[arg(long, value_name = "SECS", global = true)]
    pub publish_timeout: Option<u64>,

    /// Base URL of the article search service
    #[arg(long, value_name = "URL", env = "TOPICPRESS_SCRAPE_URL", global = true)]
    pub scrape_url: Option<String>,

    /// Bearer key for the article search service
    #[arg(long, value_name = "KEY", env = "TOPICPRESS_SCRAPE_KEY", global = true, hide_env_values = true)]
    pub scrape_key: Option<String>,

    #[arg(long, value_name = "URL", env = "TOPICPRESS_WECHAT_ENDPOINT", global = true)]
    pub wechat_endpoint: Option<String>,

    #[arg(long, value_name = "KEY", env = "TOPICPRESS_WECHAT_KEY", global = true, hide_env_values = true)]
    pub wechat_key: Option<String>,

    #[arg(long, value_name = "URL", env = "TOPICPRESS_XIAOHONGSHU_ENDPOINT", global = true)]
    pub xiaohongshu_endpoint: Option<String>,

    #[arg(long, value_name = "KEY", env = "TOPICPRESS_XIAOHONGSHU_KEY", global = true, hide_env_values = true)]
    pub xiaohongshu_key: Option<String>,

    #[arg(long, value_name = "URL", env = "TOPICPRESS_WEBHOOK_ENDPOINT", global = true)]
    pub webhook_endpoint: Option<String>,

    #[arg(long, value_name = "KEY", env = "TOPICPRESS_WEBHOOK_KEY", global = true, hide_env_values = true)]
    pub webhook_key: Option<String>,

    /// Per-user settings file whose values override the defaults
    #[arg(long, value_name = "FILE", global = true)]
    pub settings: Option<PathBuf>,

    /// Owner id recorded on new jobs and checked on reads
    #[arg(long, default_value = "local", env = "TOPICPRESS_OWNER", global = true)]
    pub owner: String,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT", global = true)]
    pub format: OutputFormat,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE", global = true)]
    pub output: Option<PathBuf>,

    /// Generate a default .topicpress.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start an analysis job and wait for it to finish
    Analyze {
        /// Keyword or account name to search for
        keyword: String,

        /// What the keyword names (keyword, account)
        #[arg(long, default_value = "keyword")]
        search_type: String,
    },

    /// Show a job's current status
    Status {
        job_id: uuid::Uuid,
    },

    /// Re-run summaries and insights for a completed job
    Regenerate {
        job_id: uuid::Uuid,

        /// Discard existing results instead of returning them
        #[arg(long)]
        force: bool,
    },

    /// Create a manual draft from an HTML file
    Draft {
        #[arg(long)]
        title: String,

        #[arg(long, value_name = "FILE")]
        html_file: PathBuf,

        /// Cover image URL
        #[arg(long, value_name = "URL")]
        cover: Option<String>,
    },

    /// Publish an article to one platform
    Publish {
        article_id: uuid::Uuid,

        #[arg(long, value_enum)]
        platform: Platform,
    },
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        let Some(ref command) = self.command else {
            return Err("A subcommand is required (try --help)".to_string());
        };

        if let Some(ref url) = self.ai_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("AI URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.timeout == Some(0) || self.publish_timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if self.owner.trim().is_empty() {
            return Err("Owner must not be empty".to_string());
        }

        match command {
            Command::Analyze { keyword, .. } if keyword.trim().is_empty() => {
                Err("Keyword must not be empty".to_string())
            }
            Command::Draft { html_file, .. } if !html_file.is_file() => Err(format!(
                "HTML file does not exist: {}",
                html_file.display()
            )),
            _ => Ok(()),
        }
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `--quiet` wins; otherwise `--verbose` or a verbose config file
    /// enables debug output.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
