//! Markdown and JSON report generation.
//!
//! Renders a job's status document (articles, insights, keyword
//! frequencies) for reading outside the tool.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

use crate::models::{Article, JobStatus, StatusDocument, TopicInsight, WordCloudEntry};

/// Run information shown at the top of a report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub generated_at: DateTime<Utc>,
    pub model_used: String,
    pub duration_seconds: f64,
}

/// A job snapshot plus the run that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub job: StatusDocument,
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    output.push_str(&format!("# TopicPress Report: {}\n\n", report.job.keyword));

    output.push_str(&generate_metadata_section(report));
    output.push_str(&generate_table_of_contents(&report.job));

    if let Some(ref cloud) = report.job.word_cloud {
        output.push_str(&generate_keywords_section(cloud));
    }
    if let Some(ref insights) = report.job.insights {
        output.push_str(&generate_insights_section(insights));
    }
    if let Some(ref articles) = report.job.articles {
        output.push_str(&generate_articles_section(articles));
    }

    output.push_str(&generate_footer());

    output
}

fn generate_metadata_section(report: &Report) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Job:** `{}`\n", report.job.job_id));
    section.push_str(&format!("- **Keyword:** {}\n", report.job.keyword));
    section.push_str(&format!(
        "- **Status:** {} {}\n",
        status_badge(report.job.status),
        report.job.status
    ));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        report.metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Model Used:** `{}`\n", report.metadata.model_used));
    if let Some(ref articles) = report.job.articles {
        section.push_str(&format!("- **Articles:** {}\n", articles.len()));
    }
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n",
        report.metadata.duration_seconds
    ));
    section.push('\n');

    section
}

fn status_badge(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Pending => "⏳",
        JobStatus::Processing => "🔄",
        JobStatus::Completed => "✅",
        JobStatus::Error => "❌",
    }
}

fn generate_table_of_contents(job: &StatusDocument) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");
    if job.word_cloud.is_some() {
        toc.push_str("- [Top Keywords](#top-keywords)\n");
    }
    if job.insights.is_some() {
        toc.push_str("- [Topic Insights](#topic-insights)\n");
    }
    if job.articles.is_some() {
        toc.push_str("- [Articles](#articles)\n");
    }
    toc.push('\n');

    toc
}

fn generate_keywords_section(cloud: &[WordCloudEntry]) -> String {
    let mut section = String::new();

    section.push_str("## Top Keywords\n\n");
    if cloud.is_empty() {
        section.push_str("No keywords found.\n\n");
        return section;
    }

    section.push_str("| Keyword | Count |\n");
    section.push_str("|:---|:---:|\n");
    for entry in cloud {
        section.push_str(&format!("| {} | {} |\n", entry.word, entry.count));
    }
    section.push('\n');

    section
}

fn generate_insights_section(insights: &[TopicInsight]) -> String {
    let mut section = String::new();

    section.push_str("## Topic Insights\n\n");
    if insights.is_empty() {
        section.push_str("No insights were produced for this job.\n\n");
        return section;
    }

    for (i, insight) in insights.iter().enumerate() {
        section.push_str(&format!("### {}. {}\n\n", i + 1, insight.title));
        if !insight.description.is_empty() {
            section.push_str(&format!("{}\n\n", insight.description));
        }
        if !insight.evidence.is_empty() {
            section.push_str(&format!("> **Evidence:** {}\n\n", insight.evidence));
        }
        if !insight.suggested_topics.is_empty() {
            section.push_str("**Suggested topics:**\n\n");
            for topic in &insight.suggested_topics {
                section.push_str(&format!("- {}\n", topic));
            }
            section.push('\n');
        }
    }

    section
}

fn generate_articles_section(articles: &[Article]) -> String {
    let mut section = String::new();

    section.push_str("## Articles\n\n");
    section.push_str("| Title | Author | Reads | Likes | Id |\n");
    section.push_str("|:---|:---|---:|---:|:---|\n");

    for article in articles {
        let title = match article.source_url {
            Some(ref url) => format!("[{}]({})", escape_cell(&article.title), url),
            None => escape_cell(&article.title),
        };
        section.push_str(&format!(
            "| {} | {} | {} | {} | `{}` |\n",
            title,
            escape_cell(article.author.as_deref().unwrap_or("-")),
            article.stats.reads,
            article.stats.likes,
            article.id
        ));
    }
    section.push('\n');

    section
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

fn generate_footer() -> String {
    "---\n\n*Report generated by TopicPress*\n".to_string()
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write rendered report content to a file.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}
