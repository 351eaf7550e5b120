//! TopicPress - keyword analysis and multi-platform publishing CLI
//!
//! Runs analysis jobs against a local model and publishes articles to
//! content platforms. State lives in a JSON snapshot so commands chain.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (bad input, upstream failure, failed job, etc.)

use anyhow::{Context, Result};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};
use tracing_subscriber::FmtSubscriber;

use topicpress::ai::{CompletionClient, OllamaClient};
use topicpress::cli::{Args, Command, OutputFormat};
use topicpress::config::{resolve, Config, StoredOverrides};
use topicpress::models::{JobId, JobStatus, StatusDocument};
use topicpress::pipeline::{AnalysisWorker, InsightSynthesisStage, JobLauncher, SummaryExtractionStage};
use topicpress::publish::{HttpPlatformAdapter, PublishParams, Publisher};
use topicpress::report::{self, Report, ReportMetadata};
use topicpress::scrape::HttpArticleSource;
use topicpress::status::StatusPoller;
use topicpress::store::{MemoryStore, Store};
use topicpress::PipelineError;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Read config first; its verbose flag feeds the log level
    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(&args, config.general.verbose);

    info!("TopicPress v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args, config).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            let message = match e.downcast_ref::<PipelineError>() {
                Some(pipeline_error) => pipeline_error.public_message(),
                None => format!("{:#}", e),
            };
            error!("Command failed: {}", message);
            eprintln!("\n❌ Error: {}", message);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .topicpress.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(".topicpress.toml");

    if path.exists() {
        eprintln!("⚠️  .topicpress.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .topicpress.toml")?;

    println!("✅ Created .topicpress.toml with default settings.");
    println!("   Edit it to set the model, search service and platform endpoints.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config_verbose: bool) {
    let level = args.log_level(config_verbose);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Everything a command needs, built once from the merged configuration.
struct App {
    config: Config,
    overrides: StoredOverrides,
    store: Arc<MemoryStore>,
}

impl App {
    fn poller(&self) -> StatusPoller {
        StatusPoller::new(self.store.clone())
    }

    fn launcher(&self) -> Result<JobLauncher> {
        let effective = resolve(&self.config.env_defaults(), &self.overrides);
        let ai: Arc<dyn CompletionClient> = Arc::new(OllamaClient::new(effective.ai.clone())?);
        let source = Arc::new(HttpArticleSource::new(
            self.config.scrape.clone(),
            self.config.pipeline.enrichment_concurrency,
        )?);

        let store: Arc<dyn Store> = self.store.clone();
        let summaries = SummaryExtractionStage::new(
            ai.clone(),
            store.clone(),
            self.config.pipeline.summary_concurrency,
            effective.ai.max_content_bytes,
        );
        let insights = InsightSynthesisStage::new(ai, store.clone());
        let worker = AnalysisWorker::new(
            store.clone(),
            source,
            summaries,
            insights,
            self.config.scrape.max_pages,
        );

        Ok(JobLauncher::new(store, Arc::new(worker)))
    }

    fn publisher(&self) -> Result<Publisher> {
        let adapter = Arc::new(HttpPlatformAdapter::new(self.config.publish.timeout_seconds)?);
        Ok(Publisher::new(self.store.clone(), self.config.env_defaults()).with_shared_adapter(adapter))
    }

    fn model(&self) -> String {
        resolve(&self.config.env_defaults(), &self.overrides).ai.model
    }
}

/// Run the selected command. Returns the process exit code.
async fn run(args: Args, config: Config) -> Result<i32> {
    let overrides = match args.settings {
        Some(ref path) => StoredOverrides::load(path)?,
        None => StoredOverrides::default(),
    };

    let store = Arc::new(MemoryStore::open(&config.general.store_path)?);
    info!("Using store snapshot: {}", config.general.store_path);

    let app = App {
        config,
        overrides,
        store,
    };

    let Some(command) = args.command.clone() else {
        return Ok(1);
    };

    match command {
        Command::Analyze {
            keyword,
            search_type,
        } => run_analyze(&app, &args, &keyword, &search_type).await,
        Command::Status { job_id } => {
            let doc = app.poller().get_status(job_id, &args.owner).await?;
            print_status(&doc);
            if args.output.is_some() {
                write_job_report(&app, &args, doc, 0.0)?;
            }
            Ok(0)
        }
        Command::Regenerate { job_id, force } => {
            let start_time = Instant::now();
            println!("🔁 Regenerating analysis for job {}", job_id);

            let outcome = app.launcher()?.regenerate(job_id, &args.owner, force).await?;
            if outcome.cached {
                println!("   Existing results returned (use --force to discard them).");
            }
            println!(
                "   Summaries: {} | Insights: {}",
                outcome.summaries.len(),
                outcome.insights.len()
            );

            let doc = app.poller().get_status(job_id, &args.owner).await?;
            write_job_report(&app, &args, doc, start_time.elapsed().as_secs_f64())?;
            Ok(0)
        }
        Command::Draft {
            title,
            html_file,
            cover,
        } => {
            let html = std::fs::read_to_string(&html_file)
                .with_context(|| format!("Failed to read {}", html_file.display()))?;
            let article = app.publisher()?.create_draft(&title, &html, cover).await?;

            println!("📝 Draft created: {}", article.id);
            Ok(0)
        }
        Command::Publish {
            article_id,
            platform,
        } => {
            println!("📤 Publishing {} to {}...", article_id, platform);
            let params = PublishParams {
                overrides: app.overrides.clone(),
            };
            let receipt = app.publisher()?.publish(article_id, platform, params).await?;

            println!(
                "✅ Published to {} at {} (ref: {})",
                receipt.platform,
                receipt.published_at.format("%Y-%m-%d %H:%M:%S UTC"),
                receipt.external_ref
            );
            Ok(0)
        }
    }
}

/// Start a job, wait for it with a spinner, then write the report.
async fn run_analyze(app: &App, args: &Args, keyword: &str, search_type: &str) -> Result<i32> {
    let start_time = Instant::now();

    println!("🔍 Analyzing \"{}\" ({})", keyword, search_type);
    println!("   Model: {}", app.model());
    println!("   Search service: {}", app.config.scrape.base_url);

    let job_id = app.launcher()?.start(keyword, search_type, &args.owner).await?;
    info!(job_id = %job_id, "Job started");

    let doc = wait_for_job(app, job_id, &args.owner, args.quiet).await?;
    print_status(&doc);

    let failed = doc.status == JobStatus::Error;
    if failed {
        if let Some(job) = app.store.get_job(job_id).await? {
            eprintln!("\n❌ Job failed: {}", job.error.unwrap_or_default());
        }
    }

    write_job_report(app, args, doc, start_time.elapsed().as_secs_f64())?;
    Ok(if failed { 1 } else { 0 })
}

/// Poll until the job is terminal. A pending job reads as not found.
async fn wait_for_job(app: &App, job_id: JobId, owner: &str, quiet: bool) -> Result<StatusDocument> {
    let spinner = if quiet {
        ProgressBar::hidden()
    } else {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner
    };
    spinner.set_message("Waiting for the worker to pick up the job...");

    let poller = app.poller();
    let interval = Duration::from_secs(app.config.general.poll_interval_seconds.max(1));

    loop {
        match poller.get_status(job_id, owner).await {
            Ok(doc) if doc.status.is_terminal() => {
                spinner.finish_and_clear();
                return Ok(doc);
            }
            Ok(doc) => {
                let scraped = doc.articles.as_ref().map_or(0, Vec::len);
                spinner.set_message(format!("Processing... {} articles scraped", scraped));
            }
            Err(PipelineError::NotFound { .. }) => {}
            Err(e) => {
                spinner.finish_and_clear();
                return Err(e.into());
            }
        }
        tokio::time::sleep(interval).await;
    }
}

fn print_status(doc: &StatusDocument) {
    println!("\n📊 Job {}", doc.job_id);
    println!("   Keyword: {}", doc.keyword);
    println!("   Status: {}", doc.status);
    if let Some(ref articles) = doc.articles {
        println!("   Articles: {}", articles.len());
    }
    if let Some(ref insights) = doc.insights {
        println!("   Insights: {}", insights.len());
        for insight in insights {
            println!("     💡 {}", insight.title);
        }
    }
    if let Some(ref cloud) = doc.word_cloud {
        let top: Vec<_> = cloud.iter().take(5).map(|e| e.word.as_str()).collect();
        if !top.is_empty() {
            println!("   Top keywords: {}", top.join(", "));
        }
    }
}

fn write_job_report(app: &App, args: &Args, job: StatusDocument, duration_seconds: f64) -> Result<()> {
    let report = Report {
        metadata: ReportMetadata {
            generated_at: Utc::now(),
            model_used: app.model(),
            duration_seconds,
        },
        job,
    };

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report),
    };

    let path = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&app.config.general.output));
    report::write_report(&output, &path)?;

    println!("\n✅ Report saved to: {}", path.display());
    Ok(())
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is set up, so problems go straight to stderr.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(Config::default()),
        Err(e) => {
            eprintln!("⚠️  Ignoring .topicpress.toml: {:#}", e);
            Ok(Config::default())
        }
    }
}
