//! # Tech News Digest
//!
//! Fetches technology news from the newsdata.io API, normalizes the articles,
//! summarizes and categorizes them through an LLM, and answers category
//! queries over the resulting digest.
//!
//! ## Usage
//!
//! ```sh
//! tech_news_digest run
//! tech_news_digest schedule --at 07:30
//! tech_news_digest categories
//! tech_news_digest filter --category tech
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Fetching**: Page through the provider API (bounded page count)
//! 2. **Normalizing**: Rename provider fields into a uniform article shape
//! 3. **Summarizing**: Send articles to the LLM for categorized summaries
//! 4. **Output**: Persist the raw response and the digest as JSON
//!
//! Query subcommands read the persisted digest back and print their result
//! as JSON on stdout. Logs go to stderr.

use chrono::NaiveTime;
use clap::Parser;
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod digest;
mod fetcher;
mod models;
mod normalize;
mod outputs;
mod scheduler;
mod summarizer;
mod utils;

use api::LlmSettings;
use cli::{Cli, Command, PipelineArgs};
use config::{AppConfig, ConfigFile};
use fetcher::NewsDataClient;
use outputs::json::{self, DIGEST_FILE};
use summarizer::Summarizer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let dotenv_path = dotenv::dotenv().ok();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    if let Some(path) = dotenv_path {
        debug!(path = %path.display(), "Loaded .env file");
    }

    let args = Cli::parse();
    debug!(?args.config, ?args.data_dir, "Parsed CLI arguments");

    let file = match ConfigFile::load(args.config.as_deref()) {
        Ok(file) => file,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };

    match args.command {
        Command::Run(pipeline) => {
            let config = resolve_config(args.data_dir.as_deref(), &pipeline, &file)?;
            run_once(&config).await
        }
        Command::Schedule { at, pipeline } => {
            let config = resolve_config(args.data_dir.as_deref(), &pipeline, &file)?;
            let at = match scheduler::parse_daily_time(&at) {
                Ok(at) => at,
                Err(e) => {
                    error!(error = %e, "Invalid configuration");
                    return Err(e.into());
                }
            };
            run_scheduled(&config, at).await
        }
        Command::Categories { digest: digest_file } => {
            let path = digest_path(digest_file, args.data_dir.as_deref(), &file);
            let news = json::read_digest(&path).await?;
            print_json(&digest::list_categories(&news))
        }
        Command::Filter {
            category,
            digest: digest_file,
        } => {
            let path = digest_path(digest_file, args.data_dir.as_deref(), &file);
            let news = json::read_digest(&path).await?;
            print_json(&digest::filter_by_category(&news, &category))
        }
    }
}

fn resolve_config(
    data_dir: Option<&Path>,
    pipeline: &PipelineArgs,
    file: &ConfigFile,
) -> Result<AppConfig, Box<dyn Error>> {
    match AppConfig::resolve(data_dir, pipeline, file) {
        Ok(config) => {
            info!(?config, "Resolved configuration");
            Ok(config)
        }
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            Err(e.into())
        }
    }
}

fn digest_path(explicit: Option<PathBuf>, data_dir: Option<&Path>, file: &ConfigFile) -> PathBuf {
    explicit.unwrap_or_else(|| file.resolve_data_dir(data_dir).join(DIGEST_FILE))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[instrument(level = "info", skip_all)]
async fn run_once(config: &AppConfig) -> Result<(), Box<dyn Error>> {
    let llm = LlmSettings::load(config.llm_config_path.as_deref(), &config.template_name).await?;
    let source = NewsDataClient::new(config)?;
    let summarizer = Summarizer::new(llm.client(), config.batch_size, config.concurrency);

    let news = scheduler::run_job(config, &source, &summarizer).await?;
    info!(
        summaries = news.summaries.len(),
        categories = digest::list_categories(&news).total_categories,
        "Digest run complete"
    );
    Ok(())
}

#[instrument(level = "info", skip_all, fields(%at))]
async fn run_scheduled(config: &AppConfig, at: NaiveTime) -> Result<(), Box<dyn Error>> {
    let llm = LlmSettings::load(config.llm_config_path.as_deref(), &config.template_name).await?;
    let source = NewsDataClient::new(config)?;
    let summarizer = Summarizer::new(llm.client(), config.batch_size, config.concurrency);

    tokio::select! {
        _ = scheduler::run_daily(config, at, &source, &summarizer) => {}
        res = tokio::signal::ctrl_c() => {
            res?;
            info!("Received Ctrl-C; stopping schedule");
        }
    }
    Ok(())
}
