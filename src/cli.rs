//! Command-line interface definitions for Tech News Digest.
//!
//! This module defines the CLI arguments and subcommands using the `clap` crate.
//! Pipeline options can be provided via command-line flags or environment
//! variables (a `.env` file in the working directory is loaded first).

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the Tech News Digest application.
///
/// # Examples
///
/// ```sh
/// # Fetch, summarize and persist one digest
/// tech_news_digest run --news-api-key YOUR_KEY
///
/// # Run the same job every day at 07:30 local time
/// tech_news_digest schedule --at 07:30
///
/// # Query the persisted digest
/// tech_news_digest categories
/// tech_news_digest filter --category tech
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML file with pipeline settings
    #[arg(short, long, global = true, env = "TECH_NEWS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding news_response.json and news_summary.json
    #[arg(short, long, global = true, env = "DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch, normalize, summarize and persist one digest
    Run(PipelineArgs),

    /// Run the digest job every day at a fixed local time
    Schedule {
        /// Local time of day to run at, as HH:MM
        #[arg(long, env = "SCHEDULE_AT")]
        at: String,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// List the distinct categories of the persisted digest
    Categories {
        /// Digest file to read instead of <data-dir>/news_summary.json
        #[arg(long)]
        digest: Option<PathBuf>,
    },

    /// Show the summaries of the persisted digest tagged with a category
    Filter {
        /// Category label, matched exactly (case-sensitive)
        #[arg(long)]
        category: String,

        /// Digest file to read instead of <data-dir>/news_summary.json
        #[arg(long)]
        digest: Option<PathBuf>,
    },
}

/// Options for the fetch → summarize pipeline.
///
/// Every option is optional here; unset values fall back to the config file
/// and then to built-in defaults.
#[derive(Args, Debug, Default, Clone)]
pub struct PipelineArgs {
    /// newsdata.io API key
    #[arg(long, env = "NEWS_API_KEY", hide_env_values = true)]
    pub news_api_key: Option<String>,

    /// News provider endpoint
    #[arg(long, env = "NEWS_API_URL")]
    pub news_api_url: Option<String>,

    /// Search query sent to the provider
    #[arg(long, env = "NEWS_QUERY")]
    pub query: Option<String>,

    /// Article language requested from the provider
    #[arg(long, env = "NEWS_LANGUAGE")]
    pub language: Option<String>,

    /// Maximum number of provider pages to follow
    #[arg(long)]
    pub max_pages: Option<usize>,

    /// Number of articles handed to the summarizer
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Articles per LLM request (default: all in one request)
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// LLM requests in flight at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Path to the awful_aj config.yaml holding LLM endpoint, key and model
    #[arg(long, env = "AWFUL_CONFIG")]
    pub llm_config: Option<PathBuf>,

    /// Name of the awful_aj chat template used for summarization
    #[arg(long, env = "NEWS_TEMPLATE")]
    pub template: Option<String>,
}
