//! Application configuration, built once at start-up.
//!
//! Values are resolved with the following precedence:
//! 1. command-line flags and environment variables (handled by `clap`)
//! 2. the optional YAML config file (`--config`)
//! 3. built-in defaults
//!
//! The resulting [`AppConfig`] is passed by reference to the fetcher, the
//! summarizer and the scheduler; nothing downstream reads the environment.
//! LLM settings (endpoint, API key, model, temperature) live in the
//! `awful_aj` config file referenced by [`AppConfig::llm_config_path`].

use crate::cli::PipelineArgs;
use crate::normalize::DEFAULT_LIMIT;
use crate::outputs::json::{DIGEST_FILE, RAW_RESPONSE_FILE};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, instrument};

pub const DEFAULT_NEWS_API_URL: &str = "https://newsdata.io/api/1/news";
pub const DEFAULT_QUERY: &str = "technology";
pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_MAX_PAGES: usize = 3;
pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_TEMPLATE: &str = "tech_news_digest";

/// Fatal configuration problems detected at start-up.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("NEWS_API_KEY not found in flags, environment variables or config file")]
    MissingNewsApiKey,

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Settings read from the optional YAML config file.
///
/// ```yaml
/// news_api_key: pub_xxx
/// query: technology
/// language: en
/// max_pages: 3
/// article_limit: 5
/// data_dir: ./data
/// llm_config: ~/.config/aj/config.yaml
/// template: tech_news_digest
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub news_api_key: Option<String>,
    pub news_api_url: Option<String>,
    pub query: Option<String>,
    pub language: Option<String>,
    pub max_pages: Option<usize>,
    pub article_limit: Option<usize>,
    pub batch_size: Option<usize>,
    pub concurrency: Option<usize>,
    pub data_dir: Option<PathBuf>,
    pub llm_config: Option<PathBuf>,
    pub template: Option<String>,
}

impl ConfigFile {
    /// Load the config file, or an empty one when no path is given.
    #[instrument(level = "info")]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file = Self::parse(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "Loaded config file");
        Ok(file)
    }

    fn parse(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    /// Data directory used by every subcommand.
    pub fn resolve_data_dir(&self, flag: Option<&Path>) -> PathBuf {
        flag.map(Path::to_path_buf)
            .or_else(|| self.data_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
    }
}

/// Fully resolved settings for the fetch → summarize pipeline.
#[derive(Clone)]
pub struct AppConfig {
    pub news_api_key: String,
    pub news_api_url: String,
    pub query: String,
    pub language: String,
    pub max_pages: usize,
    pub article_limit: usize,
    /// `None` sends all articles in a single LLM request.
    pub batch_size: Option<usize>,
    pub concurrency: usize,
    pub data_dir: PathBuf,
    /// `None` falls back to `awful_aj`'s own config directory.
    pub llm_config_path: Option<PathBuf>,
    pub template_name: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("news_api_key", &"<redacted>")
            .field("news_api_url", &self.news_api_url)
            .field("query", &self.query)
            .field("language", &self.language)
            .field("max_pages", &self.max_pages)
            .field("article_limit", &self.article_limit)
            .field("batch_size", &self.batch_size)
            .field("concurrency", &self.concurrency)
            .field("data_dir", &self.data_dir)
            .field("llm_config_path", &self.llm_config_path)
            .field("template_name", &self.template_name)
            .finish()
    }
}

impl AppConfig {
    pub fn resolve(
        data_dir: Option<&Path>,
        args: &PipelineArgs,
        file: &ConfigFile,
    ) -> Result<Self, ConfigError> {
        let news_api_key = args
            .news_api_key
            .clone()
            .or_else(|| file.news_api_key.clone())
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingNewsApiKey)?;

        let config = Self {
            news_api_key,
            news_api_url: pick(&args.news_api_url, &file.news_api_url, DEFAULT_NEWS_API_URL),
            query: pick(&args.query, &file.query, DEFAULT_QUERY),
            language: pick(&args.language, &file.language, DEFAULT_LANGUAGE),
            max_pages: args.max_pages.or(file.max_pages).unwrap_or(DEFAULT_MAX_PAGES),
            article_limit: args.limit.or(file.article_limit).unwrap_or(DEFAULT_LIMIT),
            batch_size: args.batch_size.or(file.batch_size),
            concurrency: args
                .concurrency
                .or(file.concurrency)
                .unwrap_or(DEFAULT_CONCURRENCY),
            data_dir: file.resolve_data_dir(data_dir),
            llm_config_path: args.llm_config.clone().or_else(|| file.llm_config.clone()),
            template_name: pick(&args.template, &file.template, DEFAULT_TEMPLATE),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_pages == 0 {
            return Err(ConfigError::Invalid {
                field: "max_pages",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid {
                field: "concurrency",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.batch_size == Some(0) {
            return Err(ConfigError::Invalid {
                field: "batch_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if let Err(e) = url::Url::parse(&self.news_api_url) {
            return Err(ConfigError::Invalid {
                field: "news_api_url",
                reason: e.to_string(),
            });
        }
        Ok(())
    }

    pub fn digest_path(&self) -> PathBuf {
        self.data_dir.join(DIGEST_FILE)
    }

    pub fn raw_response_path(&self) -> PathBuf {
        self.data_dir.join(RAW_RESPONSE_FILE)
    }
}

fn pick(flag: &Option<String>, file: &Option<String>, default: &str) -> String {
    flag.clone()
        .or_else(|| file.clone())
        .unwrap_or_else(|| default.to_string())
}
