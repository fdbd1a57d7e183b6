//! The digest job and its daily schedule.
//!
//! [`run_job`] performs one cycle:
//! 1. **Fetching**: page through the provider ([`crate::fetcher`])
//! 2. **Normalizing**: keep the first `article_limit` articles ([`crate::normalize`])
//! 3. **Summarizing**: ask the LLM for categorized summaries ([`crate::summarizer`])
//! 4. **Output**: persist the raw response and the digest ([`crate::outputs::json`])
//!
//! [`run_daily`] repeats the job every day at a fixed local time.

use crate::api::AskAsync;
use crate::config::{AppConfig, ConfigError};
use crate::fetcher::{PageSource, fetch_all};
use crate::models::NewsDigest;
use crate::normalize::normalize;
use crate::outputs::json;
use crate::summarizer::Summarizer;
use crate::utils::ensure_writable_dir;
use chrono::{Duration, Local, NaiveDateTime, NaiveTime};
use std::error::Error;
use std::time::Duration as StdDuration;
use tokio::time::sleep;
use tracing::{error, info, instrument};

/// Run one fetch → normalize → summarize → persist cycle.
#[instrument(level = "info", skip_all, fields(data_dir = %config.data_dir.display()))]
pub async fn run_job<S, A>(
    config: &AppConfig,
    source: &S,
    summarizer: &Summarizer<A>,
) -> Result<NewsDigest, Box<dyn Error>>
where
    S: PageSource,
    A: AskAsync<Response = String>,
{
    let start_time = std::time::Instant::now();

    if let Err(e) = ensure_writable_dir(&config.data_dir).await {
        error!(
            error = %e,
            "Data directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let response = fetch_all(source, config.max_pages).await?;
    json::write_json(&response, &config.raw_response_path()).await?;

    let articles = normalize(&response, config.article_limit);
    // Nothing is written over the previous digest unless summarization succeeded.
    let digest = summarizer.summarize(&articles).await?;

    json::write_json(&digest, &config.digest_path()).await?;

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        articles = articles.len(),
        summaries = digest.summaries.len(),
        path = %config.digest_path().display(),
        "Digest job complete"
    );
    Ok(digest)
}

/// Parse a daily run time given as `HH:MM`.
pub fn parse_daily_time(value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|e| ConfigError::Invalid {
        field: "at",
        reason: format!("{value:?} is not a HH:MM time ({e})"),
    })
}

/// Time to wait from `now` until the next occurrence of `at`.
///
/// If `at` is exactly now or already passed today, the next run is tomorrow.
pub fn next_run_delay(now: NaiveDateTime, at: NaiveTime) -> StdDuration {
    let today = now.date().and_time(at);
    let next = if today > now {
        today
    } else {
        today + Duration::days(1)
    };
    (next - now).to_std().unwrap_or_default()
}

/// Run the job every day at `at` local time. Never returns.
///
/// A failed cycle is logged and the schedule carries on.
#[instrument(level = "info", skip_all, fields(%at))]
pub async fn run_daily<S, A>(config: &AppConfig, at: NaiveTime, source: &S, summarizer: &Summarizer<A>)
where
    S: PageSource,
    A: AskAsync<Response = String>,
{
    loop {
        let delay = next_run_delay(Local::now().naive_local(), at);
        info!(?delay, "Waiting for next scheduled run");
        sleep(delay).await;

        match run_job(config, source, summarizer).await {
            Ok(digest) => info!(summaries = digest.summaries.len(), "Scheduled run succeeded"),
            Err(e) => error!(error = %e, "Scheduled run failed; will retry at next slot"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::PipelineArgs;
    use crate::config::ConfigFile;
    use crate::fetcher::FetchError;
    use crate::models::{NewsResponse, NormalizedArticle};
    use chrono::NaiveDate;
    use serde_json::{Value, json};

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn now(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_time(at(h, m))
    }

    #[test]
    fn test_next_run_later_today() {
        assert_eq!(next_run_delay(now(6, 0), at(7, 30)), StdDuration::from_secs(90 * 60));
    }

    #[test]
    fn test_next_run_tomorrow() {
        assert_eq!(
            next_run_delay(now(8, 0), at(7, 0)),
            StdDuration::from_secs(23 * 3600)
        );
        assert_eq!(
            next_run_delay(now(7, 0), at(7, 0)),
            StdDuration::from_secs(24 * 3600)
        );
    }

    #[test]
    fn test_parse_daily_time() {
        assert_eq!(parse_daily_time("07:30").unwrap(), at(7, 30));
        assert_eq!(parse_daily_time(" 23:05 ").unwrap(), at(23, 5));
        assert!(matches!(
            parse_daily_time("25:00"),
            Err(ConfigError::Invalid { field: "at", .. })
        ));
        assert!(parse_daily_time("morning").is_err());
    }

    /// One provider page with the two-article scenario.
    struct OnePage;

    impl PageSource for OnePage {
        async fn fetch_page(&self, _page: Option<&str>) -> Result<NewsResponse, FetchError> {
            Ok(serde_json::from_value(json!({
                "status": "success",
                "results": [
                    {"title": "A", "category": ["AI", "Tech"], "source_name": "X", "pubDate": "2024-01-01", "link": "u1"},
                    {"title": "B", "category": ["Tech"], "source_name": "Y", "pubDate": "2024-01-02", "link": "u2"}
                ]
            }))?)
        }
    }

    /// Echoes article categories through, lowercased.
    #[derive(Debug)]
    struct EchoCategories;

    impl AskAsync for EchoCategories {
        type Response = String;

        async fn ask(&self, text: &str) -> Result<String, Box<dyn Error>> {
            let articles: Vec<NormalizedArticle> = serde_json::from_str(text)?;
            let summaries: Vec<Value> = articles
                .iter()
                .map(|a| {
                    let category: Vec<String> = a
                        .category
                        .iter()
                        .flatten()
                        .map(|c| c.to_lowercase())
                        .collect();
                    json!({ "category": category, "title": a.title })
                })
                .collect();
            Ok(json!({ "summaries": summaries }).to_string())
        }
    }

    #[tokio::test]
    async fn test_run_job_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let args = PipelineArgs {
            news_api_key: Some("key".to_string()),
            ..Default::default()
        };
        let config = AppConfig::resolve(Some(dir.path()), &args, &ConfigFile::default()).unwrap();
        let summarizer = Summarizer::new(EchoCategories, config.batch_size, config.concurrency);

        let digest = run_job(&config, &OnePage, &summarizer).await.unwrap();
        assert_eq!(
            serde_json::to_value(&digest).unwrap(),
            json!({
                "summaries": [
                    {"category": ["ai", "tech"], "title": "A"},
                    {"category": ["tech"], "title": "B"}
                ]
            })
        );

        let persisted = json::read_digest(&config.digest_path()).await.unwrap();
        assert_eq!(persisted, digest);

        let categories = crate::digest::list_categories(&persisted);
        assert_eq!(categories.total_categories, 2);
        assert_eq!(categories.categories, vec!["ai", "tech"]);

        let tech = crate::digest::filter_by_category(&persisted, "tech");
        assert_eq!(tech.total_articles, 2);

        let raw: Value =
            serde_json::from_str(&std::fs::read_to_string(config.raw_response_path()).unwrap())
                .unwrap();
        assert_eq!(raw["status"], json!("ok"));
        assert_eq!(raw["totalResults"], json!(2));
        assert_eq!(raw["results"][0]["pubDate"], json!("2024-01-01"));
    }

    /// Every call fails, as when the LLM endpoint is down.
    #[derive(Debug)]
    struct Unreachable;

    impl AskAsync for Unreachable {
        type Response = String;

        async fn ask(&self, _text: &str) -> Result<String, Box<dyn Error>> {
            Err("connection refused".into())
        }
    }

    #[tokio::test]
    async fn test_failed_summarization_keeps_previous_digest() {
        let dir = tempfile::tempdir().unwrap();
        let args = PipelineArgs {
            news_api_key: Some("key".to_string()),
            batch_size: Some(1),
            ..Default::default()
        };
        let config = AppConfig::resolve(Some(dir.path()), &args, &ConfigFile::default()).unwrap();
        let previous = r#"{"summaries":[{"title":"yesterday","category":["tech"]}]}"#;
        std::fs::write(config.digest_path(), previous).unwrap();

        let summarizer = Summarizer::new(Unreachable, config.batch_size, config.concurrency);
        let result = run_job(&config, &OnePage, &summarizer).await;

        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(config.digest_path()).unwrap(), previous);
        let kept = json::read_digest(&config.digest_path()).await.unwrap();
        assert_eq!(crate::digest::filter_by_category(&kept, "tech").total_articles, 1);
    }
}
