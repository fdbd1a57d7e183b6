//! Summarization of normalized articles into a [`NewsDigest`].
//!
//! Articles are serialized as a JSON array and sent as the user message of
//! the configured chat template. The template instructs the model to answer
//! with `{"summaries": [{..., "category": [..]}]}`; the response is read with
//! the tolerant digest rules from [`crate::models`].
//!
//! # Batching
//!
//! With a batch size configured, articles are split into batches that are
//! summarized concurrently (bounded by `concurrency`). Batch order is kept in
//! the final digest. A batch whose response cannot be used is logged and
//! skipped so one bad answer does not discard the whole run. A run where
//! every batch fails is an error, never an empty digest.

use crate::api::AskAsync;
use crate::models::{NewsDigest, NormalizedArticle};
use crate::utils::{extract_json_payload, looks_truncated, truncate_for_log};
use futures::stream::{self, StreamExt};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("all {batches} summarization batch(es) failed")]
    AllBatchesFailed { batches: usize },
}

pub struct Summarizer<A> {
    client: A,
    batch_size: Option<usize>,
    concurrency: usize,
}

impl<A> Summarizer<A>
where
    A: AskAsync<Response = String>,
{
    pub fn new(client: A, batch_size: Option<usize>, concurrency: usize) -> Self {
        Self {
            client,
            batch_size: batch_size.filter(|&n| n > 0),
            concurrency: concurrency.max(1),
        }
    }

    /// Summarize `articles` into a single digest.
    ///
    /// Empty input gives an empty digest without calling the model. Otherwise
    /// at least one batch must succeed.
    #[instrument(level = "info", skip_all, fields(articles = articles.len()))]
    pub async fn summarize(&self, articles: &[NormalizedArticle]) -> Result<NewsDigest, SummarizeError> {
        if articles.is_empty() {
            info!("No articles to summarize");
            return Ok(NewsDigest::default());
        }

        let batch_size = self.batch_size.unwrap_or(articles.len());
        let batches: Vec<&[NormalizedArticle]> = articles.chunks(batch_size).collect();
        let total_batches = batches.len();
        info!(
            batches = total_batches,
            batch_size,
            concurrency = self.concurrency,
            "Starting summarization"
        );

        let results: Vec<Option<NewsDigest>> = stream::iter(batches.into_iter().enumerate())
            .map(|(i, batch)| self.summarize_batch(i, batch))
            .buffered(self.concurrency)
            .collect()
            .await;

        let successful = results.iter().filter(|r| r.is_some()).count();
        if successful == 0 {
            error!(batches = total_batches, "Every summarization batch failed");
            return Err(SummarizeError::AllBatchesFailed {
                batches: total_batches,
            });
        }

        let digest = NewsDigest {
            summaries: results
                .into_iter()
                .flatten()
                .flat_map(|d| d.summaries)
                .collect(),
        };

        info!(
            batches = total_batches,
            successful,
            failed = total_batches - successful,
            summaries = digest.summaries.len(),
            "Completed summarization"
        );
        Ok(digest)
    }

    async fn summarize_batch(&self, index: usize, batch: &[NormalizedArticle]) -> Option<NewsDigest> {
        let prompt = match serde_json::to_string_pretty(batch) {
            Ok(prompt) => prompt,
            Err(e) => {
                error!(index, error = %e, "Failed to serialize articles; skipping batch");
                return None;
            }
        };
        debug!(index, articles = batch.len(), bytes = prompt.len(), "Summarizing batch");

        let response = match self.client.ask(&prompt).await {
            Ok(response) => response,
            Err(e) => {
                error!(index, error = %e, "API call failed; skipping batch");
                return None;
            }
        };

        let mut parsed = parse_digest(&response);

        // If the parse failed due to EOF (truncation), re-ask ONCE
        if let Err(ref e) = parsed {
            if looks_truncated(e) {
                warn!(index, error = %e, "EOF while parsing; re-asking once");
                match self.client.ask(&prompt).await {
                    Ok(r2) => parsed = parse_digest(&r2),
                    Err(e2) => warn!(index, error = %e2, "Re-ask failed; will skip batch"),
                }
            }
        }

        match parsed {
            Ok(digest) => {
                if digest.summaries.is_empty() {
                    warn!(
                        index,
                        articles = batch.len(),
                        response_preview = %truncate_for_log(&response, 300),
                        "Model answer held no usable summaries"
                    );
                } else {
                    info!(index, summaries = digest.summaries.len(), "Summarized batch");
                }
                Some(digest)
            }
            Err(e) => {
                warn!(
                    index,
                    error = %e,
                    response_preview = %truncate_for_log(&response, 300),
                    "Model returned non-conforming JSON; skipping batch"
                );
                None
            }
        }
    }
}

/// Parse a model response into a digest, unwrapping Markdown code fences.
pub fn parse_digest(response: &str) -> Result<NewsDigest, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(extract_json_payload(response))?;
    Ok(NewsDigest::from_value(value))
}
