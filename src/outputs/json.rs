//! JSON persistence for the provider dump and the digest.
//!
//! Files are pretty-printed so they can be inspected and diffed by hand.
//! Writes go to a sibling temporary file that is then renamed over the target,
//! so a reader sees either the old file or the new one, never a partial write.
//! Reading a digest back goes through [`NewsDigest::from_value`], so a digest
//! written by an older or partial run still loads with empty collections in
//! place of missing keys.

use crate::models::NewsDigest;
use serde::Serialize;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

/// File name of the persisted digest inside the data directory.
pub const DIGEST_FILE: &str = "news_summary.json";
/// File name of the combined provider response inside the data directory.
pub const RAW_RESPONSE_FILE: &str = "news_response.json";

/// Serialize `value` as pretty JSON to `path`, creating parent directories.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(value)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = fs::create_dir_all(parent).await {
            error!(dir = %parent.display(), error = %e, "Failed to create output dir");
            return Err(e.into());
        }
    }

    let tmp = temp_path(path);
    if let Err(e) = fs::write(&tmp, json).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    if let Err(e) = fs::rename(&tmp, path).await {
        error!(tmp = %tmp.display(), error = %e, "Failed to move JSON file into place");
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    info!("Wrote JSON file");
    Ok(())
}

/// `dir/.name.tmp` next to `path`, on the same filesystem so the rename is atomic.
fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp"))
}

/// Read a persisted digest.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn read_digest(path: &Path) -> Result<NewsDigest, Box<dyn Error>> {
    let text = fs::read_to_string(path).await?;
    let value: serde_json::Value = serde_json::from_str(&text)?;
    let digest = NewsDigest::from_value(value);
    info!(summaries = digest.summaries.len(), "Loaded digest");
    Ok(digest)
}
