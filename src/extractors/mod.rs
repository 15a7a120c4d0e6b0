use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

pub mod youtube;

pub use youtube::YoutubeExtractor;

use crate::Result;

/// Display metadata of a video, used to name the output directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMetadata {
    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default = "default_id")]
    pub id: String,
}

fn default_title() -> String {
    "unknown_video".to_string()
}

fn default_id() -> String {
    "unknown_id".to_string()
}

/// Resolves a video URL to its metadata and its best audio stream
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Look up title and id without downloading anything
    async fn fetch_metadata(&self, url: &str) -> Result<VideoMetadata>;

    /// Download the best audio stream into `output_dir`, returning the written file
    async fn download_audio(&self, url: &str, output_dir: &Path) -> Result<PathBuf>;

    /// Get the name of this platform
    fn platform_name(&self) -> &'static str;
}

/// Validate and normalize URLs
pub fn validate_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url.trim())
        .map_err(|_| anyhow::anyhow!("Invalid URL format: {}", url))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("URL must use HTTP or HTTPS protocol");
    }

    if parsed.host_str().map_or(true, str::is_empty) {
        anyhow::bail!("URL has no host: {}", url);
    }

    Ok(parsed)
}
