use anyhow::Context;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use super::{validate_url, MediaExtractor, VideoMetadata};
use crate::Result;

/// File stem of the raw download, before it is re-encoded to `audio.mp3`
const SOURCE_STEM: &str = "source";

/// YouTube audio extractor using yt-dlp
pub struct YoutubeExtractor {
    yt_dlp_path: String,
}

impl YoutubeExtractor {
    pub fn new() -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
        }
    }

    /// Run yt-dlp with `args`, returning stdout when it exits successfully
    async fn run(&self, args: &[OsString]) -> Result<String> {
        let output = Command::new(&self.yt_dlp_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .with_context(|| {
                format!(
                    "failed to run {}. Please install it: https://github.com/yt-dlp/yt-dlp",
                    self.yt_dlp_path
                )
            })?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp failed: {}", error.trim());
        }

        String::from_utf8(output.stdout).context("yt-dlp printed non UTF-8 output")
    }

    /// Find the raw download when yt-dlp did not print its final path
    fn find_source_file(output_dir: &Path) -> Result<PathBuf> {
        for entry in fs_err::read_dir(output_dir)? {
            let path = entry?.path();
            let is_source = path.file_stem().and_then(|s| s.to_str()) == Some(SOURCE_STEM);
            let is_partial = path.extension().and_then(|e| e.to_str()) == Some("part");
            if path.is_file() && is_source && !is_partial {
                return Ok(path);
            }
        }

        anyhow::bail!("yt-dlp finished but no audio file was written to {}", output_dir.display())
    }
}

/// yt-dlp arguments saving the best audio stream of `url` as `<output_dir>/source.<ext>`
fn download_args(url: &str, output_dir: &Path) -> Vec<OsString> {
    let template = output_dir.join(format!("{}.%(ext)s", SOURCE_STEM));

    let mut args: Vec<OsString> = ["--format", "bestaudio/best", "--no-playlist", "--no-warnings", "--output"]
        .iter()
        .map(OsString::from)
        .collect();
    args.push(template.into_os_string());
    // Prints the final file name; implies --quiet
    args.push("--print".into());
    args.push("after_move:filepath".into());
    args.push(url.into());
    args
}

#[async_trait]
impl MediaExtractor for YoutubeExtractor {
    async fn fetch_metadata(&self, url: &str) -> Result<VideoMetadata> {
        let url = validate_url(url)?;
        tracing::debug!("Extracting video info for: {}", url);

        let args: Vec<OsString> = ["--dump-json", "--no-playlist", "--skip-download", "--no-warnings", url.as_str()]
            .iter()
            .map(OsString::from)
            .collect();
        let json = self.run(&args).await?;

        let metadata: VideoMetadata =
            serde_json::from_str(json.trim()).context("failed to parse yt-dlp video info")?;

        Ok(metadata)
    }

    async fn download_audio(&self, url: &str, output_dir: &Path) -> Result<PathBuf> {
        let url = validate_url(url)?;
        tracing::debug!("Downloading best audio for {} to {}", url, output_dir.display());

        let stdout = self.run(&download_args(url.as_str(), output_dir)).await?;

        let printed = stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
            .map(PathBuf::from);

        match printed {
            Some(path) if path.is_file() => Ok(path),
            _ => Self::find_source_file(output_dir),
        }
    }

    fn platform_name(&self) -> &'static str {
        "YouTube"
    }
}

impl Default for YoutubeExtractor {
    fn default() -> Self {
        Self::new()
    }
}
