use anyhow::Context;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

pub mod chunker;

pub use chunker::{chunk_file_name, plan_segments, Chunker, Segment, SegmentSet, TimeRange};

use crate::Result;

/// File name of the encoded asset inside the output directory
pub const AUDIO_FILE_NAME: &str = "audio.mp3";

/// The encoded MP3 the rest of the run works from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioAsset {
    pub path: PathBuf,

    /// Size on disk in bytes
    pub size: u64,
}

impl AudioAsset {
    /// Describe an asset that already exists on disk
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let size = fs_err::metadata(&path)?.len();
        Ok(Self { path, size })
    }
}

/// External audio tooling: transcoding, duration probing and cutting
#[async_trait]
pub trait AudioToolkit: Send + Sync {
    /// Transcode `source` into an MP3 at `bitrate_kbps` written to `dest`
    async fn encode_mp3(&self, source: &Path, dest: &Path, bitrate_kbps: u32) -> Result<()>;

    /// Duration of the audio in `path`
    async fn probe_duration(&self, path: &Path) -> Result<Duration>;

    /// Write the `range` slice of `source` to `dest` as an MP3 at `bitrate_kbps`
    async fn extract_range(
        &self,
        source: &Path,
        range: &TimeRange,
        dest: &Path,
        bitrate_kbps: u32,
    ) -> Result<()>;
}

/// Audio toolkit backed by the ffmpeg and ffprobe binaries
pub struct FfmpegToolkit {
    ffmpeg_path: String,
    ffprobe_path: String,
}

impl FfmpegToolkit {
    pub fn new() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
        }
    }

    async fn run_ffmpeg(&self, args: &[OsString]) -> Result<()> {
        let output = Command::new(&self.ffmpeg_path)
            .args(["-hide_banner", "-loglevel", "error", "-nostdin", "-y"])
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("failed to run {} (is it installed?)", self.ffmpeg_path))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("ffmpeg failed: {}", error.trim());
        }

        Ok(())
    }
}

#[async_trait]
impl AudioToolkit for FfmpegToolkit {
    async fn encode_mp3(&self, source: &Path, dest: &Path, bitrate_kbps: u32) -> Result<()> {
        tracing::debug!("Encoding {} to {} at {}k", source.display(), dest.display(), bitrate_kbps);

        self.run_ffmpeg(&mp3_args(source, None, dest, bitrate_kbps)).await
    }

    async fn probe_duration(&self, path: &Path) -> Result<Duration> {
        let output = Command::new(&self.ffprobe_path)
            .args(["-v", "quiet", "-print_format", "json", "-show_format"])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("failed to run {} (is it installed?)", self.ffprobe_path))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Failed to analyze file with ffprobe: {}", error.trim());
        }

        let info: serde_json::Value = serde_json::from_slice(&output.stdout)?;
        parse_probe_duration(&info)
            .with_context(|| format!("ffprobe reported no duration for {}", path.display()))
    }

    async fn extract_range(
        &self,
        source: &Path,
        range: &TimeRange,
        dest: &Path,
        bitrate_kbps: u32,
    ) -> Result<()> {
        tracing::debug!(
            "Cutting {:.3}s..{:.3}s of {} into {}",
            range.start.as_secs_f64(),
            range.end.as_secs_f64(),
            source.display(),
            dest.display()
        );

        self.run_ffmpeg(&mp3_args(source, Some(range), dest, bitrate_kbps)).await
    }
}

impl Default for FfmpegToolkit {
    fn default() -> Self {
        Self::new()
    }
}

/// ffmpeg arguments transcoding `source` (or just `range` of it) to an MP3 at `dest`.
/// Paths are passed through as OS strings so non UTF-8 names survive.
fn mp3_args(source: &Path, range: Option<&TimeRange>, dest: &Path, bitrate_kbps: u32) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::with_capacity(12);
    if let Some(range) = range {
        args.push("-ss".into());
        args.push(format!("{:.3}", range.start.as_secs_f64()).into());
        args.push("-t".into());
        args.push(format!("{:.3}", range.duration().as_secs_f64()).into());
    }
    args.push("-i".into());
    args.push(source.into());
    args.push("-vn".into());
    args.push("-codec:a".into());
    args.push("libmp3lame".into());
    args.push("-b:a".into());
    args.push(format!("{}k", bitrate_kbps).into());
    args.push(dest.into());
    args
}

/// Read `format.duration` out of `ffprobe -show_format` JSON
fn parse_probe_duration(info: &serde_json::Value) -> Option<Duration> {
    info["format"]["duration"]
        .as_str()
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
}
