//! Splitting of the encoded asset into upload-sized segments.
//!
//! Splitting is by fixed duration rather than exact byte budget: at a constant 192 kbps
//! a ten-minute segment is roughly 14 MB, well below the API ceiling.

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{AudioAsset, AudioToolkit};
use crate::config::AudioConfig;
use crate::utils::{format_duration, format_file_size};
use crate::TranscriptorError;

/// Half-open `[start, end)` slice of an audio asset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: Duration,
    pub end: Duration,
}

impl TimeRange {
    pub fn new(start: Duration, end: Duration) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> Duration {
        self.end.saturating_sub(self.start)
    }
}

/// Plan the segment ranges for an asset of `duration` and `size` bytes.
///
/// Below `threshold` the whole asset is one range. At or above it the asset is cut
/// into consecutive ranges of `segment` length, the last one holding the remainder.
/// A zero-length asset over the threshold yields no ranges.
pub fn plan_segments(
    duration: Duration,
    size: u64,
    threshold: u64,
    segment: Duration,
) -> Vec<TimeRange> {
    if size < threshold || segment.is_zero() {
        return vec![TimeRange::new(Duration::ZERO, duration)];
    }

    let mut ranges = Vec::new();
    let mut start = Duration::ZERO;
    while start < duration {
        let end = (start + segment).min(duration);
        ranges.push(TimeRange::new(start, end));
        start = end;
    }
    ranges
}

/// File name of the `index`th split segment (0-based)
pub fn chunk_file_name(index: usize) -> String {
    format!("audio_chunk_{:03}.mp3", index)
}

/// One contiguous slice of the asset, ready for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// 0-based position in the set
    pub index: usize,

    pub path: PathBuf,

    /// `None` when the segment is the whole asset
    pub range: Option<TimeRange>,
}

impl Segment {
    /// 1-based position, as shown to the operator
    pub fn number(&self) -> usize {
        self.index + 1
    }
}

/// Ordered segments of one asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentSet {
    segments: Vec<Segment>,
    split: bool,
}

impl SegmentSet {
    /// The whole asset as a single segment
    pub fn whole(asset: &AudioAsset) -> Self {
        Self {
            segments: vec![Segment {
                index: 0,
                path: asset.path.clone(),
                range: None,
            }],
            split: false,
        }
    }

    /// Segments cut from the asset into separate files
    pub(crate) fn split(segments: Vec<Segment>) -> Self {
        Self {
            segments,
            split: true,
        }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether the segments are physical files cut from the asset
    pub fn is_split(&self) -> bool {
        self.split
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.segments.iter()
    }

    /// Remove the segment files cut from the asset. The asset itself is never touched.
    pub fn cleanup(&self) {
        if !self.split {
            return;
        }
        for segment in &self.segments {
            if let Err(e) = fs_err::remove_file(&segment.path) {
                tracing::warn!("Could not remove segment file: {}", e);
            }
        }
    }
}

/// Decides whether an asset needs splitting and performs the split
pub struct Chunker<'a> {
    toolkit: &'a dyn AudioToolkit,
    policy: &'a AudioConfig,
}

impl<'a> Chunker<'a> {
    pub fn new(toolkit: &'a dyn AudioToolkit, policy: &'a AudioConfig) -> Self {
        Self { toolkit, policy }
    }

    /// Turn `asset` into an ordered segment set, writing split files into `output_dir`
    pub async fn prepare(
        &self,
        asset: &AudioAsset,
        output_dir: &Path,
    ) -> Result<SegmentSet, TranscriptorError> {
        if asset.size < self.policy.split_threshold_bytes {
            tracing::debug!(
                "Audio is {}, below the split threshold",
                format_file_size(asset.size)
            );
            return Ok(SegmentSet::whole(asset));
        }

        let duration = self
            .toolkit
            .probe_duration(&asset.path)
            .await
            .map_err(|e| TranscriptorError::Chunking(format!("{:#}", e)))?;

        let ranges = plan_segments(
            duration,
            asset.size,
            self.policy.split_threshold_bytes,
            self.policy.segment_duration,
        );

        match ranges.len() {
            0 => {
                return Err(TranscriptorError::Chunking(format!(
                    "{} has zero duration",
                    asset.path.display()
                )))
            }
            1 if asset.size <= self.policy.payload_ceiling_bytes => {
                tracing::info!(
                    "Audio is {} but only {} long, sending it whole",
                    format_file_size(asset.size),
                    format_duration(duration.as_secs_f64())
                );
                return Ok(SegmentSet::whole(asset));
            }
            1 => {
                tracing::info!(
                    "Audio is {} ({}), over the upload limit, re-encoding it as one segment",
                    format_file_size(asset.size),
                    format_duration(duration.as_secs_f64())
                );
            }
            _ => {
                tracing::info!(
                    "Audio is {} ({}), splitting into {} segments",
                    format_file_size(asset.size),
                    format_duration(duration.as_secs_f64()),
                    ranges.len()
                );
            }
        }

        let mut segments: Vec<Segment> = Vec::with_capacity(ranges.len());
        for (index, range) in ranges.into_iter().enumerate() {
            let path = output_dir.join(chunk_file_name(index));

            if let Err(e) = self
                .toolkit
                .extract_range(&asset.path, &range, &path, self.policy.bitrate_kbps)
                .await
            {
                // Nothing partial may outlive a failed split
                if path.exists() {
                    let _ = fs_err::remove_file(&path);
                }
                SegmentSet::split(segments).cleanup();
                return Err(TranscriptorError::Chunking(format!(
                    "segment {}: {:#}",
                    index + 1,
                    e
                )));
            }

            segments.push(Segment {
                index,
                path,
                range: Some(range),
            });
        }

        Ok(SegmentSet::split(segments))
    }
}
