use futures_util::stream::{self, TryStreamExt};
use indicatif::ProgressBar;
use std::path::{Path, PathBuf};

use crate::audio::{AudioAsset, AudioToolkit, Chunker, FfmpegToolkit, SegmentSet, AUDIO_FILE_NAME};
use crate::config::Config;
use crate::extractors::{MediaExtractor, YoutubeExtractor};
use crate::output;
use crate::utils::{format_file_size, spinner};
use crate::TranscriptorError;

pub mod client;

pub use client::{OpenAiTranscriber, SpeechToText};

/// Transcribed text of each segment, in segment order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscriptResult {
    fragments: Vec<String>,
}

impl TranscriptResult {
    pub fn push(&mut self, fragment: String) {
        self.fragments.push(fragment);
    }

    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    /// Fragments joined verbatim, in order
    pub fn text(&self) -> String {
        self.fragments.concat()
    }

    /// Byte offsets in [`text`](Self::text) where each fragment after the first begins
    pub fn boundaries(&self) -> Vec<usize> {
        self.fragments
            .iter()
            .scan(0, |offset, fragment| {
                *offset += fragment.len();
                Some(*offset)
            })
            .take(self.fragments.len().saturating_sub(1))
            .collect()
    }
}

/// Transcribe every segment in order, stopping at the first failure.
///
/// Each request completes before the next one is sent.
pub async fn assemble(
    stt: &dyn SpeechToText,
    segments: &SegmentSet,
    progress: &ProgressBar,
) -> Result<TranscriptResult, TranscriptorError> {
    let total = segments.len();

    stream::iter(segments.iter().map(Ok::<_, TranscriptorError>))
        .try_fold(TranscriptResult::default(), |mut result, segment| async move {
            progress.set_message(format!("Transcribing segment {}/{}...", segment.number(), total));
            tracing::debug!("Transcribing segment {}/{}: {}", segment.number(), total, segment.path.display());

            let text = stt.transcribe_file(&segment.path).await.map_err(|e| {
                TranscriptorError::Transcription {
                    segment: segment.number(),
                    total,
                    message: format!("{:#}", e),
                }
            })?;

            result.push(text);
            Ok(result)
        })
        .await
}

/// What a successful run left on disk
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub output_dir: PathBuf,
    pub transcript_path: PathBuf,

    /// `None` when the operator asked for the audio to be removed
    pub audio_path: Option<PathBuf>,

    pub segment_count: usize,
}

/// Main transcription pipeline
pub struct TranscriptionPipeline {
    config: Config,
    extractor: Box<dyn MediaExtractor>,
    toolkit: Box<dyn AudioToolkit>,
    stt: Box<dyn SpeechToText>,
}

impl TranscriptionPipeline {
    /// Create a pipeline backed by yt-dlp, ffmpeg and the configured API
    pub fn new(config: Config) -> Result<Self, TranscriptorError> {
        let stt = OpenAiTranscriber::new(&config.api, config.audio.payload_ceiling_bytes)
            .map_err(|e| TranscriptorError::Configuration(format!("{:#}", e)))?;

        Ok(Self::with_components(
            config,
            Box::new(YoutubeExtractor::new()),
            Box::new(FfmpegToolkit::new()),
            Box::new(stt),
        ))
    }

    /// Create a pipeline from explicit collaborators
    pub fn with_components(
        config: Config,
        extractor: Box<dyn MediaExtractor>,
        toolkit: Box<dyn AudioToolkit>,
        stt: Box<dyn SpeechToText>,
    ) -> Self {
        Self {
            config,
            extractor,
            toolkit,
            stt,
        }
    }

    /// Run every stage for `url`. A transcript is written only if all segments succeed.
    pub async fn transcribe_from_url(&self, url: &str) -> Result<RunSummary, TranscriptorError> {
        let show = self.config.app.show_progress;

        tracing::info!("Fetching video info for: {}", url);
        let progress = spinner("Fetching video info...", show);
        let metadata = self
            .extractor
            .fetch_metadata(url)
            .await
            .map_err(|e| source_unavailable(&progress, e))?;
        progress.finish_and_clear();
        tracing::info!("Video title: {}", metadata.title);

        let output_dir = output::prepare_output_dir(&self.config.app.output_base, &metadata)?;
        tracing::info!("Output directory: {}", output_dir.display());

        let progress = spinner(
            &format!("Downloading audio with {}...", self.extractor.platform_name()),
            show,
        );
        let raw = self
            .extractor
            .download_audio(url, &output_dir)
            .await
            .map_err(|e| source_unavailable(&progress, e))?;
        progress.finish_with_message("Download complete");

        let asset = self.encode(&raw, &output_dir).await?;

        let progress = spinner("Preparing segments...", show);
        let segments = Chunker::new(self.toolkit.as_ref(), &self.config.audio)
            .prepare(&asset, &output_dir)
            .await;
        progress.finish_and_clear();
        let segments = segments?;

        let progress = spinner("Transcribing...", show);
        let result = assemble(self.stt.as_ref(), &segments, &progress).await;
        segments.cleanup();
        let result = match result {
            Ok(result) => {
                progress.finish_with_message("Transcription completed!");
                result
            }
            Err(e) => {
                progress.abandon_with_message("Transcription failed");
                return Err(e);
            }
        };

        let transcript_path = output::write_transcript(&output_dir, &result.text())?;

        let audio_path = if self.config.app.keep_audio {
            Some(asset.path)
        } else {
            output::remove_audio(&asset.path)?;
            None
        };

        Ok(RunSummary {
            output_dir,
            transcript_path,
            audio_path,
            segment_count: segments.len(),
        })
    }

    /// Re-encode the raw download to `audio.mp3` and drop the raw file
    async fn encode(&self, raw: &Path, output_dir: &Path) -> Result<AudioAsset, TranscriptorError> {
        let bitrate = self.config.audio.bitrate_kbps;
        let dest = output_dir.join(AUDIO_FILE_NAME);
        let progress = spinner(&format!("Encoding MP3 at {} kbps...", bitrate), self.config.app.show_progress);

        if let Err(e) = self.toolkit.encode_mp3(raw, &dest, bitrate).await {
            progress.abandon_with_message("Encoding failed");
            return Err(TranscriptorError::Encoding(format!("{:#}", e)));
        }

        if raw != dest {
            if let Err(e) = fs_err::remove_file(raw) {
                tracing::warn!("Could not remove raw download: {}", e);
            }
        }

        let asset = AudioAsset::from_path(&dest).map_err(|e| {
            TranscriptorError::Encoding(format!("encoder produced no output: {:#}", e))
        })?;

        progress.finish_with_message(format!("Audio encoded ({})", format_file_size(asset.size)));
        Ok(asset)
    }
}

fn source_unavailable(progress: &ProgressBar, e: anyhow::Error) -> TranscriptorError {
    progress.abandon();
    TranscriptorError::SourceUnavailable(format!("{:#}", e))
}
