//! yt-transcript - download a YouTube video's audio and turn it into a transcript
//!
//! The run is a single forward pipeline: the audio is fetched with yt-dlp, re-encoded
//! to a fixed-bitrate MP3 with ffmpeg, split into ten-minute segments when it is too
//! large for the transcription API, and each segment is transcribed in order before
//! the fragments are joined into `transcript.txt`.

pub mod audio;
pub mod cli;
pub mod config;
pub mod extractors;
pub mod output;
pub mod transcribe;
pub mod utils;

pub use audio::{AudioAsset, AudioToolkit, FfmpegToolkit};
pub use cli::Cli;
pub use config::Config;
pub use extractors::{MediaExtractor, VideoMetadata};
pub use transcribe::{RunSummary, SpeechToText, TranscriptResult, TranscriptionPipeline};

/// Result type used by the external-tool adapters
pub type Result<T> = anyhow::Result<T>;

/// Failure of one pipeline stage. Any of these aborts the run.
#[derive(thiserror::Error, Debug)]
pub enum TranscriptorError {
    #[error("fetch: source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("encode: audio encoding failed: {0}")]
    Encoding(String),

    #[error("chunk: audio chunking failed: {0}")]
    Chunking(String),

    #[error("transcribe: segment {segment} of {total} failed: {message}")]
    Transcription {
        /// 1-based position of the failing segment
        segment: usize,
        total: usize,
        message: String,
    },

    #[error("config: {0}")]
    Configuration(String),

    #[error("output: {0}")]
    Output(String),
}

impl TranscriptorError {
    /// Short name of the stage that failed
    pub fn stage(&self) -> &'static str {
        match self {
            TranscriptorError::SourceUnavailable(_) => "fetch",
            TranscriptorError::Encoding(_) => "encode",
            TranscriptorError::Chunking(_) => "chunk",
            TranscriptorError::Transcription { .. } => "transcribe",
            TranscriptorError::Configuration(_) => "config",
            TranscriptorError::Output(_) => "output",
        }
    }
}
