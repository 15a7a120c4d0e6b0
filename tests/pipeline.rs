use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use yt_transcript::audio::{chunk_file_name, TimeRange};
use yt_transcript::extractors::YoutubeExtractor;
use yt_transcript::{
    AudioToolkit, Config, MediaExtractor, SpeechToText, TranscriptionPipeline, TranscriptorError,
    VideoMetadata,
};

const MIB: u64 = 1024 * 1024;
const URL: &str = "https://www.youtube.com/watch?v=vid123";

fn minutes(m: u64) -> Duration {
    Duration::from_secs(m * 60)
}

struct FakeExtractor {
    metadata: Option<VideoMetadata>,
}

#[async_trait]
impl MediaExtractor for FakeExtractor {
    async fn fetch_metadata(&self, _url: &str) -> yt_transcript::Result<VideoMetadata> {
        self.metadata
            .clone()
            .ok_or_else(|| anyhow::anyhow!("ERROR: [youtube] vid123: Private video"))
    }

    async fn download_audio(&self, _url: &str, output_dir: &Path) -> yt_transcript::Result<PathBuf> {
        let path = output_dir.join("source.webm");
        fs_err::write(&path, b"opus bytes")?;
        Ok(path)
    }

    fn platform_name(&self) -> &'static str {
        "Fake"
    }
}

/// Produces an `audio.mp3` of a chosen size and duration
struct FakeToolkit {
    size: u64,
    duration: Duration,
    fail_encode: bool,
}

#[async_trait]
impl AudioToolkit for FakeToolkit {
    async fn encode_mp3(&self, _source: &Path, dest: &Path, bitrate_kbps: u32) -> yt_transcript::Result<()> {
        assert_eq!(bitrate_kbps, 192);
        if self.fail_encode {
            anyhow::bail!("ffmpeg failed: Invalid data found when processing input");
        }
        fs_err::File::create(dest)?.set_len(self.size)?;
        Ok(())
    }

    async fn probe_duration(&self, _path: &Path) -> yt_transcript::Result<Duration> {
        Ok(self.duration)
    }

    async fn extract_range(
        &self,
        _source: &Path,
        range: &TimeRange,
        dest: &Path,
        _bitrate_kbps: u32,
    ) -> yt_transcript::Result<()> {
        fs_err::write(dest, format!("{:?}", range))?;
        Ok(())
    }
}

/// Answers each call with the next scripted response, recording the uploaded paths
#[derive(Clone)]
struct ScriptedStt {
    responses: Arc<Vec<Result<String, String>>>,
    calls: Arc<Mutex<Vec<PathBuf>>>,
}

impl ScriptedStt {
    fn new(responses: Vec<Result<&str, &str>>) -> Self {
        Self {
            responses: Arc::new(
                responses
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechToText for ScriptedStt {
    async fn transcribe_file(&self, path: &Path) -> yt_transcript::Result<String> {
        assert!(path.exists(), "segment {} uploaded after removal", path.display());
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(path.to_path_buf());
            calls.len() - 1
        };
        match &self.responses[index] {
            Ok(text) => Ok(text.clone()),
            Err(message) => Err(anyhow::anyhow!("{}", message)),
        }
    }
}

fn config(base: &Path, keep_audio: bool) -> Config {
    let env = |name: &str| (name == "OPENAI_API_KEY").then(|| "sk-test".to_string());
    let mut config = Config::resolve(&HashMap::new(), env).unwrap();
    config.app.output_base = base.to_path_buf();
    config.app.keep_audio = keep_audio;
    config.app.show_progress = false;
    config
}

fn talk() -> VideoMetadata {
    VideoMetadata {
        title: "A Talk: About Rust?".to_string(),
        id: "vid123".to_string(),
    }
}

fn pipeline(base: &Path, toolkit: FakeToolkit, stt: &ScriptedStt) -> TranscriptionPipeline {
    TranscriptionPipeline::with_components(
        config(base, true),
        Box::new(FakeExtractor {
            metadata: Some(talk()),
        }),
        Box::new(toolkit),
        Box::new(stt.clone()),
    )
}

#[tokio::test]
async fn short_source_is_sent_whole() {
    let base = tempfile::tempdir().unwrap();
    let stt = ScriptedStt::new(vec![Ok("Welcome to the talk.\n")]);
    let toolkit = FakeToolkit {
        size: 5 * MIB,
        duration: minutes(5),
        fail_encode: false,
    };

    let summary = pipeline(base.path(), toolkit, &stt)
        .transcribe_from_url(URL)
        .await
        .unwrap();

    let dir = base.path().join("A_Talk_About_Rust_vid123");
    assert_eq!(summary.output_dir, dir);
    assert_eq!(summary.segment_count, 1);
    assert_eq!(stt.calls(), vec![dir.join("audio.mp3")]);
    assert_eq!(
        fs_err::read_to_string(dir.join("transcript.txt")).unwrap(),
        "Welcome to the talk.\n"
    );
    assert_eq!(summary.audio_path, Some(dir.join("audio.mp3")));
    assert!(dir.join("audio.mp3").exists());
    assert!(!dir.join("source.webm").exists());
}

#[tokio::test]
async fn long_source_is_split_and_reassembled_in_order() {
    let base = tempfile::tempdir().unwrap();
    let stt = ScriptedStt::new(vec![Ok("first "), Ok("second "), Ok("third "), Ok("fourth")]);
    let toolkit = FakeToolkit {
        size: 40 * MIB,
        duration: minutes(35),
        fail_encode: false,
    };

    let summary = pipeline(base.path(), toolkit, &stt)
        .transcribe_from_url(URL)
        .await
        .unwrap();

    let dir = summary.output_dir.clone();
    let expected: Vec<PathBuf> = (0..4).map(|i| dir.join(chunk_file_name(i))).collect();
    assert_eq!(stt.calls(), expected);
    assert_eq!(summary.segment_count, 4);
    assert_eq!(
        fs_err::read_to_string(&summary.transcript_path).unwrap(),
        "first second third fourth"
    );

    // Segment files are temporary, the asset is kept
    assert!(expected.iter().all(|p| !p.exists()));
    assert!(dir.join("audio.mp3").exists());
}

#[tokio::test]
async fn failed_segment_aborts_without_transcript() {
    let base = tempfile::tempdir().unwrap();
    let stt = ScriptedStt::new(vec![
        Ok("first "),
        Ok("second "),
        Err("API error 401 Unauthorized: Incorrect API key provided"),
        Ok("never"),
    ]);
    let toolkit = FakeToolkit {
        size: 40 * MIB,
        duration: minutes(35),
        fail_encode: false,
    };

    let err = pipeline(base.path(), toolkit, &stt)
        .transcribe_from_url(URL)
        .await
        .unwrap_err();

    match err {
        TranscriptorError::Transcription { segment, total, ref message } => {
            assert_eq!(segment, 3);
            assert_eq!(total, 4);
            assert!(message.contains("Incorrect API key"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(stt.calls().len(), 3);

    let dir = base.path().join("A_Talk_About_Rust_vid123");
    assert!(!dir.join("transcript.txt").exists());
    assert!((0..4).all(|i| !dir.join(chunk_file_name(i)).exists()));
}

#[tokio::test]
async fn malformed_url_creates_no_output_directory() {
    let base = tempfile::tempdir().unwrap();
    let stt = ScriptedStt::new(vec![]);
    let pipeline = TranscriptionPipeline::with_components(
        config(base.path(), true),
        Box::new(YoutubeExtractor::new()),
        Box::new(FakeToolkit {
            size: 0,
            duration: Duration::ZERO,
            fail_encode: false,
        }),
        Box::new(stt.clone()),
    );

    let err = pipeline.transcribe_from_url("not a url").await.unwrap_err();

    assert!(matches!(err, TranscriptorError::SourceUnavailable(_)));
    assert_eq!(fs_err::read_dir(base.path()).unwrap().count(), 0);
    assert!(stt.calls().is_empty());
}

#[tokio::test]
async fn unavailable_video_creates_no_output_directory() {
    let base = tempfile::tempdir().unwrap();
    let stt = ScriptedStt::new(vec![]);
    let pipeline = TranscriptionPipeline::with_components(
        config(base.path(), true),
        Box::new(FakeExtractor { metadata: None }),
        Box::new(FakeToolkit {
            size: 5 * MIB,
            duration: minutes(5),
            fail_encode: false,
        }),
        Box::new(stt.clone()),
    );

    let err = pipeline.transcribe_from_url(URL).await.unwrap_err();

    assert_eq!(err.stage(), "fetch");
    assert!(err.to_string().contains("Private video"));
    assert_eq!(fs_err::read_dir(base.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn encoding_failure_is_reported_as_encoding_error() {
    let base = tempfile::tempdir().unwrap();
    let stt = ScriptedStt::new(vec![]);
    let toolkit = FakeToolkit {
        size: 5 * MIB,
        duration: minutes(5),
        fail_encode: true,
    };

    let err = pipeline(base.path(), toolkit, &stt)
        .transcribe_from_url(URL)
        .await
        .unwrap_err();

    assert!(matches!(err, TranscriptorError::Encoding(_)));
    assert!(stt.calls().is_empty());
    assert!(!base.path().join("A_Talk_About_Rust_vid123/transcript.txt").exists());
}

#[tokio::test]
async fn audio_removed_when_not_kept() {
    let base = tempfile::tempdir().unwrap();
    let stt = ScriptedStt::new(vec![Ok("text")]);
    let pipeline = TranscriptionPipeline::with_components(
        config(base.path(), false),
        Box::new(FakeExtractor {
            metadata: Some(talk()),
        }),
        Box::new(FakeToolkit {
            size: MIB,
            duration: minutes(1),
            fail_encode: false,
        }),
        Box::new(stt.clone()),
    );

    let summary = pipeline.transcribe_from_url(URL).await.unwrap();

    assert!(summary.audio_path.is_none());
    assert!(!summary.output_dir.join("audio.mp3").exists());
    assert!(summary.transcript_path.exists());
}

#[tokio::test]
async fn same_video_maps_to_same_directory() {
    let base = tempfile::tempdir().unwrap();
    let mut dirs = Vec::new();
    for _ in 0..2 {
        let stt = ScriptedStt::new(vec![Ok("text")]);
        let toolkit = FakeToolkit {
            size: MIB,
            duration: minutes(1),
            fail_encode: false,
        };
        let summary = pipeline(base.path(), toolkit, &stt)
            .transcribe_from_url(URL)
            .await
            .unwrap();
        dirs.push(summary.output_dir);
    }

    assert_eq!(dirs[0], dirs[1]);
}

#[test]
fn missing_credential_is_configuration_error() {
    let err = Config::resolve(&HashMap::new(), |_| None).unwrap_err();
    assert!(matches!(err, TranscriptorError::Configuration(_)));
}
