use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::TranscriptorError;

/// Environment variable holding the transcription API key
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const BASE_URL_VAR: &str = "OPENAI_BASE_URL";
pub const MODEL_VAR: &str = "TRANSCRIPTION_MODEL";

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "whisper-1";
const DEFAULT_ENV_FILE: &str = ".env";

const MIB: u64 = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    /// Transcription API settings
    pub api: ApiConfig,

    /// Encoding and chunking policy
    pub audio: AudioConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Clone)]
pub struct ApiConfig {
    pub api_key: String,

    /// Base URL without the `/audio/transcriptions` path
    pub base_url: String,

    pub model: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioConfig {
    /// MP3 bitrate used for the asset and for split segments
    pub bitrate_kbps: u32,

    /// Assets at or above this size are split
    pub split_threshold_bytes: u64,

    /// Length of every segment except possibly the last
    pub segment_duration: Duration,

    /// Largest upload the transcription API accepts
    pub payload_ceiling_bytes: u64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base directory holding one sub-directory per video
    pub output_base: PathBuf,

    /// Keep `audio.mp3` after a successful run
    pub keep_audio: bool,

    /// Draw progress spinners
    pub show_progress: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            bitrate_kbps: 192,
            split_threshold_bytes: 24 * MIB,
            segment_duration: Duration::from_secs(10 * 60),
            payload_ceiling_bytes: 25 * MIB,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_base: PathBuf::from("./transcripts"),
            keep_audio: true,
            show_progress: true,
        }
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl Config {
    /// Load configuration from the dotenv file and the process environment.
    ///
    /// The file is parsed without touching the process environment. Its values win
    /// over environment variables of the same name. When `env_file` is `None` the
    /// `.env` in the working directory is used if it exists.
    pub fn load(env_file: Option<&Path>) -> Result<Self, TranscriptorError> {
        let file_vars = match env_file {
            Some(path) => read_env_file(path)?,
            None => {
                let default = Path::new(DEFAULT_ENV_FILE);
                if default.is_file() {
                    read_env_file(default)?
                } else {
                    HashMap::new()
                }
            }
        };

        Self::resolve(&file_vars, |name| std::env::var(name).ok())
    }

    /// Build a configuration from dotenv values and an environment lookup
    pub fn resolve<F>(file_vars: &HashMap<String, String>, env: F) -> Result<Self, TranscriptorError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| {
            file_vars
                .get(name)
                .cloned()
                .or_else(|| env(name))
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let api_key = lookup(API_KEY_VAR).ok_or_else(|| {
            TranscriptorError::Configuration(format!(
                "{} is not set (export it or add it to {})",
                API_KEY_VAR, DEFAULT_ENV_FILE
            ))
        })?;

        let base_url = lookup(BASE_URL_VAR)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        url::Url::parse(&base_url).map_err(|e| {
            TranscriptorError::Configuration(format!("{} is not a valid URL: {}", BASE_URL_VAR, e))
        })?;

        Ok(Self {
            api: ApiConfig {
                api_key,
                base_url,
                model: lookup(MODEL_VAR).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            },
            audio: AudioConfig::default(),
            app: AppConfig::default(),
        })
    }
}

/// Parse a dotenv file into a map
fn read_env_file(path: &Path) -> Result<HashMap<String, String>, TranscriptorError> {
    let iter = dotenvy::from_path_iter(path).map_err(|e| {
        TranscriptorError::Configuration(format!("cannot read {}: {}", path.display(), e))
    })?;

    iter.map(|item| {
        item.map_err(|e| {
            TranscriptorError::Configuration(format!("cannot parse {}: {}", path.display(), e))
        })
    })
    .collect()
}
