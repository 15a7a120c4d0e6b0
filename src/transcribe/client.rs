use anyhow::Context;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;

use crate::config::ApiConfig;
use crate::utils::format_file_size;
use crate::Result;

/// Remote speech-to-text service: one audio file in, plain text out
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe_file(&self, path: &Path) -> Result<String>;
}

/// Client for an OpenAI-compatible `/audio/transcriptions` endpoint
pub struct OpenAiTranscriber {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    payload_ceiling: u64,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl OpenAiTranscriber {
    pub fn new(api: &ApiConfig, payload_ceiling: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("yt-transcript/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: format!("{}/audio/transcriptions", api.base_url.trim_end_matches('/')),
            api_key: api.api_key.clone(),
            model: api.model.clone(),
            payload_ceiling,
        })
    }
}

#[async_trait]
impl SpeechToText for OpenAiTranscriber {
    async fn transcribe_file(&self, path: &Path) -> Result<String> {
        let content = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let size = content.len() as u64;
        if size > self.payload_ceiling {
            anyhow::bail!(
                "{} is {}, above the {} upload limit",
                path.display(),
                format_file_size(size),
                format_file_size(self.payload_ceiling)
            );
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.mp3".to_string());

        let part = Part::bytes(content)
            .file_name(file_name)
            .mime_str("audio/mpeg")?;
        let form = Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("response_format", "text");

        tracing::debug!("Uploading {} ({}) to {}", path.display(), format_file_size(size), self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .context("Transcription request failed")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read transcription response")?;

        if !status.is_success() {
            anyhow::bail!("API error {}: {}", status, error_message(&body));
        }

        Ok(body)
    }
}

/// Best-effort human message out of an error response body
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => parsed.error.message,
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}
