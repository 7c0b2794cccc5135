use async_trait::async_trait;
use serde::Deserialize;

use crate::{
    config::GenerationConfig,
    generation::{GenerationError, GenerationResult, VideoCandidate, truncate_chars},
};

/// Best-effort text describing a video. Never fails.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    async fn context_for(&self, video: &VideoCandidate) -> String;
}

/// Fetches transcripts from a service answering `GET {base}/{video_id}` with
/// `[{"text": "..."}, ...]`.
#[derive(Debug, Clone)]
pub struct HttpTranscriptSource {
    http: reqwest::Client,
    base_url: Option<String>,
    max_chars: usize,
}

#[derive(Deserialize)]
struct Segment {
    #[serde(default)]
    text: String,
}

/// Context used when no transcript can be fetched.
pub fn fallback_context(video: &VideoCandidate) -> String {
    format!("Title: {}\nDescription: {}", video.title, video.description)
}

impl HttpTranscriptSource {
    pub fn new(config: &GenerationConfig) -> GenerationResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            http,
            base_url: config.transcript_base_url().map(str::to_string),
            max_chars: config.context_chars(),
        })
    }

    async fn transcript(&self, video_id: &str) -> GenerationResult<String> {
        let base_url = self
            .base_url
            .as_deref()
            .ok_or_else(|| GenerationError::Service(String::from("no transcript service")))?;

        let segments: Vec<Segment> = self
            .http
            .get(format!("{base_url}/{video_id}"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let text = segments
            .iter()
            .map(|segment| segment.text.trim())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if text.is_empty() {
            return Err(GenerationError::Service(String::from("empty transcript")));
        }
        Ok(text)
    }
}

#[async_trait]
impl TranscriptSource for HttpTranscriptSource {
    #[tracing::instrument(skip_all, fields(video_id = %video.id))]
    async fn context_for(&self, video: &VideoCandidate) -> String {
        let text = match self.transcript(&video.id).await {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!("transcript unavailable, using metadata: {e}");
                fallback_context(video)
            }
        };

        truncate_chars(&text, self.max_chars).to_string()
    }
}
