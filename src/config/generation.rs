use std::time::Duration;

use serde::Deserialize;

use super::{ConfigError, ConfigResult};

/// Settings for the external services used by course generation and the
/// size limits applied to each pipeline stage.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    gemini_api_key: Option<String>,
    gemini_base_url: String,
    model: String,
    youtube_api_key: Option<String>,
    youtube_base_url: String,
    transcript_base_url: Option<String>,
    timeout_secs: u64,
    videos_per_lesson: u32,
    questions_per_quiz: usize,
    final_quiz_questions: usize,
    context_chars: usize,
    quiz_source_chars: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_base_url: String::from("https://generativelanguage.googleapis.com/v1beta"),
            model: String::from("gemini-2.5-flash"),
            youtube_api_key: None,
            youtube_base_url: String::from("https://www.googleapis.com/youtube/v3"),
            transcript_base_url: None,
            timeout_secs: 60,
            videos_per_lesson: 3,
            questions_per_quiz: 5,
            final_quiz_questions: 10,
            context_chars: 2500,
            quiz_source_chars: 25000,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl GenerationConfig {
    /// Rejects values no generation run could work with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::invalid("generation.model", "must not be empty"));
        }
        for (field, url) in [
            ("generation.gemini_base_url", &self.gemini_base_url),
            ("generation.youtube_base_url", &self.youtube_base_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::invalid(field, "must be an http(s) url"));
            }
        }
        if self.context_chars == 0 || self.quiz_source_chars == 0 {
            return Err(ConfigError::invalid(
                "generation.context_chars",
                "text limits must be positive",
            ));
        }
        Ok(())
    }

    #[inline]
    pub fn gemini_api_key(&self) -> Option<&str> {
        non_empty(&self.gemini_api_key)
    }

    #[inline]
    pub fn gemini_base_url(&self) -> &str {
        self.gemini_base_url.trim_end_matches('/')
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[inline]
    pub fn youtube_api_key(&self) -> Option<&str> {
        non_empty(&self.youtube_api_key)
    }

    #[inline]
    pub fn youtube_base_url(&self) -> &str {
        self.youtube_base_url.trim_end_matches('/')
    }

    #[inline]
    pub fn transcript_base_url(&self) -> Option<&str> {
        non_empty(&self.transcript_base_url).map(|url| url.trim_end_matches('/'))
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    #[inline]
    pub fn videos_per_lesson(&self) -> u32 {
        self.videos_per_lesson
    }

    #[inline]
    pub fn questions_per_quiz(&self) -> usize {
        self.questions_per_quiz.max(1)
    }

    #[inline]
    pub fn final_quiz_questions(&self) -> usize {
        self.final_quiz_questions.max(1)
    }

    #[inline]
    pub fn context_chars(&self) -> usize {
        self.context_chars
    }

    #[inline]
    pub fn quiz_source_chars(&self) -> usize {
        self.quiz_source_chars
    }
}
