mod error;
pub use error::{GenerationError, GenerationResult};

pub mod json;
pub use json::extract_json;

mod llm;
pub use llm::{GeminiClient, TextGenerator};

mod video;
pub use video::{VideoCandidate, VideoSearch, YouTubeClient};

mod transcript;
pub use transcript::{HttpTranscriptSource, TranscriptSource, fallback_context};

pub mod stages;

mod pipeline;
pub use pipeline::{
    CourseGenerator, CourseRequest, DegradedItem, GenerationReport, GenerationSettings,
    ModuleRequest, PipelineStage, assessment_slots,
};

/// Longest title the store accepts.
pub const MAX_TITLE_CHARS: usize = 200;

/// Prefix of `text` holding at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

pub(crate) fn clamp_title(title: &str) -> String {
    truncate_chars(title.trim(), MAX_TITLE_CHARS).trim_end().to_string()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn titles_fit_the_store() {
        let long = "t".repeat(MAX_TITLE_CHARS + 50);
        assert_eq!(clamp_title(&long).chars().count(), MAX_TITLE_CHARS);
        assert_eq!(clamp_title("  Intro  "), "Intro");
    }
}
