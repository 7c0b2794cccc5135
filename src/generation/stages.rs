//! The individual generation steps. Each one issues a single completion and
//! turns whatever comes back into a usable result, padding or substituting
//! where the output cannot be trusted.

use serde_json::Value;

use crate::{
    generation::{
        GenerationError, GenerationResult, TextGenerator, VideoCandidate, clamp_title,
        json::extract_json, truncate_chars,
    },
    model::draft::{LessonDraft, QuestionDraft, QuizDraft},
};

/// Title used when a quiz comes back unusable and no title was suggested.
pub const GENERIC_QUIZ_TITLE: &str = "Quiz";

/// Options per generated question. Hand-written questions may have any count.
pub const QUIZ_OPTIONS: usize = 4;

/// Result of a stage that recovered locally. `degraded` carries the reason
/// when the value is not what the model produced.
#[derive(Debug, Clone)]
pub struct StageOutput<T> {
    pub value: T,
    pub degraded: Option<String>,
}

impl<T> StageOutput<T> {
    fn clean(value: T) -> Self {
        Self {
            value,
            degraded: None,
        }
    }

    fn degraded(value: T, reason: impl Into<String>) -> Self {
        Self {
            value,
            degraded: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outline {
    pub course_title: String,
    pub module_titles: Vec<String>,
}

/// A video picked for a lesson together with the text the model saw for it.
#[derive(Debug, Clone)]
pub struct VideoContext {
    pub video: VideoCandidate,
    pub context: String,
}

fn title_at(items: Option<&Vec<Value>>, index: usize) -> Option<String> {
    let item = items?.get(index)?;
    let title = match item {
        Value::String(title) => title.as_str(),
        Value::Object(map) => map.get("title")?.as_str()?,
        _ => return None,
    };

    let title = title.trim();
    (!title.is_empty()).then(|| clamp_title(title))
}

/// Reads exactly `count` titles from `key`, padding gaps with `pad(i)` where
/// `i` starts at 1. Returns the titles and how many were padded.
fn exact_titles(
    value: Option<&Value>,
    key: &str,
    count: usize,
    pad: impl Fn(usize) -> String,
) -> (Vec<String>, usize) {
    let items = value.and_then(|v| v.get(key)).and_then(Value::as_array);
    let mut padded = 0;

    let titles = (0..count)
        .map(|index| {
            title_at(items, index).unwrap_or_else(|| {
                padded += 1;
                clamp_title(&pad(index + 1))
            })
        })
        .collect();

    (titles, padded)
}

fn padding_reason(padded: usize, count: usize, parse_error: Option<GenerationError>) -> Option<String> {
    match (padded, parse_error) {
        (_, Some(e)) => Some(format!("{e}; all {count} titles synthesized")),
        (0, None) => None,
        (padded, None) => Some(format!("{padded} of {count} titles synthesized")),
    }
}

/// Produces exactly `count` module titles for `prompt`.
///
/// Service failures propagate. Missing, empty or malformed titles are padded
/// with `Module i: <prompt> Part i`.
#[tracing::instrument(skip(llm))]
pub async fn outline(
    llm: &dyn TextGenerator,
    prompt: &str,
    count: usize,
) -> GenerationResult<StageOutput<Outline>> {
    let request = format!(
        "Create a course outline for the topic: \"{prompt}\".\n\
         The course must have exactly {count} modules in a logical learning order.\n\
         Give every module a concise, descriptive title.\n\
         Return ONLY a JSON object of the form \
         {{\"course_title\": \"...\", \"modules\": [{{\"title\": \"...\"}}]}} without any explanation."
    );

    let raw = llm.generate(&request).await?;
    let (parsed, parse_error) = match extract_json(&raw) {
        Ok(value) => (Some(value), None),
        Err(e) => (None, Some(e)),
    };

    let course_title = parsed
        .as_ref()
        .and_then(|v| v.get("course_title"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .unwrap_or(prompt);
    let course_title = clamp_title(course_title);

    let (module_titles, padded) = exact_titles(parsed.as_ref(), "modules", count, |i| {
        format!("Module {i}: {prompt} Part {i}")
    });

    let outline = Outline {
        course_title,
        module_titles,
    };
    Ok(match padding_reason(padded, count, parse_error) {
        Some(reason) => StageOutput::degraded(outline, reason),
        None => StageOutput::clean(outline),
    })
}

/// Produces exactly `count` lesson titles for one module, padding with
/// `Lesson i: <module> Part i`.
#[tracing::instrument(skip(llm))]
pub async fn lesson_plan(
    llm: &dyn TextGenerator,
    module_title: &str,
    course_prompt: &str,
    count: usize,
) -> GenerationResult<StageOutput<Vec<String>>> {
    let request = format!(
        "You are planning the module \"{module_title}\" of a course about \"{course_prompt}\".\n\
         Split the module into exactly {count} lessons, ordered from basic to advanced.\n\
         Return ONLY a JSON object of the form \
         {{\"lessons\": [{{\"title\": \"...\"}}]}} without any explanation."
    );

    let raw = llm.generate(&request).await?;
    let (parsed, parse_error) = match extract_json(&raw) {
        Ok(value) => (Some(value), None),
        Err(e) => (None, Some(e)),
    };

    let (titles, padded) = exact_titles(parsed.as_ref(), "lessons", count, |i| {
        format!("Lesson {i}: {module_title} Part {i}")
    });

    Ok(match padding_reason(padded, count, parse_error) {
        Some(reason) => StageOutput::degraded(titles, reason),
        None => StageOutput::clean(titles),
    })
}

/// Writes the body of one lesson and picks its video.
///
/// With candidates present the chosen id is always one of them, the first
/// one when the model declines or invents an id. Any failure, including of
/// the service itself, yields a placeholder body instead of an error.
#[tracing::instrument(skip(llm, videos), fields(candidates = videos.len()))]
pub async fn lesson_content(
    llm: &dyn TextGenerator,
    lesson_title: &str,
    module_title: &str,
    course_prompt: &str,
    videos: &[VideoContext],
) -> StageOutput<LessonDraft> {
    let first_candidate = videos.first().map(|v| v.video.id.clone());

    let catalogue = if videos.is_empty() {
        String::from("No videos are available; set \"video_id\" to null.")
    } else {
        videos
            .iter()
            .map(|v| {
                format!(
                    "- id: {}\n  title: {}\n  channel: {}\n  context: {}",
                    v.video.id, v.video.title, v.video.channel, v.context
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let request = format!(
        "Write the lesson \"{lesson_title}\" of the module \"{module_title}\" \
         in a course about \"{course_prompt}\".\n\
         Explain the topic clearly in Markdown with examples.\n\
         Candidate videos:\n{catalogue}\n\
         Pick the single most relevant video by its id.\n\
         Return ONLY a JSON object of the form \
         {{\"content\": \"...\", \"video_id\": \"...\"}} without any explanation."
    );

    let placeholder = |reason: String| {
        StageOutput::degraded(
            LessonDraft {
                title: clamp_title(lesson_title),
                content: format!("Content generation failed for {lesson_title}."),
                video_id: first_candidate.clone(),
            },
            reason,
        )
    };

    let raw = match llm.generate(&request).await {
        Ok(raw) => raw,
        Err(e) => return placeholder(e.to_string()),
    };
    let parsed = match extract_json(&raw) {
        Ok(parsed) => parsed,
        Err(e) => return placeholder(e.to_string()),
    };

    let content = parsed
        .get("content")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|content| !content.is_empty());
    let Some(content) = content else {
        return placeholder(String::from("lesson body missing from output"));
    };

    let proposed = parsed.get("video_id").and_then(Value::as_str).map(str::trim);
    let video_id = match proposed {
        Some(id) if videos.iter().any(|v| v.video.id == id) => Some(id.to_string()),
        _ => first_candidate.clone(),
    };

    StageOutput::clean(LessonDraft {
        title: clamp_title(lesson_title),
        content: content.to_string(),
        video_id,
    })
}

fn parse_question(value: &Value) -> Option<QuestionDraft> {
    let text = value
        .get("question")
        .or_else(|| value.get("question_text"))?
        .as_str()?
        .trim();
    if text.is_empty() {
        return None;
    }

    let options = value
        .get("options")?
        .as_array()?
        .iter()
        .map(|option| option.as_str().map(|o| o.trim().to_string()))
        .collect::<Option<Vec<_>>>()?;
    let correct_answer = value.get("correct_answer")?.as_str()?.trim().to_string();

    let question = QuestionDraft {
        question_text: text.to_string(),
        options,
        correct_answer,
    };
    (question.options.len() == QUIZ_OPTIONS && question.is_well_formed()).then_some(question)
}

/// Builds a multiple-choice quiz over `source`, truncated to `source_chars`.
///
/// Service failures propagate. Unusable output gives an empty quiz titled
/// `suggested_title` or [`GENERIC_QUIZ_TITLE`]; malformed questions are dropped
/// and at most `count` are kept.
#[tracing::instrument(skip(llm, source), fields(source_chars = source.len()))]
pub async fn quiz(
    llm: &dyn TextGenerator,
    source: &str,
    count: usize,
    suggested_title: Option<&str>,
    source_chars: usize,
) -> GenerationResult<StageOutput<QuizDraft>> {
    let source = truncate_chars(source, source_chars);
    let fallback_title = clamp_title(suggested_title.unwrap_or(GENERIC_QUIZ_TITLE));

    let request = format!(
        "Create a multiple-choice quiz with exactly {count} questions based on the text below.\n\
         Every question has exactly {QUIZ_OPTIONS} options and one correct answer, \
         which must be copied verbatim from the options.\n\
         Suggested title: {fallback_title}\n\
         Return ONLY a JSON object of the form \
         {{\"title\": \"...\", \"questions\": [{{\"question\": \"...\", \"options\": [\"...\"], \"correct_answer\": \"...\"}}]}} \
         without any explanation.\n\nText:\n{source}"
    );

    let raw = llm.generate(&request).await?;
    let parsed = match extract_json(&raw) {
        Ok(parsed) => parsed,
        Err(e) => {
            return Ok(StageOutput::degraded(
                QuizDraft {
                    title: fallback_title,
                    questions: Vec::new(),
                },
                e.to_string(),
            ));
        }
    };

    let title = parsed
        .get("title")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .map(clamp_title)
        .unwrap_or(fallback_title);

    let offered = parsed
        .get("questions")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    let mut questions: Vec<QuestionDraft> = offered.iter().filter_map(parse_question).collect();
    questions.truncate(count);

    let quiz = QuizDraft { title, questions };
    if quiz.questions.len() < count {
        let reason = format!(
            "{} of {count} questions usable ({} offered)",
            quiz.questions.len(),
            offered.len()
        );
        return Ok(StageOutput::degraded(quiz, reason));
    }
    Ok(StageOutput::clean(quiz))
}

#[cfg(test)]
mod test {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    /// Answers every prompt with the next scripted reply.
    struct Scripted {
        replies: Mutex<Vec<GenerationResult<String>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(replies: Vec<GenerationResult<String>>) -> Self {
            let mut replies = replies;
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn reply(text: &str) -> Self {
            Self::new(vec![Ok(text.to_string())])
        }
    }

    #[async_trait]
    impl TextGenerator for Scripted {
        async fn generate(&self, prompt: &str) -> GenerationResult<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(GenerationError::Service(String::from("script exhausted"))))
        }
    }

    fn candidate(id: &str) -> VideoContext {
        VideoContext {
            video: VideoCandidate {
                id: id.to_string(),
                title: format!("Video {id}"),
                description: String::new(),
                channel: String::from("Channel"),
            },
            context: String::from("Title: x\nDescription: y"),
        }
    }

    #[tokio::test]
    async fn outline_returns_requested_titles() {
        let llm = Scripted::reply(
            r#"{"course_title": "Rust 101", "modules": [{"title": "Ownership"}, {"title": "Traits"}]}"#,
        );
        let out = outline(&llm, "Rust", 2).await.unwrap();
        assert_eq!(out.value.course_title, "Rust 101");
        assert_eq!(out.value.module_titles, vec!["Ownership", "Traits"]);
        assert!(out.degraded.is_none());
    }

    #[tokio::test]
    async fn outline_pads_short_and_empty_titles() {
        let llm = Scripted::reply(r#"{"modules": [{"title": "Ownership"}, {"title": "  "}, 7]}"#);
        let out = outline(&llm, "Rust", 4).await.unwrap();
        assert_eq!(
            out.value.module_titles,
            vec![
                "Ownership",
                "Module 2: Rust Part 2",
                "Module 3: Rust Part 3",
                "Module 4: Rust Part 4",
            ]
        );
        assert_eq!(out.value.course_title, "Rust");
        assert!(out.degraded.is_some());
    }

    #[tokio::test]
    async fn outline_truncates_extra_titles() {
        let llm = Scripted::reply(r#"{"modules": ["A", "B", "C"]}"#);
        let out = outline(&llm, "Rust", 2).await.unwrap();
        assert_eq!(out.value.module_titles, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn outline_exact_count_for_any_malformation() {
        for count in 1..=6 {
            let llm = Scripted::reply("I cannot help with that");
            let out = outline(&llm, "Go", count).await.unwrap();
            assert_eq!(out.value.module_titles.len(), count);
            assert_eq!(out.value.module_titles[0], "Module 1: Go Part 1");
        }
    }

    #[tokio::test]
    async fn outline_propagates_service_failure() {
        let llm = Scripted::new(vec![Err(GenerationError::Service(String::from("down")))]);
        assert!(matches!(
            outline(&llm, "Rust", 3).await,
            Err(GenerationError::Service(_))
        ));
    }

    #[tokio::test]
    async fn lesson_plan_pads_to_count() {
        let llm = Scripted::reply(r#"```json
{"lessons": [{"title": "Moves"}]}
```"#);
        let out = lesson_plan(&llm, "Ownership", "Rust", 3).await.unwrap();
        assert_eq!(
            out.value,
            vec!["Moves", "Lesson 2: Ownership Part 2", "Lesson 3: Ownership Part 3"]
        );
    }

    #[tokio::test]
    async fn content_keeps_known_video() {
        let llm = Scripted::reply(r#"{"content": "Body", "video_id": "b"}"#);
        let out = lesson_content(&llm, "Moves", "Ownership", "Rust", &[candidate("a"), candidate("b")]).await;
        assert_eq!(out.value.content, "Body");
        assert_eq!(out.value.video_id.as_deref(), Some("b"));
        assert!(out.degraded.is_none());
    }

    #[tokio::test]
    async fn content_replaces_unknown_or_missing_video() {
        for reply in [
            r#"{"content": "Body", "video_id": "zzz"}"#,
            r#"{"content": "Body", "video_id": null}"#,
            r#"{"content": "Body"}"#,
        ] {
            let llm = Scripted::reply(reply);
            let out = lesson_content(&llm, "Moves", "Ownership", "Rust", &[candidate("a"), candidate("b")]).await;
            assert_eq!(out.value.video_id.as_deref(), Some("a"));
        }
    }

    #[tokio::test]
    async fn content_without_candidates_has_no_video() {
        let llm = Scripted::reply(r#"{"content": "Body", "video_id": "made-up"}"#);
        let out = lesson_content(&llm, "Moves", "Ownership", "Rust", &[]).await;
        assert_eq!(out.value.video_id, None);
    }

    #[tokio::test]
    async fn content_failure_yields_placeholder() {
        let llm = Scripted::new(vec![Err(GenerationError::Service(String::from("quota")))]);
        let out = lesson_content(&llm, "Moves", "Ownership", "Rust", &[candidate("a")]).await;
        assert_eq!(out.value.content, "Content generation failed for Moves.");
        assert_eq!(out.value.video_id.as_deref(), Some("a"));
        assert!(out.degraded.unwrap().contains("quota"));

        let llm = Scripted::reply("no json at all");
        let out = lesson_content(&llm, "Moves", "Ownership", "Rust", &[]).await;
        assert_eq!(out.value.content, "Content generation failed for Moves.");
        assert_eq!(out.value.video_id, None);
        assert!(out.degraded.is_some());
    }

    #[tokio::test]
    async fn quiz_filters_malformed_questions() {
        let llm = Scripted::reply(
            r#"{"title": "Check", "questions": [
                {"question": "Q1", "options": ["a", "b", "c", "d"], "correct_answer": "b"},
                {"question": "Q2", "options": ["a", "b", "c", "d"], "correct_answer": "e"},
                {"question_text": "Q3", "options": ["a", "b", "c", "d"], "correct_answer": "d"},
                {"question": "Q4", "options": [], "correct_answer": "a"},
                {"options": ["a"], "correct_answer": "a"},
                {"question": "Q5", "options": ["a", "b"], "correct_answer": "a"},
                {"question": "Q6", "options": ["a", "b", "c", "d", "e"], "correct_answer": "e"}
            ]}"#,
        );
        let out = quiz(&llm, "text", 5, None, 100).await.unwrap();
        assert_eq!(out.value.title, "Check");
        let texts: Vec<_> = out.value.questions.iter().map(|q| q.question_text.as_str()).collect();
        assert_eq!(texts, vec!["Q1", "Q3"]);
        assert!(out.value.questions.iter().all(QuestionDraft::is_well_formed));
        assert!(out.value.questions.iter().all(|q| q.options.len() == QUIZ_OPTIONS));
        assert!(out.degraded.is_some());
    }

    #[tokio::test]
    async fn quiz_truncates_to_count() {
        let question = r#"{"question": "Q", "options": ["a", "b", "c", "d"], "correct_answer": "a"}"#;
        let reply = format!(r#"{{"title": "T", "questions": [{question}, {question}, {question}]}}"#);
        let llm = Scripted::reply(&reply);
        let out = quiz(&llm, "text", 2, None, 100).await.unwrap();
        assert_eq!(out.value.questions.len(), 2);
        assert!(out.degraded.is_none());
    }

    #[tokio::test]
    async fn quiz_survives_garbage() {
        let llm = Scripted::reply("Sorry, I can't do that.");
        let out = quiz(&llm, "text", 3, None, 100).await.unwrap();
        assert_eq!(out.value.title, GENERIC_QUIZ_TITLE);
        assert!(out.value.questions.is_empty());

        let llm = Scripted::reply("{\"questions\": \"none\"}");
        let out = quiz(&llm, "text", 3, Some("Final Assessment"), 100).await.unwrap();
        assert_eq!(out.value.title, "Final Assessment");
        assert!(out.value.questions.is_empty());
    }

    #[tokio::test]
    async fn quiz_source_is_truncated() {
        let llm = Scripted::reply("{}");
        let source = "x".repeat(500);
        quiz(&llm, &source, 1, None, 50).await.unwrap();

        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].ends_with(&"x".repeat(50)));
        assert!(!prompts[0].contains(&"x".repeat(51)));
    }
}
