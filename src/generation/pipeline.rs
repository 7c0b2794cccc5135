use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    config::GenerationConfig,
    generation::{
        GeminiClient, GenerationError, GenerationResult, HttpTranscriptSource, TextGenerator,
        TranscriptSource, VideoSearch, YouTubeClient, clamp_title,
        stages::{self, StageOutput, VideoContext},
    },
    model::{
        ModelManager, append_module,
        draft::{CourseDraft, LessonDraft, ModuleDraft, QuizDraft},
        entity::{Course, Lesson, Module, ModuleKind},
        persist_course,
    },
    web::AdminGrant,
};

pub const MAX_CONTENT_MODULES: usize = 20;
pub const MAX_LESSONS_PER_MODULE: usize = 15;
const MAX_PROMPT_CHARS: usize = 1000;
const FINAL_MODULE_TITLE: &str = "Final Assessment";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Outline,
    PlanningLessons,
    Content,
    IntermediateQuizzes,
    FinalQuiz,
    Persist,
    Done,
    Failed,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Outline => "outline",
            Self::PlanningLessons => "planning_lessons",
            Self::Content => "content",
            Self::IntermediateQuizzes => "intermediate_quizzes",
            Self::FinalQuiz => "final_quiz",
            Self::Persist => "persist",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something the pipeline substituted instead of failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct DegradedItem {
    pub stage: PipelineStage,
    /// Module, lesson or quiz title the substitution applies to.
    pub item: String,
    pub reason: String,
}

/// Partial-success summary returned next to every generated course or module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct GenerationReport {
    pub modules: usize,
    pub lessons: usize,
    pub questions: usize,
    pub degraded: Vec<DegradedItem>,
}

impl GenerationReport {
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }

    /// Placeholder lessons written because content generation failed.
    pub fn failed_lessons(&self) -> usize {
        self.degraded
            .iter()
            .filter(|item| item.stage == PipelineStage::Content)
            .count()
    }

    fn count(&mut self, module: &ModuleDraft) {
        self.modules += 1;
        self.lessons += module.lessons().len();
        self.questions += module.quiz().map_or(0, |quiz| quiz.questions.len());
    }
}

#[derive(Debug, Clone)]
pub struct CourseRequest {
    pub prompt: String,
    pub num_content_modules: usize,
    pub num_lessons_per_module: usize,
    pub num_test_modules: usize,
}

#[derive(Debug, Clone)]
pub struct ModuleRequest {
    pub prompt: String,
    pub kind: ModuleKind,
    pub num_lessons: usize,
}

fn validate_prompt(prompt: &str) -> GenerationResult<()> {
    if prompt.trim().is_empty() {
        return Err(GenerationError::InvalidRequest(String::from("prompt must not be empty")));
    }
    if prompt.chars().count() > MAX_PROMPT_CHARS {
        return Err(GenerationError::InvalidRequest(format!(
            "prompt must be at most {MAX_PROMPT_CHARS} characters"
        )));
    }
    Ok(())
}

fn validate_lessons(count: usize) -> GenerationResult<()> {
    if !(1..=MAX_LESSONS_PER_MODULE).contains(&count) {
        return Err(GenerationError::InvalidRequest(format!(
            "lessons per module must be between 1 and {MAX_LESSONS_PER_MODULE}"
        )));
    }
    Ok(())
}

impl CourseRequest {
    pub fn validate(&self) -> GenerationResult<()> {
        validate_prompt(&self.prompt)?;
        if !(1..=MAX_CONTENT_MODULES).contains(&self.num_content_modules) {
            return Err(GenerationError::InvalidRequest(format!(
                "content modules must be between 1 and {MAX_CONTENT_MODULES}"
            )));
        }
        validate_lessons(self.num_lessons_per_module)
    }

    /// Intermediate tests actually injected; never more than content modules.
    pub fn test_modules(&self) -> usize {
        self.num_test_modules.min(self.num_content_modules)
    }
}

impl ModuleRequest {
    pub fn validate(&self) -> GenerationResult<()> {
        validate_prompt(&self.prompt)?;
        match self.kind {
            ModuleKind::Content => validate_lessons(self.num_lessons),
            ModuleKind::Assessment => Ok(()),
        }
    }
}

/// 1-based positions of the content modules followed by an intermediate test.
///
/// Tests go after every `floor(content / tests)`-th content module, at most
/// `tests` of them, with `tests` clamped to `content`.
pub fn assessment_slots(content: usize, tests: usize) -> Vec<usize> {
    let tests = tests.min(content);
    if tests == 0 {
        return Vec::new();
    }

    let interval = content / tests;
    (1..=content)
        .filter(|position| position % interval == 0)
        .take(tests)
        .collect()
}

/// Sizes handed to the stages.
#[derive(Debug, Clone, Copy)]
pub struct GenerationSettings {
    pub videos_per_lesson: u32,
    pub questions_per_quiz: usize,
    pub final_quiz_questions: usize,
    pub quiz_source_chars: usize,
}

impl From<&GenerationConfig> for GenerationSettings {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            videos_per_lesson: config.videos_per_lesson(),
            questions_per_quiz: config.questions_per_quiz(),
            final_quiz_questions: config.final_quiz_questions(),
            quiz_source_chars: config.quiz_source_chars(),
        }
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self::from(&GenerationConfig::default())
    }
}

/// Tracks the current stage and collects degraded items for one request.
struct Run {
    stage: PipelineStage,
    report: GenerationReport,
}

impl Run {
    fn new() -> Self {
        Self {
            stage: PipelineStage::Outline,
            report: GenerationReport::default(),
        }
    }

    fn enter(&mut self, stage: PipelineStage) {
        if self.stage != stage {
            tracing::debug!(from = %self.stage, to = %stage, "pipeline stage");
        }
        self.stage = stage;
    }

    fn accept<T>(&mut self, item: &str, output: StageOutput<T>) -> T {
        if let Some(reason) = output.degraded {
            tracing::warn!(stage = %self.stage, item, "degraded: {reason}");
            self.report.degraded.push(DegradedItem {
                stage: self.stage,
                item: item.to_string(),
                reason,
            });
        }
        output.value
    }

    fn fail(&self, error: GenerationError) -> GenerationError {
        let error = error.at(self.stage);
        tracing::error!(stage = %self.stage, to = %PipelineStage::Failed, "{error}");
        error
    }

    fn done(mut self) -> GenerationReport {
        self.enter(PipelineStage::Done);
        self.report
    }
}

/// Runs the generation stages against the configured services.
#[derive(Clone)]
pub struct CourseGenerator {
    llm: Arc<dyn TextGenerator>,
    videos: Arc<dyn VideoSearch>,
    transcripts: Arc<dyn TranscriptSource>,
    settings: GenerationSettings,
}

impl std::fmt::Debug for CourseGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CourseGenerator")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl CourseGenerator {
    pub fn new(
        llm: Arc<dyn TextGenerator>,
        videos: Arc<dyn VideoSearch>,
        transcripts: Arc<dyn TranscriptSource>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            llm,
            videos,
            transcripts,
            settings,
        }
    }

    /// Gemini, YouTube and the transcript service as configured.
    pub fn from_config(config: &GenerationConfig) -> GenerationResult<Self> {
        Ok(Self::new(
            Arc::new(GeminiClient::new(config)?),
            Arc::new(YouTubeClient::new(config)?),
            Arc::new(HttpTranscriptSource::new(config)?),
            GenerationSettings::from(config),
        ))
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// Generates a whole course without writing anything.
    #[tracing::instrument(skip(self, grant), fields(admin = %grant.user_id()))]
    pub async fn draft_course(
        &self,
        grant: &AdminGrant,
        request: &CourseRequest,
    ) -> GenerationResult<(CourseDraft, GenerationReport)> {
        let mut run = Run::new();
        let draft = self.draft(&mut run, request).await.map_err(|e| run.fail(e))?;
        Ok((draft, run.done()))
    }

    /// Generates a course and persists it as a draft owned by the grant holder.
    #[tracing::instrument(skip(self, mm, grant), fields(admin = %grant.user_id()))]
    pub async fn generate_course(
        &self,
        mm: &ModelManager,
        grant: &AdminGrant,
        request: &CourseRequest,
    ) -> GenerationResult<(Course, GenerationReport)> {
        let mut run = Run::new();
        let draft = self.draft(&mut run, request).await.map_err(|e| run.fail(e))?;

        run.enter(PipelineStage::Persist);
        let course = persist_course(mm, grant.user_id(), &draft)
            .await
            .map_err(|e| run.fail(e.into()))?;

        let report = run.done();
        tracing::info!(
            course_id = %course.id(),
            modules = report.modules,
            degraded = report.degraded.len(),
            "course generated"
        );
        Ok((course, report))
    }

    /// Generates one module and appends it after the last module of `course`.
    #[tracing::instrument(skip(self, mm, grant, course), fields(admin = %grant.user_id(), course_id = %course.id()))]
    pub async fn generate_module(
        &self,
        mm: &ModelManager,
        grant: &AdminGrant,
        course: &Course,
        request: &ModuleRequest,
    ) -> GenerationResult<(Module, GenerationReport)> {
        let mut run = Run::new();
        let draft = self
            .draft_module(&mut run, mm, course, request)
            .await
            .map_err(|e| run.fail(e))?;

        run.enter(PipelineStage::Persist);
        let module = append_module(mm, course.id(), &draft)
            .await
            .map_err(|e| run.fail(e.into()))?;

        Ok((module, run.done()))
    }

    async fn draft(&self, run: &mut Run, request: &CourseRequest) -> GenerationResult<CourseDraft> {
        request.validate()?;
        let prompt = request.prompt.trim();
        let slots = assessment_slots(request.num_content_modules, request.test_modules());

        run.enter(PipelineStage::Outline);
        let outline = stages::outline(self.llm.as_ref(), prompt, request.num_content_modules).await?;
        let outline = run.accept("outline", outline);

        let mut modules = Vec::with_capacity(request.num_content_modules + slots.len() + 1);
        let mut course_text: Vec<String> = Vec::new();
        let mut chunk_text: Vec<String> = Vec::new();

        for (index, module_title) in outline.module_titles.iter().enumerate() {
            let module = self
                .content_module(run, module_title, prompt, request.num_lessons_per_module)
                .await?;

            let text: Vec<String> = module.lessons().iter().map(lesson_text).collect();
            chunk_text.extend(text.iter().cloned());
            course_text.extend(text);
            run.report.count(&module);
            modules.push(module);

            if slots.contains(&(index + 1)) {
                run.enter(PipelineStage::IntermediateQuizzes);
                let number = slots.iter().position(|slot| *slot == index + 1).unwrap_or(0) + 1;
                let title = format!("Checkpoint {number}: {module_title}");
                let quiz = self
                    .quiz(run, &chunk_text.join("\n\n"), self.settings.questions_per_quiz, &title)
                    .await?;
                chunk_text.clear();

                let module = ModuleDraft::assessment(clamp_title(&title), quiz);
                run.report.count(&module);
                modules.push(module);
            }
        }

        run.enter(PipelineStage::FinalQuiz);
        let title = format!("{FINAL_MODULE_TITLE}: {}", outline.course_title);
        let quiz = self
            .quiz(run, &course_text.join("\n\n"), self.settings.final_quiz_questions, &title)
            .await?;
        let module = ModuleDraft::assessment(FINAL_MODULE_TITLE, quiz);
        run.report.count(&module);
        modules.push(module);

        Ok(CourseDraft {
            title: outline.course_title,
            modules,
        })
    }

    async fn draft_module(
        &self,
        run: &mut Run,
        mm: &ModelManager,
        course: &Course,
        request: &ModuleRequest,
    ) -> GenerationResult<ModuleDraft> {
        request.validate()?;
        let prompt = request.prompt.trim();

        let module = match request.kind {
            ModuleKind::Content => {
                run.enter(PipelineStage::Outline);
                let outline = stages::outline(self.llm.as_ref(), prompt, 1).await?;
                let outline = run.accept("outline", outline);
                let title = outline
                    .module_titles
                    .into_iter()
                    .next()
                    .unwrap_or_else(|| clamp_title(prompt));

                self.content_module(run, &title, prompt, request.num_lessons)
                    .await?
            }
            ModuleKind::Assessment => {
                run.enter(PipelineStage::IntermediateQuizzes);
                let existing = Lesson::course_text(mm, course.id()).await?;
                let source = if existing.is_empty() {
                    prompt.to_string()
                } else {
                    existing.join("\n\n")
                };

                let quiz = self
                    .quiz(run, &source, self.settings.questions_per_quiz, prompt)
                    .await?;
                ModuleDraft::assessment(quiz.title.clone(), quiz)
            }
        };

        run.report.count(&module);
        Ok(module)
    }

    async fn content_module(
        &self,
        run: &mut Run,
        module_title: &str,
        prompt: &str,
        lessons: usize,
    ) -> GenerationResult<ModuleDraft> {
        run.enter(PipelineStage::PlanningLessons);
        let plan = stages::lesson_plan(self.llm.as_ref(), module_title, prompt, lessons).await?;
        let plan = run.accept(module_title, plan);

        run.enter(PipelineStage::Content);
        let mut drafts: Vec<LessonDraft> = Vec::with_capacity(plan.len());
        for lesson_title in &plan {
            let videos = self.video_contexts(lesson_title, prompt).await;
            let lesson =
                stages::lesson_content(self.llm.as_ref(), lesson_title, module_title, prompt, &videos)
                    .await;
            drafts.push(run.accept(lesson_title, lesson));
        }

        Ok(ModuleDraft::content(module_title, drafts))
    }

    async fn video_contexts(&self, lesson_title: &str, prompt: &str) -> Vec<VideoContext> {
        let query = format!("{lesson_title} {prompt}");
        let candidates = self
            .videos
            .search(&query, self.settings.videos_per_lesson)
            .await;

        let mut contexts = Vec::with_capacity(candidates.len());
        for video in candidates {
            let context = self.transcripts.context_for(&video).await;
            contexts.push(VideoContext { video, context });
        }
        contexts
    }

    async fn quiz(
        &self,
        run: &mut Run,
        source: &str,
        questions: usize,
        title: &str,
    ) -> GenerationResult<QuizDraft> {
        let quiz = stages::quiz(
            self.llm.as_ref(),
            source,
            questions,
            Some(title),
            self.settings.quiz_source_chars,
        )
        .await?;
        Ok(run.accept(title, quiz))
    }
}

fn lesson_text(lesson: &LessonDraft) -> String {
    format!("{}\n{}", lesson.title, lesson.content)
}

#[cfg(test)]
mod test {
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use async_trait::async_trait;
    use uuid::Uuid;

    use super::*;
    use crate::{
        generation::VideoCandidate,
        web::{AuthenticatedUser, UserRole},
    };

    /// Answers by looking at which JSON shape the prompt asks for.
    #[derive(Default)]
    struct FakeLlm {
        calls: AtomicUsize,
        fail_outline: bool,
        garbage_content: bool,
        quiz_sources: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TextGenerator for FakeLlm {
        async fn generate(&self, prompt: &str) -> GenerationResult<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);

            if prompt.contains("\"questions\"") {
                self.quiz_sources.lock().unwrap().push(prompt.to_string());
                return Ok(String::from(
                    r#"{"title": "Quiz", "questions": [
                        {"question": "Pick b", "options": ["a", "b", "c", "d"], "correct_answer": "b"}
                    ]}"#,
                ));
            }
            if prompt.contains("\"video_id\"") {
                if self.garbage_content {
                    return Ok(String::from("no idea"));
                }
                return Ok(format!(r#"{{"content": "Body {call}", "video_id": "v2"}}"#));
            }
            if prompt.contains("\"lessons\"") {
                return Ok(String::from(r#"{"lessons": [{"title": "First"}, {"title": "Second"}]}"#));
            }
            if self.fail_outline {
                return Err(GenerationError::Service(String::from("unavailable")));
            }
            Ok(String::from(r#"{"course_title": "Generated", "modules": []}"#))
        }
    }

    struct FakeVideos;

    #[async_trait]
    impl VideoSearch for FakeVideos {
        async fn search(&self, _query: &str, max_results: u32) -> Vec<VideoCandidate> {
            (1..=max_results)
                .map(|i| VideoCandidate {
                    id: format!("v{i}"),
                    title: format!("Video {i}"),
                    description: String::new(),
                    channel: String::from("Channel"),
                })
                .collect()
        }
    }

    struct FakeTranscripts;

    #[async_trait]
    impl TranscriptSource for FakeTranscripts {
        async fn context_for(&self, video: &VideoCandidate) -> String {
            crate::generation::fallback_context(video)
        }
    }

    fn generator(llm: FakeLlm) -> CourseGenerator {
        CourseGenerator::new(
            Arc::new(llm),
            Arc::new(FakeVideos),
            Arc::new(FakeTranscripts),
            GenerationSettings {
                videos_per_lesson: 3,
                questions_per_quiz: 1,
                final_quiz_questions: 1,
                quiz_source_chars: 25_000,
            },
        )
    }

    fn grant() -> AdminGrant {
        AuthenticatedUser::new(Uuid::new_v4(), UserRole::Admin)
            .admin_grant()
            .unwrap()
    }

    fn request(content: usize, tests: usize) -> CourseRequest {
        CourseRequest {
            prompt: String::from("Rust"),
            num_content_modules: content,
            num_lessons_per_module: 2,
            num_test_modules: tests,
        }
    }

    #[test]
    fn slots_for_six_modules_two_tests() {
        assert_eq!(assessment_slots(6, 2), vec![3, 6]);
    }

    #[test]
    fn slots_are_clamped_and_bounded() {
        assert_eq!(assessment_slots(3, 10), vec![1, 2, 3]);
        assert_eq!(assessment_slots(7, 2), vec![3, 6]);
        assert_eq!(assessment_slots(5, 0), Vec::<usize>::new());
        assert_eq!(assessment_slots(4, 1), vec![4]);
    }

    #[tokio::test]
    async fn six_modules_two_tests_gives_nine_modules() {
        let generator = generator(FakeLlm::default());
        let (draft, report) = generator.draft_course(&grant(), &request(6, 2)).await.unwrap();

        use ModuleKind::{Assessment as A, Content as C};
        assert_eq!(draft.kinds(), vec![C, C, C, A, C, C, C, A, A]);
        assert_eq!(draft.modules.last().unwrap().title, FINAL_MODULE_TITLE);
        assert_eq!(report.modules, 9);
        assert_eq!(report.lessons, 12);
        assert_eq!(report.questions, 3);
    }

    #[tokio::test]
    async fn outline_padding_reaches_the_report() {
        let generator = generator(FakeLlm::default());
        let (draft, report) = generator.draft_course(&grant(), &request(2, 0)).await.unwrap();

        assert_eq!(draft.title, "Generated");
        assert_eq!(draft.modules[0].title, "Module 1: Rust Part 1");
        assert_eq!(draft.modules[1].title, "Module 2: Rust Part 2");
        assert!(report
            .degraded
            .iter()
            .any(|item| item.stage == PipelineStage::Outline));
    }

    #[tokio::test]
    async fn every_lesson_gets_a_candidate_video() {
        let generator = generator(FakeLlm::default());
        let (draft, _) = generator.draft_course(&grant(), &request(2, 1)).await.unwrap();

        for module in &draft.modules {
            for lesson in module.lessons() {
                assert_eq!(lesson.video_id.as_deref(), Some("v2"));
                assert!(lesson.content.starts_with("Body"));
            }
        }
    }

    #[tokio::test]
    async fn failed_lessons_are_reported_not_fatal() {
        let generator = generator(FakeLlm {
            garbage_content: true,
            ..Default::default()
        });
        let (draft, report) = generator.draft_course(&grant(), &request(1, 0)).await.unwrap();

        let lessons = draft.modules[0].lessons();
        assert_eq!(lessons[0].content, "Content generation failed for First.");
        assert_eq!(lessons[0].video_id.as_deref(), Some("v1"));
        assert_eq!(report.failed_lessons(), 2);
    }

    #[tokio::test]
    async fn intermediate_quiz_covers_its_chunk_only() {
        let llm = Arc::new(FakeLlm::default());
        let generator = CourseGenerator::new(
            llm.clone(),
            Arc::new(FakeVideos),
            Arc::new(FakeTranscripts),
            GenerationSettings::default(),
        );
        generator.draft_course(&grant(), &request(2, 2)).await.unwrap();

        let sources = llm.quiz_sources.lock().unwrap();
        assert_eq!(sources.len(), 3);
        assert_eq!(sources[0].matches("First\nBody").count(), 1);
        assert_eq!(sources[1].matches("First\nBody").count(), 1);
        // the final quiz sees the lessons of both modules
        assert_eq!(sources[2].matches("First\nBody").count(), 2);
    }

    #[tokio::test]
    async fn outline_failure_is_tagged_with_stage() {
        let generator = generator(FakeLlm {
            fail_outline: true,
            ..Default::default()
        });
        let err = generator.draft_course(&grant(), &request(2, 1)).await.unwrap_err();
        assert_eq!(err.stage(), Some(PipelineStage::Outline));
        assert!(matches!(err.root(), GenerationError::Service(_)));
    }

    #[tokio::test]
    async fn invalid_requests_are_rejected() {
        let generator = generator(FakeLlm::default());
        for bad in [
            request(0, 0),
            request(MAX_CONTENT_MODULES + 1, 0),
            CourseRequest {
                prompt: String::from("   "),
                ..request(1, 0)
            },
            CourseRequest {
                num_lessons_per_module: 0,
                ..request(1, 0)
            },
        ] {
            let err = generator.draft_course(&grant(), &bad).await.unwrap_err();
            assert!(err.is_invalid_request());
        }
    }

    #[test]
    fn assessment_module_request_ignores_lesson_count() {
        let request = ModuleRequest {
            prompt: String::from("Rust"),
            kind: ModuleKind::Assessment,
            num_lessons: 0,
        };
        assert!(request.validate().is_ok());
    }
}
