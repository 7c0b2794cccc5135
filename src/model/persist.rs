use sqlx::PgConnection;
use uuid::Uuid;

use crate::model::{
    DatabaseError, DatabaseResult, ModelManager,
    draft::{CourseDraft, ModuleBody, ModuleDraft},
    entity::{Course, CourseCreate, CourseStatus, Lesson, Module, Question, Quiz},
};

/// Writes a generated course tree in a single transaction.
///
/// Order numbers start at 1 and follow the draft order for modules, lessons
/// and questions. Any failing insert rolls back the whole course.
#[tracing::instrument(skip(mm, draft), fields(title = %draft.title, modules = draft.modules.len()))]
pub async fn persist_course(
    mm: &ModelManager,
    owner: Uuid,
    draft: &CourseDraft,
) -> DatabaseResult<Course> {
    let mut tx = mm.begin().await?;

    let course = Course::insert(
        &mut *tx,
        &CourseCreate {
            title: draft.title.clone(),
            created_by: owner,
            status: CourseStatus::Draft,
        },
    )
    .await?;

    for (index, module) in draft.modules.iter().enumerate() {
        write_module(&mut tx, course.id(), module, index as i32 + 1).await?;
    }

    tx.commit().await?;
    tracing::debug!(course_id = %course.id(), "course persisted");
    Ok(course)
}

/// Appends one generated module after the last module of `course_id`.
#[tracing::instrument(skip(mm, draft), fields(title = %draft.title))]
pub async fn append_module(
    mm: &ModelManager,
    course_id: Uuid,
    draft: &ModuleDraft,
) -> DatabaseResult<Module> {
    let mut tx = mm.begin().await?;

    let order_index = lock_module_order(&mut tx, course_id).await?;
    let module = write_module(&mut tx, course_id, draft, order_index).await?;

    tx.commit().await?;
    Ok(module)
}

/// Takes the transaction-scoped advisory lock of `course_id` and returns the
/// next free module order number. Every writer that assigns module order
/// goes through here, so two transactions never read the same maximum.
pub(crate) async fn lock_module_order(
    conn: &mut PgConnection,
    course_id: Uuid,
) -> DatabaseResult<i32> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(course_id.to_string())
        .execute(&mut *conn)
        .await?;

    let course_exists: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM courses WHERE id = $1)")
            .bind(course_id)
            .fetch_one(&mut *conn)
            .await?;
    if !course_exists {
        return Err(DatabaseError::ParentNotFound);
    }

    Module::next_order_index(&mut *conn, course_id).await
}

async fn write_module(
    conn: &mut PgConnection,
    course_id: Uuid,
    draft: &ModuleDraft,
    order_index: i32,
) -> DatabaseResult<Module> {
    let module = Module::insert(&mut *conn, course_id, &draft.title, order_index, draft.kind()).await?;

    match &draft.body {
        ModuleBody::Content { lessons } => {
            for (index, lesson) in lessons.iter().enumerate() {
                Lesson::insert(
                    &mut *conn,
                    module.id(),
                    &lesson.title,
                    &lesson.content,
                    index as i32 + 1,
                    lesson.video_id.as_deref(),
                )
                .await?;
            }
        }
        ModuleBody::Assessment { quiz } => {
            let stored = Quiz::insert(&mut *conn, module.id(), &quiz.title).await?;
            for (index, question) in quiz.questions.iter().enumerate() {
                Question::insert(
                    &mut *conn,
                    stored.id(),
                    &question.question_text,
                    &question.options,
                    &question.correct_answer,
                    index as i32 + 1,
                )
                .await?;
            }
        }
    }

    Ok(module)
}
