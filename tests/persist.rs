mod common;
use academy::model::draft::{CourseDraft, LessonDraft, ModuleDraft, QuestionDraft, QuizDraft};
use academy::model::entity::{Module, ModuleCreate, ModuleKind, UserEntity};
use academy::model::{
    CrudRepository, DatabaseError, ModelManager, append_module, persist_course,
};
use academy::web::AuthenticatedUser;
use uuid::Uuid;

use crate::common::setup_test_db;

fn lesson(title: &str) -> LessonDraft {
    LessonDraft {
        title: title.to_string(),
        content: format!("About {title}"),
        video_id: None,
    }
}

fn quiz() -> QuizDraft {
    QuizDraft {
        title: String::from("Quiz"),
        questions: vec![QuestionDraft {
            question_text: String::from("Pick a"),
            options: vec![String::from("a"), String::from("b")],
            correct_answer: String::from("a"),
        }],
    }
}

async fn admin_id(mm: &ModelManager) -> Uuid {
    UserEntity::find_by_username(mm, &AuthenticatedUser::admin(), "admin")
        .await
        .unwrap()
        .expect("seeded admin")
        .id()
}

async fn count(mm: &ModelManager, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(mm.executor())
        .await
        .unwrap()
}

#[tokio::test]
async fn failed_insert_rolls_back_whole_course() {
    let db = setup_test_db().await;
    let mm = db.model_manager();
    let owner = admin_id(&mm).await;

    let draft = CourseDraft {
        title: String::from("Doomed"),
        modules: vec![
            ModuleDraft::content("One", vec![lesson("A"), lesson("B")]),
            ModuleDraft::assessment("Check", quiz()),
            // the store refuses titles over 200 characters
            ModuleDraft::content("Two", vec![lesson("C"), lesson(&"x".repeat(201))]),
        ],
    };

    assert!(persist_course(&mm, owner, &draft).await.is_err());

    for table in ["courses", "modules", "lessons", "quizzes", "questions"] {
        assert_eq!(count(&mm, table).await, 0, "{table} left behind");
    }
}

#[tokio::test]
async fn concurrent_appends_get_distinct_positions() {
    let db = setup_test_db().await;
    let mm = db.model_manager();
    let owner = admin_id(&mm).await;

    let course = persist_course(
        &mm,
        owner,
        &CourseDraft {
            title: String::from("Base"),
            modules: vec![ModuleDraft::content("One", vec![lesson("A")])],
        },
    )
    .await
    .unwrap();

    let first = ModuleDraft::content("Two", vec![lesson("B")]);
    let second = ModuleDraft::assessment("Review", quiz());
    let (a, b) = tokio::join!(
        append_module(&mm, course.id(), &first),
        append_module(&mm, course.id(), &second),
    );

    let mut orders = vec![a.unwrap().order_index(), b.unwrap().order_index()];
    orders.sort();
    assert_eq!(orders, vec![2, 3]);
}

#[tokio::test]
async fn manual_create_and_append_do_not_collide() {
    let db = setup_test_db().await;
    let mm = db.model_manager();
    let owner = admin_id(&mm).await;
    let actor = AuthenticatedUser::admin();

    let course = persist_course(
        &mm,
        owner,
        &CourseDraft {
            title: String::from("Base"),
            modules: vec![ModuleDraft::content("One", vec![lesson("A")])],
        },
    )
    .await
    .unwrap();

    let generated = ModuleDraft::assessment("Review", quiz());
    let manual = ModuleCreate {
        course_id: course.id(),
        title: String::from("Extra"),
        order_index: None,
        kind: ModuleKind::Content,
    };
    let (a, b) = tokio::join!(
        append_module(&mm, course.id(), &generated),
        Module::create(&mm, &actor, manual),
    );

    let mut orders = vec![a.unwrap().order_index(), b.unwrap().order_index()];
    orders.sort();
    assert_eq!(orders, vec![2, 3]);

    let missing = ModuleCreate {
        course_id: Uuid::new_v4(),
        title: String::from("Orphan"),
        order_index: None,
        kind: ModuleKind::Content,
    };
    let result = Module::create(&mm, &actor, missing).await;
    assert!(matches!(result, Err(DatabaseError::ParentNotFound)));
}

#[tokio::test]
async fn append_to_missing_course_fails() {
    let db = setup_test_db().await;
    let mm = db.model_manager();

    let result = append_module(&mm, Uuid::new_v4(), &ModuleDraft::assessment("Review", quiz())).await;
    assert!(matches!(result, Err(DatabaseError::ParentNotFound)));
    assert_eq!(count(&mm, "modules").await, 0);
}
