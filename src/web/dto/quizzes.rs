use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::entity::Question;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct QuizCreateBody {
    pub module_id: Uuid,
    pub title: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct QuizPatchBody {
    pub title: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct QuestionCreateBody {
    pub quiz_id: Uuid,
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub order_index: Option<i32>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct QuestionPatchBody {
    pub question_text: Option<String>,
    pub options: Option<Vec<String>>,
    pub correct_answer: Option<String>,
    pub order_index: Option<i32>,
}

/// Chosen option per question id. Unanswered questions count as wrong.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct QuizCheckRequest {
    pub answers: HashMap<Uuid, String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, utoipa::ToSchema)]
pub struct QuestionResult {
    pub question_id: Uuid,
    pub is_correct: bool,
    pub correct_answer: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, utoipa::ToSchema)]
pub struct QuizCheckResponse {
    pub score: usize,
    pub total: usize,
    pub results: Vec<QuestionResult>,
}

impl QuizCheckResponse {
    pub fn grade(questions: &[Question], answers: &HashMap<Uuid, String>) -> Self {
        let results: Vec<QuestionResult> = questions
            .iter()
            .map(|question| QuestionResult {
                question_id: question.id(),
                is_correct: answers
                    .get(&question.id())
                    .is_some_and(|answer| question.is_correct(answer)),
                correct_answer: question.correct_answer().to_string(),
            })
            .collect();

        Self {
            score: results.iter().filter(|result| result.is_correct).count(),
            total: results.len(),
            results,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn questions() -> Vec<Question> {
        serde_json::from_value(serde_json::json!([
            {
                "id": "00000000-0000-0000-0000-000000000001",
                "quiz_id": "00000000-0000-0000-0000-0000000000aa",
                "question_text": "Who owns a moved value?",
                "options": ["caller", "callee", "both", "nobody"],
                "correct_answer": "callee",
                "order_index": 1
            },
            {
                "id": "00000000-0000-0000-0000-000000000002",
                "quiz_id": "00000000-0000-0000-0000-0000000000aa",
                "question_text": "Is &mut exclusive?",
                "options": ["yes", "no", "sometimes", "only in unsafe"],
                "correct_answer": "yes",
                "order_index": 2
            }
        ]))
        .unwrap()
    }

    #[test]
    fn grading_counts_correct_answers_in_order() {
        let questions = questions();
        let answers = HashMap::from([
            (questions[0].id(), String::from("callee")),
            (questions[1].id(), String::from("no")),
        ]);

        let graded = QuizCheckResponse::grade(&questions, &answers);
        assert_eq!(graded.score, 1);
        assert_eq!(graded.total, 2);
        assert!(graded.results[0].is_correct);
        assert!(!graded.results[1].is_correct);
        assert_eq!(graded.results[1].correct_answer, "yes");
    }

    #[test]
    fn unanswered_questions_are_wrong() {
        let graded = QuizCheckResponse::grade(&questions(), &HashMap::new());
        assert_eq!(graded.score, 0);
        assert_eq!(graded.total, 2);
    }
}
