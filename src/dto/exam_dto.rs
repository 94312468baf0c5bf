use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::exam::{Difficulty, Exam};
use crate::models::session::{ExamSession, SessionStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamSummary {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub duration_minutes: i32,
    pub total_questions: i32,
    pub difficulty: Difficulty,
}

impl From<&Exam> for ExamSummary {
    fn from(exam: &Exam) -> Self {
        Self {
            id: exam.id,
            title: exam.title.clone(),
            description: exam.description.clone(),
            duration_minutes: exam.duration_minutes,
            total_questions: exam.total_questions,
            difficulty: exam.difficulty,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub exam: ExamSummary,
    pub attempt_number: i32,
    pub start_time: DateTime<Utc>,
    pub status: SessionStatus,
    pub score: Option<Decimal>,
    pub total_questions: i32,
    pub correct_answers: i32,
}

impl SessionSummary {
    pub fn new(session: &ExamSession, exam: &Exam) -> Self {
        Self {
            session_id: session.session_id.clone(),
            exam: ExamSummary::from(exam),
            attempt_number: session.attempt_number,
            start_time: session.start_time,
            status: session.status,
            score: session.score,
            total_questions: session.total_questions,
            correct_answers: session.correct_answers,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartExamResponse {
    pub message: String,
    pub session: SessionSummary,
}

/// Choice as delivered to the student: no correctness flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceOut {
    pub id: i64,
    pub choice_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionOut {
    pub id: i64,
    pub question_text: String,
    pub choices: Vec<ChoiceOut>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionsResponse {
    pub session_id: String,
    pub questions: Vec<QuestionOut>,
    pub duration_minutes: i32,
    pub start_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    #[validate(range(min = 1))]
    pub question_id: i64,
    /// Absent or null records an explicit skip.
    pub choice_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAnswerResponse {
    pub message: String,
    pub question_id: i64,
    pub choice_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamResult {
    pub session_id: String,
    pub exam: ExamSummary,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub score: Option<Decimal>,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub status: SessionStatus,
}

impl ExamResult {
    pub fn new(session: &ExamSession, exam: &Exam) -> Self {
        Self {
            session_id: session.session_id.clone(),
            exam: ExamSummary::from(exam),
            start_time: session.start_time,
            end_time: session.end_time,
            score: session.score,
            total_questions: session.total_questions,
            correct_answers: session.correct_answers,
            status: session.status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitExamResponse {
    pub message: String,
    pub result: ExamResult,
}
