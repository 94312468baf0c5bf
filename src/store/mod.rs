pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::Result;
use crate::models::answer::StudentAnswer;
use crate::models::choice::Choice;
use crate::models::exam::Exam;
use crate::models::question::Question;
use crate::models::session::ExamSession;

#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: Uuid,
    pub exam_id: i64,
    pub total_questions: i32,
}

/// Answer counts for one session at grading time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnswerTally {
    pub correct: i64,
    pub answered: i64,
}

impl AnswerTally {
    /// Percentage score over the *answered* count. Unanswered questions are
    /// excluded from the denominator rather than counted wrong; an empty
    /// answer sheet scores zero.
    pub fn percentage(&self) -> Decimal {
        if self.answered > 0 {
            ((Decimal::from(self.correct) * Decimal::from(100)) / Decimal::from(self.answered))
                .round_dp(2)
        } else {
            Decimal::ZERO
        }
    }
}

/// Persistence boundary for the exam core. Operations that must be atomic
/// (attempt numbering, submit-time grading) are atomic inside each
/// implementation, so services stay free of storage-level coordination.
#[async_trait]
pub trait ExamStore: Send + Sync {
    async fn list_active_exams(&self) -> Result<Vec<Exam>>;
    async fn get_active_exam(&self, exam_id: i64) -> Result<Option<Exam>>;
    async fn get_exam(&self, exam_id: i64) -> Result<Option<Exam>>;

    async fn list_questions(&self, exam_id: i64) -> Result<Vec<Question>>;
    async fn list_choices(&self, question_ids: &[i64]) -> Result<Vec<Choice>>;
    async fn find_question(&self, question_id: i64, exam_id: i64) -> Result<Option<Question>>;
    async fn find_choice(&self, choice_id: i64, question_id: i64) -> Result<Option<Choice>>;

    /// Creates the session with the next attempt number for (user, exam).
    /// Concurrent duplicate starts serialize on the uniqueness constraint.
    async fn create_session(&self, new: NewSession) -> Result<ExamSession>;
    async fn get_session(&self, session_id: &str, user_id: Uuid) -> Result<Option<ExamSession>>;
    /// Marks an in-progress session expired; a lost race against completion
    /// leaves the terminal state untouched.
    async fn expire_session(&self, id: i64, ended_at: DateTime<Utc>) -> Result<()>;
    /// Bulk-expires every in-progress session past its deadline. Returns the
    /// number of sessions transitioned.
    async fn expire_overdue_sessions(&self, now: DateTime<Utc>) -> Result<u64>;

    async fn assigned_question_ids(&self, session_pk: i64) -> Result<Vec<i64>>;
    /// Freezes the sampled question set for a session. First writer wins;
    /// callers re-read the assignment afterwards.
    async fn assign_questions(&self, session_pk: i64, question_ids: &[i64]) -> Result<()>;

    /// Records or overwrites the answer for one question. The status check
    /// and the write are atomic: a session that is no longer in progress
    /// fails with `InvalidState` and nothing is persisted.
    async fn upsert_answer(
        &self,
        session_pk: i64,
        question_id: i64,
        choice_id: Option<i64>,
    ) -> Result<()>;
    async fn list_answers(&self, session_pk: i64) -> Result<Vec<StudentAnswer>>;

    /// Atomically tallies recorded answers and finalizes the session:
    /// status=completed, end_time, score, correct_answers. Fails with
    /// `InvalidState` if the session is no longer in progress.
    async fn complete_session(&self, session_pk: i64, ended_at: DateTime<Utc>)
        -> Result<ExamSession>;
    /// Re-tallies a completed session and rewrites score/correct_answers
    /// with the same formula as `complete_session`.
    async fn rescore_session(&self, session_pk: i64) -> Result<ExamSession>;

    async fn get_completed_session(
        &self,
        session_id: &str,
        user_id: Uuid,
    ) -> Result<Option<ExamSession>>;
    /// Completed sessions for a user, newest (by end_time) first.
    async fn list_completed_sessions(&self, user_id: Uuid) -> Result<Vec<ExamSession>>;
}
