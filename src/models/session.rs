use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "session_status", rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
    Expired,
}

/// One timed attempt by one user at one exam.
///
/// `session_id` is the opaque token handed to clients; `id` is the row
/// identity and never leaves the server. Status moves exactly once from
/// `InProgress` to either `Completed` or `Expired` and is immutable after
/// that.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExamSession {
    pub id: i64,
    pub session_id: String,
    pub user_id: Uuid,
    pub exam_id: i64,
    pub attempt_number: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    pub score: Option<rust_decimal::Decimal>,
    /// Snapshot of the exam's target question count at start time.
    pub total_questions: i32,
    pub correct_answers: i32,
}

impl ExamSession {
    pub fn deadline(&self, duration_minutes: i32) -> DateTime<Utc> {
        self.start_time + chrono::Duration::minutes(duration_minutes as i64)
    }
}
