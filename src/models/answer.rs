use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// At most one row per (session, question); re-answering overwrites.
/// A `None` choice is an explicit skip.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StudentAnswer {
    pub id: i64,
    pub session_id: i64,
    pub question_id: i64,
    pub selected_choice_id: Option<i64>,
    pub answered_at: DateTime<Utc>,
}
