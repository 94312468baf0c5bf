use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::exam::Difficulty;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Question {
    pub id: i64,
    pub exam_id: i64,
    pub question_text: String,
    pub difficulty: Difficulty,
    pub created_at: DateTime<Utc>,
}
