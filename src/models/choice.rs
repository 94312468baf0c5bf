use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// `is_correct` never leaves the server; client-facing payloads use
/// `dto::exam_dto::ChoiceOut` instead.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Choice {
    pub id: i64,
    pub question_id: i64,
    pub choice_text: String,
    pub is_correct: bool,
}
