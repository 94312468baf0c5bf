use std::sync::Arc;

use crate::error::{Error, Result};
use crate::models::session::ExamSession;
use crate::store::ExamStore;

#[derive(Clone)]
pub struct AnswerService {
    store: Arc<dyn ExamStore>,
}

impl AnswerService {
    pub fn new(store: Arc<dyn ExamStore>) -> Self {
        Self { store }
    }

    /// Records the student's choice for one question of an in-progress
    /// session. Upsert semantics per (session, question): re-answering
    /// overwrites the earlier choice. A missing choice id records an
    /// explicit skip. The session score is untouched until submission.
    pub async fn record(
        &self,
        session: &ExamSession,
        question_id: i64,
        choice_id: Option<i64>,
    ) -> Result<()> {
        let question = self
            .store
            .find_question(question_id, session.exam_id)
            .await?
            .ok_or_else(|| Error::NotFound("Question not found".to_string()))?;

        if let Some(choice_id) = choice_id {
            self.store
                .find_choice(choice_id, question.id)
                .await?
                .ok_or_else(|| Error::NotFound("Choice not found".to_string()))?;
        }

        self.store
            .upsert_answer(session.id, question.id, choice_id)
            .await
    }
}
