use std::sync::Arc;

use uuid::Uuid;

use crate::dto::exam_dto::ExamResult;
use crate::error::{Error, Result};
use crate::store::ExamStore;

/// Read-only projections of completed sessions.
#[derive(Clone)]
pub struct ResultService {
    store: Arc<dyn ExamStore>,
}

impl ResultService {
    pub fn new(store: Arc<dyn ExamStore>) -> Self {
        Self { store }
    }

    /// Result of one completed session. Sessions that are still running,
    /// expired, or owned by someone else all read as not found.
    pub async fn result(&self, user_id: Uuid, session_id: &str) -> Result<ExamResult> {
        let session = self
            .store
            .get_completed_session(session_id, user_id)
            .await?
            .ok_or_else(|| Error::NotFound("Exam session not found".to_string()))?;
        let exam = self
            .store
            .get_exam(session.exam_id)
            .await?
            .ok_or_else(|| Error::NotFound("Exam not found".to_string()))?;
        Ok(ExamResult::new(&session, &exam))
    }

    /// All of the user's completed sessions, newest first.
    pub async fn history(&self, user_id: Uuid) -> Result<Vec<ExamResult>> {
        let sessions = self.store.list_completed_sessions(user_id).await?;
        let mut results = Vec::with_capacity(sessions.len());
        for session in &sessions {
            let exam = self
                .store
                .get_exam(session.exam_id)
                .await?
                .ok_or_else(|| Error::NotFound("Exam not found".to_string()))?;
            results.push(ExamResult::new(session, &exam));
        }
        Ok(results)
    }
}
