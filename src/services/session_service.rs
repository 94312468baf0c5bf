use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::exam::Exam;
use crate::models::session::{ExamSession, SessionStatus};
use crate::store::{ExamStore, NewSession};

#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn ExamStore>,
}

impl SessionService {
    pub fn new(store: Arc<dyn ExamStore>) -> Self {
        Self { store }
    }

    /// Starts a new attempt at an active exam. The attempt number continues
    /// the user's 1-based sequence for this exam; the exam's target question
    /// count is snapshotted onto the session and never re-read.
    pub async fn start_session(&self, user_id: Uuid, exam_id: i64) -> Result<(ExamSession, Exam)> {
        let exam = self
            .store
            .get_active_exam(exam_id)
            .await?
            .ok_or_else(|| Error::NotFound("Exam not found".to_string()))?;

        let session = self
            .store
            .create_session(NewSession {
                user_id,
                exam_id: exam.id,
                total_questions: exam.total_questions,
            })
            .await?;

        tracing::info!(
            session_id = %session.session_id,
            exam_id = exam.id,
            attempt = session.attempt_number,
            "exam session started"
        );
        Ok((session, exam))
    }

    /// Resolves an in-progress session by its opaque token, scoped to the
    /// owning user. Runs the lazy expiry check: a session past its deadline
    /// is transitioned to expired here and the operation fails. This check,
    /// on every read of an in-progress session, is the sole expiry mechanism
    /// the correctness of the lifecycle relies on.
    pub async fn load_active(&self, user_id: Uuid, session_id: &str) -> Result<(ExamSession, Exam)> {
        let session = self
            .store
            .get_session(session_id, user_id)
            .await?
            .ok_or_else(|| Error::NotFound("Exam session not found".to_string()))?;

        if session.status != SessionStatus::InProgress {
            return Err(Error::InvalidState(
                "This exam session is not active".to_string(),
            ));
        }

        let exam = self
            .store
            .get_exam(session.exam_id)
            .await?
            .ok_or_else(|| Error::NotFound("Exam not found".to_string()))?;

        let now = Utc::now();
        if now > session.deadline(exam.duration_minutes) {
            self.store.expire_session(session.id, now).await?;
            tracing::info!(session_id = %session.session_id, "exam session expired");
            return Err(Error::InvalidState(
                "Exam session has expired".to_string(),
            ));
        }

        Ok((session, exam))
    }
}
