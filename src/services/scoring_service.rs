use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::session::ExamSession;
use crate::store::ExamStore;

#[derive(Clone)]
pub struct ScoringService {
    store: Arc<dyn ExamStore>,
}

impl ScoringService {
    pub fn new(store: Arc<dyn ExamStore>) -> Self {
        Self { store }
    }

    /// Finalizes an in-progress session: tallies the recorded answers and
    /// persists score, correct_answers, end_time and the completed status in
    /// one atomic store operation. The denominator is the number of answers
    /// actually recorded, so skipped-and-never-answered questions do not
    /// drag the score down.
    pub async fn submit(&self, session: &ExamSession) -> Result<ExamSession> {
        let completed = self
            .store
            .complete_session(session.id, Utc::now())
            .await?;
        tracing::info!(
            session_id = %completed.session_id,
            score = %completed.score.unwrap_or_default(),
            correct = completed.correct_answers,
            "exam submitted"
        );
        Ok(completed)
    }

    /// Consistency repair for completed sessions: re-tallies and rewrites
    /// score and correct_answers with the same formula submission uses.
    pub async fn recalculate(&self, user_id: Uuid, session_id: &str) -> Result<ExamSession> {
        let session = self
            .store
            .get_completed_session(session_id, user_id)
            .await?
            .ok_or_else(|| Error::NotFound("Exam session not found".to_string()))?;
        self.store.rescore_session(session.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::answer_service::AnswerService;
    use crate::services::session_service::SessionService;
    use crate::store::MemoryStore;
    use rust_decimal::Decimal;

    struct Fixture {
        store: Arc<MemoryStore>,
        sessions: SessionService,
        answers: AnswerService,
        scoring: ScoringService,
    }

    impl Fixture {
        fn new() -> Self {
            let store = Arc::new(MemoryStore::new());
            Self {
                sessions: SessionService::new(store.clone()),
                answers: AnswerService::new(store.clone()),
                scoring: ScoringService::new(store.clone()),
                store,
            }
        }
    }

    #[tokio::test]
    async fn single_correct_answer_scores_one_hundred() {
        let fx = Fixture::new();
        let exam = fx.store.insert_exam("Score", 30, 3, true);
        let (question, choices) =
            fx.store
                .insert_question(exam.id, "Q1", &[("right", true), ("wrong", false)]);
        let user = Uuid::new_v4();
        let (session, _) = fx.sessions.start_session(user, exam.id).await.unwrap();

        fx.answers
            .record(&session, question.id, Some(choices[0].id))
            .await
            .unwrap();
        let result = fx.scoring.submit(&session).await.unwrap();

        assert_eq!(result.score, Some(Decimal::from(100)));
        assert_eq!(result.correct_answers, 1);
        assert!(result.end_time.is_some());
    }

    #[tokio::test]
    async fn denominator_is_answered_count_not_snapshot() {
        let fx = Fixture::new();
        // snapshot says 4 questions, but only 2 get answered: 1 right, 1 wrong
        let exam = fx.store.insert_exam("Partial", 30, 4, true);
        let (q1, c1) = fx
            .store
            .insert_question(exam.id, "Q1", &[("right", true), ("wrong", false)]);
        let (q2, c2) = fx
            .store
            .insert_question(exam.id, "Q2", &[("right", true), ("wrong", false)]);
        fx.store
            .insert_question(exam.id, "Q3", &[("right", true), ("wrong", false)]);
        let (session, _) = fx
            .sessions
            .start_session(Uuid::new_v4(), exam.id)
            .await
            .unwrap();

        fx.answers
            .record(&session, q1.id, Some(c1[0].id))
            .await
            .unwrap();
        fx.answers
            .record(&session, q2.id, Some(c2[1].id))
            .await
            .unwrap();
        let result = fx.scoring.submit(&session).await.unwrap();

        assert_eq!(result.score, Some(Decimal::from(50)));
        assert_eq!(result.correct_answers, 1);
        assert!(result.correct_answers as i64 <= 2);
    }

    #[tokio::test]
    async fn no_answers_scores_zero() {
        let fx = Fixture::new();
        let exam = fx.store.insert_exam("Empty", 30, 2, true);
        fx.store
            .insert_question(exam.id, "Q1", &[("right", true)]);
        let (session, _) = fx
            .sessions
            .start_session(Uuid::new_v4(), exam.id)
            .await
            .unwrap();

        let result = fx.scoring.submit(&session).await.unwrap();
        assert_eq!(result.score, Some(Decimal::ZERO));
        assert_eq!(result.correct_answers, 0);
    }

    #[tokio::test]
    async fn skips_count_against_the_denominator() {
        let fx = Fixture::new();
        let exam = fx.store.insert_exam("Skips", 30, 2, true);
        let (q1, c1) = fx
            .store
            .insert_question(exam.id, "Q1", &[("right", true), ("wrong", false)]);
        let (q2, _) = fx
            .store
            .insert_question(exam.id, "Q2", &[("right", true), ("wrong", false)]);
        let (session, _) = fx
            .sessions
            .start_session(Uuid::new_v4(), exam.id)
            .await
            .unwrap();

        fx.answers
            .record(&session, q1.id, Some(c1[0].id))
            .await
            .unwrap();
        // an explicit skip is a recorded answer with no choice
        fx.answers.record(&session, q2.id, None).await.unwrap();

        let result = fx.scoring.submit(&session).await.unwrap();
        assert_eq!(result.score, Some(Decimal::from(50)));
    }

    #[tokio::test]
    async fn double_submit_is_rejected() {
        let fx = Fixture::new();
        let exam = fx.store.insert_exam("Once", 30, 1, true);
        fx.store.insert_question(exam.id, "Q1", &[("right", true)]);
        let (session, _) = fx
            .sessions
            .start_session(Uuid::new_v4(), exam.id)
            .await
            .unwrap();

        fx.scoring.submit(&session).await.unwrap();
        let err = fx.scoring.submit(&session).await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[tokio::test]
    async fn recalculate_reproduces_submit_score() {
        let fx = Fixture::new();
        let exam = fx.store.insert_exam("Repair", 30, 3, true);
        let (q1, c1) = fx
            .store
            .insert_question(exam.id, "Q1", &[("right", true), ("wrong", false)]);
        let user = Uuid::new_v4();
        let (session, _) = fx.sessions.start_session(user, exam.id).await.unwrap();

        fx.answers
            .record(&session, q1.id, Some(c1[0].id))
            .await
            .unwrap();
        let submitted = fx.scoring.submit(&session).await.unwrap();
        let rescored = fx
            .scoring
            .recalculate(user, &session.session_id)
            .await
            .unwrap();

        assert_eq!(rescored.score, submitted.score);
        assert_eq!(rescored.correct_answers, submitted.correct_answers);
    }

    #[tokio::test]
    async fn recalculate_requires_a_completed_session() {
        let fx = Fixture::new();
        let exam = fx.store.insert_exam("InFlight", 30, 1, true);
        let user = Uuid::new_v4();
        let (session, _) = fx.sessions.start_session(user, exam.id).await.unwrap();

        let err = fx
            .scoring
            .recalculate(user, &session.session_id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
