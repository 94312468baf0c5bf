use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::answer::StudentAnswer;
use crate::models::choice::Choice;
use crate::models::exam::Exam;
use crate::models::question::Question;
use crate::models::session::{ExamSession, SessionStatus};
use crate::utils::token::generate_session_token;

use super::{AnswerTally, ExamStore, NewSession};

const SESSION_TOKEN_LEN: usize = 32;
const ATTEMPT_NUMBER_RETRIES: u32 = 3;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn tally_answers<'e, E>(executor: E, session_pk: i64) -> Result<AnswerTally>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let (answered, correct): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COUNT(*) FILTER (WHERE c.is_correct)
            FROM student_answers a
            LEFT JOIN choices c ON c.id = a.selected_choice_id
            WHERE a.session_id = $1
            "#,
        )
        .bind(session_pk)
        .fetch_one(executor)
        .await?;

        Ok(AnswerTally { correct, answered })
    }
}

#[async_trait]
impl ExamStore for PgStore {
    async fn list_active_exams(&self) -> Result<Vec<Exam>> {
        let exams = sqlx::query_as::<_, Exam>(
            r#"SELECT * FROM exams WHERE is_active ORDER BY id"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(exams)
    }

    async fn get_active_exam(&self, exam_id: i64) -> Result<Option<Exam>> {
        let exam = sqlx::query_as::<_, Exam>(
            r#"SELECT * FROM exams WHERE id = $1 AND is_active"#,
        )
        .bind(exam_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(exam)
    }

    async fn get_exam(&self, exam_id: i64) -> Result<Option<Exam>> {
        let exam = sqlx::query_as::<_, Exam>(r#"SELECT * FROM exams WHERE id = $1"#)
            .bind(exam_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(exam)
    }

    async fn list_questions(&self, exam_id: i64) -> Result<Vec<Question>> {
        let questions = sqlx::query_as::<_, Question>(
            r#"SELECT * FROM questions WHERE exam_id = $1 ORDER BY id"#,
        )
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(questions)
    }

    async fn list_choices(&self, question_ids: &[i64]) -> Result<Vec<Choice>> {
        let choices = sqlx::query_as::<_, Choice>(
            r#"SELECT * FROM choices WHERE question_id = ANY($1) ORDER BY id"#,
        )
        .bind(question_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(choices)
    }

    async fn find_question(&self, question_id: i64, exam_id: i64) -> Result<Option<Question>> {
        let question = sqlx::query_as::<_, Question>(
            r#"SELECT * FROM questions WHERE id = $1 AND exam_id = $2"#,
        )
        .bind(question_id)
        .bind(exam_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(question)
    }

    async fn find_choice(&self, choice_id: i64, question_id: i64) -> Result<Option<Choice>> {
        let choice = sqlx::query_as::<_, Choice>(
            r#"SELECT * FROM choices WHERE id = $1 AND question_id = $2"#,
        )
        .bind(choice_id)
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(choice)
    }

    async fn create_session(&self, new: NewSession) -> Result<ExamSession> {
        // The count-then-insert pair is racy; the unique
        // (user, exam, attempt_number) constraint arbitrates and losers
        // recount and retry.
        for _ in 0..ATTEMPT_NUMBER_RETRIES {
            let previous: i64 = sqlx::query_scalar(
                r#"SELECT COUNT(*) FROM exam_sessions WHERE user_id = $1 AND exam_id = $2"#,
            )
            .bind(new.user_id)
            .bind(new.exam_id)
            .fetch_one(&self.pool)
            .await?;

            let inserted = sqlx::query_as::<_, ExamSession>(
                r#"
                INSERT INTO exam_sessions
                    (session_id, user_id, exam_id, attempt_number, start_time, status,
                     total_questions, correct_answers)
                VALUES ($1, $2, $3, $4, $5, $6, $7, 0)
                RETURNING *
                "#,
            )
            .bind(generate_session_token(SESSION_TOKEN_LEN))
            .bind(new.user_id)
            .bind(new.exam_id)
            .bind(previous as i32 + 1)
            .bind(Utc::now())
            .bind(SessionStatus::InProgress)
            .bind(new.total_questions)
            .fetch_one(&self.pool)
            .await;

            match inserted {
                Ok(session) => return Ok(session),
                Err(sqlx::Error::Database(db))
                    if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation) =>
                {
                    tracing::debug!(
                        user_id = %new.user_id,
                        exam_id = new.exam_id,
                        "attempt number collision, retrying"
                    );
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(Error::Internal(
            "Could not allocate an attempt number".to_string(),
        ))
    }

    async fn get_session(&self, session_id: &str, user_id: Uuid) -> Result<Option<ExamSession>> {
        let session = sqlx::query_as::<_, ExamSession>(
            r#"SELECT * FROM exam_sessions WHERE session_id = $1 AND user_id = $2"#,
        )
        .bind(session_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn expire_session(&self, id: i64, ended_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE exam_sessions
            SET status = $2, end_time = $3
            WHERE id = $1 AND status = $4
            "#,
        )
        .bind(id)
        .bind(SessionStatus::Expired)
        .bind(ended_at)
        .bind(SessionStatus::InProgress)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn expire_overdue_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE exam_sessions s
            SET status = $1, end_time = $2
            FROM exams e
            WHERE e.id = s.exam_id
              AND s.status = $3
              AND s.start_time + make_interval(mins => e.duration_minutes) < $2
            "#,
        )
        .bind(SessionStatus::Expired)
        .bind(now)
        .bind(SessionStatus::InProgress)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn assigned_question_ids(&self, session_pk: i64) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(
            r#"SELECT question_id FROM session_questions WHERE session_id = $1 ORDER BY position"#,
        )
        .bind(session_pk)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn assign_questions(&self, session_pk: i64, question_ids: &[i64]) -> Result<()> {
        // The session row lock serializes concurrent first fetches; a loser
        // finds rows already present and keeps none of its own sample, so
        // the frozen set is always exactly one sampling run.
        let mut tx = self.pool.begin().await?;

        sqlx::query(r#"SELECT id FROM exam_sessions WHERE id = $1 FOR UPDATE"#)
            .bind(session_pk)
            .execute(&mut *tx)
            .await?;

        let existing: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM session_questions WHERE session_id = $1"#,
        )
        .bind(session_pk)
        .fetch_one(&mut *tx)
        .await?;
        if existing > 0 {
            return Ok(());
        }

        for (position, question_id) in question_ids.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO session_questions (session_id, question_id, position)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(session_pk)
            .bind(question_id)
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn upsert_answer(
        &self,
        session_pk: i64,
        question_id: i64,
        choice_id: Option<i64>,
    ) -> Result<()> {
        // FOR SHARE holds the status stable for the duration of the write
        // and serializes against the FOR UPDATE taken by completion, so an
        // answer racing a submit either lands before the tally or fails
        // the guard.
        let mut tx = self.pool.begin().await?;

        let status: SessionStatus = sqlx::query_scalar(
            r#"SELECT status FROM exam_sessions WHERE id = $1 FOR SHARE"#,
        )
        .bind(session_pk)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound("Exam session not found".to_string()))?;

        if status != SessionStatus::InProgress {
            return Err(Error::InvalidState(
                "This exam session is not active".to_string(),
            ));
        }

        sqlx::query(
            r#"
            INSERT INTO student_answers (session_id, question_id, selected_choice_id, answered_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (session_id, question_id)
            DO UPDATE SET selected_choice_id = EXCLUDED.selected_choice_id,
                          answered_at = EXCLUDED.answered_at
            "#,
        )
        .bind(session_pk)
        .bind(question_id)
        .bind(choice_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn list_answers(&self, session_pk: i64) -> Result<Vec<StudentAnswer>> {
        let answers = sqlx::query_as::<_, StudentAnswer>(
            r#"SELECT * FROM student_answers WHERE session_id = $1 ORDER BY question_id"#,
        )
        .bind(session_pk)
        .fetch_all(&self.pool)
        .await?;
        Ok(answers)
    }

    async fn complete_session(
        &self,
        session_pk: i64,
        ended_at: DateTime<Utc>,
    ) -> Result<ExamSession> {
        // Row lock so a concurrent answer upsert lands wholly before the
        // tally or fails the status guard afterwards.
        let mut tx = self.pool.begin().await?;

        let session = sqlx::query_as::<_, ExamSession>(
            r#"SELECT * FROM exam_sessions WHERE id = $1 FOR UPDATE"#,
        )
        .bind(session_pk)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound("Exam session not found".to_string()))?;

        if session.status != SessionStatus::InProgress {
            return Err(Error::InvalidState(
                "This exam session is not active".to_string(),
            ));
        }

        let tally = Self::tally_answers(&mut *tx, session_pk).await?;

        let updated = sqlx::query_as::<_, ExamSession>(
            r#"
            UPDATE exam_sessions
            SET status = $2, end_time = $3, score = $4, correct_answers = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(session_pk)
        .bind(SessionStatus::Completed)
        .bind(ended_at)
        .bind(tally.percentage())
        .bind(tally.correct as i32)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn rescore_session(&self, session_pk: i64) -> Result<ExamSession> {
        let mut tx = self.pool.begin().await?;

        let session = sqlx::query_as::<_, ExamSession>(
            r#"SELECT * FROM exam_sessions WHERE id = $1 FOR UPDATE"#,
        )
        .bind(session_pk)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound("Exam session not found".to_string()))?;

        if session.status != SessionStatus::Completed {
            return Err(Error::InvalidState(
                "Only completed sessions can be rescored".to_string(),
            ));
        }

        let tally = Self::tally_answers(&mut *tx, session_pk).await?;

        let updated = sqlx::query_as::<_, ExamSession>(
            r#"
            UPDATE exam_sessions
            SET score = $2, correct_answers = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(session_pk)
        .bind(tally.percentage())
        .bind(tally.correct as i32)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn get_completed_session(
        &self,
        session_id: &str,
        user_id: Uuid,
    ) -> Result<Option<ExamSession>> {
        let session = sqlx::query_as::<_, ExamSession>(
            r#"
            SELECT * FROM exam_sessions
            WHERE session_id = $1 AND user_id = $2 AND status = $3
            "#,
        )
        .bind(session_id)
        .bind(user_id)
        .bind(SessionStatus::Completed)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn list_completed_sessions(&self, user_id: Uuid) -> Result<Vec<ExamSession>> {
        let sessions = sqlx::query_as::<_, ExamSession>(
            r#"
            SELECT * FROM exam_sessions
            WHERE user_id = $1 AND status = $2
            ORDER BY end_time DESC, id DESC
            "#,
        )
        .bind(user_id)
        .bind(SessionStatus::Completed)
        .fetch_all(&self.pool)
        .await?;
        Ok(sessions)
    }
}
