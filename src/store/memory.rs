//! In-memory `ExamStore` used by the test suites. One mutex serializes every
//! operation, which gives the same atomicity the Postgres store gets from
//! transactions and row locks.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::answer::StudentAnswer;
use crate::models::choice::Choice;
use crate::models::exam::{Difficulty, Exam};
use crate::models::question::Question;
use crate::models::session::{ExamSession, SessionStatus};
use crate::utils::token::generate_session_token;

use super::{AnswerTally, ExamStore, NewSession};

#[derive(Default)]
struct Inner {
    exams: BTreeMap<i64, Exam>,
    questions: BTreeMap<i64, Question>,
    choices: BTreeMap<i64, Choice>,
    sessions: BTreeMap<i64, ExamSession>,
    assignments: HashMap<i64, Vec<i64>>,
    answers: BTreeMap<(i64, i64), StudentAnswer>,
    next_id: i64,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn tally(&self, session_pk: i64) -> AnswerTally {
        let mut tally = AnswerTally::default();
        for answer in self.answers.values().filter(|a| a.session_id == session_pk) {
            tally.answered += 1;
            let correct = answer
                .selected_choice_id
                .and_then(|id| self.choices.get(&id))
                .map(|c| c.is_correct)
                .unwrap_or(false);
            if correct {
                tally.correct += 1;
            }
        }
        tally
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_exam(
        &self,
        title: &str,
        duration_minutes: i32,
        total_questions: i32,
        is_active: bool,
    ) -> Exam {
        let mut inner = self.inner.lock().expect("memory store mutex poisoned");
        let id = inner.next_id();
        let now = Utc::now();
        let exam = Exam {
            id,
            title: title.to_string(),
            description: format!("{} description", title),
            duration_minutes,
            total_questions,
            difficulty: Difficulty::Medium,
            is_active,
            created_at: now,
            updated_at: now,
        };
        inner.exams.insert(id, exam.clone());
        exam
    }

    /// Adds a question with its choices; each choice is (text, is_correct).
    pub fn insert_question(
        &self,
        exam_id: i64,
        text: &str,
        choices: &[(&str, bool)],
    ) -> (Question, Vec<Choice>) {
        let mut inner = self.inner.lock().expect("memory store mutex poisoned");
        let question_id = inner.next_id();
        let question = Question {
            id: question_id,
            exam_id,
            question_text: text.to_string(),
            difficulty: Difficulty::Medium,
            created_at: Utc::now(),
        };
        inner.questions.insert(question_id, question.clone());

        let mut out = Vec::with_capacity(choices.len());
        for (choice_text, is_correct) in choices {
            let id = inner.next_id();
            let choice = Choice {
                id,
                question_id,
                choice_text: choice_text.to_string(),
                is_correct: *is_correct,
            };
            inner.choices.insert(id, choice.clone());
            out.push(choice);
        }
        (question, out)
    }

    /// Shifts a session's start time into the past, for deadline tests.
    pub fn backdate_session(&self, session_pk: i64, minutes: i64) {
        let mut inner = self.inner.lock().expect("memory store mutex poisoned");
        if let Some(session) = inner.sessions.get_mut(&session_pk) {
            session.start_time -= Duration::minutes(minutes);
        }
    }

    pub fn session_status(&self, session_pk: i64) -> Option<SessionStatus> {
        let inner = self.inner.lock().expect("memory store mutex poisoned");
        inner.sessions.get(&session_pk).map(|s| s.status)
    }
}

#[async_trait]
impl ExamStore for MemoryStore {
    async fn list_active_exams(&self) -> Result<Vec<Exam>> {
        let inner = self.inner.lock().expect("memory store mutex poisoned");
        Ok(inner.exams.values().filter(|e| e.is_active).cloned().collect())
    }

    async fn get_active_exam(&self, exam_id: i64) -> Result<Option<Exam>> {
        let inner = self.inner.lock().expect("memory store mutex poisoned");
        Ok(inner.exams.get(&exam_id).filter(|e| e.is_active).cloned())
    }

    async fn get_exam(&self, exam_id: i64) -> Result<Option<Exam>> {
        let inner = self.inner.lock().expect("memory store mutex poisoned");
        Ok(inner.exams.get(&exam_id).cloned())
    }

    async fn list_questions(&self, exam_id: i64) -> Result<Vec<Question>> {
        let inner = self.inner.lock().expect("memory store mutex poisoned");
        Ok(inner
            .questions
            .values()
            .filter(|q| q.exam_id == exam_id)
            .cloned()
            .collect())
    }

    async fn list_choices(&self, question_ids: &[i64]) -> Result<Vec<Choice>> {
        let inner = self.inner.lock().expect("memory store mutex poisoned");
        Ok(inner
            .choices
            .values()
            .filter(|c| question_ids.contains(&c.question_id))
            .cloned()
            .collect())
    }

    async fn find_question(&self, question_id: i64, exam_id: i64) -> Result<Option<Question>> {
        let inner = self.inner.lock().expect("memory store mutex poisoned");
        Ok(inner
            .questions
            .get(&question_id)
            .filter(|q| q.exam_id == exam_id)
            .cloned())
    }

    async fn find_choice(&self, choice_id: i64, question_id: i64) -> Result<Option<Choice>> {
        let inner = self.inner.lock().expect("memory store mutex poisoned");
        Ok(inner
            .choices
            .get(&choice_id)
            .filter(|c| c.question_id == question_id)
            .cloned())
    }

    async fn create_session(&self, new: NewSession) -> Result<ExamSession> {
        let mut inner = self.inner.lock().expect("memory store mutex poisoned");
        let attempt_number = inner
            .sessions
            .values()
            .filter(|s| s.user_id == new.user_id && s.exam_id == new.exam_id)
            .count() as i32
            + 1;
        let id = inner.next_id();
        let session = ExamSession {
            id,
            session_id: generate_session_token(32),
            user_id: new.user_id,
            exam_id: new.exam_id,
            attempt_number,
            start_time: Utc::now(),
            end_time: None,
            status: SessionStatus::InProgress,
            score: None,
            total_questions: new.total_questions,
            correct_answers: 0,
        };
        inner.sessions.insert(id, session.clone());
        Ok(session)
    }

    async fn get_session(&self, session_id: &str, user_id: Uuid) -> Result<Option<ExamSession>> {
        let inner = self.inner.lock().expect("memory store mutex poisoned");
        Ok(inner
            .sessions
            .values()
            .find(|s| s.session_id == session_id && s.user_id == user_id)
            .cloned())
    }

    async fn expire_session(&self, id: i64, ended_at: DateTime<Utc>) -> Result<()> {
        let mut inner = self.inner.lock().expect("memory store mutex poisoned");
        if let Some(session) = inner.sessions.get_mut(&id) {
            if session.status == SessionStatus::InProgress {
                session.status = SessionStatus::Expired;
                session.end_time = Some(ended_at);
            }
        }
        Ok(())
    }

    async fn expire_overdue_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut inner = self.inner.lock().expect("memory store mutex poisoned");
        let durations: HashMap<i64, i32> = inner
            .exams
            .iter()
            .map(|(id, e)| (*id, e.duration_minutes))
            .collect();
        let mut expired = 0;
        for session in inner.sessions.values_mut() {
            if session.status != SessionStatus::InProgress {
                continue;
            }
            let Some(minutes) = durations.get(&session.exam_id) else {
                continue;
            };
            if session.start_time + Duration::minutes(*minutes as i64) < now {
                session.status = SessionStatus::Expired;
                session.end_time = Some(now);
                expired += 1;
            }
        }
        Ok(expired)
    }

    async fn assigned_question_ids(&self, session_pk: i64) -> Result<Vec<i64>> {
        let inner = self.inner.lock().expect("memory store mutex poisoned");
        Ok(inner.assignments.get(&session_pk).cloned().unwrap_or_default())
    }

    async fn assign_questions(&self, session_pk: i64, question_ids: &[i64]) -> Result<()> {
        let mut inner = self.inner.lock().expect("memory store mutex poisoned");
        inner
            .assignments
            .entry(session_pk)
            .or_insert_with(|| question_ids.to_vec());
        Ok(())
    }

    async fn upsert_answer(
        &self,
        session_pk: i64,
        question_id: i64,
        choice_id: Option<i64>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().expect("memory store mutex poisoned");
        let status = inner
            .sessions
            .get(&session_pk)
            .map(|s| s.status)
            .ok_or_else(|| Error::NotFound("Exam session not found".to_string()))?;
        if status != SessionStatus::InProgress {
            return Err(Error::InvalidState(
                "This exam session is not active".to_string(),
            ));
        }
        let id = inner.next_id();
        let entry = inner
            .answers
            .entry((session_pk, question_id))
            .or_insert(StudentAnswer {
                id,
                session_id: session_pk,
                question_id,
                selected_choice_id: None,
                answered_at: Utc::now(),
            });
        entry.selected_choice_id = choice_id;
        entry.answered_at = Utc::now();
        Ok(())
    }

    async fn list_answers(&self, session_pk: i64) -> Result<Vec<StudentAnswer>> {
        let inner = self.inner.lock().expect("memory store mutex poisoned");
        Ok(inner
            .answers
            .values()
            .filter(|a| a.session_id == session_pk)
            .cloned()
            .collect())
    }

    async fn complete_session(
        &self,
        session_pk: i64,
        ended_at: DateTime<Utc>,
    ) -> Result<ExamSession> {
        let mut inner = self.inner.lock().expect("memory store mutex poisoned");
        let status = inner
            .sessions
            .get(&session_pk)
            .map(|s| s.status)
            .ok_or_else(|| Error::NotFound("Exam session not found".to_string()))?;
        if status != SessionStatus::InProgress {
            return Err(Error::InvalidState(
                "This exam session is not active".to_string(),
            ));
        }

        let tally = inner.tally(session_pk);
        let session = inner.sessions.get_mut(&session_pk).expect("checked above");
        session.status = SessionStatus::Completed;
        session.end_time = Some(ended_at);
        session.score = Some(tally.percentage());
        session.correct_answers = tally.correct as i32;
        Ok(session.clone())
    }

    async fn rescore_session(&self, session_pk: i64) -> Result<ExamSession> {
        let mut inner = self.inner.lock().expect("memory store mutex poisoned");
        let status = inner
            .sessions
            .get(&session_pk)
            .map(|s| s.status)
            .ok_or_else(|| Error::NotFound("Exam session not found".to_string()))?;
        if status != SessionStatus::Completed {
            return Err(Error::InvalidState(
                "Only completed sessions can be rescored".to_string(),
            ));
        }

        let tally = inner.tally(session_pk);
        let session = inner.sessions.get_mut(&session_pk).expect("checked above");
        session.score = Some(tally.percentage());
        session.correct_answers = tally.correct as i32;
        Ok(session.clone())
    }

    async fn get_completed_session(
        &self,
        session_id: &str,
        user_id: Uuid,
    ) -> Result<Option<ExamSession>> {
        let inner = self.inner.lock().expect("memory store mutex poisoned");
        Ok(inner
            .sessions
            .values()
            .find(|s| {
                s.session_id == session_id
                    && s.user_id == user_id
                    && s.status == SessionStatus::Completed
            })
            .cloned())
    }

    async fn list_completed_sessions(&self, user_id: Uuid) -> Result<Vec<ExamSession>> {
        let inner = self.inner.lock().expect("memory store mutex poisoned");
        let mut sessions: Vec<ExamSession> = inner
            .sessions
            .values()
            .filter(|s| s.user_id == user_id && s.status == SessionStatus::Completed)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.end_time.cmp(&a.end_time).then(b.id.cmp(&a.id)));
        Ok(sessions)
    }
}
