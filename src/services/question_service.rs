use std::collections::HashMap;
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::thread_rng;

use crate::dto::exam_dto::{ChoiceOut, QuestionOut};
use crate::error::Result;
use crate::models::exam::Exam;
use crate::models::session::ExamSession;
use crate::store::ExamStore;

#[derive(Clone)]
pub struct QuestionService {
    store: Arc<dyn ExamStore>,
}

impl QuestionService {
    pub fn new(store: Arc<dyn ExamStore>) -> Self {
        Self { store }
    }

    /// Question set for an in-progress session. The first fetch samples
    /// `min(exam.total_questions, available)` questions uniformly without
    /// replacement and freezes the selection; later fetches replay it in the
    /// same order. Correctness flags stay server-side.
    pub async fn sampled_for(
        &self,
        session: &ExamSession,
        exam: &Exam,
    ) -> Result<Vec<QuestionOut>> {
        let mut assigned = self.store.assigned_question_ids(session.id).await?;
        if assigned.is_empty() {
            let all = self.store.list_questions(exam.id).await?;
            let take = (exam.total_questions.max(0) as usize).min(all.len());
            let sampled: Vec<i64> = all
                .choose_multiple(&mut thread_rng(), take)
                .map(|q| q.id)
                .collect();
            self.store.assign_questions(session.id, &sampled).await?;
            // re-read in case a concurrent first fetch won the assignment
            assigned = self.store.assigned_question_ids(session.id).await?;
            tracing::debug!(
                session_id = %session.session_id,
                sampled = assigned.len(),
                "question set frozen"
            );
        }

        let questions = self.store.list_questions(exam.id).await?;
        let by_id: HashMap<i64, _> = questions.into_iter().map(|q| (q.id, q)).collect();

        let mut choices_by_question: HashMap<i64, Vec<ChoiceOut>> = HashMap::new();
        for choice in self.store.list_choices(&assigned).await? {
            choices_by_question
                .entry(choice.question_id)
                .or_default()
                .push(ChoiceOut {
                    id: choice.id,
                    choice_text: choice.choice_text,
                });
        }

        Ok(assigned
            .iter()
            .filter_map(|id| by_id.get(id))
            .map(|q| QuestionOut {
                id: q.id,
                question_text: q.question_text.clone(),
                choices: choices_by_question.remove(&q.id).unwrap_or_default(),
            })
            .collect())
    }
}
