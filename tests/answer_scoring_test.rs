mod common;

use axum::http::StatusCode;
use exam_portal_backend::store::ExamStore;
use serde_json::json;
use uuid::Uuid;

struct Flow {
    store: std::sync::Arc<exam_portal_backend::store::MemoryStore>,
    app: axum::Router,
    auth: String,
    session_id: String,
    session_pk: i64,
}

impl Flow {
    async fn answer(&self, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        common::post(
            &self.app,
            &format!("/api/exams/session/{}/answer", self.session_id),
            &self.auth,
            Some(body),
        )
        .await
    }

    async fn submit(&self) -> (StatusCode, serde_json::Value) {
        common::post(
            &self.app,
            &format!("/api/exams/session/{}/submit", self.session_id),
            &self.auth,
            None,
        )
        .await
    }
}

async fn flow_with_questions(
    question_count: usize,
) -> (Flow, Vec<(i64, i64, i64)>) {
    let (store, app) = common::test_app();
    let exam = store.insert_exam("Scoring", 30, question_count as i32, true);
    let mut questions = Vec::new();
    for i in 0..question_count {
        let (q, c) = store.insert_question(
            exam.id,
            &format!("Q{}", i),
            &[("right", true), ("wrong", false)],
        );
        questions.push((q.id, c[0].id, c[1].id));
    }

    let user = Uuid::new_v4();
    let auth = common::bearer(user);
    let (status, body) = common::post(&app, &format!("/api/exams/{}/start", exam.id), &auth, None).await;
    assert_eq!(status, StatusCode::CREATED);
    let session_id = body["session"]["session_id"].as_str().unwrap().to_string();
    let session_pk = store
        .get_session(&session_id, user)
        .await
        .unwrap()
        .unwrap()
        .id;

    (
        Flow {
            store,
            app,
            auth,
            session_id,
            session_pk,
        },
        questions,
    )
}

#[tokio::test]
async fn reanswering_keeps_one_row_with_the_latest_choice() {
    let (flow, questions) = flow_with_questions(1).await;
    let (q, right, wrong) = questions[0];

    let (status, _) = flow.answer(json!({"question_id": q, "choice_id": wrong})).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = flow.answer(json!({"question_id": q, "choice_id": right})).await;
    assert_eq!(status, StatusCode::OK);

    let answers = flow.store.list_answers(flow.session_pk).await.unwrap();
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0].selected_choice_id, Some(right));

    let (_, body) = flow.submit().await;
    assert_eq!(common::score_of(&body["result"]["score"]), 100.0);
}

#[tokio::test]
async fn score_divides_by_answered_count_only() {
    // 4 assigned, 3 answered: 2 right, 1 wrong -> 66.67
    let (flow, questions) = flow_with_questions(4).await;

    let (q0, right0, _) = questions[0];
    let (q1, right1, _) = questions[1];
    let (q2, _, wrong2) = questions[2];
    flow.answer(json!({"question_id": q0, "choice_id": right0})).await;
    flow.answer(json!({"question_id": q1, "choice_id": right1})).await;
    flow.answer(json!({"question_id": q2, "choice_id": wrong2})).await;

    let (status, body) = flow.submit().await;
    assert_eq!(status, StatusCode::OK);
    let result = &body["result"];
    assert_eq!(result["correct_answers"], 2);
    assert_eq!(result["total_questions"], 4);
    let score = common::score_of(&result["score"]);
    assert!((score - 66.67).abs() < 0.001);
}

#[tokio::test]
async fn skip_is_recorded_and_scored_as_wrong_among_answered() {
    let (flow, questions) = flow_with_questions(2).await;
    let (q0, right0, _) = questions[0];
    let (q1, _, _) = questions[1];

    flow.answer(json!({"question_id": q0, "choice_id": right0})).await;
    let (status, body) = flow.answer(json!({"question_id": q1})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["choice_id"], serde_json::Value::Null);

    let (_, body) = flow.submit().await;
    assert_eq!(common::score_of(&body["result"]["score"]), 50.0);
}

#[tokio::test]
async fn submitting_with_no_answers_scores_zero() {
    let (flow, _) = flow_with_questions(2).await;
    let (status, body) = flow.submit().await;
    assert_eq!(status, StatusCode::OK);
    let result = &body["result"];
    assert_eq!(common::score_of(&result["score"]), 0.0);
    assert_eq!(result["correct_answers"], 0);
}

#[tokio::test]
async fn foreign_question_and_choice_ids_are_not_found() {
    let (flow, questions) = flow_with_questions(1).await;
    let (q, _, _) = questions[0];

    // a question from a different exam
    let other_exam = flow.store.insert_exam("Other", 30, 1, true);
    let (other_q, other_c) = flow
        .store
        .insert_question(other_exam.id, "Elsewhere", &[("yes", true)]);

    let (status, _) = flow
        .answer(json!({"question_id": other_q.id, "choice_id": other_c[0].id}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // a valid question with a choice belonging to another question
    let (status, _) = flow
        .answer(json!({"question_id": q, "choice_id": other_c[0].id}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_answer_payloads_are_rejected() {
    let (flow, _) = flow_with_questions(1).await;

    // missing question_id fails deserialization
    let (status, _) = flow.answer(json!({"choice_id": 1})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // non-positive question_id fails validation
    let (status, _) = flow.answer(json!({"question_id": 0})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
