mod common;

use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn full_exam_flow_end_to_end() {
    let (store, app) = common::test_app();
    let exam = store.insert_exam("Rust Fundamentals", 30, 2, true);
    store.insert_exam("Hidden Draft", 30, 2, false);
    let (q1, c1) = store.insert_question(
        exam.id,
        "What does ownership prevent?",
        &[("data races", true), ("fast builds", false)],
    );
    let (q2, c2) = store.insert_question(
        exam.id,
        "What is a borrow?",
        &[("a move", false), ("a reference", true)],
    );
    store.insert_question(exam.id, "Spare question", &[("yes", true), ("no", false)]);

    let user = Uuid::new_v4();
    let auth = common::bearer(user);

    // catalog lists only active exams
    let (status, body) = common::get(&app, "/api/exams/available", &auth).await;
    assert_eq!(status, StatusCode::OK);
    let listed = body.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["title"], "Rust Fundamentals");
    assert_eq!(listed[0]["total_questions"], 2);

    // start a session
    let (status, body) = common::post(
        &app,
        &format!("/api/exams/{}/start", exam.id),
        &auth,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["session"]["attempt_number"], 1);
    assert_eq!(body["session"]["status"], "in_progress");
    assert_eq!(body["session"]["total_questions"], 2);
    let session_id = body["session"]["session_id"].as_str().unwrap().to_string();

    // fetch questions: 2 sampled out of 3, no correctness leak, stable replay
    let questions_uri = format!("/api/exams/session/{}/questions", session_id);
    let (status, body) = common::get(&app, &questions_uri, &auth).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["duration_minutes"], 30);
    let questions = body["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 2);
    assert!(!body.to_string().contains("is_correct"));

    let first_ids: Vec<i64> = questions
        .iter()
        .map(|q| q["id"].as_i64().unwrap())
        .collect();
    let (_, body) = common::get(&app, &questions_uri, &auth).await;
    let replay_ids: Vec<i64> = body["questions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|q| q["id"].as_i64().unwrap())
        .collect();
    assert_eq!(first_ids, replay_ids);

    // answer both questions correctly
    let answer_uri = format!("/api/exams/session/{}/answer", session_id);
    for (question_id, choice_id) in [(q1.id, c1[0].id), (q2.id, c2[1].id)] {
        let (status, body) = common::post(
            &app,
            &answer_uri,
            &auth,
            Some(json!({"question_id": question_id, "choice_id": choice_id})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["question_id"], question_id);
        assert_eq!(body["choice_id"], choice_id);
    }

    // submit and check the result
    let (status, body) = common::post(
        &app,
        &format!("/api/exams/session/{}/submit", session_id),
        &auth,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let result = &body["result"];
    assert_eq!(result["status"], "completed");
    assert_eq!(result["correct_answers"], 2);
    assert_eq!(common::score_of(&result["score"]), 100.0);

    // result endpoint shows the completed session
    let (status, body) = common::get(
        &app,
        &format!("/api/exams/session/{}/result", session_id),
        &auth,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session_id"], session_id.as_str());
    assert_eq!(body["exam"]["title"], "Rust Fundamentals");

    // history has exactly this attempt
    let (status, body) = common::get(&app, "/api/exams/history", &auth).await;
    assert_eq!(status, StatusCode::OK);
    let history = body.as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["session_id"], session_id.as_str());
}

#[tokio::test]
async fn attempt_numbers_are_sequential_per_user_and_exam() {
    let (store, app) = common::test_app();
    let exam = store.insert_exam("Attempts", 30, 1, true);
    store.insert_question(exam.id, "Q", &[("yes", true)]);
    let auth = common::bearer(Uuid::new_v4());

    for expected in 1..=3 {
        let (status, body) = common::post(
            &app,
            &format!("/api/exams/{}/start", exam.id),
            &auth,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["session"]["attempt_number"], expected);
        assert_eq!(
            body["message"],
            format!("Exam session started successfully (Attempt #{})", expected)
        );
    }
}

#[tokio::test]
async fn starting_a_missing_or_inactive_exam_is_not_found() {
    let (store, app) = common::test_app();
    let inactive = store.insert_exam("Inactive", 30, 1, false);
    let auth = common::bearer(Uuid::new_v4());

    let (status, _) = common::post(&app, "/api/exams/424242/start", &auth, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = common::post(
        &app,
        &format!("/api/exams/{}/start", inactive.id),
        &auth,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn requests_without_a_token_are_unauthorized() {
    let (_, app) = common::test_app();
    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/api/exams/available")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
