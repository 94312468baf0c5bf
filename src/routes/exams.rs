use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use validator::Validate;

use crate::dto::exam_dto::{
    ExamResult, ExamSummary, QuestionsResponse, SessionSummary, StartExamResponse,
    SubmitAnswerRequest, SubmitAnswerResponse, SubmitExamResponse,
};
use crate::middleware::auth::Claims;
use crate::AppState;

#[axum::debug_handler]
pub async fn available_exams(State(state): State<AppState>) -> crate::error::Result<Response> {
    let exams = state.catalog.available_exams().await?;
    let out: Vec<ExamSummary> = exams.iter().map(ExamSummary::from).collect();
    Ok(Json(out).into_response())
}

#[axum::debug_handler]
pub async fn start_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<i64>,
) -> crate::error::Result<Response> {
    let user_id = claims.user_id()?;
    let (session, exam) = state.sessions.start_session(user_id, exam_id).await?;
    let response = StartExamResponse {
        message: format!(
            "Exam session started successfully (Attempt #{})",
            session.attempt_number
        ),
        session: SessionSummary::new(&session, &exam),
    };
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

#[axum::debug_handler]
pub async fn get_exam_questions(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<String>,
) -> crate::error::Result<Response> {
    let user_id = claims.user_id()?;
    let (session, exam) = state.sessions.load_active(user_id, &session_id).await?;
    let questions = state.questions.sampled_for(&session, &exam).await?;
    let response = QuestionsResponse {
        session_id: session.session_id.clone(),
        questions,
        duration_minutes: exam.duration_minutes,
        start_time: session.start_time,
    };
    Ok(Json(response).into_response())
}

#[axum::debug_handler]
pub async fn submit_answer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<String>,
    Json(req): Json<SubmitAnswerRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let user_id = claims.user_id()?;
    let (session, _exam) = state.sessions.load_active(user_id, &session_id).await?;
    state
        .answers
        .record(&session, req.question_id, req.choice_id)
        .await?;
    Ok(Json(SubmitAnswerResponse {
        message: "Answer submitted successfully".to_string(),
        question_id: req.question_id,
        choice_id: req.choice_id,
    })
    .into_response())
}

#[axum::debug_handler]
pub async fn submit_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<String>,
) -> crate::error::Result<Response> {
    let user_id = claims.user_id()?;
    let (session, exam) = state.sessions.load_active(user_id, &session_id).await?;
    let completed = state.scoring.submit(&session).await?;
    Ok(Json(SubmitExamResponse {
        message: "Exam submitted successfully".to_string(),
        result: ExamResult::new(&completed, &exam),
    })
    .into_response())
}

#[axum::debug_handler]
pub async fn get_exam_result(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<String>,
) -> crate::error::Result<Response> {
    let user_id = claims.user_id()?;
    let result = state.results.result(user_id, &session_id).await?;
    Ok(Json(result).into_response())
}

#[axum::debug_handler]
pub async fn exam_history(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> crate::error::Result<Response> {
    let user_id = claims.user_id()?;
    let history = state.results.history(user_id).await?;
    Ok(Json(history).into_response())
}
