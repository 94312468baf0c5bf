pub mod exams;
pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::middleware::{auth, rate_limit};
use crate::AppState;

/// Full API surface. Everything except the health probe sits behind bearer
/// auth and the shared per-second rate limit.
pub fn api_router(state: AppState, public_rps: u32) -> Router {
    let exam_api = Router::new()
        .route("/api/exams/available", get(exams::available_exams))
        .route("/api/exams/:exam_id/start", post(exams::start_exam))
        .route(
            "/api/exams/session/:session_id/questions",
            get(exams::get_exam_questions),
        )
        .route(
            "/api/exams/session/:session_id/answer",
            post(exams::submit_answer),
        )
        .route(
            "/api/exams/session/:session_id/submit",
            post(exams::submit_exam),
        )
        .route(
            "/api/exams/session/:session_id/result",
            get(exams::get_exam_result),
        )
        .route("/api/exams/history", get(exams::exam_history))
        .layer(axum::middleware::from_fn(auth::require_bearer_auth))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit::new_rps_state(public_rps),
            rate_limit::rps_middleware,
        ));

    Router::new()
        .route("/health", get(health::health))
        .merge(exam_api)
        .with_state(state)
}
