pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
pub mod utils;

use std::sync::Arc;

use crate::services::{
    answer_service::AnswerService, catalog_service::CatalogService,
    question_service::QuestionService, result_service::ResultService,
    scoring_service::ScoringService, session_service::SessionService,
};
use crate::store::ExamStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ExamStore>,
    pub catalog: CatalogService,
    pub sessions: SessionService,
    pub questions: QuestionService,
    pub answers: AnswerService,
    pub scoring: ScoringService,
    pub results: ResultService,
}

impl AppState {
    pub fn new(store: Arc<dyn ExamStore>) -> Self {
        Self {
            catalog: CatalogService::new(store.clone()),
            sessions: SessionService::new(store.clone()),
            questions: QuestionService::new(store.clone()),
            answers: AnswerService::new(store.clone()),
            scoring: ScoringService::new(store.clone()),
            results: ResultService::new(store.clone()),
            store,
        }
    }
}
