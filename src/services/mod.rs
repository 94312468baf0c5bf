pub mod answer_service;
pub mod catalog_service;
pub mod question_service;
pub mod result_service;
pub mod scoring_service;
pub mod session_service;
