use std::sync::Arc;

use crate::error::Result;
use crate::models::exam::Exam;
use crate::store::ExamStore;

/// Read side of the exam catalog. Definitions are admin-managed data;
/// this service never writes them.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn ExamStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn ExamStore>) -> Self {
        Self { store }
    }

    pub async fn available_exams(&self) -> Result<Vec<Exam>> {
        self.store.list_active_exams().await
    }
}
