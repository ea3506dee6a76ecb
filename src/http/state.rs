use crate::catalog::QuestionCatalog;
use crate::config::TurnConfig;
use crate::interview::InterviewHandle;
use crate::runtime::CollaboratorFactory;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Running interviews (interview_id → controller handle)
    pub interviews: Arc<RwLock<HashMap<String, InterviewHandle>>>,
    pub catalog: Arc<QuestionCatalog>,
    pub turn_config: TurnConfig,
    pub factory: Arc<dyn CollaboratorFactory>,
    pub service_name: String,
}

impl AppState {
    pub fn new(
        catalog: QuestionCatalog,
        turn_config: TurnConfig,
        factory: Arc<dyn CollaboratorFactory>,
        service_name: impl Into<String>,
    ) -> Self {
        Self {
            interviews: Arc::new(RwLock::new(HashMap::new())),
            catalog: Arc::new(catalog),
            turn_config,
            factory,
            service_name: service_name.into(),
        }
    }

    pub async fn get(&self, interview_id: &str) -> Option<InterviewHandle> {
        self.interviews.read().await.get(interview_id).cloned()
    }
}
