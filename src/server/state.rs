use crate::config::ValidatorConfig;
use crate::contract::SchemaModel;
use crate::orchestrator::RequestValidator;
use std::sync::Arc;

/// Shared front-door state
#[derive(Clone)]
pub struct AppState {
    pub validator: Arc<RequestValidator>,
}

impl AppState {
    pub fn new(model: Arc<SchemaModel>, config: ValidatorConfig) -> Self {
        Self {
            validator: Arc::new(RequestValidator::new(model, config)),
        }
    }

    pub fn config(&self) -> &ValidatorConfig {
        self.validator.config()
    }
}
