use std::sync::Arc;

use crate::application::auth::IdentityProvider;
use crate::application::questions::QuestionService;
use crate::application::repos::HealthCheck;
use crate::infra::hub::QuestionHub;

#[derive(Clone)]
pub struct ApiState {
    pub questions: Arc<QuestionService>,
    pub identity: Arc<dyn IdentityProvider>,
    pub hub: Arc<QuestionHub>,
    pub health: Arc<dyn HealthCheck>,
}
