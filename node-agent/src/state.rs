use std::sync::Arc;

use orchestrator_core::Orchestrator;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub node_secret: Arc<str>,
}
