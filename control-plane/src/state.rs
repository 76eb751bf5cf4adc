use std::sync::Arc;

use crate::db::Repo;
use crate::lifecycle::LifecycleController;

#[derive(Clone)]
pub struct AppState {
    pub repo: Repo,
    pub lifecycle: Arc<LifecycleController>,
}
