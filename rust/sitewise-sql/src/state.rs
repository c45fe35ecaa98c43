use crate::{config::AppConfig, session::SessionStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, sessions: SessionStore) -> Self {
        Self { config, sessions }
    }
}
