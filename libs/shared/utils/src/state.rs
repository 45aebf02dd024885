use std::sync::Arc;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

/// Shared by every router; cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<SupabaseClient>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let db = SupabaseClient::new(&config);
        Self {
            config: Arc::new(config),
            db: Arc::new(db),
        }
    }
}
