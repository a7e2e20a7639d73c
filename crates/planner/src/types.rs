use crate::api::{CourseApiClient, FetchError};
use crate::config::PlannerConfig;

/// Shared state handed to every request handler.
pub struct AppState {
    pub client: CourseApiClient,
    pub config: PlannerConfig,
}

impl AppState {
    pub fn new(config: PlannerConfig) -> Result<Self, FetchError> {
        let client = CourseApiClient::with_config(config.to_api_config())?;
        Ok(Self { client, config })
    }
}
