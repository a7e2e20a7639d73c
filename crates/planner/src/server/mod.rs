use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::server::endpoints::{catalog, status, timetable};
use crate::types::AppState;

mod endpoints;
mod types;

pub use types::ApiErrorType;

/// Creates a router that can be used by `axum`.
///
/// # Parameters
/// - `app_state`: The app server state.
///
/// # Returns
/// The router.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Passthroughs to the course-data API
    let catalog_router = Router::new()
        .route("/semesters", get(catalog::get_semesters))
        .route("/subjects", get(catalog::get_subjects))
        .route(
            "/semester/:year/:term/courses",
            get(catalog::get_term_courses),
        )
        .route("/search/sections", get(catalog::get_search_sections));

    let planner_router = Router::new()
        .route("/timetable", post(timetable::post_timetable))
        .route("/calendar", post(timetable::post_calendar));

    Router::new()
        .route("/health", get(status::get_health))
        .route("/cache_stats", get(status::get_cache_stats))
        .route("/invalidate_cache", post(status::invalidate_cache))
        .merge(catalog_router)
        .merge(planner_router)
        .with_state(app_state)
}
