//! Read-only passthroughs to the course-data API.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::{error, info};

use crate::api::SectionSearchParams;
use crate::fetcher;
use crate::server::types::ApiErrorType;
use crate::types::AppState;

/// GET /semesters
pub async fn get_semesters(State(s): State<Arc<AppState>>) -> Response {
    info!("GET /semesters");

    match s.client.semesters().await {
        Ok(fetched) => (StatusCode::OK, Json(fetched)).into_response(),
        Err(e) => {
            error!("Failed to fetch semesters: {}", e);
            ApiErrorType::from(e).into_response()
        }
    }
}

/// GET /subjects
pub async fn get_subjects(State(s): State<Arc<AppState>>) -> Response {
    info!("GET /subjects");

    match s.client.subjects().await {
        Ok(fetched) => (StatusCode::OK, Json(fetched)).into_response(),
        Err(e) => {
            error!("Failed to fetch subjects: {}", e);
            ApiErrorType::from(e).into_response()
        }
    }
}

/// GET /semester/:year/:term/courses
///
/// Returns every course in the term with its sections attached.
pub async fn get_term_courses(
    Path((year, term)): Path<(i32, u32)>,
    State(s): State<Arc<AppState>>,
) -> Response {
    info!("GET /semester/{}/{}/courses", year, term);

    match fetcher::fetch_term(&s.client, year, term).await {
        Ok(catalog) => (StatusCode::OK, Json(catalog)).into_response(),
        Err(e) => {
            error!("Failed to load term {} {}: {}", year, term, e);
            ApiErrorType::from(e).into_response()
        }
    }
}

/// GET /search/sections
///
/// Query parameters are forwarded as-is; see [`SectionSearchParams`].
pub async fn get_search_sections(
    State(s): State<Arc<AppState>>,
    Query(params): Query<SectionSearchParams>,
) -> Response {
    info!("GET /search/sections - {:?}", params);

    if let (Some(year), Some(term)) = (params.year, params.term) {
        if let Err(e) = fetcher::validate_term(year, term) {
            return ApiErrorType::from(e).into_response();
        }
    }

    match s.client.search_sections(&params).await {
        Ok(fetched) => (StatusCode::OK, Json(fetched)).into_response(),
        Err(e) => {
            error!("Section search failed: {}", e);
            ApiErrorType::from(e).into_response()
        }
    }
}
