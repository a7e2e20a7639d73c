//! Timetable planning endpoints.
//!
//! Both endpoints load the term catalog through the regular fetch path, so
//! they share the client's local cache with the catalog endpoints.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::calendar::WeekGrid;
use crate::enumerate::{sections_conflict, EnumerateOptions, Outcome};
use crate::fetcher;
use crate::model::{CourseKey, Section};
use crate::server::types::ApiErrorType;
use crate::state::{run_effect, Action, CatalogState, CombinationSummary, PlannerState};
use crate::types::AppState;

#[derive(Debug, Deserialize)]
pub struct TimetableRequest {
    pub year: i32,
    pub term: u32,
    /// Course keys such as `"CPSC 1150"`
    pub courses: Vec<String>,
    #[serde(default)]
    pub valid_only: bool,
    /// Capped by the server's `max_combinations`
    pub limit: Option<usize>,
    #[serde(default)]
    pub include_calendar: bool,
    pub slot_minutes: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct CalendarView {
    pub grid: WeekGrid,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct TimetableEntry {
    #[serde(flatten)]
    pub combination: CombinationSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar: Option<CalendarView>,
}

#[derive(Debug, Serialize)]
pub struct TimetableResponse {
    pub year: i32,
    pub term: u32,
    pub courses: Vec<CourseKey>,
    pub outcome: Outcome,
    /// Courses with no sections, when the outcome is unsatisfiable
    pub empty_courses: Vec<CourseKey>,
    pub total: u64,
    /// How many combinations were generated before stopping
    pub examined: u64,
    /// Stopped early at the kept or examined cap
    pub truncated: bool,
    pub combinations: Vec<TimetableEntry>,
}

#[derive(Debug, Deserialize)]
pub struct CalendarRequest {
    pub year: i32,
    pub term: u32,
    pub section_ids: Vec<String>,
    pub slot_minutes: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct CalendarResponse {
    pub sections: Vec<String>,
    /// Index pairs into `sections` that overlap in time
    pub conflicts: Vec<(usize, usize)>,
    #[serde(flatten)]
    pub calendar: CalendarView,
}

/// Runs a term load through the planner state and returns it once loaded.
async fn load_planner(
    s: &AppState,
    year: i32,
    term: u32,
    options: EnumerateOptions,
) -> Result<PlannerState, ApiErrorType> {
    let mut planner = PlannerState::new(options);
    let effect = planner.apply(Action::SetTerm { year, term })?;
    if let Some(done) = run_effect(&s.client, effect).await {
        planner.apply(done)?;
    }

    let failure = match planner.catalog() {
        CatalogState::Loaded(_) => None,
        CatalogState::Failed { error, .. } => Some(ApiErrorType::from(error.clone())),
        CatalogState::Unloaded | CatalogState::Loading { .. } => Some(ApiErrorType::from((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Term catalog did not load",
            None,
        ))),
    };
    match failure {
        Some(e) => Err(e),
        None => Ok(planner),
    }
}

/// POST /timetable
///
/// Enumerates section combinations for the requested courses. Every
/// combination is returned with its validity flag unless `valid_only` is set.
pub async fn post_timetable(
    State(s): State<Arc<AppState>>,
    Json(req): Json<TimetableRequest>,
) -> Response {
    info!(
        "POST /timetable - {} {} ({} courses)",
        req.year,
        req.term,
        req.courses.len()
    );

    let cap = s.config.max_combinations;
    let options = EnumerateOptions {
        valid_only: req.valid_only,
        limit: Some(req.limit.map_or(cap, |l| l.min(cap))),
        max_examined: Some(s.config.max_examined),
    };

    let mut planner = match load_planner(&s, req.year, req.term, options).await {
        Ok(planner) => planner,
        Err(e) => return e.into_response(),
    };

    for raw in &req.courses {
        if let Err(e) = planner.add_course_by_name(raw) {
            warn!("Rejected course {:?}: {}", raw, e);
            return ApiErrorType::from(e).into_response();
        }
    }

    let (year, term) = (req.year, req.term);
    let include_calendar = req.include_calendar;
    let slot = req.slot_minutes.unwrap_or(s.config.calendar_slot_minutes);

    // Enumeration is CPU-bound; keep it off the async workers.
    let built = tokio::task::spawn_blocking(move || {
        build_timetable(planner, year, term, include_calendar, slot)
    })
    .await;

    match built {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => {
            error!("Timetable enumeration task failed: {}", e);
            ApiErrorType::from((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to enumerate timetables",
                Some(e.to_string()),
            ))
            .into_response()
        }
    }
}

fn build_timetable(
    mut planner: PlannerState,
    year: i32,
    term: u32,
    include_calendar: bool,
    slot: u32,
) -> TimetableResponse {
    let set = planner.combinations().clone();

    let mut combinations = Vec::with_capacity(set.combinations.len());
    for (index, combination) in set.combinations.into_iter().enumerate() {
        let calendar = if include_calendar {
            planner.calendar(index).map(|grid| CalendarView {
                text: grid.render_text(slot),
                grid,
            })
        } else {
            None
        };
        combinations.push(TimetableEntry {
            combination,
            calendar,
        });
    }

    TimetableResponse {
        year,
        term,
        courses: planner.selection().keys().cloned().collect(),
        outcome: set.outcome,
        empty_courses: set.empty_courses,
        total: set.total,
        examined: set.examined,
        truncated: set.truncated,
        combinations,
    }
}

/// POST /calendar
///
/// Projects an explicit list of sections onto a week grid.
pub async fn post_calendar(
    State(s): State<Arc<AppState>>,
    Json(req): Json<CalendarRequest>,
) -> Response {
    info!(
        "POST /calendar - {} {} ({} sections)",
        req.year,
        req.term,
        req.section_ids.len()
    );

    let catalog = match fetcher::fetch_term(&s.client, req.year, req.term).await {
        Ok(catalog) => catalog,
        Err(e) => {
            error!("Failed to load term {} {}: {}", req.year, req.term, e);
            return ApiErrorType::from(e).into_response();
        }
    };

    let mut sections: Vec<&Section> = Vec::with_capacity(req.section_ids.len());
    for id in &req.section_ids {
        match catalog.section(id) {
            Some(section) => sections.push(section),
            None => {
                return ApiErrorType::from((
                    StatusCode::NOT_FOUND,
                    "Unknown section",
                    Some(format!("No section {} in {} {}", id, req.year, req.term)),
                ))
                .into_response()
            }
        }
    }

    let response = CalendarResponse {
        sections: sections.iter().map(|section| section.id.clone()).collect(),
        conflicts: conflicting_pairs(&sections),
        calendar: {
            let grid = WeekGrid::from_sections(sections.iter().copied());
            CalendarView {
                text: grid.render_text(req.slot_minutes.unwrap_or(s.config.calendar_slot_minutes)),
                grid,
            }
        },
    };

    (StatusCode::OK, Json(response)).into_response()
}

fn conflicting_pairs(sections: &[&Section]) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for i in 0..sections.len() {
        for j in (i + 1)..sections.len() {
            if sections_conflict(sections[i], sections[j]) {
                pairs.push((i, j));
            }
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ComponentKind, DaySet, ScheduleEntry, TimeRange};

    fn section(id: &str, days: DaySet, span: &str) -> Section {
        Section {
            id: id.to_string(),
            section: "001".to_string(),
            course: CourseKey::new("CPSC", "1150"),
            schedule: vec![ScheduleEntry {
                kind: ComponentKind::Lecture,
                days,
                time: TimeRange::parse_span(span),
                room: None,
                instructor: None,
            }],
            seats: None,
            waitlist: None,
            cancelled: false,
            notes: None,
        }
    }

    #[test]
    fn test_conflicting_pairs() {
        let a = section("1", DaySet::MONDAY, "0900-1000");
        let b = section("2", DaySet::MONDAY, "1000-1100");
        let c = section("3", DaySet::MONDAY | DaySet::FRIDAY, "0930-1030");
        assert_eq!(conflicting_pairs(&[&a, &b, &c]), vec![(0, 2), (1, 2)]);
    }

    #[test]
    fn test_timetable_request_defaults() {
        let req: TimetableRequest = serde_json::from_str(
            r#"{ "year": 2024, "term": 10, "courses": ["CPSC 1150"] }"#,
        )
        .unwrap();
        assert!(!req.valid_only);
        assert!(!req.include_calendar);
        assert!(req.limit.is_none());
    }
}
