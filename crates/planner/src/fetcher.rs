//! Loads everything the planner needs for one term.
//!
//! Both listings are requested concurrently and must both succeed; a term
//! with courses but no sections (or vice versa) is never handed out.

use crate::api::{CacheIndicator, CourseApiClient, FetchError, SemesterWire, SubjectWire};
use crate::model::{Course, CourseKey, Section};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{info, warn};

/// Term codes used by the college: spring, summer, fall.
pub const TERM_CODES: [(u32, &str); 3] = [(10, "Spring"), (20, "Summer"), (30, "Fall")];

const MIN_YEAR: i32 = 1990;
const MAX_YEAR: i32 = 2100;

/// Rejects year/term pairs the API cannot have data for.
pub fn validate_term(year: i32, term: u32) -> Result<(), FetchError> {
    let known_term = TERM_CODES.iter().any(|(code, _)| *code == term);
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) || !known_term {
        return Err(FetchError::InvalidTerm { year, term });
    }
    Ok(())
}

pub fn term_name(term: u32) -> Option<&'static str> {
    TERM_CODES
        .iter()
        .find(|(code, _)| *code == term)
        .map(|(_, name)| *name)
}

/// Courses of one term with their sections attached.
#[derive(Debug, Clone, Serialize)]
pub struct TermCatalog {
    pub year: i32,
    pub term: u32,
    pub courses: Vec<Course>,
    pub courses_cache: CacheIndicator,
    pub sections_cache: CacheIndicator,
    pub elapsed_ms: u64,
}

impl TermCatalog {
    pub fn course(&self, key: &CourseKey) -> Option<&Course> {
        self.courses.iter().find(|c| &c.key == key)
    }

    /// Finds a section by its registration number.
    pub fn section(&self, id: &str) -> Option<&Section> {
        self.courses.iter().find_map(|c| c.section(id))
    }

    pub fn section_count(&self) -> usize {
        self.courses.iter().map(|c| c.sections.len()).sum()
    }
}

/// Fetches courses and sections for a term and merges them.
pub async fn fetch_term(
    client: &CourseApiClient,
    year: i32,
    term: u32,
) -> Result<TermCatalog, FetchError> {
    validate_term(year, term)?;

    let start = Instant::now();
    let (courses, sections) = tokio::try_join!(
        client.term_courses(year, term),
        client.term_sections(year, term)
    )?;

    let courses_cache = courses.cache;
    let sections_cache = sections.cache;
    let courses = merge_sections(courses.data, sections.data);

    let catalog = TermCatalog {
        year,
        term,
        courses,
        courses_cache,
        sections_cache,
        elapsed_ms: start.elapsed().as_millis() as u64,
    };

    info!(
        year,
        term,
        courses = catalog.courses.len(),
        sections = catalog.section_count(),
        duration_ms = catalog.elapsed_ms,
        "Loaded term catalog"
    );

    Ok(catalog)
}

/// Attaches each section to the course with the same subject and course
/// code, keeping both input orders.
///
/// A section whose course is missing from `courses` gets a bare course record
/// appended, so no section is lost.
pub fn merge_sections(mut courses: Vec<Course>, sections: Vec<Section>) -> Vec<Course> {
    let mut index: HashMap<CourseKey, usize> = courses
        .iter()
        .enumerate()
        .map(|(i, c)| (c.key.clone(), i))
        .collect();

    for section in sections {
        let position = match index.get(&section.course) {
            Some(&i) => i,
            None => {
                warn!(course = %section.course, section = %section.id, "Section has no matching course");
                courses.push(Course::new(section.course.clone()));
                index.insert(section.course.clone(), courses.len() - 1);
                courses.len() - 1
            }
        };
        courses[position].sections.push(section);
    }

    courses
}

/// The indices a front end needs before any term is chosen.
#[derive(Debug, Clone, Serialize)]
pub struct Bootstrap {
    pub semesters: Vec<SemesterWire>,
    pub subjects: Vec<SubjectWire>,
}

impl Bootstrap {
    /// The most recent semester, used as the default selection.
    pub fn latest_semester(&self) -> Option<&SemesterWire> {
        self.semesters.iter().max_by_key(|s| (s.year, s.term))
    }
}

/// Fetches the semester and subject indices concurrently.
pub async fn fetch_bootstrap(client: &CourseApiClient) -> Result<Bootstrap, FetchError> {
    let (semesters, subjects) = tokio::try_join!(client.semesters(), client.subjects())?;
    Ok(Bootstrap {
        semesters: semesters.data,
        subjects: subjects.data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(id: &str, subject: &str, code: &str) -> Section {
        Section {
            id: id.to_string(),
            section: "001".to_string(),
            course: CourseKey::new(subject, code),
            schedule: Vec::new(),
            seats: Some(10),
            waitlist: None,
            cancelled: false,
            notes: None,
        }
    }

    #[test]
    fn test_merge_attaches_by_subject_and_code() {
        let courses = vec![
            Course::new(CourseKey::new("CPSC", "1150")),
            Course::new(CourseKey::new("MATH", "1171")),
        ];
        let sections = vec![
            section("1", "MATH", "1171"),
            section("2", "CPSC", "1150"),
            section("3", "MATH", "1171"),
        ];

        let merged = merge_sections(courses, sections);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].key, CourseKey::new("CPSC", "1150"));
        let ids: Vec<_> = merged[1].sections.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn test_merge_keeps_orphan_sections() {
        let merged = merge_sections(
            vec![Course::new(CourseKey::new("CPSC", "1150"))],
            vec![section("9", "ENGL", "1123"), section("10", "ENGL", "1123")],
        );
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[1].key, CourseKey::new("ENGL", "1123"));
        assert_eq!(merged[1].sections.len(), 2);
        assert!(merged[0].sections.is_empty());
    }

    #[test]
    fn test_merge_requires_exact_code_match() {
        let merged = merge_sections(
            vec![Course::new(CourseKey::new("CPSC", "1150"))],
            vec![section("1", "CPSC", "1155")],
        );
        assert!(merged[0].sections.is_empty());
        assert_eq!(merged[1].key.course_code, "1155");
    }

    #[test]
    fn test_validate_term() {
        assert!(validate_term(2024, 10).is_ok());
        assert!(validate_term(2024, 30).is_ok());
        assert!(matches!(
            validate_term(2024, 40),
            Err(FetchError::InvalidTerm { .. })
        ));
        assert!(validate_term(1066, 10).is_err());
        assert_eq!(term_name(20), Some("Summer"));
    }

    #[test]
    fn test_catalog_lookup() {
        let catalog = TermCatalog {
            year: 2024,
            term: 10,
            courses: merge_sections(
                vec![Course::new(CourseKey::new("CPSC", "1150"))],
                vec![section("42", "CPSC", "1150")],
            ),
            courses_cache: CacheIndicator::Unknown,
            sections_cache: CacheIndicator::Unknown,
            elapsed_ms: 0,
        };
        assert_eq!(catalog.section_count(), 1);
        assert!(catalog.section("42").is_some());
        assert!(catalog.course(&CourseKey::new("CPSC", "1150")).is_some());
        assert!(catalog.course(&CourseKey::new("CPSC", "9999")).is_none());
    }

    #[tokio::test]
    async fn test_fetch_term_rejects_invalid_term_without_request() {
        let client = CourseApiClient::new().unwrap();
        let err = fetch_term(&client, 2024, 99).await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidTerm { year: 2024, term: 99 }));
    }

    mod upstream {
        use super::*;
        use crate::api::ApiClientConfig;
        use axum::http::StatusCode;
        use axum::routing::get;
        use axum::{Json, Router};
        use serde_json::json;

        const COURSES: &str = "/v1/semester/2024/10/courses";
        const SECTIONS: &str = "/v1/semester/2024/10/sections";

        /// Serves `router` on an ephemeral port and returns a client for it.
        async fn client_for(router: Router) -> CourseApiClient {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, router).await.unwrap();
            });
            CourseApiClient::with_config(ApiClientConfig {
                base_url: format!("http://{addr}"),
                ..Default::default()
            })
            .unwrap()
        }

        async fn courses() -> Json<serde_json::Value> {
            Json(json!({
                "courses": [
                    { "subject": "CPSC", "course_code": "1150", "title": "Program Design" },
                    { "subject": "MATH", "course_code": "1171" }
                ]
            }))
        }

        #[tokio::test]
        async fn test_failed_sections_fail_the_whole_term() {
            let client = client_for(
                Router::new()
                    .route(COURSES, get(courses))
                    .route(SECTIONS, get(|| async { StatusCode::INTERNAL_SERVER_ERROR })),
            )
            .await;

            let err = fetch_term(&client, 2024, 10).await.unwrap_err();
            assert!(matches!(err, FetchError::UnexpectedStatus { status: 500, .. }));
            assert!(err.is_retryable());
        }

        #[tokio::test]
        async fn test_malformed_courses_fail_the_whole_term() {
            let client = client_for(
                Router::new()
                    .route(COURSES, get(|| async { "<html>maintenance</html>" }))
                    .route(SECTIONS, get(|| async { Json(json!({ "sections": [] })) })),
            )
            .await;

            let err = fetch_term(&client, 2024, 10).await.unwrap_err();
            assert!(matches!(err, FetchError::MalformedResponse { .. }));
        }

        #[tokio::test]
        async fn test_fetch_term_merges_and_caches() {
            let sections = || async {
                (
                    [("x-cache", "HIT")],
                    Json(json!({
                        "sections": [
                            {
                                "crn": 10234, "section": "001", "subject": "CPSC", "course_code": "1150",
                                "seats": "12", "waitlist": "0",
                                "schedule": [
                                    { "type": "Lecture", "days": "M-W----", "start": "10:30", "end": "12:20" }
                                ]
                            },
                            { "crn": 30001, "section": "002", "subject": "ENGL", "course_code": "1123", "seats": "Cancel" }
                        ]
                    })),
                )
            };
            let client = client_for(
                Router::new()
                    .route(COURSES, get(courses))
                    .route(SECTIONS, get(sections)),
            )
            .await;

            let catalog = fetch_term(&client, 2024, 10).await.unwrap();
            assert_eq!(catalog.courses.len(), 3);
            assert_eq!(catalog.section_count(), 2);
            assert_eq!(catalog.sections_cache, CacheIndicator::Hit);
            assert_eq!(catalog.courses_cache, CacheIndicator::Unknown);

            let cpsc = catalog.course(&CourseKey::new("CPSC", "1150")).unwrap();
            assert_eq!(cpsc.title.as_deref(), Some("Program Design"));
            assert!(cpsc.sections[0].schedule[0].is_timetabled());
            assert!(catalog.section("30001").unwrap().cancelled);

            let again = fetch_term(&client, 2024, 10).await.unwrap();
            assert_eq!(again.courses_cache, CacheIndicator::Local);
            assert_eq!(again.section_count(), 2);
        }
    }
}
