//! HTTP client for the course-data API.
//!
//! Index and per-term listings are cached locally for `cache_ttl`; searches
//! always go upstream. Every response records whether the upstream cache
//! served it.

use super::cache::{CacheIndicator, CacheKey, CacheStats, ResponseCache};
use super::error::FetchError;
use super::query::SectionSearchParams;
use super::wire::{CourseWire, ListEnvelope, SectionWire, SemesterWire, SubjectWire};
use crate::model::{Course, Section};
use rand::Rng;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};
use url::Url;

const SEMESTERS_PATH: &str = "/v1/index/semesters";
const SUBJECTS_PATH: &str = "/v1/index/subjects";
const SECTION_SEARCH_PATH: &str = "/v2/search/sections";

fn term_path(year: i32, term: u32, listing: &str) -> String {
    format!("/v1/semester/{year}/{term}/{listing}")
}

/// Configuration for the course-data API client.
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Base URL, without a trailing version segment
    pub base_url: String,
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// How long index and term listings stay in the local cache
    pub cache_ttl: Duration,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://coursesapi.langaracs.ca".to_string(),
            user_agent: concat!("planner/", env!("CARGO_PKG_VERSION")).to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            cache_ttl: Duration::from_secs(10 * 60),
        }
    }
}

/// A decoded response along with where it came from.
#[derive(Debug, Clone, Serialize)]
pub struct Fetched<T> {
    pub data: T,
    pub cache: CacheIndicator,
    pub elapsed_ms: u64,
}

impl<T> Fetched<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetched<U> {
        Fetched {
            data: f(self.data),
            cache: self.cache,
            elapsed_ms: self.elapsed_ms,
        }
    }
}

/// Client for the remote course-data API.
pub struct CourseApiClient {
    client: Client,
    config: ApiClientConfig,
    cache: Arc<ResponseCache>,
}

impl CourseApiClient {
    pub fn new() -> Result<Self, FetchError> {
        Self::with_config(ApiClientConfig::default())
    }

    pub fn with_config(config: ApiClientConfig) -> Result<Self, FetchError> {
        // Validate early so a bad base URL fails at startup, not on first request
        Url::parse(&config.base_url)?;

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| FetchError::Network {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        let cache = Arc::new(ResponseCache::new(config.cache_ttl));

        Ok(Self {
            client,
            config,
            cache,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn url_for(&self, path: &str) -> Result<Url, FetchError> {
        Ok(Url::parse(&format!(
            "{}{}",
            self.config.base_url.trim_end_matches('/'),
            path
        ))?)
    }

    /// Lists every semester the API has data for.
    pub async fn semesters(&self) -> Result<Fetched<Vec<SemesterWire>>, FetchError> {
        let url = self.url_for(SEMESTERS_PATH)?;
        self.get_list("semesters", url, true).await
    }

    /// Lists every subject code.
    pub async fn subjects(&self) -> Result<Fetched<Vec<SubjectWire>>, FetchError> {
        let url = self.url_for(SUBJECTS_PATH)?;
        self.get_list("subjects", url, true).await
    }

    /// Courses offered in a term, without their sections.
    pub async fn term_courses(&self, year: i32, term: u32) -> Result<Fetched<Vec<Course>>, FetchError> {
        let url = self.url_for(&term_path(year, term, "courses"))?;
        let fetched: Fetched<Vec<CourseWire>> = self.get_list("courses", url, true).await?;
        Ok(fetched.map(|wire| wire.into_iter().map(CourseWire::into_course).collect()))
    }

    /// Every section offered in a term.
    pub async fn term_sections(
        &self,
        year: i32,
        term: u32,
    ) -> Result<Fetched<Vec<Section>>, FetchError> {
        let url = self.url_for(&term_path(year, term, "sections"))?;
        let fetched: Fetched<Vec<SectionWire>> = self.get_list("sections", url, true).await?;
        Ok(fetched.map(|wire| wire.into_iter().map(SectionWire::into_section).collect()))
    }

    /// Runs a section search. Results are never cached locally.
    pub async fn search_sections(
        &self,
        params: &SectionSearchParams,
    ) -> Result<Fetched<ListEnvelope<Section>>, FetchError> {
        let mut url = self.url_for(SECTION_SEARCH_PATH)?;
        params.apply_to(&mut url);

        let (body, cache, elapsed_ms) = self.get_json(&url, false).await?;
        let envelope: ListEnvelope<SectionWire> =
            ListEnvelope::from_value("sections", url.as_str(), body)?;

        Ok(Fetched {
            data: ListEnvelope {
                items: envelope
                    .items
                    .into_iter()
                    .map(SectionWire::into_section)
                    .collect(),
                total: envelope.total,
                page: envelope.page,
                total_pages: envelope.total_pages,
            },
            cache,
            elapsed_ms,
        })
    }

    async fn get_list<T: DeserializeOwned>(
        &self,
        plural: &str,
        url: Url,
        cacheable: bool,
    ) -> Result<Fetched<Vec<T>>, FetchError> {
        let (body, cache, elapsed_ms) = self.get_json(&url, cacheable).await?;
        let envelope: ListEnvelope<T> = ListEnvelope::from_value(plural, url.as_str(), body)?;
        Ok(Fetched {
            data: envelope.items,
            cache,
            elapsed_ms,
        })
    }

    /// Fetches `url` and decodes its body as JSON, consulting the local cache
    /// first when `cacheable`.
    async fn get_json(
        &self,
        url: &Url,
        cacheable: bool,
    ) -> Result<(Value, CacheIndicator, u64), FetchError> {
        let key = CacheKey::from_url(url.as_str());
        if cacheable {
            if let Some(body) = self.cache.get(&key) {
                debug!(url = %url, key = %key, "Serving response from local cache");
                return Ok((body, CacheIndicator::Local, 0));
            }
        }

        let correlation_id = generate_correlation_id();
        let start = Instant::now();
        info!(correlation_id = %correlation_id, url = %url, "Requesting course data");

        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                error!(correlation_id = %correlation_id, url = %url, error = %e, "Request failed");
                return Err(e.into());
            }
        };

        let status = response.status();
        if !status.is_success() {
            error!(
                correlation_id = %correlation_id,
                url = %url,
                status = status.as_u16(),
                "Unexpected status from course API"
            );
            return Err(FetchError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let indicator = CacheIndicator::from_headers(response.headers());
        let text = response.text().await?;
        let body: Value =
            serde_json::from_str(&text).map_err(|e| FetchError::malformed(url.as_str(), e))?;

        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            correlation_id = %correlation_id,
            url = %url,
            cache = ?indicator,
            duration_ms = elapsed_ms,
            "Course data received"
        );

        if cacheable {
            self.cache.insert(key, body.clone());
        }

        Ok((body, indicator, elapsed_ms))
    }

    /// Drops every locally cached response.
    pub fn invalidate_cache(&self) {
        self.cache.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.cleanup_expired();
        self.cache.stats()
    }
}

/// Generates a unique correlation ID for request tracing.
fn generate_correlation_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros();
    let random: u32 = rand::thread_rng().gen();
    format!("{:x}-{:08x}", timestamp & 0xFFFFFFFF, random)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_building_keeps_base_path() {
        let client = CourseApiClient::with_config(ApiClientConfig {
            base_url: "https://api.example.test/courses/".to_string(),
            ..Default::default()
        })
        .unwrap();

        let url = client.url_for(&term_path(2024, 10, "sections")).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.test/courses/v1/semester/2024/10/sections"
        );
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let result = CourseApiClient::with_config(ApiClientConfig {
            base_url: "not a url".to_string(),
            ..Default::default()
        });
        assert!(matches!(result, Err(FetchError::UrlError { .. })));
    }

    #[test]
    fn test_correlation_ids_differ() {
        assert_ne!(generate_correlation_id(), generate_correlation_id());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let client = CourseApiClient::with_config(ApiClientConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            connect_timeout: Duration::from_millis(200),
            request_timeout: Duration::from_millis(500),
            ..Default::default()
        })
        .unwrap();

        let err = client.semesters().await.unwrap_err();
        assert!(matches!(err, FetchError::Network { .. }));
    }
}
