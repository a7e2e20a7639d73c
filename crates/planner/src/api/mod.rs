//! Typed access to the remote course-data API.
mod cache;
mod client;
mod error;
mod query;
mod wire;

pub use cache::{CacheIndicator, CacheKey, CacheStats, ResponseCache};
pub use client::{ApiClientConfig, CourseApiClient, Fetched};
pub use error::FetchError;
pub use query::SectionSearchParams;
pub use wire::{ListEnvelope, SemesterWire, SubjectWire};
