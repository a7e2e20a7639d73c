//! Query-string encoding for the section search endpoint.

use serde::{Deserialize, Serialize};
use url::Url;

/// Parameters accepted by the section search endpoint.
///
/// Booleans are only sent when true and empty strings are never sent, so a
/// default value produces an empty query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionSearchParams {
    pub subject: Option<String>,
    pub course_code: Option<String>,
    pub instructor_search: Option<String>,
    pub title_search: Option<String>,
    pub year: Option<i32>,
    pub term: Option<u32>,

    pub attr_ar: bool,
    pub attr_sc: bool,
    pub attr_hum: bool,
    pub attr_lsc: bool,
    pub attr_sci: bool,
    pub attr_soc: bool,
    pub attr_ut: bool,

    pub online: bool,
    pub filter_no_waitlist: bool,
    pub filter_open_seats: bool,
    pub filter_not_cancelled: bool,

    pub page: Option<u32>,
    pub sections_per_page: Option<u32>,
}

impl SectionSearchParams {
    /// The `(key, value)` pairs that go on the wire, in a fixed order.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();

        let strings = [
            ("subject", &self.subject),
            ("course_code", &self.course_code),
            ("instructor_search", &self.instructor_search),
            ("title_search", &self.title_search),
        ];
        for (key, value) in strings {
            if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                pairs.push((key, v.to_string()));
            }
        }

        if let Some(year) = self.year {
            pairs.push(("year", year.to_string()));
        }
        if let Some(term) = self.term {
            pairs.push(("term", term.to_string()));
        }

        let flags = [
            ("attr_ar", self.attr_ar),
            ("attr_sc", self.attr_sc),
            ("attr_hum", self.attr_hum),
            ("attr_lsc", self.attr_lsc),
            ("attr_sci", self.attr_sci),
            ("attr_soc", self.attr_soc),
            ("attr_ut", self.attr_ut),
            ("online", self.online),
            ("filter_no_waitlist", self.filter_no_waitlist),
            ("filter_open_seats", self.filter_open_seats),
            ("filter_not_cancelled", self.filter_not_cancelled),
        ];
        pairs.extend(
            flags
                .into_iter()
                .filter(|(_, set)| *set)
                .map(|(key, _)| (key, "true".to_string())),
        );

        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(per_page) = self.sections_per_page {
            pairs.push(("sections_per_page", per_page.to_string()));
        }

        pairs
    }

    /// Appends the encoded parameters to `url`.
    pub fn apply_to(&self, url: &mut Url) {
        let pairs = self.to_query_pairs();
        if pairs.is_empty() {
            return;
        }
        let mut query = url.query_pairs_mut();
        for (key, value) in pairs {
            query.append_pair(key, &value);
        }
    }
}
