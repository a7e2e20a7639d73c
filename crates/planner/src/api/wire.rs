//! JSON shapes returned by the course-data API, and their conversion into
//! the domain model.

use super::error::FetchError;
use crate::model::{ComponentKind, Course, CourseKey, DaySet, ScheduleEntry, Section, TimeRange};
use crate::model::parse_clock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// A paged list response: `{ <plural>: [...], count|total, page, total_pages }`.
#[derive(Debug, Clone, Serialize)]
pub struct ListEnvelope<T> {
    pub items: Vec<T>,
    pub total: Option<u64>,
    pub page: Option<u64>,
    pub total_pages: Option<u64>,
}

impl<T: DeserializeOwned> ListEnvelope<T> {
    /// Extracts the list stored under `plural`, along with whatever paging
    /// fields the endpoint included.
    pub fn from_value(plural: &str, url: &str, value: Value) -> Result<Self, FetchError> {
        let Value::Object(mut map) = value else {
            return Err(FetchError::malformed(url, "expected a JSON object envelope"));
        };

        let items = map
            .remove(plural)
            .ok_or_else(|| FetchError::malformed(url, format!("missing `{plural}` field")))?;
        let items: Vec<T> =
            serde_json::from_value(items).map_err(|e| FetchError::malformed(url, e))?;

        let number = |key: &str| map.get(key).and_then(Value::as_u64);
        let total = number("count")
            .or_else(|| number("total"))
            .or_else(|| number(&format!("total_{plural}")));

        Ok(Self {
            items,
            total,
            page: number("page"),
            total_pages: number("total_pages"),
        })
    }
}

/// Accepts a JSON string or number and yields its trimmed text.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let s = lenient_string(deserializer)?;
    Ok((!s.is_empty()).then_some(s))
}

fn lenient_f32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f32>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64().map(|f| f as f32),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemesterWire {
    pub year: i32,
    pub term: u32,
    #[serde(default)]
    pub courses_last_updated: Option<String>,
    #[serde(default)]
    pub sections_last_updated: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectWire {
    #[serde(alias = "subject_code", alias = "code")]
    pub subject: String,
    #[serde(default, alias = "title")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CourseWire {
    #[serde(deserialize_with = "lenient_string")]
    pub subject: String,
    #[serde(deserialize_with = "lenient_string")]
    pub course_code: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub abbreviated_title: Option<String>,
    #[serde(default, deserialize_with = "lenient_f32")]
    pub credits: Option<f32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleWire {
    #[serde(default, rename = "type", deserialize_with = "lenient_string")]
    pub kind: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub days: String,
    /// Combined span, e.g. `"1030-1220"`.
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub time: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub start_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub end_time: Option<String>,
    /// Short forms of `start_time`/`end_time` used by some endpoints.
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub start: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub end: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub room: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub instructor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SectionWire {
    /// Registration number; preferred over `id` when both are present.
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub crn: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub section: String,
    #[serde(deserialize_with = "lenient_string")]
    pub subject: String,
    #[serde(deserialize_with = "lenient_string")]
    pub course_code: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub seats: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub waitlist: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub notes: Option<String>,
    #[serde(default)]
    pub schedule: Vec<ScheduleWire>,
}

impl ScheduleWire {
    fn time_range(&self) -> Option<TimeRange> {
        if let Some(span) = &self.time {
            if let Some(range) = TimeRange::parse_span(span) {
                return Some(range);
            }
        }
        let start = self.start_time.as_deref().or(self.start.as_deref())?;
        let end = self.end_time.as_deref().or(self.end.as_deref())?;
        TimeRange::new(parse_clock(start)?, parse_clock(end)?)
    }

    pub fn into_entry(self) -> ScheduleEntry {
        let time = self.time_range();
        ScheduleEntry {
            kind: ComponentKind::from_str(&self.kind).unwrap_or(ComponentKind::Other),
            days: DaySet::from_str(&self.days).unwrap_or_default(),
            time,
            room: self.room,
            instructor: self.instructor,
        }
    }
}

/// Seat and waitlist columns hold counts, blanks or status words.
fn parse_count(raw: &str) -> Option<u32> {
    raw.trim().parse().ok()
}

impl SectionWire {
    pub fn key(&self) -> CourseKey {
        CourseKey::new(&self.subject, &self.course_code)
    }

    pub fn into_section(self) -> Section {
        let course = self.key();
        let cancelled = self.seats.eq_ignore_ascii_case("cancel")
            || self.seats.eq_ignore_ascii_case("cancelled");
        Section {
            id: self.crn.or(self.id).unwrap_or_default(),
            section: self.section,
            course,
            seats: parse_count(&self.seats),
            waitlist: parse_count(&self.waitlist),
            cancelled,
            notes: self.notes,
            schedule: self.schedule.into_iter().map(ScheduleWire::into_entry).collect(),
        }
    }
}

impl CourseWire {
    pub fn into_course(self) -> Course {
        let mut course = Course::new(CourseKey::new(self.subject, self.course_code));
        course.title = self.title.or(self.abbreviated_title);
        course.credits = self.credits;
        course
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_section_wire_conversion() {
        let raw = json!({
            "id": "SECT-20241-10234",
            "crn": 10234,
            "section": "001",
            "subject": "CPSC",
            "course_code": 1150,
            "seats": "Cancel",
            "waitlist": " ",
            "schedule": [
                { "type": "Lecture", "days": "M-W----", "time": "1030-1220", "room": "A130", "instructor": "Smith" },
                { "type": "Exam", "days": "---R---", "time": "0830-1130", "room": "GYM", "instructor": " " }
            ]
        });

        let wire: SectionWire = serde_json::from_value(raw).unwrap();
        let section = wire.into_section();

        assert_eq!(section.id, "10234");
        assert_eq!(section.course, CourseKey::new("CPSC", "1150"));
        assert!(section.cancelled);
        assert_eq!(section.seats, None);
        assert_eq!(section.waitlist, None);
        assert_eq!(section.schedule.len(), 2);
        assert_eq!(section.schedule[0].days, DaySet::MONDAY | DaySet::WEDNESDAY);
        assert!(section.schedule[0].time.is_some());
        assert_eq!(section.schedule[1].kind, ComponentKind::Exam);
        assert_eq!(section.schedule[1].instructor, None);
    }

    #[test]
    fn test_schedule_wire_split_times() {
        let wire: ScheduleWire = serde_json::from_value(json!({
            "type": "Lab",
            "days": "TR",
            "start_time": "13:30",
            "end_time": "15:20"
        }))
        .unwrap();
        let entry = wire.into_entry();
        assert_eq!(entry.kind, ComponentKind::Lab);
        assert_eq!(entry.time.unwrap().minutes(), 110);
    }

    #[test]
    fn test_schedule_wire_short_time_fields() {
        let wire: ScheduleWire = serde_json::from_value(json!({
            "type": "Lecture",
            "days": "M------",
            "start": "09:00",
            "end": "10:00"
        }))
        .unwrap();
        let entry = wire.into_entry();
        assert!(entry.is_timetabled());
        assert_eq!(entry.time, TimeRange::parse_span("0900-1000"));

        let other: ScheduleWire = serde_json::from_value(json!({
            "type": "Lecture",
            "days": "M------",
            "time": "0930-1030"
        }))
        .unwrap();
        assert!(crate::enumerate::conflicts(&entry, &other.into_entry()));
    }

    #[test]
    fn test_schedule_wire_tba() {
        let wire: ScheduleWire =
            serde_json::from_value(json!({ "type": "WWW", "days": "-------", "time": "-" }))
                .unwrap();
        let entry = wire.into_entry();
        assert!(entry.time.is_none());
        assert!(!entry.is_timetabled());
    }

    #[test]
    fn test_list_envelope() {
        let value = json!({
            "courses": [{ "subject": "MATH", "course_code": "1171", "title": "Calculus I", "credits": "3" }],
            "total_courses": 1,
            "page": 1,
            "total_pages": 1
        });
        let envelope: ListEnvelope<CourseWire> =
            ListEnvelope::from_value("courses", "u", value).unwrap();
        assert_eq!(envelope.items.len(), 1);
        assert_eq!(envelope.total, Some(1));
        assert_eq!(envelope.items[0].credits, Some(3.0));
    }

    #[test]
    fn test_list_envelope_missing_field() {
        let err = ListEnvelope::<CourseWire>::from_value("courses", "u", json!({ "sections": [] }))
            .unwrap_err();
        assert!(matches!(err, FetchError::MalformedResponse { .. }));

        let err = ListEnvelope::<CourseWire>::from_value("courses", "u", json!([])).unwrap_err();
        assert!(matches!(err, FetchError::MalformedResponse { .. }));
    }
}
