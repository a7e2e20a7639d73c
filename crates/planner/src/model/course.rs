//! Courses, sections and the schedule entries they meet on.

use super::days::DaySet;
use chrono::NaiveTime;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::sync::LazyLock;

static COURSE_KEY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z]{2,5})\s*[-_ ]?\s*([0-9]{3,4}[A-Za-z]?)\s*$").unwrap()
});

/// Identifies a course by subject and course code, e.g. `CPSC 1150`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CourseKey {
    pub subject: String,
    pub course_code: String,
}

impl CourseKey {
    pub fn new(subject: impl Into<String>, course_code: impl Into<String>) -> Self {
        let subject: String = subject.into();
        let course_code: String = course_code.into();
        Self {
            subject: subject.trim().to_ascii_uppercase(),
            course_code: course_code.trim().to_ascii_uppercase(),
        }
    }
}

impl Display for CourseKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{} {}", self.subject, self.course_code)
    }
}

impl FromStr for CourseKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = COURSE_KEY_REGEX
            .captures(s)
            .ok_or_else(|| format!("'{s}' is not a course key like 'CPSC 1150'"))?;
        Ok(Self::new(&caps[1], &caps[2]))
    }
}

/// A half-open `[begin, end)` time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub begin: NaiveTime,
    pub end: NaiveTime,
}

impl TimeRange {
    /// Creates a new `TimeRange` if `begin` is before `end`
    pub fn new(begin: NaiveTime, end: NaiveTime) -> Option<Self> {
        (begin < end).then_some(Self { begin, end })
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.begin < other.end && other.begin < self.end
    }

    pub fn minutes(&self) -> i64 {
        (self.end - self.begin).num_minutes()
    }

    /// Parses a span such as `"1030-1220"` or `"10:30-12:20"`.
    pub fn parse_span(span: &str) -> Option<Self> {
        let (begin, end) = span.split_once('-')?;
        Self::new(parse_clock(begin)?, parse_clock(end)?)
    }
}

/// Parses a wall-clock time in `HHMM`, `HH:MM` or `HH:MM:SS` form.
pub fn parse_clock(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H%M"))
        .ok()
}

/// What kind of meeting a schedule entry is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComponentKind {
    Lecture,
    Lab,
    Seminar,
    Tutorial,
    Exam,
    Online,
    Other,
}

impl ComponentKind {
    pub fn is_exam(self) -> bool {
        matches!(self, ComponentKind::Exam)
    }
}

impl FromStr for ComponentKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Ok(if lower.contains("exam") {
            Self::Exam
        } else if lower.starts_with("lec") {
            Self::Lecture
        } else if lower.starts_with("lab") {
            Self::Lab
        } else if lower.starts_with("sem") {
            Self::Seminar
        } else if lower.starts_with("tut") {
            Self::Tutorial
        } else if lower == "www" || lower.contains("online") {
            Self::Online
        } else {
            Self::Other
        })
    }
}

impl Display for ComponentKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            ComponentKind::Lecture => "Lecture",
            ComponentKind::Lab => "Lab",
            ComponentKind::Seminar => "Seminar",
            ComponentKind::Tutorial => "Tutorial",
            ComponentKind::Exam => "Exam",
            ComponentKind::Online => "Online",
            ComponentKind::Other => "Other",
        };
        f.write_str(name)
    }
}

/// One recurring (or one-off, for exams) meeting of a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub kind: ComponentKind,
    pub days: DaySet,
    /// `None` when the time is to be announced or the entry is asynchronous.
    pub time: Option<TimeRange>,
    pub room: Option<String>,
    pub instructor: Option<String>,
}

impl ScheduleEntry {
    /// Whether this entry occupies a slot on the weekly calendar.
    pub fn is_timetabled(&self) -> bool {
        !self.kind.is_exam() && self.time.is_some() && !self.days.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    InPerson,
    Online,
    Hybrid,
}

/// One offered instance of a course in a term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Registration number, unique within a term.
    pub id: String,
    /// Section label, e.g. `"001"` or `"M01"`.
    pub section: String,
    pub course: CourseKey,
    pub schedule: Vec<ScheduleEntry>,
    pub seats: Option<u32>,
    pub waitlist: Option<u32>,
    pub cancelled: bool,
    pub notes: Option<String>,
}

impl Section {
    /// Entries that take part in conflict checks and the calendar.
    pub fn timetabled(&self) -> impl Iterator<Item = &ScheduleEntry> {
        self.schedule.iter().filter(|e| e.is_timetabled())
    }

    /// Distinct instructor names across the schedule, sorted.
    pub fn instructors(&self) -> Vec<String> {
        unique_sorted(self.schedule.iter().filter_map(|e| e.instructor.as_deref()))
    }

    /// Distinct rooms across the non-exam schedule, sorted.
    pub fn rooms(&self) -> Vec<String> {
        unique_sorted(
            self.schedule
                .iter()
                .filter(|e| !e.kind.is_exam())
                .filter_map(|e| e.room.as_deref()),
        )
    }

    pub fn delivery_mode(&self) -> DeliveryMode {
        let mut online = 0;
        let mut in_person = 0;
        for entry in self.schedule.iter().filter(|e| !e.kind.is_exam()) {
            let is_online = entry.kind == ComponentKind::Online
                || entry
                    .room
                    .as_deref()
                    .is_some_and(|r| r.eq_ignore_ascii_case("WWW"));
            if is_online {
                online += 1;
            } else {
                in_person += 1;
            }
        }

        match (online, in_person) {
            (0, _) => DeliveryMode::InPerson,
            (_, 0) => DeliveryMode::Online,
            _ => DeliveryMode::Hybrid,
        }
    }

    /// The single non-exam component kind of this section, if it has exactly one.
    pub fn component(&self) -> Option<ComponentKind> {
        let kinds: BTreeSet<ComponentKind> = self
            .schedule
            .iter()
            .map(|e| e.kind)
            .filter(|k| !k.is_exam())
            .collect();
        match kinds.len() {
            1 => kinds.into_iter().next(),
            _ => None,
        }
    }

    pub fn has_open_seats(&self) -> bool {
        !self.cancelled && self.seats.is_some_and(|s| s > 0)
    }
}

/// A course offered in a term, owning its sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    #[serde(flatten)]
    pub key: CourseKey,
    pub title: Option<String>,
    pub credits: Option<f32>,
    pub sections: Vec<Section>,
}

impl Course {
    pub fn new(key: CourseKey) -> Self {
        Self {
            key,
            title: None,
            credits: None,
            sections: Vec::new(),
        }
    }

    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }
}

/// Collapses display values into a sorted list without duplicates or blanks.
pub fn unique_sorted<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}
