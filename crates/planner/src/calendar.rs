//! Projects a combination onto a weekly grid.

use crate::enumerate::Combination;
use crate::model::{ComponentKind, CourseKey, Section};
use chrono::{Duration, NaiveTime, Timelike, Weekday};
use serde::Serialize;
use std::fmt::Write as _;

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// A single meeting placed on a day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarBlock {
    pub course: CourseKey,
    pub section_id: String,
    pub section: String,
    pub kind: ComponentKind,
    pub begin: NaiveTime,
    pub end: NaiveTime,
    pub room: Option<String>,
    pub instructor: Option<String>,
}

impl CalendarBlock {
    fn label(&self) -> String {
        format!("{} {}", self.course, self.section)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DayColumn {
    pub day: Weekday,
    pub blocks: Vec<CalendarBlock>,
}

/// A section meeting that has no fixed slot (TBA or asynchronous).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Unscheduled {
    pub course: CourseKey,
    pub section_id: String,
    pub kind: ComponentKind,
}

/// Seven day columns, Monday first, with blocks sorted by start time.
#[derive(Debug, Clone, Serialize)]
pub struct WeekGrid {
    pub days: Vec<DayColumn>,
    pub unscheduled: Vec<Unscheduled>,
    pub earliest: Option<NaiveTime>,
    pub latest: Option<NaiveTime>,
}

impl WeekGrid {
    /// Projects every section of `combination`. Exams are left out.
    pub fn project(combination: &Combination<'_>) -> Self {
        Self::from_sections(combination.sections())
    }

    pub fn from_sections<'s>(sections: impl IntoIterator<Item = &'s Section>) -> Self {
        let mut days: Vec<DayColumn> = WEEK
            .iter()
            .map(|&day| DayColumn {
                day,
                blocks: Vec::new(),
            })
            .collect();
        let mut unscheduled = Vec::new();

        for section in sections {
            for entry in section.schedule.iter().filter(|e| !e.kind.is_exam()) {
                let time = match entry.time {
                    Some(time) if !entry.days.is_empty() => time,
                    _ => {
                        unscheduled.push(Unscheduled {
                            course: section.course.clone(),
                            section_id: section.id.clone(),
                            kind: entry.kind,
                        });
                        continue;
                    }
                };

                for day in entry.days.iter() {
                    days[day.num_days_from_monday() as usize]
                        .blocks
                        .push(CalendarBlock {
                            course: section.course.clone(),
                            section_id: section.id.clone(),
                            section: section.section.clone(),
                            kind: entry.kind,
                            begin: time.begin,
                            end: time.end,
                            room: entry.room.clone(),
                            instructor: entry.instructor.clone(),
                        });
                }
            }
        }

        for column in &mut days {
            column.blocks.sort_by_key(|b| (b.begin, b.end));
        }

        let earliest = days.iter().flat_map(|d| &d.blocks).map(|b| b.begin).min();
        let latest = days.iter().flat_map(|d| &d.blocks).map(|b| b.end).max();

        Self {
            days,
            unscheduled,
            earliest,
            latest,
        }
    }

    pub fn day(&self, day: Weekday) -> &DayColumn {
        &self.days[day.num_days_from_monday() as usize]
    }

    pub fn is_empty(&self) -> bool {
        self.days.iter().all(|d| d.blocks.is_empty())
    }

    /// Renders the grid as a plain-text table with one row per
    /// `slot_minutes` and one column per weekday (weekends only when used).
    ///
    /// Overlapping blocks are not expected; if they occur, the later one in a
    /// day's order wins the cell.
    pub fn render_text(&self, slot_minutes: u32) -> String {
        let slot = Duration::minutes(i64::from(slot_minutes.max(5)));
        let (Some(earliest), Some(latest)) = (self.earliest, self.latest) else {
            return "(no scheduled classes)\n".to_string();
        };

        let columns: Vec<&DayColumn> = self
            .days
            .iter()
            .filter(|d| {
                !matches!(d.day, Weekday::Sat | Weekday::Sun) || !d.blocks.is_empty()
            })
            .collect();

        let width = columns
            .iter()
            .flat_map(|d| &d.blocks)
            .map(|b| b.label().len())
            .max()
            .unwrap_or(0)
            .max(3);

        let mut out = String::new();
        let _ = write!(out, "{:>5} ", "");
        for column in &columns {
            let _ = write!(out, "| {:<width$} ", column.day.to_string());
        }
        out.push_str("|\n");

        let mut time = floor_to_slot(earliest, slot_minutes.max(5));
        while time < latest {
            let _ = write!(out, "{} ", time.format("%H:%M"));
            for column in &columns {
                let cell = column
                    .blocks
                    .iter()
                    .filter(|b| b.begin < time + slot && time < b.end)
                    .last()
                    .map(|b| {
                        if b.begin >= time {
                            b.label()
                        } else {
                            "  ...".to_string()
                        }
                    })
                    .unwrap_or_default();
                let _ = write!(out, "| {cell:<width$} ");
            }
            out.push_str("|\n");

            let next = time + slot;
            // NaiveTime arithmetic wraps at midnight
            if next <= time {
                break;
            }
            time = next;
        }

        if !self.unscheduled.is_empty() {
            out.push_str("Unscheduled:\n");
            for item in &self.unscheduled {
                let _ = writeln!(out, "  {} ({}) {}", item.course, item.section_id, item.kind);
            }
        }

        out
    }
}

fn floor_to_slot(time: NaiveTime, slot_minutes: u32) -> NaiveTime {
    let minutes = time.hour() * 60 + time.minute();
    let floored = minutes - minutes % slot_minutes;
    NaiveTime::from_hms_opt(floored / 60, floored % 60, 0).unwrap_or(time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enumerate::{enumerate, EnumerateOptions};
    use crate::model::{Course, DaySet, ScheduleEntry, TimeRange};

    fn entry(kind: ComponentKind, days: DaySet, span: &str, room: &str) -> ScheduleEntry {
        ScheduleEntry {
            kind,
            days,
            time: TimeRange::parse_span(span),
            room: Some(room.to_string()),
            instructor: None,
        }
    }

    fn course_with(subject: &str, code: &str, id: &str, schedule: Vec<ScheduleEntry>) -> Course {
        let key = CourseKey::new(subject, code);
        let mut course = Course::new(key.clone());
        course.sections.push(Section {
            id: id.to_string(),
            section: "001".to_string(),
            course: key,
            schedule,
            seats: Some(1),
            waitlist: None,
            cancelled: false,
            notes: None,
        });
        course
    }

    #[test]
    fn test_projection_places_blocks_per_day() {
        let courses = vec![
            course_with(
                "CPSC",
                "1150",
                "100",
                vec![
                    entry(ComponentKind::Lecture, DaySet::MONDAY | DaySet::WEDNESDAY, "1030-1220", "A130"),
                    entry(ComponentKind::Exam, DaySet::FRIDAY, "0830-1130", "GYM"),
                ],
            ),
            course_with(
                "MATH",
                "1171",
                "200",
                vec![
                    entry(ComponentKind::Lecture, DaySet::MONDAY, "0830-1020", "B140"),
                    entry(ComponentKind::Online, DaySet::NONE, "-", "WWW"),
                ],
            ),
        ];

        let result = enumerate(&courses).collect_with(EnumerateOptions::default());
        let grid = WeekGrid::project(&result.combinations[0]);

        let monday = grid.day(Weekday::Mon);
        assert_eq!(monday.blocks.len(), 2);
        assert_eq!(monday.blocks[0].course, CourseKey::new("MATH", "1171"));
        assert_eq!(monday.blocks[1].course, CourseKey::new("CPSC", "1150"));
        assert_eq!(grid.day(Weekday::Wed).blocks.len(), 1);
        assert!(grid.day(Weekday::Fri).blocks.is_empty());

        assert_eq!(grid.unscheduled.len(), 1);
        assert_eq!(grid.earliest, NaiveTime::from_hms_opt(8, 30, 0));
        assert_eq!(grid.latest, NaiveTime::from_hms_opt(12, 20, 0));
    }

    #[test]
    fn test_render_text() {
        let courses = vec![course_with(
            "CPSC",
            "1150",
            "100",
            vec![entry(ComponentKind::Lecture, DaySet::TUESDAY, "0900-1000", "A130")],
        )];
        let grid = WeekGrid::from_sections(courses[0].sections.iter());
        let text = grid.render_text(30);

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("Mon") && lines[0].contains("Fri"));
        assert!(!lines[0].contains("Sat"));
        assert!(lines[1].starts_with("09:00"));
        assert!(lines[1].contains("CPSC 1150 001"));
        assert!(lines[2].starts_with("09:30"));
        assert!(lines[2].contains("..."));
    }

    #[test]
    fn test_empty_grid() {
        let grid = WeekGrid::from_sections(std::iter::empty());
        assert!(grid.is_empty());
        assert_eq!(grid.render_text(30), "(no scheduled classes)\n");
    }

    #[test]
    fn test_floor_to_slot() {
        let t = NaiveTime::from_hms_opt(10, 50, 0).unwrap();
        assert_eq!(floor_to_slot(t, 30), NaiveTime::from_hms_opt(10, 30, 0).unwrap());
    }
}
