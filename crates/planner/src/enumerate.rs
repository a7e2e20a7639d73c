//! Timetable combinations: one section per (course, component) group, each
//! flagged as conflict-free or not.
//!
//! Enumeration is lazy. [`Combinations`] walks the cartesian product like an
//! odometer (first group slowest, last group fastest, sections in their
//! original order), so results are reproducible and a caller can stop at any
//! point without materialising the whole product.

use crate::model::{ComponentKind, Course, CourseKey, ScheduleEntry, Section};
use serde::Serialize;
use std::collections::BTreeSet;

/// Whether two schedule entries occupy the same time on the same day.
///
/// Intervals are half-open, so a class ending at 10:00 does not clash with one
/// starting at 10:00. Exams and entries without a fixed time never conflict.
pub fn conflicts(a: &ScheduleEntry, b: &ScheduleEntry) -> bool {
    if !a.is_timetabled() || !b.is_timetabled() {
        return false;
    }
    match (a.time, b.time) {
        (Some(ta), Some(tb)) => a.days.intersects(b.days) && ta.overlaps(&tb),
        _ => false,
    }
}

/// Whether any timetabled entry of `a` conflicts with one of `b`.
pub fn sections_conflict(a: &Section, b: &Section) -> bool {
    a.timetabled()
        .any(|ea| b.timetabled().any(|eb| conflicts(ea, eb)))
}

/// The alternatives for one slot of a timetable.
#[derive(Debug, Clone, Serialize)]
pub struct SectionGroup<'a> {
    pub course: &'a CourseKey,
    /// `None` when the course's sections are all interchangeable.
    pub component: Option<ComponentKind>,
    pub sections: Vec<&'a Section>,
}

/// Splits a course's sections into the groups a timetable must pick from.
///
/// Sections are split by component only when each of them is a single kind
/// of meeting (all lecture, all lab, ...) and the course has more than one
/// kind. Otherwise every section is an alternative for a single slot. Group
/// order follows the first appearance of each component.
pub fn group_sections(course: &Course) -> Vec<SectionGroup<'_>> {
    let components: Vec<Option<ComponentKind>> =
        course.sections.iter().map(Section::component).collect();
    let distinct: BTreeSet<ComponentKind> = components.iter().flatten().copied().collect();
    let split = components.iter().all(Option::is_some) && distinct.len() > 1;

    if !split {
        return vec![SectionGroup {
            course: &course.key,
            component: None,
            sections: course.sections.iter().collect(),
        }];
    }

    let mut groups: Vec<SectionGroup<'_>> = Vec::new();
    for (section, component) in course.sections.iter().zip(components) {
        match groups.iter_mut().find(|g| g.component == component) {
            Some(group) => group.sections.push(section),
            None => groups.push(SectionGroup {
                course: &course.key,
                component,
                sections: vec![section],
            }),
        }
    }
    groups
}

/// One chosen section within a combination.
#[derive(Debug, Clone, Serialize)]
pub struct Choice<'a> {
    pub course: &'a CourseKey,
    pub component: Option<ComponentKind>,
    pub section: &'a Section,
}

/// A fully specified timetable candidate.
#[derive(Debug, Clone, Serialize)]
pub struct Combination<'a> {
    pub choices: Vec<Choice<'a>>,
    /// True when no two choices overlap.
    pub valid: bool,
    /// Index pairs into `choices` that overlap.
    pub conflicts: Vec<(usize, usize)>,
}

impl<'a> Combination<'a> {
    fn new(choices: Vec<Choice<'a>>) -> Self {
        let mut pairs = Vec::new();
        for i in 0..choices.len() {
            for j in (i + 1)..choices.len() {
                if sections_conflict(choices[i].section, choices[j].section) {
                    pairs.push((i, j));
                }
            }
        }
        Self {
            valid: pairs.is_empty(),
            conflicts: pairs,
            choices,
        }
    }

    pub fn sections(&self) -> impl Iterator<Item = &'a Section> + '_ {
        self.choices.iter().map(|c| c.section)
    }

    pub fn section_ids(&self) -> Vec<String> {
        self.choices.iter().map(|c| c.section.id.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }
}

/// Lazy iterator over every combination of the given groups.
#[derive(Debug, Clone)]
pub struct Combinations<'a> {
    groups: Vec<SectionGroup<'a>>,
    /// Next index per group; `None` once exhausted.
    cursor: Option<Vec<usize>>,
}

impl<'a> Combinations<'a> {
    fn new(groups: Vec<SectionGroup<'a>>) -> Self {
        let cursor = if groups.iter().any(|g| g.sections.is_empty()) {
            None
        } else {
            Some(vec![0; groups.len()])
        };
        Self { groups, cursor }
    }

    pub fn groups(&self) -> &[SectionGroup<'a>] {
        &self.groups
    }

    /// Size of the full product, saturating at `u64::MAX`.
    pub fn total(&self) -> u64 {
        self.groups
            .iter()
            .fold(1u64, |acc, g| acc.saturating_mul(g.sections.len() as u64))
    }

    fn advance(&mut self) {
        let Some(cursor) = self.cursor.as_mut() else {
            return;
        };
        for pos in (0..cursor.len()).rev() {
            cursor[pos] += 1;
            if cursor[pos] < self.groups[pos].sections.len() {
                return;
            }
            cursor[pos] = 0;
        }
        // every position wrapped (or there were none): the product is done
        self.cursor = None;
    }
}

impl<'a> Iterator for Combinations<'a> {
    type Item = Combination<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let cursor = self.cursor.as_ref()?;
        let choices = self
            .groups
            .iter()
            .zip(cursor)
            .map(|(group, &i)| Choice {
                course: group.course,
                component: group.component,
                section: group.sections[i],
            })
            .collect();
        self.advance();
        Some(Combination::new(choices))
    }
}

/// The three shapes an enumeration can take.
#[derive(Debug, Clone)]
pub enum Enumeration<'a> {
    /// Nothing selected: exactly one, empty, combination.
    NoCourses,
    /// Some selected course has no sections, so there are no combinations.
    Unsatisfiable { empty: Vec<CourseKey> },
    Combinations(Combinations<'a>),
}

/// Enumerates timetables for `courses`, in selection order.
pub fn enumerate(courses: &[Course]) -> Enumeration<'_> {
    if courses.is_empty() {
        return Enumeration::NoCourses;
    }

    let empty: Vec<CourseKey> = courses
        .iter()
        .filter(|c| c.sections.is_empty())
        .map(|c| c.key.clone())
        .collect();
    if !empty.is_empty() {
        return Enumeration::Unsatisfiable { empty };
    }

    let groups = courses.iter().flat_map(group_sections).collect();
    Enumeration::Combinations(Combinations::new(groups))
}

/// Limits applied while collecting combinations.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnumerateOptions {
    /// Skip conflicting combinations instead of returning them flagged.
    pub valid_only: bool,
    /// Stop after this many combinations have been kept.
    pub limit: Option<usize>,
    /// Stop after generating this many combinations, kept or not. Bounds the
    /// work of a `valid_only` run over a product with few valid entries.
    pub max_examined: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    NoCourses,
    Unsatisfiable,
    Combinations,
}

/// A collected, possibly truncated, enumeration.
#[derive(Debug, Clone, Serialize)]
pub struct Enumerated<'a> {
    pub outcome: Outcome,
    /// Courses that made the selection unsatisfiable.
    pub empty_courses: Vec<CourseKey>,
    /// Size of the full product.
    pub total: u64,
    /// How many combinations were generated before stopping.
    pub examined: u64,
    pub truncated: bool,
    pub combinations: Vec<Combination<'a>>,
}

impl<'a> Enumeration<'a> {
    /// The same enumeration as a plain iterator. `NoCourses` yields the one
    /// empty combination; `Unsatisfiable` yields nothing.
    pub fn into_combinations(self) -> Combinations<'a> {
        match self {
            Enumeration::NoCourses => Combinations::new(Vec::new()),
            Enumeration::Unsatisfiable { .. } => Combinations {
                groups: Vec::new(),
                cursor: None,
            },
            Enumeration::Combinations(c) => c,
        }
    }

    pub fn collect_with(self, options: EnumerateOptions) -> Enumerated<'a> {
        let (outcome, empty_courses) = match &self {
            Enumeration::NoCourses => (Outcome::NoCourses, Vec::new()),
            Enumeration::Unsatisfiable { empty } => (Outcome::Unsatisfiable, empty.clone()),
            Enumeration::Combinations(_) => (Outcome::Combinations, Vec::new()),
        };

        let iter = self.into_combinations();
        let total = if outcome == Outcome::Unsatisfiable {
            0
        } else {
            iter.total()
        };

        let limit = options.limit.unwrap_or(usize::MAX);
        let max_examined = options.max_examined.unwrap_or(u64::MAX);
        let mut combinations = Vec::new();
        let mut examined = 0u64;
        let mut truncated = false;

        for combination in iter {
            if examined == max_examined {
                truncated = true;
                break;
            }
            examined += 1;
            if options.valid_only && !combination.valid {
                continue;
            }
            if combinations.len() == limit {
                truncated = true;
                break;
            }
            combinations.push(combination);
        }

        Enumerated {
            outcome,
            empty_courses,
            total,
            examined,
            truncated,
            combinations,
        }
    }
}
