//! The user's chosen courses.

use crate::model::{Course, CourseKey};
use serde::Serialize;

/// An ordered set of courses, unique by subject and course code.
///
/// Every mutation bumps `generation`, which lets holders of derived data
/// (enumerated combinations) tell whether it is stale.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Selection {
    courses: Vec<Course>,
    #[serde(skip)]
    generation: u64,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `course` unless a course with the same key is already selected.
    ///
    /// Returns whether the selection changed.
    pub fn add(&mut self, course: Course) -> bool {
        if self.contains(&course.key) {
            return false;
        }
        self.courses.push(course);
        self.generation += 1;
        true
    }

    /// Removes the course with `key`, returning it if it was selected.
    pub fn remove(&mut self, key: &CourseKey) -> Option<Course> {
        let position = self.courses.iter().position(|c| &c.key == key)?;
        self.generation += 1;
        Some(self.courses.remove(position))
    }

    pub fn list(&self) -> &[Course] {
        &self.courses
    }

    pub fn keys(&self) -> impl Iterator<Item = &CourseKey> {
        self.courses.iter().map(|c| &c.key)
    }

    pub fn contains(&self, key: &CourseKey) -> bool {
        self.courses.iter().any(|c| &c.key == key)
    }

    pub fn len(&self) -> usize {
        self.courses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }

    pub fn clear(&mut self) {
        if !self.courses.is_empty() {
            self.courses.clear();
            self.generation += 1;
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(subject: &str, code: &str) -> Course {
        Course::new(CourseKey::new(subject, code))
    }

    #[test]
    fn test_add_deduplicates_by_key() {
        let mut selection = Selection::new();
        assert!(selection.add(course("CPSC", "1150")));
        assert!(selection.add(course("MATH", "1171")));
        assert!(!selection.add(course("cpsc", "1150")));

        let keys: Vec<String> = selection.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["CPSC 1150", "MATH 1171"]);
        assert_eq!(selection.generation(), 2);
    }

    #[test]
    fn test_remove() {
        let mut selection = Selection::new();
        selection.add(course("CPSC", "1150"));
        selection.add(course("MATH", "1171"));

        let removed = selection.remove(&CourseKey::new("CPSC", "1150")).unwrap();
        assert_eq!(removed.key.subject, "CPSC");
        assert_eq!(selection.len(), 1);

        let before = selection.generation();
        assert!(selection.remove(&CourseKey::new("CPSC", "1150")).is_none());
        assert_eq!(selection.generation(), before);
    }

    #[test]
    fn test_clear_bumps_generation_once() {
        let mut selection = Selection::new();
        selection.clear();
        assert_eq!(selection.generation(), 0);

        selection.add(course("CPSC", "1150"));
        selection.clear();
        assert!(selection.is_empty());
        assert_eq!(selection.generation(), 2);
    }
}
