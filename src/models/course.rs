//! Course, enrollment and term input models.
//!
//! A course is taught by one faculty member (optionally handing over to a
//! second one from a given week) and enrolls a set of students. The whole
//! input of a run is a [`TermInput`]: courses, student enrollments and rooms.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::Room;

/// A course to be sectioned and scheduled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    /// Unique course identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Faculty identifier teaching the course.
    pub faculty: String,
    /// Replacement faculty from a given week onward (mid-term handover).
    pub handover: Option<FacultyHandover>,
}

/// Mid-term change of the teaching faculty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacultyHandover {
    /// First week taught by `faculty`.
    pub from_week: u32,
    pub faculty: String,
}

/// A single (student, course) enrollment row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Enrollment {
    pub student_id: String,
    pub course_id: String,
}

/// A student and the courses they take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub courses: BTreeSet<String>,
}

impl Course {
    /// Creates a course taught by `faculty`.
    pub fn new(id: impl Into<String>, faculty: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            faculty: faculty.into(),
            handover: None,
        }
    }

    /// Sets the course name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Hands the course over to `faculty` starting at `from_week`.
    pub fn with_handover(mut self, from_week: u32, faculty: impl Into<String>) -> Self {
        self.handover = Some(FacultyHandover {
            from_week,
            faculty: faculty.into(),
        });
        self
    }

    /// Faculty teaching in `week`.
    pub fn faculty_in_week(&self, week: u32) -> &str {
        match &self.handover {
            Some(h) if week >= h.from_week => &h.faculty,
            _ => &self.faculty,
        }
    }
}

impl Enrollment {
    pub fn new(student_id: impl Into<String>, course_id: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            course_id: course_id.into(),
        }
    }
}

/// Complete input of a timetabling run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TermInput {
    pub courses: Vec<Course>,
    pub enrollments: Vec<Enrollment>,
    pub rooms: Vec<Room>,
}

impl TermInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a course.
    pub fn with_course(mut self, course: Course) -> Self {
        self.courses.push(course);
        self
    }

    /// Enrolls every student in `students` into `course_id`.
    pub fn with_enrollments<I, S>(mut self, course_id: &str, students: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enrollments
            .extend(students.into_iter().map(|s| Enrollment::new(s, course_id)));
        self
    }

    /// Adds a room.
    pub fn with_room(mut self, room: Room) -> Self {
        self.rooms.push(room);
        self
    }

    /// Finds a course by id.
    pub fn course(&self, course_id: &str) -> Option<&Course> {
        self.courses.iter().find(|c| c.id == course_id)
    }

    /// Students enrolled per course (deduplicated, sorted by id).
    pub fn roster(&self) -> BTreeMap<&str, BTreeSet<&str>> {
        let mut roster: BTreeMap<&str, BTreeSet<&str>> = self
            .courses
            .iter()
            .map(|c| (c.id.as_str(), BTreeSet::new()))
            .collect();
        for e in &self.enrollments {
            if let Some(students) = roster.get_mut(e.course_id.as_str()) {
                students.insert(e.student_id.as_str());
            }
        }
        roster
    }

    /// Students with their course sets, sorted by id.
    pub fn students(&self) -> Vec<Student> {
        let mut by_student: BTreeMap<&str, BTreeSet<String>> = BTreeMap::new();
        for e in &self.enrollments {
            by_student
                .entry(e.student_id.as_str())
                .or_default()
                .insert(e.course_id.clone());
        }
        by_student
            .into_iter()
            .map(|(id, courses)| Student {
                id: id.to_string(),
                courses,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_course_builder() {
        let course = Course::new("DTI", "Prof. A")
            .with_name("Design Thinking")
            .with_handover(6, "Prof. B");

        assert_eq!(course.id, "DTI");
        assert_eq!(course.name, "Design Thinking");
        assert_eq!(course.faculty_in_week(1), "Prof. A");
        assert_eq!(course.faculty_in_week(5), "Prof. A");
        assert_eq!(course.faculty_in_week(6), "Prof. B");
        assert_eq!(course.faculty_in_week(10), "Prof. B");
    }

    #[test]
    fn test_roster_deduplicates() {
        let input = TermInput::new()
            .with_course(Course::new("C1", "F1"))
            .with_course(Course::new("C2", "F2"))
            .with_enrollments("C1", ["s2", "s1", "s2"])
            .with_enrollments("C2", ["s1"]);

        let roster = input.roster();
        assert_eq!(roster["C1"].iter().copied().collect::<Vec<_>>(), vec!["s1", "s2"]);
        assert_eq!(roster["C2"].len(), 1);
    }

    #[test]
    fn test_students() {
        let input = TermInput::new()
            .with_course(Course::new("C1", "F1"))
            .with_course(Course::new("C2", "F2"))
            .with_enrollments("C1", ["s1", "s2"])
            .with_enrollments("C2", ["s1"]);

        let students = input.students();
        assert_eq!(students.len(), 2);
        assert_eq!(students[0].id, "s1");
        assert_eq!(students[0].courses.len(), 2);
        assert_eq!(students[1].courses.len(), 1);
    }

    #[test]
    fn test_course_lookup() {
        let input = TermInput::new().with_course(Course::new("C1", "F1"));
        assert!(input.course("C1").is_some());
        assert!(input.course("C9").is_none());
    }
}
