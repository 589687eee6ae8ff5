//! Section and session models.
//!
//! A section is a capacity-bounded group of a course's students. Every
//! section must meet a fixed number of sessions; each session ends the run
//! in exactly one terminal [`SessionStatus`].

use serde::{Deserialize, Serialize};

/// A capacity-bounded student group of one course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Unique section identifier (`<course>_<label>`).
    pub id: String,
    /// Owning course identifier.
    pub course_id: String,
    /// Section label within the course (`A`, `B`, ...).
    pub label: String,
    /// Enrolled student ids, sorted.
    pub students: Vec<String>,
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionStatus {
    Unscheduled,
    ScheduledRegular,
    ScheduledContingent,
}

/// One required meeting of a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier (`<section>#<ordinal>`).
    pub id: String,
    pub section_id: String,
    /// 1-based ordinal within the section.
    pub ordinal: u32,
    pub status: SessionStatus,
}

impl Section {
    /// Creates a section; student ids are sorted.
    pub fn new(
        course_id: impl Into<String>,
        label: impl Into<String>,
        mut students: Vec<String>,
    ) -> Self {
        let course_id = course_id.into();
        let label = label.into();
        students.sort();
        Self {
            id: format!("{course_id}_{label}"),
            course_id,
            label,
            students,
        }
    }

    /// Number of enrolled students.
    #[inline]
    pub fn size(&self) -> usize {
        self.students.len()
    }

    /// Whether the student attends this section.
    pub fn contains(&self, student_id: &str) -> bool {
        self.students
            .binary_search_by(|s| s.as_str().cmp(student_id))
            .is_ok()
    }

    /// Creates `count` unscheduled sessions for this section.
    pub fn sessions(&self, count: u32) -> Vec<Session> {
        (1..=count)
            .map(|ordinal| Session {
                id: format!("{}#{:02}", self.id, ordinal),
                section_id: self.id.clone(),
                ordinal,
                status: SessionStatus::Unscheduled,
            })
            .collect()
    }
}

/// Section label for a 0-based index: A..Z, then AA, AB, ...
pub fn section_label(index: usize) -> String {
    let mut label = Vec::new();
    let mut n = index;
    loop {
        label.push(b'A' + (n % 26) as u8);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    label.reverse();
    String::from_utf8_lossy(&label).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_new() {
        let s = Section::new("BV", "A", vec!["s3".into(), "s1".into(), "s2".into()]);
        assert_eq!(s.id, "BV_A");
        assert_eq!(s.size(), 3);
        assert_eq!(s.students, vec!["s1", "s2", "s3"]);
        assert!(s.contains("s2"));
        assert!(!s.contains("s9"));
    }

    #[test]
    fn test_sessions() {
        let s = Section::new("BV", "B", vec!["s1".into()]);
        let sessions = s.sessions(20);
        assert_eq!(sessions.len(), 20);
        assert_eq!(sessions[0].id, "BV_B#01");
        assert_eq!(sessions[19].id, "BV_B#20");
        assert!(sessions
            .iter()
            .all(|x| x.status == SessionStatus::Unscheduled && x.section_id == "BV_B"));
    }

    #[test]
    fn test_section_labels() {
        assert_eq!(section_label(0), "A");
        assert_eq!(section_label(1), "B");
        assert_eq!(section_label(25), "Z");
        assert_eq!(section_label(26), "AA");
        assert_eq!(section_label(27), "AB");
    }
}
