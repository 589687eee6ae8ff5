//! Input validation and schedule audit.
//!
//! [`validate_input`] checks structural integrity of courses, enrollments
//! and rooms before any solving starts. Detects:
//! - Duplicate course / room IDs
//! - Enrollments referencing unknown courses
//! - Courses without faculty
//! - Rooms with zero capacity or a validity window outside the term
//! - Faculty handovers outside the term
//!
//! [`diagnose_load`] flags students that need more sessions than the term
//! has timeslots. [`audit_schedule`] re-checks a finished schedule against
//! every hard invariant and reports [`Violation`]s.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::TimetableConfig;
use crate::models::{Schedule, Section, TermInput, Violation, ViolationType};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two entities share the same ID.
    DuplicateId,
    /// An enrollment references a course that doesn't exist.
    UnknownCourse,
    /// A course (or its handover) names no faculty.
    EmptyFaculty,
    /// A room seats nobody.
    InvalidRoomCapacity,
    /// A room's validity window is empty or leaves the term.
    RoomWindowOutsideTerm,
    /// A faculty handover starts outside the term.
    HandoverOutsideTerm,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// Validates the input data of a timetabling run.
///
/// Checks:
/// 1. No duplicate course IDs
/// 2. No duplicate room IDs
/// 3. Every course names a faculty member (also after handover)
/// 4. Handover weeks fall within `2..=weeks`
/// 5. Rooms have positive capacity and a window inside the term
/// 6. Every enrollment references an existing course
///
/// Duplicate enrollment rows are tolerated; they collapse in
/// [`TermInput::roster`].
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_input(input: &TermInput, config: &TimetableConfig) -> ValidationResult {
    let mut errors = Vec::new();
    let weeks = config.calendar.weeks;

    let mut course_ids = HashSet::new();
    for course in &input.courses {
        if !course_ids.insert(course.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate course ID: {}", course.id),
            ));
        }
        if course.faculty.trim().is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::EmptyFaculty,
                format!("Course '{}' has no faculty", course.id),
            ));
        }
        if let Some(handover) = &course.handover {
            if handover.faculty.trim().is_empty() {
                errors.push(ValidationError::new(
                    ValidationErrorKind::EmptyFaculty,
                    format!("Course '{}' hands over to an empty faculty", course.id),
                ));
            }
            if handover.from_week < 2 || handover.from_week > weeks {
                errors.push(ValidationError::new(
                    ValidationErrorKind::HandoverOutsideTerm,
                    format!(
                        "Course '{}' hands over in week {} (term has {} weeks)",
                        course.id, handover.from_week, weeks
                    ),
                ));
            }
        }
    }

    let mut room_ids = HashSet::new();
    for room in &input.rooms {
        if !room_ids.insert(room.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate room ID: {}", room.id),
            ));
        }
        if room.capacity == 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidRoomCapacity,
                format!("Room '{}' has zero capacity", room.id),
            ));
        }
        if room.window.is_empty() || room.window.first < 1 || room.window.last > weeks {
            errors.push(ValidationError::new(
                ValidationErrorKind::RoomWindowOutsideTerm,
                format!(
                    "Room '{}' window {}..={} is not inside weeks 1..={}",
                    room.id, room.window.first, room.window.last, weeks
                ),
            ));
        }
    }

    // One error per unknown course, not per row
    let mut reported = HashSet::new();
    for e in &input.enrollments {
        if !course_ids.contains(e.course_id.as_str()) && reported.insert(e.course_id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownCourse,
                format!(
                    "Enrollment of '{}' references unknown course '{}'",
                    e.student_id, e.course_id
                ),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// A student whose courses need more sessions than the term can hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentLoad {
    pub student_id: String,
    pub courses: usize,
    pub required_sessions: usize,
    pub available_slots: usize,
}

impl StudentLoad {
    /// Sessions that can never be placed in the regular term.
    pub fn excess(&self) -> usize {
        self.required_sessions.saturating_sub(self.available_slots)
    }
}

/// Students whose required sessions exceed the term's timeslot count,
/// heaviest first.
///
/// Each such student forces a deficit of at least [`StudentLoad::excess`].
pub fn diagnose_load(input: &TermInput, config: &TimetableConfig) -> Vec<StudentLoad> {
    let per_course = config.core.sessions_per_section as usize;
    let available = config.calendar.slots_per_term();
    let known: HashSet<&str> = input.courses.iter().map(|c| c.id.as_str()).collect();

    let mut out: Vec<StudentLoad> = input
        .students()
        .into_iter()
        .filter_map(|student| {
            let courses = student
                .courses
                .iter()
                .filter(|c| known.contains(c.as_str()))
                .count();
            let required = courses * per_course;
            (required > available).then(|| StudentLoad {
                student_id: student.id,
                courses,
                required_sessions: required,
                available_slots: available,
            })
        })
        .collect();
    out.sort_by(|a, b| {
        b.required_sessions
            .cmp(&a.required_sessions)
            .then_with(|| a.student_id.cmp(&b.student_id))
    });
    out
}

/// Re-checks a finished schedule against every hard invariant.
///
/// Regular assignments are checked for student, faculty and room clashes
/// per timeslot, room capacity and validity window, the weekly cap and the
/// slot-repeat cap. Contingent assignments are checked for clashes per
/// (day, period) and room capacity, with the faculty active in the final
/// week. Every session of every section must end in exactly one terminal
/// status: a missing or duplicated session is `SessionUnaccounted`.
pub fn audit_schedule(
    schedule: &Schedule,
    sections: &[Section],
    input: &TermInput,
    config: &TimetableConfig,
) -> Vec<Violation> {
    let mut violations = Vec::new();
    let section_map: HashMap<&str, &Section> =
        sections.iter().map(|s| (s.id.as_str(), s)).collect();
    let room_map: HashMap<&str, u32> = input
        .rooms
        .iter()
        .map(|r| (r.id.as_str(), r.capacity))
        .collect();
    let faculty_in = |section: &Section, week: u32| -> String {
        input
            .course(&section.course_id)
            .map(|c| c.faculty_in_week(week).to_string())
            .unwrap_or_else(|| format!("<{}>", section.course_id))
    };

    // Clash checks per cell, shared by both phases.
    let mut check_cell = |cell: String, week: u32, members: Vec<(&str, &str)>| {
        let mut students: HashMap<&str, &str> = HashMap::new();
        let mut faculty: HashMap<String, &str> = HashMap::new();
        let mut rooms: HashSet<&str> = HashSet::new();
        for (section_id, room_id) in members {
            if !rooms.insert(room_id) {
                violations.push(Violation::new(
                    ViolationType::RoomDoubleBooked,
                    room_id,
                    format!("room {room_id} hosts two sessions at {cell}"),
                ));
            }
            let Some(section) = section_map.get(section_id) else {
                continue;
            };
            let f = faculty_in(section, week);
            if let Some(other) = faculty.insert(f.clone(), section_id) {
                violations.push(Violation::new(
                    ViolationType::FacultyClash,
                    f.as_str(),
                    format!("{f} teaches {other} and {section_id} at {cell}"),
                ));
            }
            for student in &section.students {
                if let Some(other) = students.insert(student.as_str(), section_id) {
                    violations.push(Violation::new(
                        ViolationType::StudentClash,
                        student.as_str(),
                        format!("{student} attends {other} and {section_id} at {cell}"),
                    ));
                }
            }
            if let Some(&capacity) = room_map.get(room_id) {
                if (capacity as usize) < section.size() {
                    violations.push(Violation::new(
                        ViolationType::RoomTooSmall,
                        room_id,
                        format!(
                            "room {room_id} seats {capacity} but {section_id} has {}",
                            section.size()
                        ),
                    ));
                }
            }
        }
    };

    for (slot, assigned) in schedule.by_slot() {
        let members = assigned
            .iter()
            .map(|a| (a.section_id.as_str(), a.room_id.as_str()))
            .collect();
        check_cell(slot.to_string(), slot.week, members);
    }
    let final_week = config.calendar.weeks;
    for ((day, period), assigned) in schedule.contingent_by_cell() {
        let members = assigned
            .iter()
            .map(|a| (a.section_id.as_str(), a.room_id.as_str()))
            .collect();
        check_cell(format!("C{day}_P{}", period + 1), final_week, members);
    }

    for a in &schedule.assignments {
        let valid = input
            .rooms
            .iter()
            .find(|r| r.id == a.room_id)
            .is_some_and(|r| r.is_valid_in(a.slot.week));
        if !valid {
            violations.push(Violation::new(
                ViolationType::RoomUnavailable,
                a.room_id.as_str(),
                format!("room {} is not available in week {}", a.room_id, a.slot.week),
            ));
        }
    }
    for a in &schedule.contingent {
        if !room_map.contains_key(a.room_id.as_str()) {
            violations.push(Violation::new(
                ViolationType::RoomUnavailable,
                a.room_id.as_str(),
                format!("unknown room {} on contingent day {}", a.room_id, a.day_id),
            ));
        }
    }

    let mut per_week: BTreeMap<(&str, u32), u32> = BTreeMap::new();
    let mut per_pattern: BTreeMap<(&str, (u8, u8)), u32> = BTreeMap::new();
    for a in &schedule.assignments {
        *per_week.entry((a.section_id.as_str(), a.slot.week)).or_insert(0) += 1;
        *per_pattern
            .entry((a.section_id.as_str(), a.slot.pattern()))
            .or_insert(0) += 1;
    }
    for ((section_id, week), count) in per_week {
        if count > config.core.max_sessions_per_week {
            violations.push(Violation::new(
                ViolationType::WeeklyCapExceeded,
                section_id,
                format!("{section_id} meets {count} times in week {week}"),
            ));
        }
    }
    for ((section_id, (day, period)), count) in per_pattern {
        if count > config.core.max_slot_repeats {
            violations.push(Violation::new(
                ViolationType::SlotRepeatExceeded,
                section_id,
                format!(
                    "{section_id} uses day {} period {} {count} times",
                    day + 1,
                    period + 1
                ),
            ));
        }
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let placed = schedule
        .assignments
        .iter()
        .map(|a| (a.session_id.as_str(), a.section_id.as_str()))
        .chain(
            schedule
                .contingent
                .iter()
                .map(|a| (a.session_id.as_str(), a.section_id.as_str())),
        );
    for (session_id, section_id) in placed {
        if !seen.insert(session_id) {
            violations.push(Violation::new(
                ViolationType::SessionUnaccounted,
                session_id,
                format!("session {session_id} is placed more than once"),
            ));
        }
        if !section_map.contains_key(section_id) {
            violations.push(Violation::new(
                ViolationType::SessionUnaccounted,
                session_id,
                format!("session {session_id} belongs to unknown section {section_id}"),
            ));
        }
    }
    for section in sections {
        for session in section.sessions(config.core.sessions_per_section) {
            if !seen.contains(session.id.as_str()) {
                violations.push(Violation::new(
                    ViolationType::SessionUnaccounted,
                    session.id.as_str(),
                    format!("session {} was never placed", session.id),
                ));
            }
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CalendarConfig;
    use crate::models::{
        Assignment, ContingentAssignment, Course, Enrollment, Room, TimeSlot,
    };

    fn sample_input() -> TermInput {
        TermInput::new()
            .with_course(Course::new("C1", "F1"))
            .with_course(Course::new("C2", "F2").with_handover(5, "F3"))
            .with_enrollments("C1", ["s1", "s2"])
            .with_enrollments("C2", ["s2", "s3"])
            .with_room(Room::new("R1", 70, 1, 4))
            .with_room(Room::new("R2", 70, 5, 10))
    }

    #[test]
    fn test_valid_input() {
        let input = sample_input();
        assert!(validate_input(&input, &TimetableConfig::default()).is_ok());
    }

    #[test]
    fn test_duplicate_ids() {
        let input = sample_input()
            .with_course(Course::new("C1", "F9"))
            .with_room(Room::new("R1", 50, 1, 10));
        let errors = validate_input(&input, &TimetableConfig::default()).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::DuplicateId && e.message.contains("course")));
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::DuplicateId && e.message.contains("room")));
    }

    #[test]
    fn test_unknown_course_reported_once() {
        let mut input = sample_input();
        input.enrollments.push(Enrollment::new("s1", "NOPE"));
        input.enrollments.push(Enrollment::new("s2", "NOPE"));
        let errors = validate_input(&input, &TimetableConfig::default()).unwrap_err();
        let unknown: Vec<_> = errors
            .iter()
            .filter(|e| e.kind == ValidationErrorKind::UnknownCourse)
            .collect();
        assert_eq!(unknown.len(), 1);
    }

    #[test]
    fn test_duplicate_enrollment_tolerated() {
        let input = sample_input().with_enrollments("C1", ["s1"]);
        assert!(validate_input(&input, &TimetableConfig::default()).is_ok());
        assert_eq!(input.roster()["C1"].len(), 2);
    }

    #[test]
    fn test_room_and_handover_checks() {
        let input = TermInput::new()
            .with_course(Course::new("C1", " ").with_handover(11, "F2"))
            .with_room(Room::new("R0", 0, 1, 10))
            .with_room(Room::new("R9", 40, 8, 12));
        let errors = validate_input(&input, &TimetableConfig::default()).unwrap_err();
        let kinds: Vec<_> = errors.iter().map(|e| e.kind.clone()).collect();
        assert!(kinds.contains(&ValidationErrorKind::EmptyFaculty));
        assert!(kinds.contains(&ValidationErrorKind::HandoverOutsideTerm));
        assert!(kinds.contains(&ValidationErrorKind::InvalidRoomCapacity));
        assert!(kinds.contains(&ValidationErrorKind::RoomWindowOutsideTerm));
        assert!(errors.len() >= 4);
    }

    #[test]
    fn test_diagnose_load() {
        // 2 weeks x 1 day x 3 periods = 6 slots; 2 courses x 4 sessions = 8 > 6
        let mut config = TimetableConfig::default()
            .with_calendar(CalendarConfig::uniform(2, 1, 1, 3));
        config.core.sessions_per_section = 4;
        let input = sample_input();
        let overloaded = diagnose_load(&input, &config);
        assert_eq!(overloaded.len(), 1);
        assert_eq!(overloaded[0].student_id, "s2");
        assert_eq!(overloaded[0].required_sessions, 8);
        assert_eq!(overloaded[0].excess(), 2);

        assert!(diagnose_load(&input, &TimetableConfig::default()).is_empty());
    }

    fn audit_fixture() -> (TermInput, Vec<Section>, TimetableConfig) {
        let input = TermInput::new()
            .with_course(Course::new("C1", "F1"))
            .with_course(Course::new("C2", "F1"))
            .with_course(Course::new("C3", "F3"))
            .with_room(Room::new("R1", 2, 1, 2))
            .with_room(Room::new("R2", 1, 1, 2));
        let sections = vec![
            Section::new("C1", "A", vec!["s1".into(), "s2".into()]),
            Section::new("C2", "A", vec!["s3".into()]),
            Section::new("C3", "A", vec!["s1".into()]),
        ];
        let mut config =
            TimetableConfig::default().with_calendar(CalendarConfig::uniform(2, 1, 1, 2));
        config.core.sessions_per_section = 1;
        config.core.max_sessions_per_week = 1;
        (input, sections, config)
    }

    #[test]
    fn test_audit_clean_schedule() {
        let (input, sections, config) = audit_fixture();
        let mut schedule = Schedule::new();
        schedule.add_assignment(Assignment::new("C1_A#01", "C1_A", "C1", TimeSlot::new(1, 0, 0), "R1"));
        schedule.add_assignment(Assignment::new("C2_A#01", "C2_A", "C2", TimeSlot::new(1, 0, 1), "R1"));
        schedule.add_contingent(ContingentAssignment {
            session_id: "C3_A#01".into(),
            section_id: "C3_A".into(),
            course_id: "C3".into(),
            day_id: "C1".into(),
            day: 1,
            period: 0,
            room_id: "R2".into(),
        });
        let violations = audit_schedule(&schedule, &sections, &input, &config);
        assert!(violations.is_empty(), "{violations:?}");
    }

    #[test]
    fn test_audit_detects_clashes() {
        let (input, sections, config) = audit_fixture();
        let slot = TimeSlot::new(1, 0, 0);
        let mut schedule = Schedule::new();
        schedule.add_assignment(Assignment::new("C1_A#01", "C1_A", "C1", slot, "R2"));
        schedule.add_assignment(Assignment::new("C2_A#01", "C2_A", "C2", slot, "R1"));
        schedule.add_assignment(Assignment::new("C3_A#01", "C3_A", "C3", slot, "R1"));
        let violations = audit_schedule(&schedule, &sections, &input, &config);
        let has = |t: ViolationType| violations.iter().any(|v| v.violation_type == t);
        assert!(has(ViolationType::FacultyClash));
        assert!(has(ViolationType::StudentClash));
        assert!(has(ViolationType::RoomDoubleBooked));
        assert!(has(ViolationType::RoomTooSmall));
    }

    #[test]
    fn test_audit_detects_caps_windows_and_accounting() {
        let (input, sections, config) = audit_fixture();
        let mut schedule = Schedule::new();
        schedule.add_assignment(Assignment::new("C1_A#01", "C1_A", "C1", TimeSlot::new(1, 0, 0), "R1"));
        schedule.add_assignment(Assignment::new("C1_A#01", "C1_A", "C1", TimeSlot::new(1, 0, 1), "R1"));
        schedule.add_assignment(Assignment::new("C2_A#01", "C2_A", "C2", TimeSlot::new(3, 0, 0), "R1"));
        let violations = audit_schedule(&schedule, &sections, &input, &config);
        let has = |t: ViolationType| violations.iter().any(|v| v.violation_type == t);
        assert!(has(ViolationType::WeeklyCapExceeded));
        assert!(has(ViolationType::RoomUnavailable));
        // duplicate C1_A#01 and missing C3_A#01
        let unaccounted: Vec<_> = violations
            .iter()
            .filter(|v| v.violation_type == ViolationType::SessionUnaccounted)
            .map(|v| v.entity_id.as_str())
            .collect();
        assert!(unaccounted.contains(&"C1_A#01"));
        assert!(unaccounted.contains(&"C3_A#01"));
    }
}
