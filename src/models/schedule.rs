//! Schedule (solution) model.
//!
//! A schedule maps sessions to (timeslot, room) cells of the regular term,
//! and deficit sessions to (contingent day, period, room) cells. It may
//! carry violations found by [`crate::validation::audit_schedule`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::TimeSlot;

/// A regular-term assignment of one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub session_id: String,
    /// Owning section (denormalized for query convenience).
    pub section_id: String,
    pub course_id: String,
    pub slot: TimeSlot,
    pub room_id: String,
}

/// An extra recovery day outside the regular term grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContingentDay {
    /// Identifier (`C1`, `C2`, ...).
    pub id: String,
    /// 1-based day number.
    pub number: u32,
    /// Periods offered on this day.
    pub periods: u8,
    /// Rooms usable on this day.
    pub room_ids: Vec<String>,
}

/// An assignment of a deficit session on a contingent day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContingentAssignment {
    pub session_id: String,
    pub section_id: String,
    pub course_id: String,
    /// Contingent day identifier.
    pub day_id: String,
    pub day: u32,
    pub period: u8,
    pub room_id: String,
}

/// A constraint violation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub violation_type: ViolationType,
    /// Related entity ID (session, section, room or student).
    pub entity_id: String,
    /// Human-readable description.
    pub message: String,
    /// Severity (0-100, higher = worse).
    pub severity: i32,
}

/// Classification of constraint violations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationType {
    /// A student attends two sessions in the same slot.
    StudentClash,
    /// A faculty member teaches two sessions in the same slot.
    FacultyClash,
    /// A room hosts two sessions in the same slot.
    RoomDoubleBooked,
    /// Room seats fewer students than the section holds.
    RoomTooSmall,
    /// Room used outside its validity window.
    RoomUnavailable,
    /// Section exceeds its weekly session cap.
    WeeklyCapExceeded,
    /// Section reuses one (day, period) more often than allowed.
    SlotRepeatExceeded,
    /// A session is missing, duplicated, or has no terminal status.
    SessionUnaccounted,
    /// Domain-specific violation.
    Custom(String),
}

impl Assignment {
    pub fn new(
        session_id: impl Into<String>,
        section_id: impl Into<String>,
        course_id: impl Into<String>,
        slot: TimeSlot,
        room_id: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            section_id: section_id.into(),
            course_id: course_id.into(),
            slot,
            room_id: room_id.into(),
        }
    }
}

impl ContingentDay {
    /// Creates contingent day `number` (1-based).
    pub fn new(number: u32, periods: u8, room_ids: Vec<String>) -> Self {
        Self {
            id: format!("C{number}"),
            number,
            periods,
            room_ids,
        }
    }
}

impl Violation {
    pub fn new(
        violation_type: ViolationType,
        entity_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let severity = match violation_type {
            ViolationType::StudentClash | ViolationType::FacultyClash => 95,
            ViolationType::RoomDoubleBooked | ViolationType::SessionUnaccounted => 90,
            ViolationType::RoomTooSmall | ViolationType::RoomUnavailable => 85,
            ViolationType::WeeklyCapExceeded | ViolationType::SlotRepeatExceeded => 50,
            ViolationType::Custom(_) => 10,
        };
        Self {
            violation_type,
            entity_id: entity_id.into(),
            message: message.into(),
            severity,
        }
    }
}

/// A complete term schedule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schedule {
    /// Regular-term assignments.
    pub assignments: Vec<Assignment>,
    /// Contingent days opened for recovery.
    pub contingent_days: Vec<ContingentDay>,
    /// Contingent assignments.
    pub contingent: Vec<ContingentAssignment>,
    /// Constraint violations detected in this schedule.
    pub violations: Vec<Violation>,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_assignment(&mut self, assignment: Assignment) {
        self.assignments.push(assignment);
    }

    pub fn add_contingent(&mut self, assignment: ContingentAssignment) {
        self.contingent.push(assignment);
    }

    pub fn add_violation(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    /// Whether the schedule has no violations.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Number of regular assignments.
    pub fn assignment_count(&self) -> usize {
        self.assignments.len()
    }

    /// Number of contingent assignments.
    pub fn contingent_count(&self) -> usize {
        self.contingent.len()
    }

    /// Finds the regular assignment of a session.
    pub fn assignment_for_session(&self, session_id: &str) -> Option<&Assignment> {
        self.assignments.iter().find(|a| a.session_id == session_id)
    }

    /// Regular assignments of a section.
    pub fn assignments_for_section(&self, section_id: &str) -> Vec<&Assignment> {
        self.assignments
            .iter()
            .filter(|a| a.section_id == section_id)
            .collect()
    }

    /// Regular assignments in a room.
    pub fn assignments_for_room(&self, room_id: &str) -> Vec<&Assignment> {
        self.assignments
            .iter()
            .filter(|a| a.room_id == room_id)
            .collect()
    }

    /// Regular assignments grouped by timeslot, in slot order.
    pub fn by_slot(&self) -> BTreeMap<TimeSlot, Vec<&Assignment>> {
        let mut map: BTreeMap<TimeSlot, Vec<&Assignment>> = BTreeMap::new();
        for a in &self.assignments {
            map.entry(a.slot).or_default().push(a);
        }
        map
    }

    /// Contingent assignments grouped by (day, period).
    pub fn contingent_by_cell(&self) -> BTreeMap<(u32, u8), Vec<&ContingentAssignment>> {
        let mut map: BTreeMap<(u32, u8), Vec<&ContingentAssignment>> = BTreeMap::new();
        for a in &self.contingent {
            map.entry((a.day, a.period)).or_default().push(a);
        }
        map
    }

    /// Regular session count per section.
    pub fn sessions_per_section(&self) -> BTreeMap<&str, usize> {
        let mut map: BTreeMap<&str, usize> = BTreeMap::new();
        for a in &self.assignments {
            *map.entry(a.section_id.as_str()).or_insert(0) += 1;
        }
        map
    }
}
