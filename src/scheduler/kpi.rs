//! Schedule quality metrics (KPIs).
//!
//! Computes term-level indicators from a completed schedule and its
//! sections.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Regular completion | Regular sessions placed / sessions required |
//! | Total completion | (regular + contingent) / required |
//! | Course shortfall | Required minus regular sessions, per course |
//! | Max shortfall | Largest single section shortfall |
//! | Sections below floor | Sections with fewer regular sessions than the floor |
//! | Faculty load | Courses and sections per faculty member |
//! | Room utilization | Booked room-slots / available room-slots, per regime |

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::CoreConfig;
use crate::models::{Course, Schedule, Section};
use crate::slots::{Regime, SlotCalendar};

/// Courses and sections taught by one faculty member.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacultyLoad {
    pub courses: usize,
    pub sections: usize,
}

/// Schedule performance indicators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleKpi {
    /// Sections × sessions per section.
    pub sessions_required: usize,
    pub sessions_regular: usize,
    pub sessions_contingent: usize,
    /// Regular sessions / required (0.0..1.0).
    pub regular_completion: f64,
    /// (Regular + contingent) / required (0.0..1.0).
    pub total_completion: f64,
    /// Regular-term shortfall per course (courses without shortfall omitted).
    pub shortfall_by_course: BTreeMap<String, u32>,
    /// Largest regular-term shortfall of a single section.
    pub max_section_shortfall: u32,
    /// Sections finishing the regular term below the session floor.
    pub sections_below_floor: Vec<String>,
    /// Load per primary faculty member.
    pub faculty_load: BTreeMap<String, FacultyLoad>,
    /// Booked room-slots over available room-slots.
    pub utilization_by_regime: BTreeMap<Regime, f64>,
}

impl ScheduleKpi {
    /// Computes KPIs from a schedule and the sections it was built for.
    pub fn calculate(
        schedule: &Schedule,
        sections: &[Section],
        courses: &[Course],
        calendar: &SlotCalendar,
        core: &CoreConfig,
    ) -> Self {
        let required = core.sessions_per_section;
        let per_section = schedule.sessions_per_section();

        let mut shortfall_by_course: BTreeMap<String, u32> = BTreeMap::new();
        let mut max_section_shortfall = 0;
        let mut sections_below_floor = Vec::new();
        for section in sections {
            let placed = per_section.get(section.id.as_str()).copied().unwrap_or(0) as u32;
            let shortfall = required.saturating_sub(placed);
            if shortfall > 0 {
                *shortfall_by_course.entry(section.course_id.clone()).or_insert(0) += shortfall;
            }
            max_section_shortfall = max_section_shortfall.max(shortfall);
            if placed < core.session_floor {
                sections_below_floor.push(section.id.clone());
            }
        }

        let mut faculty_load: BTreeMap<String, FacultyLoad> = BTreeMap::new();
        for course in courses {
            let count = sections.iter().filter(|s| s.course_id == course.id).count();
            let load = faculty_load.entry(course.faculty.clone()).or_default();
            load.courses += 1;
            load.sections += count;
        }

        // Available room-slots per regime
        let mut available: BTreeMap<Regime, usize> = BTreeMap::new();
        for t in 0..calendar.slot_count() {
            let regime = calendar.regime(calendar.slot(t).week);
            *available.entry(regime).or_insert(0) += calendar.room_pool(t).len();
        }
        let mut booked: BTreeMap<Regime, usize> = BTreeMap::new();
        for a in &schedule.assignments {
            *booked.entry(calendar.regime(a.slot.week)).or_insert(0) += 1;
        }
        let utilization_by_regime = available
            .into_iter()
            .map(|(regime, slots)| {
                let used = booked.get(&regime).copied().unwrap_or(0);
                let rate = if slots == 0 { 0.0 } else { used as f64 / slots as f64 };
                (regime, rate)
            })
            .collect();

        let sessions_required = sections.len() * required as usize;
        let sessions_regular = schedule.assignment_count();
        let sessions_contingent = schedule.contingent_count();
        let ratio = |n: usize| {
            if sessions_required == 0 {
                1.0
            } else {
                n as f64 / sessions_required as f64
            }
        };

        Self {
            sessions_required,
            sessions_regular,
            sessions_contingent,
            regular_completion: ratio(sessions_regular),
            total_completion: ratio(sessions_regular + sessions_contingent),
            shortfall_by_course,
            max_section_shortfall,
            sections_below_floor,
            faculty_load,
            utilization_by_regime,
        }
    }

    /// Total regular-term shortfall.
    pub fn total_shortfall(&self) -> u32 {
        self.shortfall_by_course.values().sum()
    }

    /// Whether the schedule meets the given quality thresholds.
    pub fn meets_thresholds(&self, max_section_shortfall: u32, min_completion: f64) -> bool {
        self.max_section_shortfall <= max_section_shortfall
            && self.total_completion >= min_completion
    }
}
