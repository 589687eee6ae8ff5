//! Scheduling context for dispatching rule evaluation.

use std::collections::HashMap;

/// Runtime placement state passed to dispatching rules.
///
/// Course-level counters let rules balance shortfall between courses with
/// several sections, not only between individual sections.
#[derive(Debug, Clone, Default)]
pub struct SchedulingContext {
    /// Placements made so far in this phase.
    pub placements: u64,
    /// Sessions still missing per course (course index → sessions).
    pub course_shortfall: HashMap<usize, u32>,
}

impl SchedulingContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of placements made so far.
    pub fn with_placements(mut self, placements: u64) -> Self {
        self.placements = placements;
        self
    }

    /// Sets the shortfall of a course.
    pub fn with_course_shortfall(mut self, course: usize, sessions: u32) -> Self {
        self.course_shortfall.insert(course, sessions);
        self
    }

    /// Records one placement for `course`.
    pub fn record_placement(&mut self, course: usize) {
        self.placements += 1;
        if let Some(s) = self.course_shortfall.get_mut(&course) {
            *s = s.saturating_sub(1);
        }
    }

    /// Records one removed placement for `course`.
    pub fn record_removal(&mut self, course: usize) {
        *self.course_shortfall.entry(course).or_insert(0) += 1;
    }
}
