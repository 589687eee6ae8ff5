//! Term calendar primitives.
//!
//! # Time Model
//! Weeks are 1-based. Within a week, days and periods are 0-based indices
//! into the configured day grid. A [`TimeSlot`] is one (week, day, period)
//! cell; rooms are valid over an inclusive [`WeekWindow`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// An inclusive range of weeks `[first, last]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeekWindow {
    pub first: u32,
    pub last: u32,
}

impl WeekWindow {
    /// Creates a window. `first > last` yields an empty window.
    pub fn new(first: u32, last: u32) -> Self {
        Self { first, last }
    }

    /// Number of weeks covered.
    #[inline]
    pub fn len(&self) -> u32 {
        if self.last < self.first {
            0
        } else {
            self.last - self.first + 1
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a week falls within this window.
    #[inline]
    pub fn contains(&self, week: u32) -> bool {
        week >= self.first && week <= self.last
    }

    /// Whether two windows share a week.
    pub fn overlaps(&self, other: &Self) -> bool {
        !self.is_empty() && !other.is_empty() && self.first <= other.last && other.first <= self.last
    }
}

/// A (week, day, period) cell of the regular term grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeSlot {
    pub week: u32,
    pub day: u8,
    pub period: u8,
}

impl TimeSlot {
    pub fn new(week: u32, day: u8, period: u8) -> Self {
        Self { week, day, period }
    }

    /// The (day, period) pattern, independent of the week.
    #[inline]
    pub fn pattern(&self) -> (u8, u8) {
        (self.day, self.period)
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "W{}_D{}_P{}", self.week, self.day + 1, self.period + 1)
    }
}
