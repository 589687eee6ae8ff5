//! Built-in dispatching rules.
//!
//! # Categories
//!
//! - **Fairness**: FEWEST_PLACED, COURSE_SHORTFALL
//! - **Difficulty**: MOST_CONFLICTED, LARGEST_SECTION
//! - **Progress**: MOST_REMAINING
//!
//! # Score Convention
//! All rules return lower scores for higher priority sections.

use super::{Candidate, DispatchingRule, RuleScore, SchedulingContext};

// ======================== Fairness rules ========================

/// Fewest Placed.
///
/// Prioritizes sections with the fewest sessions placed so far. Used as
/// the primary rule this yields a max–min round robin.
#[derive(Debug, Clone, Copy)]
pub struct FewestPlaced;

impl DispatchingRule for FewestPlaced {
    fn name(&self) -> &'static str {
        "FEWEST_PLACED"
    }

    fn evaluate(&self, candidate: &Candidate, _context: &SchedulingContext) -> RuleScore {
        candidate.placed as f64
    }

    fn description(&self) -> &'static str {
        "Fewest Sessions Placed"
    }
}

/// Largest Course Shortfall.
///
/// Prioritizes sections whose course is missing the most sessions overall.
/// Falls back to the section's own shortfall when the context has no
/// course counter.
#[derive(Debug, Clone, Copy)]
pub struct CourseShortfall;

impl DispatchingRule for CourseShortfall {
    fn name(&self) -> &'static str {
        "COURSE_SHORTFALL"
    }

    fn evaluate(&self, candidate: &Candidate, context: &SchedulingContext) -> RuleScore {
        let shortfall = context
            .course_shortfall
            .get(&candidate.course)
            .copied()
            .unwrap_or_else(|| candidate.shortfall());
        -(shortfall as f64)
    }

    fn description(&self) -> &'static str {
        "Largest Course Shortfall"
    }
}

// ======================== Difficulty rules ========================

/// Most Conflicted.
///
/// Prioritizes sections with the most conflicting sections: they have the
/// fewest usable slots and get harder to place as the grid fills.
///
/// # Reference
/// Brélaz (1979), largest-degree-first colouring.
#[derive(Debug, Clone, Copy)]
pub struct MostConflicted;

impl DispatchingRule for MostConflicted {
    fn name(&self) -> &'static str {
        "MOST_CONFLICTED"
    }

    fn evaluate(&self, candidate: &Candidate, _context: &SchedulingContext) -> RuleScore {
        -(candidate.degree as f64)
    }

    fn description(&self) -> &'static str {
        "Most Conflicting Sections"
    }
}

/// Largest Section.
///
/// Prioritizes large sections, which fit the fewest rooms.
#[derive(Debug, Clone, Copy)]
pub struct LargestSection;

impl DispatchingRule for LargestSection {
    fn name(&self) -> &'static str {
        "LARGEST_SECTION"
    }

    fn evaluate(&self, candidate: &Candidate, _context: &SchedulingContext) -> RuleScore {
        -(candidate.size as f64)
    }
}

// ======================== Progress rules ========================

/// Most Remaining.
///
/// Prioritizes sections with the most sessions still missing.
#[derive(Debug, Clone, Copy)]
pub struct MostRemaining;

impl DispatchingRule for MostRemaining {
    fn name(&self) -> &'static str {
        "MOST_REMAINING"
    }

    fn evaluate(&self, candidate: &Candidate, _context: &SchedulingContext) -> RuleScore {
        -(candidate.shortfall() as f64)
    }

    fn description(&self) -> &'static str {
        "Most Sessions Remaining"
    }
}
