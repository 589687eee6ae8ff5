//! Dispatching rules and rule engine for session placement.
//!
//! The core scheduler places one session at a time. Before each placement
//! the rule engine ranks the sections that still need sessions; the
//! highest-ranked section is placed next. Ranking sections by the fewest
//! sessions placed so far turns the greedy into a max–min round robin, so
//! shortfall is spread over sections instead of concentrated on a few.
//!
//! # Usage
//!
//! ```
//! use term_timetable::dispatching::{Candidate, RuleEngine, SchedulingContext, TieBreaker};
//! use term_timetable::dispatching::rules;
//!
//! let engine = RuleEngine::new()
//!     .with_rule(rules::FewestPlaced)
//!     .with_tie_breaker(rules::MostConflicted)
//!     .with_final_tie_breaker(TieBreaker::ByIndex);
//!
//! let candidates = vec![
//!     Candidate::new(0, 0).with_progress(3, 20).with_degree(4),
//!     Candidate::new(1, 1).with_progress(2, 20).with_degree(1),
//! ];
//! let context = SchedulingContext::new();
//! assert_eq!(engine.select_best(&candidates, &context), Some(1));
//! ```
//!
//! # References
//!
//! - Brélaz (1979), "New Methods to Color the Vertices of a Graph" (most-constrained first)
//! - Burke & Petrovic (2002), "Recent Research Directions in Automated Timetabling"

mod context;
mod engine;
pub mod rules;

pub use context::SchedulingContext;
pub use engine::{EvaluationMode, RuleEngine, TieBreaker};

use std::fmt::Debug;

/// Score returned by a dispatching rule.
///
/// Lower scores = higher priority (placed first).
pub type RuleScore = f64;

/// A section competing for its next session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    /// Section index in the conflict model.
    pub section: usize,
    /// Course index of the section.
    pub course: usize,
    /// Sessions placed so far.
    pub placed: u32,
    /// Sessions required.
    pub demand: u32,
    /// Students in the section.
    pub size: usize,
    /// Number of conflicting sections.
    pub degree: usize,
}

impl Candidate {
    pub fn new(section: usize, course: usize) -> Self {
        Self {
            section,
            course,
            placed: 0,
            demand: 0,
            size: 0,
            degree: 0,
        }
    }

    pub fn with_progress(mut self, placed: u32, demand: u32) -> Self {
        self.placed = placed;
        self.demand = demand;
        self
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn with_degree(mut self, degree: usize) -> Self {
        self.degree = degree;
        self
    }

    /// Sessions still missing.
    #[inline]
    pub fn shortfall(&self) -> u32 {
        self.demand.saturating_sub(self.placed)
    }
}

/// A dispatching rule that evaluates section priority.
///
/// # Score Convention
/// **Lower score = higher priority.** Rules should return smaller values
/// for sections that should be placed first.
pub trait DispatchingRule: Send + Sync + Debug {
    /// Rule name (e.g., "FEWEST_PLACED").
    fn name(&self) -> &'static str;

    /// Evaluates the priority of a candidate given the current context.
    ///
    /// Returns a score where lower = higher priority.
    fn evaluate(&self, candidate: &Candidate, context: &SchedulingContext) -> RuleScore;

    /// Rule description.
    fn description(&self) -> &'static str {
        self.name()
    }
}
