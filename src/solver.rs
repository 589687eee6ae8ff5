//! Search budgets and solve status shared by every solving phase.
//!
//! Each phase runs until it proves its objective or exhausts its budget.
//! The iteration limit keeps runs reproducible; the wall-clock limit is a
//! safety cap. Running out of budget is never an error: the best solution
//! found so far is kept and reported as [`SolveStatus::Feasible`].

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Outcome quality of a solving phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    /// The objective matched a proven bound.
    Optimal,
    /// Best solution found within budget; optimality not proven.
    Feasible,
}

impl SolveStatus {
    /// Whether optimality was proven.
    pub fn is_optimal(&self) -> bool {
        matches!(self, SolveStatus::Optimal)
    }

    /// `Optimal` when the achieved value meets its lower bound.
    pub fn from_bound(achieved: u64, lower_bound: u64) -> Self {
        if achieved <= lower_bound {
            SolveStatus::Optimal
        } else {
            SolveStatus::Feasible
        }
    }
}

/// Iteration and time limits for one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    pub iteration_limit: u64,
    pub time_limit: Option<Duration>,
}

impl Budget {
    pub fn new(iteration_limit: u64, time_limit: Option<Duration>) -> Self {
        Self {
            iteration_limit,
            time_limit,
        }
    }

    /// Budget bounded by iterations only.
    pub fn iterations(iteration_limit: u64) -> Self {
        Self::new(iteration_limit, None)
    }

    /// Starts counting against this budget.
    pub fn start(&self) -> BudgetClock {
        BudgetClock {
            budget: *self,
            started: Instant::now(),
            iterations: 0,
            expired: false,
        }
    }
}

/// Running consumption of a [`Budget`].
#[derive(Debug, Clone)]
pub struct BudgetClock {
    budget: Budget,
    started: Instant,
    iterations: u64,
    expired: bool,
}

impl BudgetClock {
    /// Consumes `n` iterations. Returns `false` once the budget is spent.
    pub fn tick(&mut self, n: u64) -> bool {
        if self.expired {
            return false;
        }
        let before = self.iterations;
        self.iterations = self.iterations.saturating_add(n);
        if self.iterations > self.budget.iteration_limit {
            self.expired = true;
        } else if let Some(limit) = self.budget.time_limit {
            // clock sampled on the first tick and every 1024 iterations after
            let sample = before == 0 || before / 1024 != self.iterations / 1024;
            if sample && self.started.elapsed() >= limit {
                self.expired = true;
            }
        }
        !self.expired
    }

    /// Whether the budget ran out at any point.
    pub fn is_expired(&self) -> bool {
        self.expired
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iteration_limit() {
        let mut clock = Budget::iterations(3).start();
        assert!(clock.tick(1));
        assert!(clock.tick(2));
        assert!(!clock.is_expired());
        assert!(!clock.tick(1));
        assert!(clock.is_expired());
        // stays expired
        assert!(!clock.tick(0));
    }

    #[test]
    fn test_zero_time_limit_expires() {
        let mut clock = Budget::new(u64::MAX, Some(Duration::ZERO)).start();
        assert!(!clock.tick(1));
        assert!(clock.is_expired());
    }

    #[test]
    fn test_status_from_bound() {
        assert_eq!(SolveStatus::from_bound(54, 54), SolveStatus::Optimal);
        assert_eq!(SolveStatus::from_bound(55, 54), SolveStatus::Feasible);
        assert!(SolveStatus::Optimal.is_optimal());
        assert!(!SolveStatus::Feasible.is_optimal());
    }
}
