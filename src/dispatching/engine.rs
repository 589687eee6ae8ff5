//! Rule engine for multi-criteria dispatching.
//!
//! Composes multiple dispatching rules with configurable evaluation modes
//! and tie-breaking strategies.
//!
//! # Reference
//! Haupt (1989), "A Survey of Priority Rule-Based Scheduling"

use std::sync::Arc;

use super::{Candidate, DispatchingRule, RuleScore, SchedulingContext};

/// How multiple rules are combined.
#[derive(Debug, Clone, Default)]
pub enum EvaluationMode {
    /// Apply rules in sequence; use next rule only on ties.
    #[default]
    Sequential,
    /// Compute weighted sum of all rule scores.
    Weighted,
}

/// How ties are broken after all rules are exhausted.
#[derive(Debug, Clone, Default)]
pub enum TieBreaker {
    /// Keep input order (stable sort).
    #[default]
    NextRule,
    /// Deterministic by section index (lowest first).
    ByIndex,
}

#[derive(Clone)]
struct WeightedRule {
    rule: Arc<dyn DispatchingRule>,
    weight: f64,
}

/// A composable rule engine for section prioritization.
///
/// Supports sequential multi-layer evaluation (primary rule → tie-breaker)
/// and weighted combination modes.
///
/// # Example
/// ```
/// use term_timetable::dispatching::RuleEngine;
/// use term_timetable::dispatching::rules;
///
/// let engine = RuleEngine::new()
///     .with_rule(rules::FewestPlaced)
///     .with_tie_breaker(rules::MostConflicted);
/// ```
#[derive(Clone)]
pub struct RuleEngine {
    rules: Vec<WeightedRule>,
    mode: EvaluationMode,
    tie_breaker: TieBreaker,
    epsilon: f64,
}

impl RuleEngine {
    /// Creates an empty rule engine.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            mode: EvaluationMode::Sequential,
            tie_breaker: TieBreaker::NextRule,
            epsilon: 1e-9,
        }
    }

    /// Max–min fair placement order: largest course shortfall, then fewest
    /// placed sessions of the section, then most conflicted section, then
    /// lowest section index.
    pub fn fair_round_robin() -> Self {
        Self::new()
            .with_rule(super::rules::CourseShortfall)
            .with_tie_breaker(super::rules::FewestPlaced)
            .with_tie_breaker(super::rules::MostConflicted)
            .with_final_tie_breaker(TieBreaker::ByIndex)
    }

    /// Adds a primary rule (weight 1.0).
    pub fn with_rule<R: DispatchingRule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(WeightedRule {
            rule: Arc::new(rule),
            weight: 1.0,
        });
        self
    }

    /// Adds a weighted rule.
    pub fn with_weighted_rule<R: DispatchingRule + 'static>(
        mut self,
        rule: R,
        weight: f64,
    ) -> Self {
        self.rules.push(WeightedRule {
            rule: Arc::new(rule),
            weight,
        });
        self
    }

    /// Adds a tie-breaking rule (weight 0.0, used only in Sequential mode).
    pub fn with_tie_breaker<R: DispatchingRule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(WeightedRule {
            rule: Arc::new(rule),
            weight: 0.0,
        });
        self
    }

    /// Sets the evaluation mode.
    pub fn with_mode(mut self, mode: EvaluationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the final tie-breaking strategy.
    pub fn with_final_tie_breaker(mut self, tie_breaker: TieBreaker) -> Self {
        self.tie_breaker = tie_breaker;
        self
    }

    /// Sorts candidates by priority (highest priority first).
    ///
    /// Returns indices into the candidate slice.
    pub fn sort_indices(&self, candidates: &[Candidate], context: &SchedulingContext) -> Vec<usize> {
        if candidates.is_empty() {
            return Vec::new();
        }

        let mut indices: Vec<usize> = (0..candidates.len()).collect();

        match &self.mode {
            EvaluationMode::Sequential => {
                indices.sort_by(|&a, &b| {
                    self.compare_sequential(&candidates[a], &candidates[b], context)
                });
            }
            EvaluationMode::Weighted => {
                let scores: Vec<f64> = candidates
                    .iter()
                    .map(|c| self.weighted_score(c, context))
                    .collect();
                indices.sort_by(|&a, &b| {
                    scores[a]
                        .partial_cmp(&scores[b])
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then_with(|| self.final_tie(&candidates[a], &candidates[b]))
                });
            }
        }

        indices
    }

    /// Returns the index of the highest-priority candidate.
    ///
    /// Linear scan; same result as the head of [`Self::sort_indices`].
    pub fn select_best(&self, candidates: &[Candidate], context: &SchedulingContext) -> Option<usize> {
        match &self.mode {
            EvaluationMode::Sequential => (0..candidates.len()).reduce(|best, i| {
                if self.compare_sequential(&candidates[i], &candidates[best], context)
                    == std::cmp::Ordering::Less
                {
                    i
                } else {
                    best
                }
            }),
            EvaluationMode::Weighted => self.sort_indices(candidates, context).first().copied(),
        }
    }

    /// Evaluates a single candidate and returns scores from each rule.
    pub fn evaluate(&self, candidate: &Candidate, context: &SchedulingContext) -> Vec<RuleScore> {
        self.rules
            .iter()
            .map(|wr| wr.rule.evaluate(candidate, context) * wr.weight)
            .collect()
    }

    fn compare_sequential(
        &self,
        a: &Candidate,
        b: &Candidate,
        context: &SchedulingContext,
    ) -> std::cmp::Ordering {
        for wr in &self.rules {
            let score_a = wr.rule.evaluate(a, context);
            let score_b = wr.rule.evaluate(b, context);

            if (score_a - score_b).abs() > self.epsilon {
                return score_a
                    .partial_cmp(&score_b)
                    .unwrap_or(std::cmp::Ordering::Equal);
            }
        }

        // All rules tied → use final tie-breaker
        self.final_tie(a, b)
    }

    fn final_tie(&self, a: &Candidate, b: &Candidate) -> std::cmp::Ordering {
        match &self.tie_breaker {
            TieBreaker::NextRule => std::cmp::Ordering::Equal,
            TieBreaker::ByIndex => a.section.cmp(&b.section),
        }
    }

    fn weighted_score(&self, candidate: &Candidate, context: &SchedulingContext) -> f64 {
        self.rules
            .iter()
            .map(|wr| wr.rule.evaluate(candidate, context) * wr.weight)
            .sum()
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RuleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleEngine")
            .field(
                "rules",
                &self
                    .rules
                    .iter()
                    .map(|r| format!("{}(w={})", r.rule.name(), r.weight))
                    .collect::<Vec<_>>(),
            )
            .field("mode", &self.mode)
            .finish()
    }
}
