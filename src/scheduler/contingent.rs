//! Contingent recovery: packs deficit sessions into the fewest extra days.
//!
//! # Algorithm
//!
//! Each contingent day offers `periods_per_day` periods and the largest
//! rooms of the term's final week (at most `max_rooms`). Faculty conflicts
//! use the faculty active in the final week.
//!
//! 1. Compute a lower bound on the day count: total sessions over day
//!    capacity, and the load of every section, student and faculty member
//!    over the periods of one day (their sessions need distinct periods).
//! 2. Starting at the bound, ask a [`DayOracle`] whether all deficit
//!    sessions fit into `n` days; increase `n` until one does.
//! 3. If an oracle call runs out of budget, stop searching and pack the
//!    sessions first-fit into the day ceiling without a budget. The result
//!    is kept and reported `Feasible` unless it meets the lower bound.
//!
//! With one day per deficit session every session can be placed alone, so
//! first-fit always succeeds unless `max_days` cuts the ceiling short.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::grid::{Occupancy, PoolRoom};
use crate::config::ContingentConfig;
use crate::conflict::ConflictModel;
use crate::error::{Result, TimetableError};
use crate::models::{ContingentAssignment, ContingentDay, Session};
use crate::slots::SlotCalendar;
use crate::solver::{BudgetClock, SolveStatus};

/// Deficit sessions to recover, grouped by section.
#[derive(Debug, Clone)]
pub struct ContingentProblem<'a> {
    model: &'a ConflictModel,
    week: u32,
    periods: u8,
    pool: Vec<PoolRoom>,
    /// (section, sessions to place)
    demand: Vec<(usize, u32)>,
}

impl<'a> ContingentProblem<'a> {
    pub fn model(&self) -> &'a ConflictModel {
        self.model
    }

    /// Periods of one contingent day.
    pub fn periods(&self) -> u8 {
        self.periods
    }

    /// Rooms usable on one day.
    pub fn room_count(&self) -> usize {
        self.pool.len()
    }

    /// (section, sessions) pairs to place.
    pub fn demand(&self) -> &[(usize, u32)] {
        &self.demand
    }

    pub fn total_sessions(&self) -> usize {
        self.demand.iter().map(|&(_, n)| n as usize).sum()
    }

    fn grid(&self, days: u32) -> Occupancy<'a> {
        let cells = days as usize * self.periods as usize;
        Occupancy::new(self.model, vec![self.week; cells], vec![0; cells], vec![self.pool.clone()])
    }

    /// Smallest day count no placement can beat.
    pub fn lower_bound(&self) -> u32 {
        let p = u64::from(self.periods.max(1));
        let per_day = p * self.pool.len().max(1) as u64;
        let total = self.total_sessions() as u64;
        let mut bound = total.div_ceil(per_day);

        let mut faculty: BTreeMap<usize, u64> = BTreeMap::new();
        let mut students: BTreeMap<&str, u64> = BTreeMap::new();
        let mut sections: BTreeMap<usize, u64> = BTreeMap::new();
        for &(s, n) in &self.demand {
            let n = u64::from(n);
            *sections.entry(s).or_insert(0) += n;
            *faculty.entry(self.model.faculty_of(s, self.week)).or_insert(0) += n;
        }
        for i in 0..self.model.student_count() {
            let (id, secs) = self.model.student(i);
            let load: u64 = secs.iter().filter_map(|s| sections.get(s)).sum();
            if load > 0 {
                students.insert(id, load);
            }
        }
        for load in faculty.values().chain(students.values()).chain(sections.values()) {
            bound = bound.max(load.div_ceil(p));
        }
        bound.max(u64::from(total > 0)) as u32
    }
}

/// One session placed on a contingent day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellPlacement {
    pub section: usize,
    /// 0-based day.
    pub day: u32,
    /// 0-based period.
    pub period: u8,
    /// Room index in the slot calendar.
    pub room: usize,
}

/// Answer of a [`DayOracle`] for one day count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayPlan {
    /// Every deficit session placed.
    Placed(Vec<CellPlacement>),
    /// No placement found within the day count.
    Infeasible,
    /// The budget ran out before an answer.
    Expired,
}

impl DayPlan {
    pub fn is_placed(&self) -> bool {
        matches!(self, Self::Placed(_))
    }
}

/// Feasibility oracle for a fixed number of contingent days.
pub trait DayOracle {
    /// Places every deficit session into `days` days.
    fn place(&self, problem: &ContingentProblem<'_>, days: u32, clock: &mut BudgetClock)
        -> DayPlan;
}

/// Greedy oracle with ejection repair and seeded restarts.
///
/// Sessions are placed most-constrained section first, each into the open
/// cell minimizing (sessions of the section that day, cell load, cell
/// index). A blocked session may move one occupant to another open cell.
/// On failure the order is reshuffled up to `restarts` times.
#[derive(Debug, Clone)]
pub struct GreedyDayOracle {
    restarts: u32,
    seed: u64,
}

impl GreedyDayOracle {
    pub fn new(seed: u64) -> Self {
        Self { restarts: 8, seed }
    }

    pub fn with_restarts(mut self, restarts: u32) -> Self {
        self.restarts = restarts;
        self
    }

    fn attempt(
        &self,
        problem: &ContingentProblem<'_>,
        days: u32,
        order: &[usize],
        clock: &mut BudgetClock,
    ) -> DayPlan {
        let periods = problem.periods as usize;
        let mut grid = problem.grid(days);
        let cells = grid.cell_count();
        for &s in order {
            if !clock.tick(cells as u64) {
                return DayPlan::Expired;
            }
            if let Some((c, room)) = best_cell(&grid, s, periods, None) {
                grid.place(s, c, room);
            } else if !repair(&mut grid, s, periods) {
                return DayPlan::Infeasible;
            }
        }
        DayPlan::Placed(placements(&grid, periods))
    }
}

impl DayOracle for GreedyDayOracle {
    fn place(
        &self,
        problem: &ContingentProblem<'_>,
        days: u32,
        clock: &mut BudgetClock,
    ) -> DayPlan {
        let model = problem.model;
        let week = problem.week;
        let mut ranked: Vec<(usize, u32)> = problem.demand.clone();
        let deficit_degree = |s: usize| {
            problem
                .demand
                .iter()
                .filter(|&&(o, _)| model.conflicts(s, o, week))
                .count()
        };
        ranked.sort_by_cached_key(|&(s, n)| {
            (
                std::cmp::Reverse(n),
                std::cmp::Reverse(deficit_degree(s)),
                s,
            )
        });
        // one entry per session, sections interleaved round robin
        let mut order = Vec::with_capacity(problem.total_sessions());
        let max = ranked.first().map_or(0, |&(_, n)| n);
        for round in 0..max {
            order.extend(ranked.iter().filter(|&&(_, n)| n > round).map(|&(s, _)| s));
        }

        let mut plan = self.attempt(problem, days, &order, clock);
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed ^ u64::from(days));
        for _ in 0..self.restarts {
            if plan != DayPlan::Infeasible {
                break;
            }
            order.shuffle(&mut rng);
            plan = self.attempt(problem, days, &order, clock);
        }
        plan
    }
}

/// Sessions of `grid` in cell order.
fn placements(grid: &Occupancy<'_>, periods: usize) -> Vec<CellPlacement> {
    let mut out = Vec::new();
    for c in 0..grid.cell_count() {
        for &(s, room) in grid.occupants(c) {
            out.push(CellPlacement {
                section: s,
                day: (c / periods) as u32,
                period: (c % periods) as u8,
                room,
            });
        }
    }
    out
}

/// Places every session into the first open cell of `days` days.
///
/// Unbudgeted. Succeeds whenever `days` is at least the session count, as
/// an empty cell then always remains.
fn first_fit(problem: &ContingentProblem<'_>, days: u32) -> Option<Vec<CellPlacement>> {
    let periods = problem.periods as usize;
    let mut grid = problem.grid(days);
    let mut from: BTreeMap<usize, usize> = BTreeMap::new();
    for &(s, n) in &problem.demand {
        for _ in 0..n {
            // cells before the section's last placement stay blocked for it
            let start = from.get(&s).copied().unwrap_or(0);
            let (c, room) =
                (start..grid.cell_count()).find_map(|c| grid.open_room(s, c).map(|r| (c, r)))?;
            grid.place(s, c, room);
            from.insert(s, c + 1);
        }
    }
    Some(placements(&grid, periods))
}

/// Open cell minimizing (section sessions that day, load, index).
fn best_cell(
    grid: &Occupancy<'_>,
    s: usize,
    periods: usize,
    exclude: Option<usize>,
) -> Option<(usize, usize)> {
    let days = grid.cell_count() / periods.max(1);
    let mut same_day = vec![0usize; days];
    for &c in grid.placed(s) {
        same_day[c / periods] += 1;
    }
    let mut best: Option<((usize, usize, usize), usize)> = None;
    for c in 0..grid.cell_count() {
        if Some(c) == exclude {
            continue;
        }
        let key = (same_day[c / periods], grid.load(c), c);
        if best.as_ref().is_some_and(|(k, _)| *k <= key) {
            continue;
        }
        if let Some(room) = grid.open_room(s, c) {
            best = Some((key, room));
        }
    }
    best.map(|((_, _, c), room)| (c, room))
}

/// Moves one blocking occupant so that `s` can take its cell.
fn repair(grid: &mut Occupancy<'_>, s: usize, periods: usize) -> bool {
    for c in 0..grid.cell_count() {
        for o in grid.displaceable(s, c) {
            let Some(o_room) = grid.remove(o, c) else {
                continue;
            };
            if let Some(room) = grid.open_room(s, c) {
                grid.place(s, c, room);
                if let Some((c2, r2)) = best_cell(grid, o, periods, Some(c)) {
                    grid.place(o, c2, r2);
                    return true;
                }
                grid.remove(s, c);
            }
            grid.place(o, c, o_room);
        }
    }
    false
}

/// Shape of the deficit before recovery.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeficitDiagnostic {
    pub sessions: usize,
    pub sections: usize,
    /// Students with at least one pending session.
    pub students_affected: usize,
    /// Most pending sessions of a single student.
    pub max_pending: u64,
    /// Mean pending sessions over affected students.
    pub mean_pending: f64,
}

impl DeficitDiagnostic {
    fn compute(problem: &ContingentProblem<'_>) -> Self {
        let pending: BTreeMap<usize, u64> = problem
            .demand
            .iter()
            .map(|&(s, n)| (s, u64::from(n)))
            .collect();
        let loads: Vec<u64> = (0..problem.model.student_count())
            .map(|i| {
                let (_, secs) = problem.model.student(i);
                secs.iter().filter_map(|s| pending.get(s)).sum()
            })
            .filter(|&l| l > 0)
            .collect();
        let mean = if loads.is_empty() {
            0.0
        } else {
            loads.iter().sum::<u64>() as f64 / loads.len() as f64
        };
        Self {
            sessions: problem.total_sessions(),
            sections: problem.demand.len(),
            students_affected: loads.len(),
            max_pending: loads.iter().copied().max().unwrap_or(0),
            mean_pending: mean,
        }
    }
}

/// Result of contingent recovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContingentOutcome {
    pub days: Vec<ContingentDay>,
    pub assignments: Vec<ContingentAssignment>,
    pub lower_bound: u32,
    pub status: SolveStatus,
    pub diagnostic: DeficitDiagnostic,
    pub iterations: u64,
}

impl ContingentOutcome {
    pub fn day_count(&self) -> usize {
        self.days.len()
    }
}

/// Contingent day minimization over a pluggable [`DayOracle`].
#[derive(Debug, Clone)]
pub struct ContingentSolver<O = GreedyDayOracle> {
    config: ContingentConfig,
    oracle: O,
}

impl ContingentSolver<GreedyDayOracle> {
    /// Creates a solver with the greedy oracle.
    pub fn new(config: ContingentConfig, seed: u64) -> Self {
        Self {
            config,
            oracle: GreedyDayOracle::new(seed),
        }
    }
}

impl<O: DayOracle> ContingentSolver<O> {
    /// Replaces the feasibility oracle.
    pub fn with_oracle<P: DayOracle>(self, oracle: P) -> ContingentSolver<P> {
        ContingentSolver {
            config: self.config,
            oracle,
        }
    }

    /// Builds the recovery problem for `deficit`.
    ///
    /// # Errors
    /// - `IrreducibleConflict` for a session of an unknown section.
    /// - `NoRoomForSection` if a deficit section fits no contingent room.
    pub fn problem<'a>(
        &self,
        deficit: &[Session],
        model: &'a ConflictModel,
        calendar: &SlotCalendar,
    ) -> Result<ContingentProblem<'a>> {
        let pool: Vec<PoolRoom> = calendar
            .final_week_rooms(self.config.max_rooms)
            .iter()
            .map(|&r| (r, calendar.room(r).capacity))
            .collect();
        let largest = pool.last().map_or(0, |&(_, cap)| cap as usize);

        let mut demand: BTreeMap<usize, u32> = BTreeMap::new();
        for session in deficit {
            let s = model.index_of(&session.section_id).ok_or_else(|| {
                TimetableError::IrreducibleConflict {
                    section_id: session.section_id.clone(),
                }
            })?;
            if model.size(s) > largest {
                return Err(TimetableError::NoRoomForSection {
                    section_id: session.section_id.clone(),
                    size: model.size(s),
                });
            }
            *demand.entry(s).or_insert(0) += 1;
        }

        Ok(ContingentProblem {
            model,
            week: calendar.weeks(),
            periods: self.config.periods_per_day,
            pool,
            demand: demand.into_iter().collect(),
        })
    }

    /// Places every deficit session on the fewest contingent days.
    ///
    /// Budget expiry is not an error: the search stops and the sessions are
    /// packed first-fit into the day ceiling.
    ///
    /// # Errors
    /// - `NoRoomForSection` / `IrreducibleConflict` from [`Self::problem`].
    /// - `ContingentDaysExhausted` if `max_days` days are not enough.
    pub fn solve(
        &self,
        deficit: &[Session],
        model: &ConflictModel,
        calendar: &SlotCalendar,
    ) -> Result<ContingentOutcome> {
        let problem = self.problem(deficit, model, calendar)?;
        let diagnostic = DeficitDiagnostic::compute(&problem);
        let total = problem.total_sessions();
        let lower_bound = problem.lower_bound();

        info!(
            event = "phase_start",
            phase = "contingent",
            deficit = total,
            sections = diagnostic.sections,
            students_affected = diagnostic.students_affected,
            max_pending = diagnostic.max_pending,
            mean_pending = diagnostic.mean_pending,
            rooms = problem.room_count(),
            periods = problem.periods(),
            lower_bound,
        );

        if total == 0 {
            info!(event = "phase_end", phase = "contingent", days = 0);
            return Ok(ContingentOutcome {
                days: Vec::new(),
                assignments: Vec::new(),
                lower_bound: 0,
                status: SolveStatus::Optimal,
                diagnostic,
                iterations: 0,
            });
        }

        let ceiling = self
            .config
            .max_days
            .map_or(total as u32, |m| m.min(total as u32));
        let mut iterations = 0;
        let mut found = None;
        for days in lower_bound..=ceiling {
            let mut clock = self.config.budget().start();
            let plan = self.oracle.place(&problem, days, &mut clock);
            iterations += clock.iterations();
            debug!(
                phase = "contingent",
                days,
                feasible = plan.is_placed(),
                iterations = clock.iterations(),
                "day count checked"
            );
            match plan {
                DayPlan::Placed(placements) => {
                    found = Some((days, placements));
                    break;
                }
                DayPlan::Infeasible => {}
                DayPlan::Expired => {
                    warn!(
                        phase = "contingent",
                        days,
                        ceiling,
                        "budget expired, packing first-fit"
                    );
                    break;
                }
            }
        }
        if found.is_none() {
            found = first_fit(&problem, ceiling).map(|placements| {
                let used = placements.iter().map(|p| p.day + 1).max().unwrap_or(0);
                (used, placements)
            });
        }

        if let Some((days, placements)) = found {
            let status = SolveStatus::from_bound(u64::from(days), u64::from(lower_bound));
            let outcome = self.build_outcome(
                deficit, &problem, calendar, days, placements, lower_bound, status, diagnostic,
                iterations,
            );
            info!(
                event = "phase_end",
                phase = "contingent",
                days,
                lower_bound,
                status = ?status,
                iterations,
            );
            return Ok(outcome);
        }

        if self.config.max_days.is_some_and(|m| m < total as u32) {
            warn!(phase = "contingent", deficit = total, ceiling, "day limit reached");
            return Err(TimetableError::ContingentDaysExhausted {
                deficit: total,
                max_days: ceiling,
            });
        }
        let section_id = problem
            .demand
            .first()
            .map(|&(s, _)| model.section_id(s).to_string())
            .unwrap_or_default();
        Err(TimetableError::IrreducibleConflict { section_id })
    }

    #[allow(clippy::too_many_arguments)]
    fn build_outcome(
        &self,
        deficit: &[Session],
        problem: &ContingentProblem<'_>,
        calendar: &SlotCalendar,
        days: u32,
        mut placements: Vec<CellPlacement>,
        lower_bound: u32,
        status: SolveStatus,
        diagnostic: DeficitDiagnostic,
        iterations: u64,
    ) -> ContingentOutcome {
        let room_ids: Vec<String> = problem
            .pool
            .iter()
            .rev()
            .map(|&(r, _)| calendar.room(r).id.clone())
            .collect();
        let day_list: Vec<ContingentDay> = (1..=days)
            .map(|n| ContingentDay::new(n, problem.periods, room_ids.clone()))
            .collect();

        placements.sort_by_key(|p| (p.section, p.day, p.period));
        let mut by_section: BTreeMap<usize, Vec<CellPlacement>> = BTreeMap::new();
        for p in placements {
            by_section.entry(p.section).or_default().push(p);
        }
        let mut sessions_by_section: BTreeMap<&str, Vec<&Session>> = BTreeMap::new();
        for session in deficit {
            sessions_by_section
                .entry(session.section_id.as_str())
                .or_default()
                .push(session);
        }

        let mut assignments = Vec::with_capacity(deficit.len());
        for (s, cells) in by_section {
            let section_id = problem.model.section_id(s);
            let Some(sessions) = sessions_by_section.get_mut(section_id) else {
                continue;
            };
            sessions.sort_by_key(|x| x.ordinal);
            for (session, p) in sessions.iter().zip(cells) {
                let day = &day_list[p.day as usize];
                assignments.push(ContingentAssignment {
                    session_id: session.id.clone(),
                    section_id: section_id.to_string(),
                    course_id: problem.model.course_id_of(s).to_string(),
                    day_id: day.id.clone(),
                    day: day.number,
                    period: p.period,
                    room_id: calendar.room(p.room).id.clone(),
                });
            }
        }

        ContingentOutcome {
            days: day_list,
            assignments,
            lower_bound,
            status,
            diagnostic,
            iterations,
        }
    }
}
