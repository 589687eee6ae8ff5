//! Core scheduler: places sessions into (timeslot, room) cells of the term.
//!
//! # Algorithm
//!
//! 1. **Fair greedy.** While some section still needs sessions, the rule
//!    engine picks the next section (default: fewest placed, then most
//!    conflicted, then lowest index). Its session goes to the open slot
//!    minimizing (sessions of the section in that week, slot load, slot
//!    index), in the smallest free room that seats it.
//! 2. **Ejection repair.** When no slot is open, a single blocking session
//!    is moved to another open slot to make room. If that fails too, the
//!    section is closed and its remaining sessions join the deficit.
//! 3. **Rebalancing.** A slot held by a section is handed to a section
//!    whose shortfall is larger by at least two, until no such transfer
//!    exists. The total stays the same; shortfall evens out.
//!
//! A slot is open for a section when no occupant shares a student or
//! faculty with it, a free valid room seats it, the section is below its
//! weekly cap and below its repeat cap for that (day, period).
//!
//! The deficit is compared to a lower bound built from per-section caps,
//! per-faculty slot supply and per-student load; meeting it proves the
//! placement count optimal.
//!
//! # Reference
//! Burke, Kingston & de Werra (2004), "Applications to Timetabling",
//! in Handbook of Graph Theory, Ch. 5.6

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::grid::Occupancy;
use crate::config::CoreConfig;
use crate::conflict::ConflictModel;
use crate::dispatching::{Candidate, RuleEngine, SchedulingContext};
use crate::models::{Assignment, Section, Session, SessionStatus};
use crate::slots::SlotCalendar;
use crate::solver::{BudgetClock, SolveStatus};

/// Result of the core scheduling phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreOutcome {
    /// Regular-term assignments, in section then slot order.
    pub assignments: Vec<Assignment>,
    /// Every session, `ScheduledRegular` or `Unscheduled`, in section order.
    pub sessions: Vec<Session>,
    /// Sessions left unscheduled.
    pub deficit: Vec<Session>,
    /// Sections × sessions per section.
    pub theoretical_sessions: usize,
    /// Proven minimum deficit.
    pub lower_bound: usize,
    pub status: SolveStatus,
    pub iterations: u64,
    /// Successful ejection repairs.
    pub repairs: usize,
    /// Slots handed over by rebalancing.
    pub transfers: usize,
}

impl CoreOutcome {
    /// Sessions placed in the regular term.
    pub fn scheduled(&self) -> usize {
        self.assignments.len()
    }

    /// Number of deficit sessions.
    pub fn deficit_count(&self) -> usize {
        self.deficit.len()
    }

    /// Deficit sessions per section id.
    pub fn deficit_by_section(&self) -> BTreeMap<&str, usize> {
        let mut map = BTreeMap::new();
        for s in &self.deficit {
            *map.entry(s.section_id.as_str()).or_insert(0) += 1;
        }
        map
    }
}

/// Regular-term session placement.
///
/// # Example
///
/// ```
/// use term_timetable::config::{CalendarConfig, CoreConfig};
/// use term_timetable::conflict::ConflictModel;
/// use term_timetable::models::{room_pool, Course, Section};
/// use term_timetable::scheduler::CoreScheduler;
/// use term_timetable::slots::SlotCalendar;
///
/// let courses = vec![Course::new("BV", "F1")];
/// let sections = vec![Section::new("BV", "A", vec!["s1".into(), "s2".into()])];
/// let model = ConflictModel::build(&sections, &courses);
/// let calendar = SlotCalendar::generate(&CalendarConfig::default(), &room_pool("R", 2, 70, 1, 10)).unwrap();
///
/// let outcome = CoreScheduler::new(CoreConfig::default()).schedule(&sections, &model, &calendar);
/// assert_eq!(outcome.scheduled(), 20);
/// assert_eq!(outcome.deficit_count(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct CoreScheduler {
    config: CoreConfig,
    rule_engine: RuleEngine,
}

impl CoreScheduler {
    /// Creates a scheduler with the fair round-robin rule engine.
    pub fn new(config: CoreConfig) -> Self {
        Self {
            config,
            rule_engine: RuleEngine::fair_round_robin(),
        }
    }

    /// Replaces the section ordering rules.
    pub fn with_rule_engine(mut self, engine: RuleEngine) -> Self {
        self.rule_engine = engine;
        self
    }

    /// Places as many sessions as possible.
    ///
    /// `model` must be built from `sections` (same order). Never fails:
    /// sessions that cannot be placed are returned as the deficit.
    pub fn schedule(
        &self,
        sections: &[Section],
        model: &ConflictModel,
        calendar: &SlotCalendar,
    ) -> CoreOutcome {
        let demand = self.config.sessions_per_section;
        let theoretical = sections.len() * demand as usize;
        info!(
            event = "phase_start",
            phase = "core",
            sections = sections.len(),
            sessions = theoretical,
            slots = calendar.slot_count(),
        );

        let mut clock = self.config.budget().start();
        let mut state = CoreState::new(model, calendar, &self.config);
        let degrees: Vec<usize> = (0..sections.len())
            .map(|s| model.degree(s, calendar.weeks()))
            .collect();

        let mut context = SchedulingContext::new();
        for s in 0..sections.len() {
            *context.course_shortfall.entry(model.course_of(s)).or_insert(0) += demand;
        }

        let mut closed = vec![false; sections.len()];
        let mut repairs = 0;
        let scan_cost = calendar.slot_count().max(1) as u64;
        loop {
            let candidates: Vec<Candidate> = (0..sections.len())
                .filter(|&s| !closed[s] && (state.count(s) as u32) < demand)
                .map(|s| {
                    Candidate::new(s, model.course_of(s))
                        .with_progress(state.count(s) as u32, demand)
                        .with_size(model.size(s))
                        .with_degree(degrees[s])
                })
                .collect();
            let Some(pick) = self.rule_engine.select_best(&candidates, &context) else {
                break;
            };
            if !clock.tick(scan_cost) {
                break;
            }
            let s = candidates[pick].section;
            if let Some((t, room)) = state.best_slot(s, None) {
                state.place(s, t, room);
            } else if state.try_repair(s, &mut clock) {
                repairs += 1;
            } else {
                closed[s] = true;
                debug!(
                    phase = "core",
                    section = model.section_id(s),
                    placed = state.count(s),
                    "no open slot, section closed"
                );
                continue;
            }
            context.record_placement(model.course_of(s));
        }

        let transfers = state.rebalance(demand, &mut context, &mut clock);

        let mut assignments = Vec::with_capacity(theoretical);
        let mut all_sessions = Vec::with_capacity(theoretical);
        let mut deficit = Vec::new();
        for (s, section) in sections.iter().enumerate() {
            let mut cells = state.grid.placed(s).to_vec();
            cells.sort_unstable();
            let mut sessions = section.sessions(demand);
            for (session, &t) in sessions.iter_mut().zip(&cells) {
                session.status = SessionStatus::ScheduledRegular;
                let room = state.room_of(s, t);
                assignments.push(Assignment::new(
                    &session.id,
                    &section.id,
                    &section.course_id,
                    calendar.slot(t),
                    room.map_or("", |r| calendar.room(r).id.as_str()),
                ));
            }
            deficit.extend(sessions.iter().skip(cells.len()).cloned());
            all_sessions.extend(sessions);
        }

        let lower_bound = deficit_lower_bound(model, calendar, &self.config);
        let status = SolveStatus::from_bound(deficit.len() as u64, lower_bound as u64);
        if clock.is_expired() {
            warn!(
                phase = "core",
                iterations = clock.iterations(),
                deficit = deficit.len(),
                lower_bound,
                "budget expired, optimality not proven"
            );
        }
        info!(
            event = "phase_end",
            phase = "core",
            scheduled = assignments.len(),
            deficit = deficit.len(),
            lower_bound,
            status = ?status,
            repairs,
            transfers,
            iterations = clock.iterations(),
        );

        CoreOutcome {
            assignments,
            sessions: all_sessions,
            deficit,
            theoretical_sessions: theoretical,
            lower_bound,
            status,
            iterations: clock.iterations(),
            repairs,
            transfers,
        }
    }
}

/// Occupancy plus the per-section weekly and (day, period) counters.
struct CoreState<'a> {
    grid: Occupancy<'a>,
    calendar: &'a SlotCalendar,
    config: &'a CoreConfig,
    /// Pattern index of every slot.
    slot_pattern: Vec<usize>,
    /// `[section][week - 1]`
    week_count: Vec<Vec<u32>>,
    /// `[section][pattern]`
    pattern_count: Vec<Vec<u32>>,
}

impl<'a> CoreState<'a> {
    fn new(model: &'a ConflictModel, calendar: &'a SlotCalendar, config: &'a CoreConfig) -> Self {
        let (cell_week, cell_pool, pools, slot_pattern, patterns) = term_cells(calendar);
        let sections = model.section_count();
        Self {
            grid: Occupancy::new(model, cell_week, cell_pool, pools),
            calendar,
            config,
            slot_pattern,
            week_count: vec![vec![0; calendar.weeks() as usize]; sections],
            pattern_count: vec![vec![0; patterns]; sections],
        }
    }

    fn count(&self, s: usize) -> usize {
        self.grid.placed(s).len()
    }

    fn week_index(&self, t: usize) -> usize {
        self.calendar.slot(t).week as usize - 1
    }

    fn caps_ok(&self, s: usize, t: usize) -> bool {
        self.week_count[s][self.week_index(t)] < self.config.max_sessions_per_week
            && self.pattern_count[s][self.slot_pattern[t]] < self.config.max_slot_repeats
    }

    fn open_room(&self, s: usize, t: usize) -> Option<usize> {
        if !self.caps_ok(s, t) {
            return None;
        }
        self.grid.open_room(s, t)
    }

    /// Open slot minimizing (week count, load, index), skipping `exclude`.
    fn best_slot(&self, s: usize, exclude: Option<usize>) -> Option<(usize, usize)> {
        let mut best: Option<((u32, usize, usize), usize)> = None;
        for t in 0..self.grid.cell_count() {
            if Some(t) == exclude {
                continue;
            }
            let key = (self.week_count[s][self.week_index(t)], self.grid.load(t), t);
            if best.as_ref().is_some_and(|(k, _)| *k <= key) {
                continue;
            }
            if let Some(room) = self.open_room(s, t) {
                best = Some((key, room));
            }
        }
        best.map(|((_, _, t), room)| (t, room))
    }

    fn place(&mut self, s: usize, t: usize, room: usize) {
        let w = self.week_index(t);
        self.grid.place(s, t, room);
        self.week_count[s][w] += 1;
        self.pattern_count[s][self.slot_pattern[t]] += 1;
    }

    fn remove(&mut self, s: usize, t: usize) -> Option<usize> {
        let room = self.grid.remove(s, t)?;
        let w = self.week_index(t);
        self.week_count[s][w] -= 1;
        self.pattern_count[s][self.slot_pattern[t]] -= 1;
        Some(room)
    }

    fn room_of(&self, s: usize, t: usize) -> Option<usize> {
        self.grid
            .occupants(t)
            .iter()
            .find(|&&(o, _)| o == s)
            .map(|&(_, r)| r)
    }

    /// Moves one blocking session elsewhere so that `s` gains a slot.
    fn try_repair(&mut self, s: usize, clock: &mut BudgetClock) -> bool {
        for t in 0..self.grid.cell_count() {
            if !self.caps_ok(s, t) || !self.grid.fits(s, t) {
                continue;
            }
            for o in self.grid.displaceable(s, t) {
                if !clock.tick(self.grid.cell_count() as u64) {
                    return false;
                }
                let Some(o_room) = self.remove(o, t) else {
                    continue;
                };
                if let Some(room) = self.open_room(s, t) {
                    self.place(s, t, room);
                    if let Some((t2, r2)) = self.best_slot(o, Some(t)) {
                        self.place(o, t2, r2);
                        return true;
                    }
                    self.remove(s, t);
                }
                self.place(o, t, o_room);
            }
        }
        false
    }

    /// Hands a slot from section `a` to section `b` when `b` is at least two
    /// sessions further behind: by course shortfall across courses, by
    /// section shortfall within one course. Returns the number of transfers.
    fn rebalance(
        &mut self,
        demand: u32,
        context: &mut SchedulingContext,
        clock: &mut BudgetClock,
    ) -> usize {
        let model = self.grid.model();
        let shortfall = |state: &Self, s: usize| demand.saturating_sub(state.count(s) as u32);
        let course_shortfall = |context: &SchedulingContext, s: usize| {
            context
                .course_shortfall
                .get(&model.course_of(s))
                .copied()
                .unwrap_or(0)
        };
        let mut transfers = 0;
        'outer: loop {
            let mut receivers: Vec<usize> = (0..model.section_count())
                .filter(|&b| shortfall(self, b) >= 1)
                .collect();
            receivers.sort_by_key(|&b| {
                (
                    std::cmp::Reverse(course_shortfall(&*context, b)),
                    std::cmp::Reverse(shortfall(self, b)),
                    b,
                )
            });
            for b in receivers {
                if !clock.tick(self.grid.cell_count() as u64) {
                    break 'outer;
                }
                let behind = |state: &Self, context: &SchedulingContext, a: usize| {
                    if model.course_of(a) == model.course_of(b) {
                        shortfall(state, a) + 2 <= shortfall(state, b)
                    } else {
                        course_shortfall(context, a) + 2 <= course_shortfall(context, b)
                    }
                };
                for t in 0..self.grid.cell_count() {
                    if !self.caps_ok(b, t) || !self.grid.fits(b, t) {
                        continue;
                    }
                    for a in self.grid.displaceable(b, t) {
                        if !behind(self, &*context, a) {
                            continue;
                        }
                        let Some(a_room) = self.remove(a, t) else {
                            continue;
                        };
                        if let Some(room) = self.open_room(b, t) {
                            self.place(b, t, room);
                            context.record_removal(model.course_of(a));
                            context.record_placement(model.course_of(b));
                            transfers += 1;
                            continue 'outer;
                        }
                        self.place(a, t, a_room);
                    }
                }
            }
            break;
        }
        if transfers > 0 {
            debug!(phase = "core", transfers, "shortfall rebalanced");
        }
        transfers
    }
}

type TermCells = (Vec<u32>, Vec<usize>, Vec<Vec<(usize, u32)>>, Vec<usize>, usize);

/// Cell weeks, per-week pools and (day, period) pattern indices of the term.
fn term_cells(calendar: &SlotCalendar) -> TermCells {
    let pools: Vec<Vec<(usize, u32)>> = (1..=calendar.weeks())
        .map(|w| {
            calendar
                .week_pool(w)
                .iter()
                .map(|&r| (r, calendar.room(r).capacity))
                .collect()
        })
        .collect();
    let mut patterns: BTreeMap<(u8, u8), usize> = BTreeMap::new();
    for slot in calendar.slots() {
        let next = patterns.len();
        patterns.entry(slot.pattern()).or_insert(next);
    }
    let slots = calendar.slots();
    (
        slots.iter().map(|s| s.week).collect(),
        slots.iter().map(|s| s.week as usize - 1).collect(),
        pools,
        slots.iter().map(|s| patterns[&s.pattern()]).collect(),
        patterns.len(),
    )
}

/// Sessions a section can get at most on its own: limited by slots with a
/// fitting room, the weekly cap and the (day, period) repeat cap.
fn section_capacity(model: &ConflictModel, calendar: &SlotCalendar, config: &CoreConfig, s: usize) -> u32 {
    let size = model.size(s);
    let mut per_week: BTreeMap<u32, u32> = BTreeMap::new();
    let mut per_pattern: BTreeMap<(u8, u8), u32> = BTreeMap::new();
    let mut fitting = 0u32;
    for (t, slot) in calendar.slots().iter().enumerate() {
        if calendar.fitting_rooms(t, size).is_empty() {
            continue;
        }
        fitting += 1;
        *per_week.entry(slot.week).or_insert(0) += 1;
        *per_pattern.entry(slot.pattern()).or_insert(0) += 1;
    }
    let by_week: u32 = per_week
        .values()
        .map(|&n| n.min(config.max_sessions_per_week))
        .sum();
    let by_pattern: u32 = per_pattern
        .values()
        .map(|&n| n.min(config.max_slot_repeats))
        .sum();
    fitting.min(by_week).min(by_pattern)
}

/// Minimum number of sessions no placement can avoid leaving out.
///
/// Faculty groups (sections of courses without handover) are disjoint, so
/// their bounds add up; within a group the sessions need distinct slots.
/// A student's sessions need distinct slots too. The larger of the summed
/// faculty/section bound and the worst student bound is returned.
pub(crate) fn deficit_lower_bound(
    model: &ConflictModel,
    calendar: &SlotCalendar,
    config: &CoreConfig,
) -> usize {
    let demand = config.sessions_per_section;
    let slots = calendar.slot_count() as u64;
    let caps: Vec<u32> = (0..model.section_count())
        .map(|s| section_capacity(model, calendar, config, s))
        .collect();
    let own = |s: usize| u64::from(demand.saturating_sub(caps[s]));

    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    let mut total = 0u64;
    for s in 0..model.section_count() {
        if model.has_handover(s) {
            total += own(s);
        } else {
            groups.entry(model.faculty_of(s, 1)).or_default().push(s);
        }
    }
    for members in groups.values() {
        let by_sections: u64 = members.iter().map(|&s| own(s)).sum();
        let by_slots = (members.len() as u64 * u64::from(demand)).saturating_sub(slots);
        total += by_sections.max(by_slots);
    }

    let worst_student = (0..model.student_count())
        .map(|i| {
            let (_, secs) = model.student(i);
            (secs.len() as u64 * u64::from(demand)).saturating_sub(slots)
        })
        .max()
        .unwrap_or(0);

    total.max(worst_student) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CalendarConfig;
    use crate::models::{room_pool, Course};

    fn core_config(sessions: u32, per_week: u32, repeats: u32) -> CoreConfig {
        CoreConfig {
            sessions_per_section: sessions,
            session_floor: sessions,
            max_sessions_per_week: per_week,
            max_slot_repeats: repeats,
            iteration_limit: 10_000_000,
            time_limit_ms: None,
        }
    }

    fn students(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{prefix}{i}")).collect()
    }

    #[test]
    fn test_single_section_spreads_over_weeks() {
        let courses = vec![Course::new("BV", "F1")];
        let sections = vec![Section::new("BV", "A", students("s", 70))];
        let model = ConflictModel::build(&sections, &courses);
        let mut rooms = room_pool("E", 10, 70, 1, 4);
        rooms.extend(room_pool("L", 4, 70, 5, 10));
        let calendar = SlotCalendar::generate(&CalendarConfig::default(), &rooms).unwrap();

        let outcome = CoreScheduler::new(CoreConfig::default()).schedule(&sections, &model, &calendar);
        assert_eq!(outcome.scheduled(), 20);
        assert_eq!(outcome.deficit_count(), 0);
        assert_eq!(outcome.lower_bound, 0);
        assert!(outcome.status.is_optimal());
        let mut per_week = BTreeMap::new();
        for a in &outcome.assignments {
            *per_week.entry(a.slot.week).or_insert(0) += 1;
        }
        assert!(per_week.values().all(|&n| n == 2));
        assert_eq!(outcome.assignments[0].session_id, "BV_A#01");
    }

    #[test]
    fn test_shared_faculty_never_coincides() {
        // one faculty, three sections, 6 slots, 4 sessions each
        let courses = vec![
            Course::new("X", "F"),
            Course::new("Y", "F"),
            Course::new("Z", "F"),
        ];
        let sections = vec![
            Section::new("X", "A", students("x", 5)),
            Section::new("Y", "A", students("y", 5)),
            Section::new("Z", "A", students("z", 5)),
        ];
        let model = ConflictModel::build(&sections, &courses);
        let calendar = SlotCalendar::generate(
            &CalendarConfig::uniform(3, 1, 1, 2),
            &room_pool("R", 3, 10, 1, 3),
        )
        .unwrap();
        let outcome = CoreScheduler::new(core_config(4, 2, 3)).schedule(&sections, &model, &calendar);

        assert_eq!(outcome.scheduled(), 6);
        assert_eq!(outcome.deficit_count(), 6);
        assert_eq!(outcome.lower_bound, 6);
        assert!(outcome.status.is_optimal());
        let slots: std::collections::BTreeSet<_> =
            outcome.assignments.iter().map(|a| a.slot).collect();
        assert_eq!(slots.len(), outcome.scheduled());
        // shortfall is spread: 2 each
        assert!(outcome.deficit_by_section().values().all(|&n| n == 2));
    }

    #[test]
    fn test_room_capacity_filters_slots() {
        let courses = vec![Course::new("BIG", "F1")];
        let sections = vec![Section::new("BIG", "A", students("s", 60))];
        let model = ConflictModel::build(&sections, &courses);
        // large room only in week 1
        let mut rooms = vec![crate::models::Room::new("HALL", 80, 1, 1)];
        rooms.extend(room_pool("S", 2, 30, 1, 2));
        let calendar =
            SlotCalendar::generate(&CalendarConfig::uniform(2, 1, 1, 4), &rooms).unwrap();
        let outcome = CoreScheduler::new(core_config(6, 4, 4)).schedule(&sections, &model, &calendar);
        assert_eq!(outcome.scheduled(), 4);
        assert!(outcome.assignments.iter().all(|a| a.room_id == "HALL" && a.slot.week == 1));
        assert_eq!(outcome.lower_bound, 2);
        assert!(outcome.status.is_optimal());
    }

    #[test]
    fn test_repair_moves_blocking_session() {
        let courses = vec![Course::new("A", "F1"), Course::new("B", "F2")];
        let sections = vec![
            Section::new("A", "A", students("a", 3)),
            Section::new("B", "A", students("b", 3)),
        ];
        let model = ConflictModel::build(&sections, &courses);
        let calendar = SlotCalendar::generate(
            &CalendarConfig::uniform(1, 1, 1, 2),
            &room_pool("R", 1, 10, 1, 1),
        )
        .unwrap();
        let config = core_config(1, 2, 2);
        let mut clock = config.budget().start();
        let mut state = CoreState::new(&model, &calendar, &config);
        // A holds the only room of slot 0; repair moves it to slot 1
        state.place(0, 0, 0);
        assert!(state.open_room(1, 0).is_none());
        assert!(state.try_repair(1, &mut clock));
        assert!(state.grid.hosts(1, 0));
        assert!(state.grid.hosts(0, 1));
        assert_eq!(state.count(0), 1);
    }

    #[test]
    fn test_rebalance_evens_shortfall() {
        let courses = vec![Course::new("A", "F"), Course::new("B", "F")];
        let sections = vec![
            Section::new("A", "A", students("a", 3)),
            Section::new("B", "A", students("b", 3)),
        ];
        let model = ConflictModel::build(&sections, &courses);
        let calendar = SlotCalendar::generate(
            &CalendarConfig::uniform(1, 1, 1, 6),
            &room_pool("R", 1, 10, 1, 1),
        )
        .unwrap();
        let config = core_config(5, 6, 6);
        let mut clock = config.budget().start();
        let mut state = CoreState::new(&model, &calendar, &config);
        for t in 0..5 {
            state.place(0, t, 0);
        }
        state.place(1, 5, 0);
        let mut context = SchedulingContext::new()
            .with_course_shortfall(model.course_of(0), 0)
            .with_course_shortfall(model.course_of(1), 4);
        let transfers = state.rebalance(5, &mut context, &mut clock);
        assert_eq!(transfers, 2);
        assert_eq!(state.count(0), 3);
        assert_eq!(state.count(1), 3);
        assert_eq!(context.course_shortfall[&model.course_of(0)], 2);
        assert_eq!(context.course_shortfall[&model.course_of(1)], 2);
    }

    fn two_course_fixture() -> (Vec<Section>, ConflictModel, SlotCalendar) {
        // X has two sections, Y one; all taught by F over 6 slots
        let courses = vec![Course::new("X", "F"), Course::new("Y", "F")];
        let sections = vec![
            Section::new("X", "A", students("xa", 3)),
            Section::new("X", "B", students("xb", 3)),
            Section::new("Y", "A", students("y", 3)),
        ];
        let model = ConflictModel::build(&sections, &courses);
        let calendar = SlotCalendar::generate(
            &CalendarConfig::uniform(1, 1, 1, 6),
            &room_pool("R", 3, 10, 1, 1),
        )
        .unwrap();
        (sections, model, calendar)
    }

    #[test]
    fn test_rebalance_evens_course_shortfall() {
        let (_, model, calendar) = two_course_fixture();
        let config = core_config(4, 6, 6);
        let mut clock = config.budget().start();
        let mut state = CoreState::new(&model, &calendar, &config);
        // two sessions per section: course X is 4 short, Y only 2
        for (s, t) in [(0, 0), (0, 1), (1, 2), (1, 3), (2, 4), (2, 5)] {
            state.place(s, t, 0);
        }
        let mut context = SchedulingContext::new()
            .with_course_shortfall(model.course_of(0), 4)
            .with_course_shortfall(model.course_of(2), 2);
        let transfers = state.rebalance(4, &mut context, &mut clock);
        assert_eq!(transfers, 1);
        assert_eq!(state.count(0) + state.count(1), 5);
        assert_eq!(state.count(2), 1);
        assert_eq!(context.course_shortfall[&model.course_of(0)], 3);
        assert_eq!(context.course_shortfall[&model.course_of(2)], 3);
    }

    #[test]
    fn test_shortfall_spread_per_course() {
        let (sections, model, calendar) = two_course_fixture();
        let outcome = CoreScheduler::new(core_config(4, 6, 6)).schedule(&sections, &model, &calendar);
        assert_eq!(outcome.scheduled(), 6);
        assert_eq!(outcome.deficit_count(), 6);
        assert!(outcome.status.is_optimal());

        let mut by_course: BTreeMap<&str, usize> = BTreeMap::new();
        for session in &outcome.deficit {
            let course = if session.section_id.starts_with('X') { "X" } else { "Y" };
            *by_course.entry(course).or_insert(0) += 1;
        }
        assert_eq!(by_course["X"], 3);
        assert_eq!(by_course["Y"], 3);
    }

    #[test]
    fn test_sessions_carry_final_status() {
        let (sections, model, calendar) = two_course_fixture();
        let outcome = CoreScheduler::new(core_config(4, 6, 6)).schedule(&sections, &model, &calendar);
        assert_eq!(outcome.sessions.len(), outcome.theoretical_sessions);
        let regular = outcome
            .sessions
            .iter()
            .filter(|s| s.status == SessionStatus::ScheduledRegular)
            .count();
        assert_eq!(regular, outcome.scheduled());
        assert!(outcome.deficit.iter().all(|s| s.status == SessionStatus::Unscheduled));
        for a in &outcome.assignments {
            let session = outcome.sessions.iter().find(|s| s.id == a.session_id).unwrap();
            assert_eq!(session.status, SessionStatus::ScheduledRegular);
        }
    }

    #[test]
    fn test_deterministic() {
        let courses = vec![
            Course::new("A", "F1"),
            Course::new("B", "F1"),
            Course::new("C", "F2"),
        ];
        let sections = vec![
            Section::new("A", "A", students("s", 4)),
            Section::new("B", "A", students("s", 2)),
            Section::new("C", "A", students("t", 4)),
        ];
        let model = ConflictModel::build(&sections, &courses);
        let calendar = SlotCalendar::generate(
            &CalendarConfig::uniform(2, 1, 2, 3),
            &room_pool("R", 2, 10, 1, 2),
        )
        .unwrap();
        let scheduler = CoreScheduler::new(core_config(5, 3, 2));
        let a = scheduler.schedule(&sections, &model, &calendar);
        let b = scheduler.schedule(&sections, &model, &calendar);
        assert_eq!(a.assignments, b.assignments);
        assert_eq!(a.deficit, b.deficit);
    }
}
