//! Student sectioning.
//!
//! Splits every course's roster into `k = ceil(N / max)` sections and then
//! improves the partition by local search so that students who share
//! courses end up in the same sections.
//!
//! # Algorithm
//! 1. Rank all students by id. Chunk each course's students (by rank) into
//!    balanced sections; the first `N mod k` sections get one extra seat.
//! 2. Local search with relocate and swap moves, minimizing lexicographically
//!    - the number of cross-course section pairs sharing a student,
//!    - `-Σ shared²`, which rewards concentrating common students.
//!
//!    Non-worsening moves are accepted. Sizes stay within
//!    `[min_split_section_size, max_section_size]` for split courses.
//! 3. Sections are re-labelled A, B, … by their smallest member rank.
//!
//! Every course pair with a common student forces at least one conflicting
//! section pair, so reaching that count proves the primary objective
//! optimal and stops the search.
//!
//! # Reference
//! Carter & Laporte (1998), "Recent Developments in Practical Course
//! Timetabling", student sectioning.

use std::collections::{BTreeMap, HashMap, HashSet};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::SectioningConfig;
use crate::error::{ConfigError, Result, TimetableError};
use crate::models::{section_label, Section, TermInput};
use crate::solver::SolveStatus;

/// Result of sectioning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectioningOutcome {
    /// Sections, grouped by course (largest enrollment first).
    pub sections: Vec<Section>,
    /// Cross-course section pairs sharing at least one student.
    pub conflict_pairs: usize,
    /// Course pairs sharing at least one student.
    pub lower_bound: usize,
    pub status: SolveStatus,
    pub iterations: u64,
}

/// Partitions course rosters into capacity-bounded sections.
#[derive(Debug, Clone)]
pub struct Sectioner {
    config: SectioningConfig,
    seed: u64,
}

impl Sectioner {
    pub fn new(config: SectioningConfig, seed: u64) -> Self {
        Self { config, seed }
    }

    /// Sections every course that has at least one enrolled student.
    ///
    /// # Errors
    /// - `Config` if the size cap is below 1.
    /// - `SectionCapacity` if a split course cannot give every section
    ///   `min_split_section_size` students.
    pub fn section(&self, input: &TermInput) -> Result<SectioningOutcome> {
        let max = self.config.max_section_size;
        if max < 1 {
            return Err(ConfigError::Invalid("max_section_size must be at least 1".into()).into());
        }

        let roster = input.roster();
        let rank: BTreeMap<&str, usize> = roster
            .values()
            .flatten()
            .copied()
            .collect::<std::collections::BTreeSet<&str>>()
            .into_iter()
            .enumerate()
            .map(|(i, s)| (s, i))
            .collect();
        let student_ids: Vec<&str> = rank.keys().copied().collect();

        let mut courses: Vec<(&str, Vec<usize>)> = roster
            .iter()
            .filter(|(_, students)| !students.is_empty())
            .map(|(&c, students)| (c, students.iter().map(|s| rank[s]).collect()))
            .collect();
        courses.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then_with(|| a.0.cmp(b.0)));

        info!(
            event = "phase_start",
            phase = "sectioning",
            courses = courses.len(),
            students = student_ids.len(),
            max_section_size = max,
        );

        let mut layout = Vec::with_capacity(courses.len());
        let mut offset = 0;
        for (course_id, members) in &courses {
            let n = members.len();
            let k = n.div_ceil(max);
            let min = if k > 1 {
                self.config.min_split_section_size
            } else {
                0
            };
            if k * min > n {
                return Err(TimetableError::SectionCapacity {
                    course_id: course_id.to_string(),
                    enrolled: n,
                    max,
                    min,
                });
            }
            layout.push(CourseLayout {
                first: offset,
                count: k,
                min,
            });
            offset += k;
        }

        let mut state = PartitionState::seed(&courses, &layout, student_ids.len(), offset);
        let lower_bound = course_pair_bound(&courses, student_ids.len());
        let movable: Vec<usize> = (0..courses.len()).filter(|&c| layout[c].count > 1).collect();

        let mut clock = self.config.budget().start();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        while state.pairs > lower_bound && !movable.is_empty() && clock.tick(1) {
            let c = movable[rng.random_range(0..movable.len())];
            state.try_move(c, &layout[c], max, &mut rng);
            if clock.iterations() % 5_000 == 0 {
                debug!(
                    phase = "sectioning",
                    iterations = clock.iterations(),
                    conflict_pairs = state.pairs,
                    lower_bound,
                    "local search progress"
                );
            }
        }

        let status = SolveStatus::from_bound(state.pairs as u64, lower_bound as u64);
        if clock.is_expired() && !status.is_optimal() {
            warn!(
                phase = "sectioning",
                conflict_pairs = state.pairs,
                lower_bound,
                "budget expired before reaching the bound"
            );
        }

        let mut sections = Vec::with_capacity(offset);
        for (c, (course_id, _)) in courses.iter().enumerate() {
            let l = &layout[c];
            let mut groups: Vec<Vec<usize>> = (l.first..l.first + l.count)
                .map(|s| {
                    let mut m = state.members[s].clone();
                    m.sort_unstable();
                    m
                })
                .collect();
            groups.sort_by_key(|g| g.first().copied());
            for (i, group) in groups.into_iter().enumerate() {
                let students = group.iter().map(|&st| student_ids[st].to_string()).collect();
                sections.push(Section::new(*course_id, section_label(i), students));
            }
        }

        info!(
            event = "phase_end",
            phase = "sectioning",
            sections = sections.len(),
            conflict_pairs = state.pairs,
            lower_bound,
            status = ?status,
            iterations = clock.iterations(),
        );

        Ok(SectioningOutcome {
            sections,
            conflict_pairs: state.pairs,
            lower_bound,
            status,
            iterations: clock.iterations(),
        })
    }
}

/// Section range and size floor of one course.
#[derive(Debug, Clone, Copy)]
struct CourseLayout {
    first: usize,
    count: usize,
    min: usize,
}

/// Number of course pairs sharing a student.
fn course_pair_bound(courses: &[(&str, Vec<usize>)], students: usize) -> usize {
    let mut per_student: Vec<Vec<usize>> = vec![Vec::new(); students];
    for (c, (_, members)) in courses.iter().enumerate() {
        for &st in members {
            per_student[st].push(c);
        }
    }
    let mut pairs = HashSet::new();
    for list in &per_student {
        for i in 0..list.len() {
            for j in (i + 1)..list.len() {
                pairs.insert((list[i], list[j]));
            }
        }
    }
    pairs.len()
}

/// Incrementally maintained partition and objective.
struct PartitionState {
    members: Vec<Vec<usize>>,
    /// Per student: (course, section) memberships.
    memberships: Vec<Vec<(usize, usize)>>,
    /// Common students per section pair `(low, high)`.
    shared: HashMap<(usize, usize), u32>,
    pairs: usize,
    squares: u64,
}

impl PartitionState {
    fn seed(
        courses: &[(&str, Vec<usize>)],
        layout: &[CourseLayout],
        students: usize,
        sections: usize,
    ) -> Self {
        let mut state = PartitionState {
            members: vec![Vec::new(); sections],
            memberships: vec![Vec::new(); students],
            shared: HashMap::new(),
            pairs: 0,
            squares: 0,
        };
        for (c, (_, ranked)) in courses.iter().enumerate() {
            let l = layout[c];
            let base = ranked.len() / l.count;
            let extra = ranked.len() % l.count;
            let mut it = ranked.iter();
            for i in 0..l.count {
                let size = base + usize::from(i < extra);
                for &st in it.by_ref().take(size) {
                    state.members[l.first + i].push(st);
                    state.memberships[st].push((c, l.first + i));
                }
            }
        }
        for st in 0..students {
            let secs: Vec<usize> = state.memberships[st].iter().map(|&(_, s)| s).collect();
            for i in 0..secs.len() {
                for j in (i + 1)..secs.len() {
                    state.bump(secs[i], secs[j], true);
                }
            }
        }
        state
    }

    /// Lexicographic objective, lower is better.
    fn objective(&self) -> (usize, std::cmp::Reverse<u64>) {
        (self.pairs, std::cmp::Reverse(self.squares))
    }

    fn bump(&mut self, a: usize, b: usize, up: bool) {
        let key = if a < b { (a, b) } else { (b, a) };
        let entry = self.shared.entry(key).or_insert(0);
        let old = *entry;
        if up {
            *entry += 1;
            if old == 0 {
                self.pairs += 1;
            }
            self.squares += 2 * old as u64 + 1;
        } else if old > 0 {
            *entry -= 1;
            if old == 1 {
                self.pairs -= 1;
            }
            self.squares -= 2 * old as u64 - 1;
        }
    }

    /// Moves `student` of `course` into section `to`.
    fn relocate(&mut self, student: usize, course: usize, to: usize) {
        let Some(pos) = self.memberships[student]
            .iter()
            .position(|&(c, _)| c == course)
        else {
            return;
        };
        let from = self.memberships[student][pos].1;
        if from == to {
            return;
        }
        let others: Vec<usize> = self.memberships[student]
            .iter()
            .filter(|&&(c, _)| c != course)
            .map(|&(_, s)| s)
            .collect();
        for x in others {
            self.bump(from, x, false);
            self.bump(to, x, true);
        }
        if let Some(i) = self.members[from].iter().position(|&m| m == student) {
            self.members[from].swap_remove(i);
        }
        self.members[to].push(student);
        self.memberships[student][pos].1 = to;
    }

    /// One relocate-or-swap step within a course; reverted if it worsens
    /// the objective.
    fn try_move(&mut self, course: usize, layout: &CourseLayout, max: usize, rng: &mut ChaCha8Rng) {
        let a = layout.first + rng.random_range(0..layout.count);
        let mut b = layout.first + rng.random_range(0..layout.count - 1);
        if b >= a {
            b += 1;
        }
        if self.members[a].is_empty() {
            return;
        }
        let u = self.members[a][rng.random_range(0..self.members[a].len())];
        let before = self.objective();

        let relocatable = self.members[a].len() > layout.min && self.members[b].len() < max;
        if relocatable && rng.random_bool(0.5) {
            self.relocate(u, course, b);
            if self.objective() > before {
                self.relocate(u, course, a);
            }
        } else if !self.members[b].is_empty() {
            let v = self.members[b][rng.random_range(0..self.members[b].len())];
            self.relocate(u, course, b);
            self.relocate(v, course, a);
            if self.objective() > before {
                self.relocate(u, course, a);
                self.relocate(v, course, b);
            }
        }
    }
}
