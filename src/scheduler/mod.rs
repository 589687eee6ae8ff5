//! Solving phases and KPI evaluation.
//!
//! # Algorithm
//!
//! `CoreScheduler` fills the regular term: a round robin over sections that
//! is max–min fair on course shortfall. Each step places one session into
//! the least-used conflict-free timeslot of the section's least-used week,
//! with one-level ejection repair
//! and a final rebalancing pass. Whatever cannot be placed is the deficit.
//!
//! `ContingentSolver` places the deficit on extra days, searching the day
//! count upward from a proven lower bound with a pluggable feasibility
//! oracle, and falls back to first-fit packing when the budget runs out.
//!
//! # KPI
//!
//! `ScheduleKpi` summarizes completion, per-course shortfall, faculty load
//! and room utilization per regime.
//!
//! # References
//!
//! - Burke & Petrovic (2002), "Recent research directions in automated timetabling"
//! - Carter & Laporte (1998), "Recent developments in practical course timetabling"

mod contingent;
mod core;
mod grid;
mod kpi;

pub use contingent::{
    CellPlacement, ContingentOutcome, ContingentProblem, ContingentSolver, DayOracle, DayPlan,
    DeficitDiagnostic, GreedyDayOracle,
};
pub use core::{CoreOutcome, CoreScheduler};
pub use kpi::{FacultyLoad, ScheduleKpi};
