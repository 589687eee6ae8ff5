//! Academic term timetabling.
//!
//! Turns student enrollments, course faculty and a room inventory into a
//! term timetable: students are split into capacity-bounded sections, every
//! section's sessions are placed on a (week, day, period, room) grid, and
//! whatever the term cannot hold is recovered on the fewest extra days.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Course`, `Section`, `Session`, `Room`,
//!   `TimeSlot`, `Schedule`, `Assignment`, `ContingentDay`
//! - **`validation`**: Input integrity checks, load diagnosis, schedule audit
//! - **`sectioning`**: Capacity-bounded student sectioning
//! - **`conflict`**: Student and faculty "must not coincide" indices
//! - **`slots`**: Term timeslot grid and weekly room pools
//! - **`dispatching`**: Section ordering rules for the core scheduler
//! - **`scheduler`**: Core scheduling, contingent recovery, KPIs
//! - **`pipeline`**: End-to-end run and result tables
//! - **`config`** / **`error`** / **`solver`**: Configuration, error types,
//!   search budgets
//!
//! # Architecture
//!
//! Phases run one after another; each consumes the finished, read-only
//! output of its predecessor. Budget expiry and a positive deficit are
//! ordinary outputs, only configuration problems abort a run.
//!
//! # References
//!
//! - Burke & Petrovic (2002), "Recent research directions in automated timetabling"
//! - Carter & Laporte (1998), "Recent developments in practical course timetabling"
//! - Schaerf (1999), "A Survey of Automated Timetabling"

pub mod config;
pub mod conflict;
pub mod dispatching;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod scheduler;
pub mod sectioning;
pub mod slots;
pub mod solver;
pub mod validation;

pub use config::TimetableConfig;
pub use error::{ConfigError, Result, TimetableError};
pub use pipeline::{run, RunReport, RunSummary, TimetablePipeline};
