//! Error types.
//!
//! Only configuration problems and structurally unrecoverable inputs are
//! errors. Budget expiry and a positive deficit are ordinary outputs
//! (see [`crate::solver::SolveStatus`] and [`crate::scheduler::CoreOutcome`]).

use thiserror::Error;

use crate::validation::ValidationError;

/// Configuration loading / validation error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Fatal error aborting a timetabling run.
#[derive(Debug, Error)]
pub enum TimetableError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("input validation failed with {} error(s)", .0.len())]
    Validation(Vec<ValidationError>),

    #[error(
        "course '{course_id}': {enrolled} students cannot be split into sections of {min}..={max}"
    )]
    SectionCapacity {
        course_id: String,
        enrolled: usize,
        max: usize,
        min: usize,
    },

    #[error("no room is available in week {week}")]
    EmptyRoomPool { week: u32 },

    #[error("section '{section_id}' ({size} students) fits no available room")]
    NoRoomForSection { section_id: String, size: usize },

    #[error("section '{section_id}' conflicts with itself and can never be placed")]
    IrreducibleConflict { section_id: String },

    #[error("{deficit} deficit sessions do not fit into {max_days} contingent day(s)")]
    ContingentDaysExhausted { deficit: usize, max_days: u32 },
}

/// Result alias for fallible timetabling operations.
pub type Result<T> = std::result::Result<T, TimetableError>;
