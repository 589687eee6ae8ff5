//! Run configuration.
//!
//! Loaded from TOML so term parameters and solver budgets can change
//! without code changes. Every table is optional; missing keys fall back to
//! the documented term (10 weeks, Mon–Sat six periods + Sunday four,
//! sections of at most 70, 20 sessions per section).
//!
//! ```
//! use term_timetable::config::TimetableConfig;
//!
//! let config = TimetableConfig::from_toml_str(r#"
//!     random_seed = 7
//!
//!     [sectioning]
//!     max_section_size = 60
//!
//!     [core]
//!     max_sessions_per_week = 3
//! "#).unwrap();
//!
//! assert_eq!(config.sectioning.max_section_size, 60);
//! assert_eq!(config.core.sessions_per_section, 20);
//! assert_eq!(config.random_seed, 7);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::solver::Budget;

/// Top-level configuration for a timetabling run.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct TimetableConfig {
    /// Seed for every randomized search move.
    pub random_seed: u64,
    pub sectioning: SectioningConfig,
    pub calendar: CalendarConfig,
    pub core: CoreConfig,
    pub contingent: ContingentConfig,
}

impl Default for TimetableConfig {
    fn default() -> Self {
        Self {
            random_seed: 42,
            sectioning: SectioningConfig::default(),
            calendar: CalendarConfig::default(),
            core: CoreConfig::default(),
            contingent: ContingentConfig::default(),
        }
    }
}

impl TimetableConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file doesn't exist or contains invalid TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_file(path)
    }

    /// Loads configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Sets the random seed.
    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    /// Sets the section size cap.
    pub fn with_max_section_size(mut self, max: usize) -> Self {
        self.sectioning.max_section_size = max;
        self
    }

    /// Replaces the calendar shape.
    pub fn with_calendar(mut self, calendar: CalendarConfig) -> Self {
        self.calendar = calendar;
        self
    }

    /// Replaces the core scheduler settings.
    pub fn with_core(mut self, core: CoreConfig) -> Self {
        self.core = core;
        self
    }

    /// Replaces the contingent recovery settings.
    pub fn with_contingent(mut self, contingent: ContingentConfig) -> Self {
        self.contingent = contingent;
        self
    }

    /// Checks internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sectioning.max_section_size < 1 {
            return Err(ConfigError::Invalid(
                "max_section_size must be at least 1".into(),
            ));
        }
        self.calendar.validate()?;
        if self.core.sessions_per_section == 0 {
            return Err(ConfigError::Invalid(
                "sessions_per_section must be positive".into(),
            ));
        }
        if self.core.max_sessions_per_week == 0 || self.core.max_slot_repeats == 0 {
            return Err(ConfigError::Invalid(
                "weekly and slot-repeat caps must be positive".into(),
            ));
        }
        if self.contingent.periods_per_day == 0 {
            return Err(ConfigError::Invalid(
                "contingent days need at least one period".into(),
            ));
        }
        if self.contingent.max_rooms == Some(0) {
            return Err(ConfigError::Invalid(
                "contingent max_rooms must be positive when set".into(),
            ));
        }
        Ok(())
    }
}

/// Student sectioning settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SectioningConfig {
    /// Hard cap on students per section.
    pub max_section_size: usize,
    /// Minimum section size, enforced only for courses split into several sections.
    pub min_split_section_size: usize,
    pub iteration_limit: u64,
    pub time_limit_ms: Option<u64>,
}

impl Default for SectioningConfig {
    fn default() -> Self {
        Self {
            max_section_size: 70,
            min_split_section_size: 25,
            iteration_limit: 20_000,
            time_limit_ms: Some(5_000),
        }
    }
}

impl SectioningConfig {
    /// Search budget for the sectioner.
    pub fn budget(&self) -> Budget {
        Budget::new(self.iteration_limit, self.time_limit_ms.map(Duration::from_millis))
    }
}

/// Shape of the regular term grid.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// Number of teaching weeks (1-based week numbers).
    pub weeks: u32,
    /// Last week of the early room regime; later weeks use the late regime.
    pub early_regime_last_week: u32,
    /// Day labels, one per teaching day of the week.
    pub day_labels: Vec<String>,
    /// Periods per day, parallel to `day_labels`.
    pub periods_per_day: Vec<u8>,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            weeks: 10,
            early_regime_last_week: 4,
            day_labels: ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"]
                .iter()
                .map(|d| d.to_string())
                .collect(),
            periods_per_day: vec![6, 6, 6, 6, 6, 6, 4],
        }
    }
}

impl CalendarConfig {
    /// A uniform grid: `days` days with `periods` periods each.
    pub fn uniform(weeks: u32, early_regime_last_week: u32, days: u8, periods: u8) -> Self {
        Self {
            weeks,
            early_regime_last_week,
            day_labels: (1..=days).map(|d| format!("D{d}")).collect(),
            periods_per_day: vec![periods; days as usize],
        }
    }

    /// Number of timeslots in one week.
    pub fn slots_per_week(&self) -> usize {
        self.periods_per_day.iter().map(|&p| p as usize).sum()
    }

    /// Number of timeslots in the whole term.
    pub fn slots_per_term(&self) -> usize {
        self.slots_per_week() * self.weeks as usize
    }

    /// Largest period count of any day.
    pub fn max_periods(&self) -> u8 {
        self.periods_per_day.iter().copied().max().unwrap_or(0)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.weeks == 0 {
            return Err(ConfigError::Invalid("weeks must be positive".into()));
        }
        if self.early_regime_last_week > self.weeks {
            return Err(ConfigError::Invalid(format!(
                "early regime ends in week {} but the term has {} weeks",
                self.early_regime_last_week, self.weeks
            )));
        }
        if self.day_labels.len() != self.periods_per_day.len() {
            return Err(ConfigError::Invalid(
                "day_labels and periods_per_day must have the same length".into(),
            ));
        }
        if self.slots_per_week() == 0 {
            return Err(ConfigError::Invalid("calendar has no periods".into()));
        }
        Ok(())
    }
}

/// Core scheduler settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Sessions every section must meet over the term.
    pub sessions_per_section: u32,
    /// Sections ending below this count are reported.
    pub session_floor: u32,
    /// Max sessions of one section within a single week.
    pub max_sessions_per_week: u32,
    /// Max times one section may use the same (day, period) across the term.
    pub max_slot_repeats: u32,
    pub iteration_limit: u64,
    pub time_limit_ms: Option<u64>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            sessions_per_section: 20,
            session_floor: 18,
            max_sessions_per_week: 2,
            max_slot_repeats: 3,
            iteration_limit: 5_000_000,
            time_limit_ms: Some(240_000),
        }
    }
}

impl CoreConfig {
    /// Search budget for the core scheduler.
    pub fn budget(&self) -> Budget {
        Budget::new(self.iteration_limit, self.time_limit_ms.map(Duration::from_millis))
    }
}

/// Contingent recovery settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContingentConfig {
    /// Periods available on one contingent day.
    pub periods_per_day: u8,
    /// Rooms usable on a contingent day (largest rooms of the final week).
    pub max_rooms: Option<usize>,
    /// Give up beyond this many days. `None` = bounded by the deficit size.
    pub max_days: Option<u32>,
    /// Iteration budget for each day-count feasibility check.
    pub iteration_limit: u64,
    pub time_limit_ms: Option<u64>,
}

impl Default for ContingentConfig {
    fn default() -> Self {
        Self {
            periods_per_day: 7,
            max_rooms: Some(10),
            max_days: None,
            iteration_limit: 200_000,
            time_limit_ms: Some(240_000),
        }
    }
}

impl ContingentConfig {
    /// Search budget for one feasibility check.
    pub fn budget(&self) -> Budget {
        Budget::new(self.iteration_limit, self.time_limit_ms.map(Duration::from_millis))
    }
}
