//! End-to-end timetabling run.
//!
//! # Phases
//!
//! 1. Configuration and input validation (fatal on error).
//! 2. Slot calendar generation (fatal on an empty weekly room pool).
//! 3. Sectioning and conflict model construction.
//! 4. Core scheduling; its deficit feeds
//! 5. contingent recovery.
//! 6. Audit and KPI evaluation.
//!
//! Run state (sections, accumulated schedule, deficit, opened days) lives in
//! an explicit [`RunContext`] passed from phase to phase.
//!
//! ```
//! use term_timetable::config::TimetableConfig;
//! use term_timetable::models::{room_pool, Course, TermInput};
//! use term_timetable::pipeline::TimetablePipeline;
//!
//! let mut input = TermInput::new()
//!     .with_course(Course::new("BV", "F1"))
//!     .with_enrollments("BV", (0..40).map(|i| format!("s{i:02}")));
//! input.rooms = room_pool("R", 3, 50, 1, 10);
//!
//! let report = TimetablePipeline::new(TimetableConfig::default()).run(&input).unwrap();
//! assert_eq!(report.summary.scheduled, 20);
//! assert_eq!(report.summary.deficit, 0);
//! assert_eq!(report.summary.contingent_days, 0);
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::TimetableConfig;
use crate::conflict::ConflictModel;
use crate::dispatching::RuleEngine;
use crate::error::{Result, TimetableError};
use crate::models::{Schedule, Section, Session, SessionStatus, TermInput, Violation};
use crate::scheduler::{ContingentSolver, CoreScheduler, DeficitDiagnostic, ScheduleKpi};
use crate::sectioning::Sectioner;
use crate::slots::SlotCalendar;
use crate::solver::SolveStatus;
use crate::validation::{audit_schedule, diagnose_load, validate_input};

/// Mutable state threaded through the phases of one run.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    pub sections: Vec<Section>,
    /// Every session with its current status.
    pub sessions: Vec<Session>,
    pub schedule: Schedule,
    /// Sessions the regular term could not hold.
    pub deficit: Vec<Session>,
    /// Contingent days opened so far.
    pub contingent_days: usize,
    pub summary: RunSummary,
}

/// Summary counters of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub students: usize,
    pub courses: usize,
    pub sections: usize,
    /// Sections × sessions per section.
    pub theoretical_sessions: usize,
    /// Sessions placed in the regular term.
    pub scheduled: usize,
    pub deficit: usize,
    pub deficit_lower_bound: usize,
    /// Students whose load exceeds the term's timeslots.
    pub overloaded_students: usize,
    pub section_conflict_pairs: usize,
    pub contingent_sessions: usize,
    pub contingent_days: usize,
    pub contingent_lower_bound: u32,
    pub sectioning_status: Option<SolveStatus>,
    pub core_status: Option<SolveStatus>,
    pub contingent_status: Option<SolveStatus>,
    pub violations: usize,
}

/// Row of the section membership table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRow {
    pub section_id: String,
    pub course_id: String,
    pub student_ids: Vec<String>,
}

/// Row of the regular-term schedule table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegularRow {
    pub session_id: String,
    pub section_id: String,
    pub course_id: String,
    pub week: u32,
    pub day: String,
    /// 1-based.
    pub period: u8,
    pub room_id: String,
}

/// Row of the contingent schedule table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContingentRow {
    pub session_id: String,
    pub section_id: String,
    pub course_id: String,
    pub day_id: String,
    /// 1-based.
    pub period: u8,
    pub room_id: String,
}

/// Everything a run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub sections: Vec<Section>,
    /// Every session with its terminal status.
    pub sessions: Vec<Session>,
    pub schedule: Schedule,
    /// Sessions the regular term could not hold, with their final status.
    pub deficit: Vec<Session>,
    pub diagnostic: DeficitDiagnostic,
    pub kpi: ScheduleKpi,
    pub summary: RunSummary,
    day_labels: Vec<String>,
}

impl RunReport {
    /// Section membership: (section, course, students).
    pub fn section_table(&self) -> Vec<SectionRow> {
        self.sections
            .iter()
            .map(|s| SectionRow {
                section_id: s.id.clone(),
                course_id: s.course_id.clone(),
                student_ids: s.students.clone(),
            })
            .collect()
    }

    /// Regular-term schedule: (session, week, day, period, room).
    pub fn regular_table(&self) -> Vec<RegularRow> {
        self.schedule
            .assignments
            .iter()
            .map(|a| RegularRow {
                session_id: a.session_id.clone(),
                section_id: a.section_id.clone(),
                course_id: a.course_id.clone(),
                week: a.slot.week,
                day: self
                    .day_labels
                    .get(a.slot.day as usize)
                    .cloned()
                    .unwrap_or_else(|| format!("D{}", a.slot.day + 1)),
                period: a.slot.period + 1,
                room_id: a.room_id.clone(),
            })
            .collect()
    }

    /// Contingent schedule: (session, day, period, room).
    pub fn contingent_table(&self) -> Vec<ContingentRow> {
        self.schedule
            .contingent
            .iter()
            .map(|a| ContingentRow {
                session_id: a.session_id.clone(),
                section_id: a.section_id.clone(),
                course_id: a.course_id.clone(),
                day_id: a.day_id.clone(),
                period: a.period + 1,
                room_id: a.room_id.clone(),
            })
            .collect()
    }

    /// Sessions ending in `status`.
    pub fn sessions_with_status(&self, status: SessionStatus) -> impl Iterator<Item = &Session> {
        self.sessions.iter().filter(move |s| s.status == status)
    }

    /// Invariant violations found by the final audit.
    pub fn violations(&self) -> &[Violation] {
        &self.schedule.violations
    }
}

/// Runs all phases with one configuration.
#[derive(Debug, Clone)]
pub struct TimetablePipeline {
    config: TimetableConfig,
    rule_engine: Option<RuleEngine>,
}

impl TimetablePipeline {
    pub fn new(config: TimetableConfig) -> Self {
        Self {
            config,
            rule_engine: None,
        }
    }

    /// Replaces the core scheduler's section ordering.
    pub fn with_rule_engine(mut self, engine: RuleEngine) -> Self {
        self.rule_engine = Some(engine);
        self
    }

    pub fn config(&self) -> &TimetableConfig {
        &self.config
    }

    /// Runs every phase on `input`.
    ///
    /// # Errors
    /// Configuration and validation problems, an empty weekly room pool, an
    /// unsplittable course, and unrecoverable contingent placement. A
    /// positive deficit or an unproven optimum is not an error.
    pub fn run(&self, input: &TermInput) -> Result<RunReport> {
        let config = &self.config;
        config.validate()?;
        validate_input(input, config).map_err(TimetableError::Validation)?;
        let calendar = SlotCalendar::generate(&config.calendar, &input.rooms)?;

        let mut ctx = RunContext::default();
        ctx.summary.courses = input.courses.len();
        self.check_load(input, &mut ctx);

        let model = self.section(input, &mut ctx)?;
        self.schedule_core(&model, &calendar, &mut ctx);
        let diagnostic = self.recover(&model, &calendar, &mut ctx)?;

        ctx.schedule.violations = audit_schedule(&ctx.schedule, &ctx.sections, input, config);
        ctx.summary.violations = ctx.schedule.violations.len();
        if !ctx.schedule.violations.is_empty() {
            warn!(violations = ctx.summary.violations, "schedule audit found violations");
        }
        let kpi = ScheduleKpi::calculate(
            &ctx.schedule,
            &ctx.sections,
            &input.courses,
            &calendar,
            &config.core,
        );

        info!(
            event = "run_end",
            theoretical = ctx.summary.theoretical_sessions,
            scheduled = ctx.summary.scheduled,
            deficit = ctx.summary.deficit,
            contingent_days = ctx.summary.contingent_days,
        );

        let unscheduled = ctx
            .sessions
            .iter()
            .filter(|s| s.status == SessionStatus::Unscheduled)
            .count();
        if unscheduled > 0 {
            warn!(sessions = unscheduled, "sessions left without a terminal status");
        }

        Ok(RunReport {
            sections: ctx.sections,
            sessions: ctx.sessions,
            schedule: ctx.schedule,
            deficit: ctx.deficit,
            diagnostic,
            kpi,
            summary: ctx.summary,
            day_labels: config.calendar.day_labels.clone(),
        })
    }

    fn check_load(&self, input: &TermInput, ctx: &mut RunContext) {
        let overloaded = diagnose_load(input, &self.config);
        ctx.summary.overloaded_students = overloaded.len();
        if let Some(worst) = overloaded.first() {
            warn!(
                students = overloaded.len(),
                worst = %worst.student_id,
                required = worst.required_sessions,
                available = worst.available_slots,
                "students need more sessions than the term has timeslots"
            );
        }
    }

    fn section(&self, input: &TermInput, ctx: &mut RunContext) -> Result<ConflictModel> {
        let outcome =
            Sectioner::new(self.config.sectioning.clone(), self.config.random_seed).section(input)?;
        let model = ConflictModel::build(&outcome.sections, &input.courses);
        ctx.summary.students = model.student_count();
        ctx.summary.sections = outcome.sections.len();
        ctx.summary.section_conflict_pairs = outcome.conflict_pairs;
        ctx.summary.sectioning_status = Some(outcome.status);
        ctx.sections = outcome.sections;
        Ok(model)
    }

    fn schedule_core(&self, model: &ConflictModel, calendar: &SlotCalendar, ctx: &mut RunContext) {
        let mut scheduler = CoreScheduler::new(self.config.core.clone());
        if let Some(engine) = &self.rule_engine {
            scheduler = scheduler.with_rule_engine(engine.clone());
        }
        let outcome = scheduler.schedule(&ctx.sections, model, calendar);
        ctx.summary.theoretical_sessions = outcome.theoretical_sessions;
        ctx.summary.scheduled = outcome.scheduled();
        ctx.summary.deficit = outcome.deficit_count();
        ctx.summary.deficit_lower_bound = outcome.lower_bound;
        ctx.summary.core_status = Some(outcome.status);
        for a in outcome.assignments {
            ctx.schedule.add_assignment(a);
        }
        ctx.sessions = outcome.sessions;
        ctx.deficit = outcome.deficit;
    }

    fn recover(
        &self,
        model: &ConflictModel,
        calendar: &SlotCalendar,
        ctx: &mut RunContext,
    ) -> Result<DeficitDiagnostic> {
        let outcome = ContingentSolver::new(self.config.contingent.clone(), self.config.random_seed)
            .solve(&ctx.deficit, model, calendar)?;
        ctx.contingent_days = outcome.day_count();
        ctx.summary.contingent_days = outcome.day_count();
        ctx.summary.contingent_sessions = outcome.assignments.len();
        ctx.summary.contingent_lower_bound = outcome.lower_bound;
        ctx.summary.contingent_status = Some(outcome.status);
        ctx.schedule.contingent_days = outcome.days;
        let recovered: HashSet<&str> = outcome
            .assignments
            .iter()
            .map(|a| a.session_id.as_str())
            .collect();
        for session in ctx.sessions.iter_mut().chain(ctx.deficit.iter_mut()) {
            if recovered.contains(session.id.as_str()) {
                session.status = SessionStatus::ScheduledContingent;
            }
        }
        for a in outcome.assignments {
            ctx.schedule.add_contingent(a);
        }
        Ok(outcome.diagnostic)
    }
}

/// Runs every phase with `config`.
pub fn run(input: &TermInput, config: &TimetableConfig) -> Result<RunReport> {
    TimetablePipeline::new(config.clone()).run(input)
}
