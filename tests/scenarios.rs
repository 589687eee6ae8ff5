//! End-to-end timetabling scenarios.
//!
//! - A: one large course on the documented term, no competition.
//! - B: 47 courses where two faculty members each teach three courses on a
//!   33-slot term: 940 sessions, 54 short, recovered on 6 contingent days.
//! - C: two courses with identical rosters never meet at the same time.
//! - Boundary: one faculty member teaches every course.
//! - Monotonicity and idempotence.
//! - Recovery: a deficit larger than the contingent budget can search.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use term_timetable::config::{CalendarConfig, CoreConfig, TimetableConfig};
use term_timetable::conflict::ConflictModel;
use term_timetable::models::{room_pool, Course, Section, SessionStatus, TermInput};
use term_timetable::scheduler::CoreScheduler;
use term_timetable::slots::SlotCalendar;
use term_timetable::solver::SolveStatus;
use term_timetable::{run, RunReport};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn students(prefix: &str, n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{prefix}_s{i:03}")).collect()
}

/// Checks room capacity and room windows of every regular assignment.
fn assert_rooms_fit(report: &RunReport, input: &TermInput) {
    let sizes: HashMap<&str, usize> = report
        .sections
        .iter()
        .map(|s| (s.id.as_str(), s.size()))
        .collect();
    for a in &report.schedule.assignments {
        let room = input
            .rooms
            .iter()
            .find(|r| r.id == a.room_id)
            .expect("assigned room exists");
        assert!(room.fits(sizes[a.section_id.as_str()]), "{} too small", room.id);
        assert!(room.is_valid_in(a.slot.week), "{} not valid in week {}", room.id, a.slot.week);
    }
}

// ---------------------------------------------------------------- A

#[test]
fn test_scenario_a_single_course_no_deficit() {
    init_tracing();
    let mut input = TermInput::new()
        .with_course(Course::new("BV", "F1"))
        .with_enrollments("BV", students("bv", 70));
    input.rooms = room_pool("E", 10, 70, 1, 4);
    input.rooms.extend(room_pool("L", 4, 70, 5, 10));

    let report = run(&input, &TimetableConfig::default()).unwrap();
    assert_eq!(report.summary.sections, 1);
    assert_eq!(report.sections[0].size(), 70);
    assert_eq!(report.summary.theoretical_sessions, 20);
    assert_eq!(report.summary.scheduled, 20);
    assert_eq!(report.summary.deficit, 0);
    assert_eq!(report.summary.contingent_days, 0);
    assert_eq!(report.summary.core_status, Some(SolveStatus::Optimal));
    assert!(report.violations().is_empty());
    assert_rooms_fit(&report, &input);

    // weekly cap of 2 over 10 weeks
    let mut per_week: BTreeMap<u32, usize> = BTreeMap::new();
    for row in report.regular_table() {
        *per_week.entry(row.week).or_insert(0) += 1;
    }
    assert!(per_week.values().all(|&n| n <= 2));
}

// ---------------------------------------------------------------- B

fn scenario_b() -> (TermInput, TimetableConfig) {
    let mut input = TermInput::new();
    for i in 0..47 {
        let id = format!("K{i:02}");
        let faculty = match i {
            0..=2 => "F".to_string(),
            3..=5 => "G".to_string(),
            _ => format!("T{i:02}"),
        };
        input = input
            .with_course(Course::new(id.as_str(), faculty))
            .with_enrollments(&id, students(&id, 10));
    }
    input.rooms = room_pool("E", 50, 100, 1, 1);
    input.rooms.extend(room_pool("L", 47, 100, 2, 3));

    let mut config = TimetableConfig::default()
        .with_calendar(CalendarConfig::uniform(3, 1, 11, 1))
        .with_core(CoreConfig {
            sessions_per_section: 20,
            session_floor: 18,
            max_sessions_per_week: 11,
            max_slot_repeats: 3,
            ..CoreConfig::default()
        });
    config.contingent.periods_per_day = 5;
    config.contingent.max_rooms = Some(2);
    (input, config)
}

#[test]
fn test_scenario_b_documented_outcome() {
    init_tracing();
    let (input, config) = scenario_b();
    let report = run(&input, &config).unwrap();

    assert_eq!(report.summary.sections, 47);
    assert_eq!(report.summary.theoretical_sessions, 940);
    assert_eq!(report.summary.deficit, 54);
    assert_eq!(report.summary.scheduled, 886);
    assert_eq!(report.summary.deficit_lower_bound, 54);
    assert_eq!(report.summary.core_status, Some(SolveStatus::Optimal));

    // shortfall spread evenly over the contended sections
    assert_eq!(report.kpi.max_section_shortfall, 9);
    assert_eq!(report.kpi.shortfall_by_course.len(), 6);
    assert!(report.kpi.shortfall_by_course.values().all(|&n| n == 9));

    assert_eq!(report.summary.contingent_days, 6);
    assert_eq!(report.summary.contingent_sessions, 54);
    assert_eq!(report.summary.contingent_status, Some(SolveStatus::Optimal));
    assert_eq!(report.contingent_table().len(), 54);
    assert!(report.contingent_table().iter().all(|r| (1..=5).contains(&r.period)));
    assert_eq!(report.diagnostic.students_affected, 60);

    assert!(report.violations().is_empty(), "{:?}", report.violations());
    assert!((report.kpi.total_completion - 1.0).abs() < 1e-10);
    assert_rooms_fit(&report, &input);
}

#[test]
fn test_scenario_b_is_deterministic() {
    let (input, config) = scenario_b();
    let first = run(&input, &config).unwrap();
    let second = run(&input, &config).unwrap();
    assert_eq!(first.regular_table(), second.regular_table());
    assert_eq!(first.contingent_table(), second.contingent_table());
    assert_eq!(first.summary, second.summary);
}

// ---------------------------------------------------------------- C

#[test]
fn test_scenario_c_identical_rosters_never_coincide() {
    let roster = students("x", 30);
    let mut input = TermInput::new()
        .with_course(Course::new("A", "F1"))
        .with_course(Course::new("B", "F2"))
        .with_enrollments("A", roster.iter().cloned())
        .with_enrollments("B", roster.iter().cloned());
    input.rooms = room_pool("R", 4, 40, 1, 10);

    let report = run(&input, &TimetableConfig::default()).unwrap();
    assert_eq!(report.summary.scheduled, 40);

    let model = ConflictModel::build(&report.sections, &input.courses);
    let a = model.index_of("A_A").unwrap();
    let b = model.index_of("B_A").unwrap();
    for week in 1..=10 {
        assert!(model.conflicts(a, b, week));
    }

    let mut by_slot: BTreeMap<(u32, String, u8), BTreeSet<String>> = BTreeMap::new();
    for row in report.regular_table() {
        by_slot
            .entry((row.week, row.day.clone(), row.period))
            .or_default()
            .insert(row.course_id);
    }
    assert!(by_slot.values().all(|courses| courses.len() == 1));
    assert!(report.violations().is_empty());
}

// ---------------------------------------------------------------- Boundary

#[test]
fn test_total_faculty_contention_keeps_every_week_covered() {
    let courses: Vec<Course> = (0..4).map(|i| Course::new(format!("C{i}"), "F")).collect();
    let sections: Vec<Section> = (0..4)
        .map(|i| Section::new(format!("C{i}"), "A", students(&format!("c{i}"), 5)))
        .collect();
    let model = ConflictModel::build(&sections, &courses);
    let calendar =
        SlotCalendar::generate(&CalendarConfig::uniform(3, 1, 2, 2), &room_pool("R", 2, 10, 1, 3))
            .unwrap();
    let config = CoreConfig {
        sessions_per_section: 6,
        session_floor: 6,
        max_sessions_per_week: 2,
        max_slot_repeats: 3,
        iteration_limit: 1_000_000,
        time_limit_ms: None,
    };
    let outcome = CoreScheduler::new(config).schedule(&sections, &model, &calendar);
    assert_eq!(outcome.scheduled(), 12);
    assert_eq!(outcome.deficit_count(), 12);
    assert_eq!(outcome.status, SolveStatus::Optimal);

    let mut occupied: BTreeMap<usize, Vec<&str>> = BTreeMap::new();
    for a in &outcome.assignments {
        let t = calendar.index_of(&a.slot).unwrap();
        occupied.entry(t).or_default().push(&a.section_id);
    }

    // exhaustive: a week without a session of X has no slot X could take
    for section in &sections {
        for week in 1..=calendar.weeks() {
            let has_session = outcome
                .assignments
                .iter()
                .any(|a| a.section_id == section.id && a.slot.week == week);
            if has_session {
                continue;
            }
            for (t, slot) in calendar.slots().iter().enumerate() {
                if slot.week != week {
                    continue;
                }
                let s = model.index_of(&section.id).unwrap();
                let free = occupied.get(&t).map_or(true, |occ| {
                    occ.iter()
                        .all(|o| !model.conflicts(s, model.index_of(o).unwrap(), week))
                });
                assert!(!free, "{} could use {} in week {week}", section.id, slot);
            }
        }
    }

    // with exactly one slot per section per week available, every week is covered
    for section in &sections {
        let weeks: BTreeSet<u32> = outcome
            .assignments
            .iter()
            .filter(|a| a.section_id == section.id)
            .map(|a| a.slot.week)
            .collect();
        assert_eq!(weeks.len(), 3, "{}", section.id);
    }
}

// ---------------------------------------------------------------- Monotonicity

fn monotonicity_run(max_section_size: usize) -> RunReport {
    let mut input = TermInput::new()
        .with_course(Course::new("BV", "F1"))
        .with_enrollments("BV", students("bv", 70));
    input.rooms = room_pool("R", 2, 80, 1, 2);
    let mut config = TimetableConfig::default()
        .with_max_section_size(max_section_size)
        .with_calendar(CalendarConfig::uniform(2, 1, 2, 4))
        .with_core(CoreConfig {
            sessions_per_section: 10,
            session_floor: 10,
            max_sessions_per_week: 5,
            max_slot_repeats: 2,
            ..CoreConfig::default()
        });
    config.sectioning.min_split_section_size = 25;
    run(&input, &config).unwrap()
}

#[test]
fn test_larger_cap_never_increases_deficit() {
    let split = monotonicity_run(35);
    let whole = monotonicity_run(70);
    assert_eq!(split.summary.sections, 2);
    assert!(split.sections.iter().all(|s| s.size() == 35));
    assert_eq!(whole.summary.sections, 1);

    assert_eq!(whole.summary.deficit, 0);
    assert_eq!(split.summary.deficit, 4);
    assert!(whole.summary.deficit <= split.summary.deficit);
    assert_eq!(split.summary.contingent_sessions, 4);
}

// ---------------------------------------------------------------- Sections

#[test]
fn test_sections_cover_each_student_once() {
    let mut input = TermInput::new()
        .with_course(Course::new("A", "F1"))
        .with_course(Course::new("B", "F2"))
        .with_enrollments("A", students("p", 100))
        .with_enrollments("B", students("p", 60));
    input.rooms = room_pool("R", 6, 70, 1, 10);

    let report = run(&input, &TimetableConfig::default()).unwrap();
    assert!(report.sections.iter().all(|s| s.size() <= 70));
    for course in ["A", "B"] {
        let mut seen = BTreeSet::new();
        for s in report.sections.iter().filter(|s| s.course_id == course) {
            for student in &s.students {
                assert!(seen.insert(student.clone()), "{student} twice in {course}");
            }
        }
        let expected = if course == "A" { 100 } else { 60 };
        assert_eq!(seen.len(), expected);
    }
    assert_eq!(report.section_table().len(), report.sections.len());
    assert!(report.violations().is_empty());
}

// ---------------------------------------------------------------- Idempotence

#[test]
fn test_calendar_generation_is_idempotent() {
    let mut rooms = room_pool("E", 10, 70, 1, 4);
    rooms.extend(room_pool("L", 4, 90, 5, 10));
    let config = CalendarConfig::default();

    let first = SlotCalendar::generate(&config, &rooms).unwrap();
    let second = SlotCalendar::generate(&config, &rooms).unwrap();
    assert_eq!(first, second);

    rooms.reverse();
    let reordered = SlotCalendar::generate(&config, &rooms).unwrap();
    assert_eq!(first.slots(), reordered.slots());
    for week in 1..=config.weeks {
        let ids = |cal: &SlotCalendar| -> Vec<String> {
            cal.week_pool(week).iter().map(|&r| cal.room(r).id.clone()).collect()
        };
        assert_eq!(ids(&first), ids(&reordered));
    }
    assert_eq!(first.slot_count(), 400);
}

#[test]
fn test_report_serializes_to_json() {
    let (input, config) = scenario_b();
    let report = run(&input, &config).unwrap();
    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["summary"]["deficit"], 54);
    assert_eq!(value["summary"]["contingent_days"], 6);
    assert!(value["kpi"]["utilization_by_regime"].get("Early").is_some());
    let rows = serde_json::to_value(report.contingent_table()).unwrap();
    assert_eq!(rows[0]["day_id"].as_str().map(|d| d.starts_with('C')), Some(true));
}

// ---------------------------------------------------------------- Recovery

#[test]
fn test_default_budget_recovers_large_deficit() {
    init_tracing();
    // 60 independent courses share one room for the whole term
    let mut input = TermInput::new();
    for i in 0..60 {
        let id = format!("K{i:02}");
        input = input
            .with_course(Course::new(id.as_str(), format!("T{i:02}")))
            .with_enrollments(&id, students(&id, 5));
    }
    input.rooms = room_pool("R", 1, 10, 1, 10);

    let report = run(&input, &TimetableConfig::default()).unwrap();
    assert_eq!(report.summary.theoretical_sessions, 1200);
    assert!(report.summary.scheduled <= 400);
    assert_eq!(report.summary.scheduled + report.summary.deficit, 1200);
    assert_eq!(report.summary.contingent_sessions, report.summary.deficit);
    assert!(report.summary.contingent_days as u32 >= report.summary.contingent_lower_bound);
    assert!(report.summary.contingent_status.is_some());

    assert_eq!(report.sessions.len(), 1200);
    assert_eq!(report.sessions_with_status(SessionStatus::Unscheduled).count(), 0);
    assert_eq!(
        report.sessions_with_status(SessionStatus::ScheduledContingent).count(),
        report.summary.deficit
    );
    assert!(report.violations().is_empty(), "{:?}", report.violations());
}
