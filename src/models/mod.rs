//! Timetabling domain models.
//!
//! Provides the data types of a term timetabling problem and its solution.
//! Input entities (courses, enrollments, rooms) and the sections derived
//! from them are immutable once built; only the schedule is produced by
//! the solving phases.
//!
//! # Domain Mappings
//!
//! | term-timetable | Meaning |
//! |----------------|---------|
//! | Course | Catalog course taught by one faculty member |
//! | Section | Capacity-bounded student group of a course |
//! | Session | One required meeting of a section |
//! | TimeSlot | (week, day, period) cell of the term grid |
//! | Room | Seat capacity + weeks in which it exists |
//! | ContingentDay | Extra recovery day after the term |

mod calendar;
mod course;
mod room;
mod schedule;
mod section;

pub use calendar::{TimeSlot, WeekWindow};
pub use course::{Course, Enrollment, FacultyHandover, Student, TermInput};
pub use room::{room_pool, Room};
pub use schedule::{
    Assignment, ContingentAssignment, ContingentDay, Schedule, Violation, ViolationType,
};
pub use section::{section_label, Section, Session, SessionStatus};
