//! # devcap-domain
//!
//! Core records for capacity planning: tasks, engineer assignments, and
//! per-engineer calendars, plus the calendar day state machine.
//!
//! ## Design Principles
//!
//! - A calendar day is exclusively owned by its calendar; the day→assignment
//!   link is a back-pointer on the day, never a list on the assignment
//! - State transitions on a day go through methods; `assignment_id` is only
//!   ever written together with the matching type change
//! - All date comparisons are day-granular (`chrono::NaiveDate`)

mod calendar;
mod day;
mod task;

pub use calendar::EngineerCalendar;
pub use day::{CalendarDay, DayStateError, DayType};
pub use task::{EngineerAssignment, Task};
