//! Calendar day states and transitions.
//!
//! Invariant, checked on every write path: `day_type == Assigned` if and only
//! if `assignment_id` is set. The transition methods below are the only
//! writers of either field.

use chrono::NaiveDate;
use devcap_id::{AssignmentId, CalendarId, DayId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from invalid day state transitions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DayStateError {
    /// The requested transition is not allowed from the current state.
    #[error("invalid transition: {day_type} day cannot become {wanted}")]
    InvalidTransition { day_type: DayType, wanted: DayType },
}

/// The type of a single calendar day.
///
/// Only `Available` days are allocation candidates. `NonWorking`, `Vacation`,
/// and `Absence` days are provisioned externally and never touched by the
/// engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DayType {
    #[default]
    Available,
    NonWorking,
    Vacation,
    Absence,
    Assigned,
}

impl DayType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::NonWorking => "non_working",
            Self::Vacation => "vacation",
            Self::Absence => "absence",
            Self::Assigned => "assigned",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "available" => Some(Self::Available),
            "non_working" => Some(Self::NonWorking),
            "vacation" => Some(Self::Vacation),
            "absence" => Some(Self::Absence),
            "assigned" => Some(Self::Assigned),
            _ => None,
        }
    }
}

impl std::fmt::Display for DayType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One day of one engineer's calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub id: DayId,
    pub calendar_id: CalendarId,
    pub date: NaiveDate,
    pub day_type: DayType,
    /// Back-reference to the assignment consuming this day.
    /// Set exactly when `day_type == Assigned`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignment_id: Option<AssignmentId>,
}

impl CalendarDay {
    /// Creates a day in its provisioned state (`Available` or `NonWorking`).
    pub fn new(id: DayId, calendar_id: CalendarId, date: NaiveDate, day_type: DayType) -> Self {
        Self {
            id,
            calendar_id,
            date,
            day_type,
            assignment_id: None,
        }
    }

    /// Marks this day as consumed by an assignment.
    ///
    /// Valid only from `Available`; sets the back-reference in the same step.
    pub fn assign(&mut self, assignment_id: AssignmentId) -> Result<(), DayStateError> {
        if self.day_type != DayType::Available {
            return Err(DayStateError::InvalidTransition {
                day_type: self.day_type,
                wanted: DayType::Assigned,
            });
        }
        self.day_type = DayType::Assigned;
        self.assignment_id = Some(assignment_id);
        Ok(())
    }

    /// Returns this day to the available pool.
    ///
    /// Valid only from `Assigned`; clears the back-reference in the same step.
    pub fn release(&mut self) -> Result<(), DayStateError> {
        if self.day_type != DayType::Assigned {
            return Err(DayStateError::InvalidTransition {
                day_type: self.day_type,
                wanted: DayType::Available,
            });
        }
        self.day_type = DayType::Available;
        self.assignment_id = None;
        Ok(())
    }

    /// Whether this day can absorb budget for a task starting at `start`.
    pub fn is_candidate(&self, start: NaiveDate) -> bool {
        self.day_type == DayType::Available && self.date >= start
    }

    /// The type/back-reference invariant.
    pub fn invariant_holds(&self) -> bool {
        (self.day_type == DayType::Assigned) == self.assignment_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(day_type: DayType) -> CalendarDay {
        CalendarDay::new(
            DayId::new(1),
            CalendarId::new(1),
            NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            day_type,
        )
    }

    #[test]
    fn test_assign_release_cycle() {
        let mut d = day(DayType::Available);
        assert!(d.invariant_holds());

        d.assign(AssignmentId::new(7)).unwrap();
        assert_eq!(d.day_type, DayType::Assigned);
        assert_eq!(d.assignment_id, Some(AssignmentId::new(7)));
        assert!(d.invariant_holds());

        d.release().unwrap();
        assert_eq!(d.day_type, DayType::Available);
        assert_eq!(d.assignment_id, None);
        assert!(d.invariant_holds());
    }

    #[test]
    fn test_assign_rejected_from_non_available() {
        for dt in [
            DayType::NonWorking,
            DayType::Vacation,
            DayType::Absence,
            DayType::Assigned,
        ] {
            let mut d = day(dt);
            if dt == DayType::Assigned {
                d.assignment_id = Some(AssignmentId::new(1));
            }
            let err = d.assign(AssignmentId::new(7)).unwrap_err();
            assert!(matches!(err, DayStateError::InvalidTransition { .. }));
            assert!(d.invariant_holds());
        }
    }

    #[test]
    fn test_release_rejected_from_non_assigned() {
        let mut d = day(DayType::Vacation);
        assert!(d.release().is_err());
        assert_eq!(d.day_type, DayType::Vacation);
    }

    #[test]
    fn test_candidate_requires_available_and_start() {
        let start = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let mut d = day(DayType::Available);
        assert!(d.is_candidate(start));
        assert!(!d.is_candidate(start.succ_opt().unwrap()));

        d.assign(AssignmentId::new(1)).unwrap();
        assert!(!d.is_candidate(start));
    }

    #[test]
    fn test_day_type_roundtrip() {
        for dt in [
            DayType::Available,
            DayType::NonWorking,
            DayType::Vacation,
            DayType::Absence,
            DayType::Assigned,
        ] {
            assert_eq!(DayType::from_str(dt.as_str()), Some(dt));
        }
        assert_eq!(DayType::from_str("weekend"), None);
    }

    #[test]
    fn test_day_serialization_omits_null_backref() {
        let d = day(DayType::Available);
        let json = serde_json::to_string(&d).unwrap();
        assert!(!json.contains("assignment_id"));
        assert!(json.contains("\"available\""));
    }
}
