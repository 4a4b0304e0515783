//! Per-engineer calendars.

use chrono::NaiveDate;
use devcap_id::{AssignmentId, CalendarId, EngineerId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::CalendarDay;

/// One engineer's calendar: an ordered-by-date collection of days.
///
/// Calendars are provisioned lazily by an external collaborator over a
/// multi-year forward horizon; an engineer without a calendar simply has zero
/// candidate days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineerCalendar {
    pub id: CalendarId,
    pub engineer_id: EngineerId,
    pub days: Vec<CalendarDay>,
}

impl EngineerCalendar {
    pub fn new(id: CalendarId, engineer_id: EngineerId) -> Self {
        Self {
            id,
            engineer_id,
            days: Vec::new(),
        }
    }

    /// Restores ascending date order after out-of-order inserts.
    pub fn sort_days(&mut self) {
        self.days.sort_by_key(|d| (d.date, d.id));
    }

    /// Candidate days for a task starting at `start`, ascending by date.
    pub fn available_days_from(&self, start: NaiveDate) -> Vec<&CalendarDay> {
        self.days.iter().filter(|d| d.is_candidate(start)).collect()
    }

    /// Days whose back-reference points into the given assignment set.
    ///
    /// This is the `assignment -> days` index resolved as a query over the
    /// day back-pointers, so mutating one assignment never requires a
    /// denormalized day list to stay in sync.
    pub fn days_assigned_to(&self, assignments: &BTreeSet<AssignmentId>) -> Vec<&CalendarDay> {
        self.days
            .iter()
            .filter(|d| d.assignment_id.is_some_and(|a| assignments.contains(&a)))
            .collect()
    }

    /// Mutable variant of [`days_assigned_to`](Self::days_assigned_to).
    pub fn days_assigned_to_mut(
        &mut self,
        assignments: &BTreeSet<AssignmentId>,
    ) -> Vec<&mut CalendarDay> {
        self.days
            .iter_mut()
            .filter(|d| d.assignment_id.is_some_and(|a| assignments.contains(&a)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DayType;
    use devcap_id::DayId;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn calendar() -> EngineerCalendar {
        let mut cal = EngineerCalendar::new(CalendarId::new(1), EngineerId::new(1));
        for (i, (d, dt)) in [
            (2, DayType::Available),
            (3, DayType::Available),
            (4, DayType::Vacation),
            (7, DayType::NonWorking),
            (9, DayType::Available),
        ]
        .into_iter()
        .enumerate()
        {
            cal.days.push(CalendarDay::new(
                DayId::new(i as i32 + 1),
                cal.id,
                date(d),
                dt,
            ));
        }
        cal
    }

    #[test]
    fn test_available_days_filter_type_and_start() {
        let cal = calendar();
        let days: Vec<_> = cal
            .available_days_from(date(3))
            .into_iter()
            .map(|d| d.date)
            .collect();
        assert_eq!(days, vec![date(3), date(9)]);
    }

    #[test]
    fn test_days_assigned_to_uses_backref() {
        let mut cal = calendar();
        cal.days[0].assign(AssignmentId::new(10)).unwrap();
        cal.days[1].assign(AssignmentId::new(11)).unwrap();

        let wanted: BTreeSet<_> = [AssignmentId::new(10)].into();
        let hits: Vec<_> = cal
            .days_assigned_to(&wanted)
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(hits, vec![DayId::new(1)]);
    }

    #[test]
    fn test_sort_days_restores_date_order() {
        let mut cal = calendar();
        let late = CalendarDay::new(DayId::new(9), cal.id, date(1), DayType::Available);
        cal.days.push(late);
        cal.sort_days();
        assert_eq!(cal.days[0].date, date(1));
    }
}
