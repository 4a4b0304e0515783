//! Task and engineer assignment records.

use chrono::NaiveDate;
use devcap_id::{AssignmentId, EngineerId, TaskId};
use serde::{Deserialize, Serialize};

/// A unit of planned work with a person-day budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    /// Total person-days to allocate across all of this task's assignments.
    pub pds_budget: i32,
    pub start_date: NaiveDate,
    /// Grows when allocation places days past it; never shrinks.
    pub end_date: NaiveDate,
    /// Soft cap on distinct engineers. Informational for the engine.
    pub max_resources: i32,
}

impl Task {
    /// Pushes the end date forward to `date` if it lies past the current end.
    ///
    /// Returns true when the task changed.
    pub fn extend_end_date(&mut self, date: NaiveDate) -> bool {
        if date > self.end_date {
            self.end_date = date;
            true
        } else {
            false
        }
    }
}

/// Links one engineer to one task.
///
/// Several assignments may reference the same task, and the same engineer may
/// degenerately hold more than one assignment to the same task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineerAssignment {
    pub id: AssignmentId,
    pub engineer_id: EngineerId,
    pub task_id: TaskId,
    /// Count of calendar days currently allocated to this assignment.
    /// Engine-computed output, not caller input.
    pub capacity_share: i32,
    pub start_date: NaiveDate,
    /// Mirrors the latest allocated day; never shrinks.
    pub end_date: NaiveDate,
}

impl EngineerAssignment {
    /// Applies a freshly computed share and latest allocated date.
    ///
    /// Returns true when anything changed. End dates only grow: a rebalance
    /// that frees late days must not pull a published end date back.
    pub fn apply_allocation(&mut self, share: i32, last_date: Option<NaiveDate>) -> bool {
        let mut changed = false;
        if self.capacity_share != share {
            self.capacity_share = share;
            changed = true;
        }
        if let Some(date) = last_date {
            if date > self.end_date {
                self.end_date = date;
                changed = true;
            }
        }
        changed
    }
}
