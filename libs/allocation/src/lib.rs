//! Balanced day-allocation primitives.
//!
//! This library decides which calendar days of which engineers absorb a
//! task's person-day budget. It is pure computation over data the caller
//! loaded up front: no IO, no clocks, no stores. Key concepts:
//!
//! - **Candidate day**: an `Available` day on/after the task start date.
//! - **Balancing**: budget spreads evenly across engineers before any one
//!   engineer is loaded further on the same date.
//! - **Shortfall**: budget that found no candidate day. A diagnostic count,
//!   never an error.
//!
//! # Invariants
//!
//! - Decisions are deterministic given the same inputs: ties break by
//!   ascending engineer ID, then ascending assignment ID
//! - Days are consumed chronologically; a later date is never used while an
//!   earlier candidate date still has unconsumed days
//! - No day is placed twice, and placements never exceed the budget

use std::collections::{BTreeMap, VecDeque};

use chrono::NaiveDate;
use devcap_id::{AssignmentId, DayId, EngineerId};

/// A candidate day offered to the allocator.
///
/// The caller filters by day type; the allocator re-applies the start-date
/// filter itself, so pre-filtering by date is optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateDay {
    pub day_id: DayId,
    pub date: NaiveDate,
}

/// One engineer's contribution to the candidate pool.
#[derive(Debug, Clone)]
pub struct EngineerCandidates {
    pub engineer_id: EngineerId,
    /// This engineer's assignments to the task being allocated.
    /// Usually one; more in the degenerate multi-assignment case.
    pub assignment_ids: Vec<AssignmentId>,
    pub days: Vec<CandidateDay>,
}

/// A single day→assignment decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub day_id: DayId,
    pub engineer_id: EngineerId,
    pub assignment_id: AssignmentId,
    pub date: NaiveDate,
}

/// The allocator's output: a day→assignment mapping plus per-assignment
/// bookkeeping for the caller to persist.
#[derive(Debug, Clone, Default)]
pub struct AllocationPlan {
    /// Decisions in the order they were made (ascending by date).
    pub placements: Vec<Placement>,

    /// Day count per assignment. Every input assignment has an entry, so a
    /// share that dropped to zero is visible to the caller.
    pub shares: BTreeMap<AssignmentId, i32>,

    /// Latest placed date per assignment (absent when the share is zero).
    pub last_date: BTreeMap<AssignmentId, NaiveDate>,

    /// Budget that found no candidate day. Diagnostic, not an error: a task
    /// may legitimately carry more PDs than its engineers have days.
    pub unplaced: i32,
}

impl AllocationPlan {
    /// Latest placed date across all assignments.
    pub fn max_date(&self) -> Option<NaiveDate> {
        self.last_date.values().max().copied()
    }

    /// Total days placed.
    pub fn placed(&self) -> i32 {
        self.placements.len() as i32
    }
}

/// Computes a balanced day→assignment mapping for one task.
///
/// Processes candidate dates in ascending order; within a date group it
/// repeatedly gives the next day to the engineer with the fewest days placed
/// so far (ties by ascending engineer ID), and within that engineer to the
/// assignment with the fewest units so far (ties by ascending assignment ID).
/// Stops when the budget is exhausted or no candidate days remain.
pub fn balance(
    budget: i32,
    start_date: NaiveDate,
    engineers: &[EngineerCandidates],
) -> AllocationPlan {
    let mut plan = AllocationPlan::default();

    // Per-engineer assignment lists, normalized for deterministic tie-breaks.
    let mut assignments_of: BTreeMap<EngineerId, Vec<AssignmentId>> = BTreeMap::new();
    for eng in engineers {
        let mut ids = eng.assignment_ids.clone();
        ids.sort();
        ids.dedup();
        for id in &ids {
            plan.shares.entry(*id).or_insert(0);
        }
        if !ids.is_empty() {
            assignments_of.entry(eng.engineer_id).or_default().extend(ids);
        }
    }

    // Group candidate days by date; within a group each engineer's days queue
    // up in (date, day_id) order so the earliest unconsumed day goes first.
    let mut groups: BTreeMap<NaiveDate, BTreeMap<EngineerId, VecDeque<DayId>>> = BTreeMap::new();
    for eng in engineers {
        if !assignments_of.contains_key(&eng.engineer_id) {
            // An engineer without assignments has nothing to receive days.
            continue;
        }
        let mut days: Vec<&CandidateDay> =
            eng.days.iter().filter(|d| d.date >= start_date).collect();
        days.sort_by_key(|d| (d.date, d.day_id));
        for day in days {
            groups
                .entry(day.date)
                .or_default()
                .entry(eng.engineer_id)
                .or_default()
                .push_back(day.day_id);
        }
    }

    let mut engineer_load: BTreeMap<EngineerId, i32> =
        assignments_of.keys().map(|e| (*e, 0)).collect();

    let mut remaining = budget;
    'dates: for (date, mut group) in groups {
        while remaining > 0 {
            // Engineer with the fewest days so far among those still offering
            // a day on this date; ties break by ascending engineer ID because
            // BTreeMap iteration is ID-ordered and the comparison is strict.
            let chosen = group
                .iter()
                .filter(|(_, days)| !days.is_empty())
                .map(|(eng, _)| *eng)
                .min_by_key(|eng| (engineer_load.get(eng).copied().unwrap_or(0), *eng));
            let Some(engineer_id) = chosen else {
                continue 'dates;
            };

            // Least-loaded assignment of that engineer, ties by ascending ID.
            let assignment_id = assignments_of.get(&engineer_id).and_then(|ids| {
                ids.iter()
                    .copied()
                    .min_by_key(|a| (plan.shares.get(a).copied().unwrap_or(0), *a))
            });
            let Some(assignment_id) = assignment_id else {
                // No assignment can absorb this engineer's days.
                group.remove(&engineer_id);
                continue;
            };

            let Some(day_id) = group.get_mut(&engineer_id).and_then(VecDeque::pop_front) else {
                group.remove(&engineer_id);
                continue;
            };

            plan.placements.push(Placement {
                day_id,
                engineer_id,
                assignment_id,
                date,
            });
            *plan.shares.entry(assignment_id).or_insert(0) += 1;
            *engineer_load.entry(engineer_id).or_insert(0) += 1;
            plan.last_date
                .entry(assignment_id)
                .and_modify(|d| *d = (*d).max(date))
                .or_insert(date);
            remaining -= 1;
        }
        if remaining == 0 {
            break;
        }
    }

    // A non-positive budget places nothing and owes nothing.
    plan.unplaced = remaining.max(0);
    plan
}
