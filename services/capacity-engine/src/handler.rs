//! Assignment lifecycle handler.
//!
//! Reacts to `created`/`deleted` assignment events by reconciling the
//! involved engineers' calendars with the task's person-day budget:
//!
//! 1. Load the task and every assignment linked to it
//! 2. Clear this task's previously Assigned days (idempotent recompute)
//! 3. Run the balanced allocator over the remaining Available days
//! 4. Persist only the days that actually changed, then the assignment
//!    shares and the task end date
//!
//! Each individual write is idempotent, so redelivery of the same event
//! converges to the same final state.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use devcap_allocation::{balance, AllocationPlan, CandidateDay, EngineerCandidates};
use devcap_domain::{DayStateError, EngineerAssignment, EngineerCalendar, Task};
use devcap_events::{AssignmentEvent, AssignmentOperation, EventError};
use devcap_id::{AssignmentId, DayId, EngineerId};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use crate::stores::{AssignmentStore, CalendarStore, StoreError, TaskStore};

/// Errors from event handling.
///
/// These never propagate past [`AssignmentLifecycleHandler::handle`]; they
/// exist so the internal flow can use `?` and log once at the top.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("day state error: {0}")]
    DayState(#[from] DayStateError),
}

/// What one event's handling changed. Observability only.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HandleOutcome {
    pub days_cleared: u32,
    pub days_assigned: u32,
    pub assignments_updated: u32,
    pub task_updated: bool,
    /// Budget that found no candidate day. Diagnostic, not an error.
    pub unplaced_pds: i32,
}

/// Handles assignment lifecycle events against the backing stores.
pub struct AssignmentLifecycleHandler {
    tasks: Arc<dyn TaskStore>,
    assignments: Arc<dyn AssignmentStore>,
    calendars: Arc<dyn CalendarStore>,
}

impl AssignmentLifecycleHandler {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        assignments: Arc<dyn AssignmentStore>,
        calendars: Arc<dyn CalendarStore>,
    ) -> Self {
        Self {
            tasks,
            assignments,
            calendars,
        }
    }

    /// Processes one event. Never fails: errors are logged with full context
    /// and swallowed so one malformed event cannot crash the event loop.
    #[instrument(
        skip(self, event, shutdown),
        fields(
            task_id = %event.task_id,
            assignment_id = %event.assignment_id,
            engineer_id = %event.engineer_id,
        )
    )]
    pub async fn handle(
        &self,
        event: &AssignmentEvent,
        shutdown: &watch::Receiver<bool>,
    ) -> HandleOutcome {
        let operation = match event.operation() {
            Ok(op) => op,
            Err(EventError::UnknownOperation(op)) => {
                warn!(operation = %op, "Ignoring unknown assignment operation");
                return HandleOutcome::default();
            }
            Err(e) => {
                warn!(error = %e, "Ignoring undecodable assignment operation");
                return HandleOutcome::default();
            }
        };

        let result = match operation {
            AssignmentOperation::Created => self.on_created(event, shutdown).await,
            AssignmentOperation::Deleted => self.on_deleted(event, shutdown).await,
        };

        match result {
            Ok(outcome) => {
                debug!(
                    days_cleared = outcome.days_cleared,
                    days_assigned = outcome.days_assigned,
                    assignments_updated = outcome.assignments_updated,
                    "Assignment event processed"
                );
                outcome
            }
            Err(e) => {
                error!(error = %e, "Failed to process assignment event");
                HandleOutcome::default()
            }
        }
    }

    /// Task-wide rebalance after an assignment was created.
    ///
    /// Allocation is always computed across all of a task's assignments,
    /// because the PD budget is shared between them.
    async fn on_created(
        &self,
        event: &AssignmentEvent,
        shutdown: &watch::Receiver<bool>,
    ) -> Result<HandleOutcome, EngineError> {
        let mut outcome = HandleOutcome::default();

        let Some(mut task) = self.tasks.get_by_id(event.task_id).await? else {
            // The event raced with a task deletion; nothing to reconcile.
            warn!("Task not found, skipping stale event");
            return Ok(outcome);
        };

        let linked = self.assignments.get_by_task_id(task.id).await?;
        if linked.is_empty() {
            warn!("No assignments linked to task, skipping stale event");
            return Ok(outcome);
        }
        let assignment_set: BTreeSet<AssignmentId> = linked.iter().map(|a| a.id).collect();

        // Load each distinct engineer's calendar. A missing calendar means
        // zero candidates, not an error: provisioning may not have run yet.
        let engineer_ids: BTreeSet<EngineerId> = linked.iter().map(|a| a.engineer_id).collect();
        let mut calendars: BTreeMap<EngineerId, EngineerCalendar> = BTreeMap::new();
        for engineer_id in &engineer_ids {
            match self.calendars.get_by_engineer_id(*engineer_id).await? {
                Some(calendar) => {
                    calendars.insert(*engineer_id, calendar);
                }
                None => {
                    debug!(engineer_id = %engineer_id, "No calendar provisioned, zero candidates");
                }
            }
        }

        // Clear this task's previous allocation so the recompute starts from
        // a blank slate. Days held by other tasks are not in the set and
        // survive untouched.
        let mut dirty: BTreeSet<DayId> = BTreeSet::new();
        for calendar in calendars.values_mut() {
            for day in calendar.days_assigned_to_mut(&assignment_set) {
                day.release()?;
                dirty.insert(day.id);
                outcome.days_cleared += 1;
            }
        }

        // Candidate pool: every engineer's Available days from the task start.
        let candidates: Vec<EngineerCandidates> = engineer_ids
            .iter()
            .map(|engineer_id| EngineerCandidates {
                engineer_id: *engineer_id,
                assignment_ids: linked
                    .iter()
                    .filter(|a| a.engineer_id == *engineer_id)
                    .map(|a| a.id)
                    .collect(),
                days: calendars
                    .get(engineer_id)
                    .map(|calendar| {
                        calendar
                            .available_days_from(task.start_date)
                            .into_iter()
                            .map(|d| CandidateDay {
                                day_id: d.id,
                                date: d.date,
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
            })
            .collect();

        let plan = balance(task.pds_budget, task.start_date, &candidates);

        // Apply the plan to the in-memory calendars before persisting, so a
        // day that was cleared and re-placed is written exactly once, in its
        // final state.
        for placement in &plan.placements {
            let day = calendars
                .get_mut(&placement.engineer_id)
                .and_then(|c| c.days.iter_mut().find(|d| d.id == placement.day_id));
            let Some(day) = day else {
                // The allocator only places days it was given.
                continue;
            };
            day.assign(placement.assignment_id)?;
            dirty.insert(day.id);
            outcome.days_assigned += 1;
        }

        if plan.unplaced > 0 {
            info!(
                unplaced_pds = plan.unplaced,
                budget = task.pds_budget,
                "Budget exceeds available days"
            );
        }
        outcome.unplaced_pds = plan.unplaced;

        // Loading and computation are done; bail out here if shutdown raced
        // in. Partial persisted progress self-heals on redelivery.
        if *shutdown.borrow() {
            warn!("Shutdown during handling, skipping persistence");
            return Ok(outcome);
        }

        self.persist_days(&calendars, &dirty).await;
        outcome.assignments_updated = self.persist_assignments(&linked, &plan).await;
        outcome.task_updated = self.persist_task_end_date(&mut task, &plan).await;

        Ok(outcome)
    }

    /// Releases the deleted assignment's days. Freed capacity is not
    /// reallocated here; a sibling `created` event triggers the task-wide
    /// recompute.
    async fn on_deleted(
        &self,
        event: &AssignmentEvent,
        shutdown: &watch::Receiver<bool>,
    ) -> Result<HandleOutcome, EngineError> {
        let mut outcome = HandleOutcome::default();

        let Some(mut calendar) = self
            .calendars
            .get_by_engineer_id(event.engineer_id)
            .await?
        else {
            debug!("No calendar for engineer, nothing to release");
            return Ok(outcome);
        };

        let deleted: BTreeSet<AssignmentId> = [event.assignment_id].into();
        let mut dirty: BTreeSet<DayId> = BTreeSet::new();
        for day in calendar.days_assigned_to_mut(&deleted) {
            day.release()?;
            dirty.insert(day.id);
            outcome.days_cleared += 1;
        }

        if *shutdown.borrow() {
            warn!("Shutdown during handling, skipping persistence");
            return Ok(outcome);
        }

        let calendars = BTreeMap::from([(calendar.engineer_id, calendar)]);
        self.persist_days(&calendars, &dirty).await;

        Ok(outcome)
    }

    /// Writes only the touched days, one upsert each. A failed write is
    /// logged and skipped; the remaining writes still go through.
    async fn persist_days(
        &self,
        calendars: &BTreeMap<EngineerId, EngineerCalendar>,
        dirty: &BTreeSet<DayId>,
    ) {
        for calendar in calendars.values() {
            for day in calendar.days.iter().filter(|d| dirty.contains(&d.id)) {
                match self.calendars.update_day(day).await {
                    Ok(true) => {}
                    Ok(false) => {
                        warn!(day_id = %day.id, date = %day.date, "Day upsert found no calendar")
                    }
                    Err(e) => {
                        warn!(day_id = %day.id, date = %day.date, error = %e, "Day upsert failed")
                    }
                }
            }
        }
    }

    /// Writes assignments whose computed share or end date moved.
    async fn persist_assignments(
        &self,
        linked: &[EngineerAssignment],
        plan: &AllocationPlan,
    ) -> u32 {
        let mut updated = 0;
        for assignment in linked {
            let mut assignment = assignment.clone();
            let share = plan.shares.get(&assignment.id).copied().unwrap_or(0);
            let last_date = plan.last_date.get(&assignment.id).copied();
            if !assignment.apply_allocation(share, last_date) {
                continue;
            }
            match self.assignments.update(&assignment).await {
                Ok(true) => updated += 1,
                Ok(false) => {
                    warn!(assignment_id = %assignment.id, "Assignment vanished before update")
                }
                Err(e) => {
                    warn!(assignment_id = %assignment.id, error = %e, "Assignment update failed")
                }
            }
        }
        updated
    }

    /// Grows the task end date to the latest placed day, never shrinking it.
    async fn persist_task_end_date(&self, task: &mut Task, plan: &AllocationPlan) -> bool {
        let Some(max_date) = plan.max_date() else {
            return false;
        };
        if !task.extend_end_date(max_date) {
            return false;
        }
        match self.tasks.update(task).await {
            Ok(true) => {
                info!(end_date = %task.end_date, "Task end date extended");
                true
            }
            Ok(false) => {
                warn!("Task vanished before end date update");
                false
            }
            Err(e) => {
                warn!(error = %e, "Task update failed");
                false
            }
        }
    }
}
