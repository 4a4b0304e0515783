//! Event worker: drains the assignment event channel and dispatches each
//! event to the lifecycle handler.
//!
//! Events for different tasks run concurrently; events for the same task go
//! through one FIFO queue with a single drainer, so same-task events are
//! handled strictly in arrival order and two rebalances never interleave
//! their read-compute-write cycles. A drainer removes its own queue from the
//! map once empty, so the map only holds tasks with work in flight.

use std::collections::HashMap;
use std::sync::Arc;

use devcap_events::AssignmentEvent;
use devcap_id::TaskId;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::handler::AssignmentLifecycleHandler;

type TaskQueues = Mutex<HashMap<TaskId, mpsc::UnboundedSender<AssignmentEvent>>>;

pub struct AssignmentEventWorker {
    handler: Arc<AssignmentLifecycleHandler>,
    task_queues: Arc<TaskQueues>,
}

impl AssignmentEventWorker {
    pub fn new(handler: Arc<AssignmentLifecycleHandler>) -> Self {
        Self {
            handler,
            task_queues: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Runs until the channel closes or shutdown is signalled, then waits for
    /// in-flight events to finish.
    pub async fn run(
        &self,
        mut events: mpsc::Receiver<AssignmentEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut drainers = JoinSet::new();

        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    // A dropped sender counts as shutdown.
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Shutdown signalled, draining in-flight events");
                        break;
                    }
                }

                event = events.recv() => {
                    let Some(event) = event else {
                        debug!("Event channel closed");
                        break;
                    };
                    self.dispatch(&mut drainers, event, shutdown.clone()).await;
                }

                // Keep the set from growing without bound under load.
                Some(result) = drainers.join_next(), if !drainers.is_empty() => {
                    if let Err(e) = result {
                        warn!(error = %e, "Event handling task panicked");
                    }
                }
            }
        }

        while let Some(result) = drainers.join_next().await {
            if let Err(e) = result {
                warn!(error = %e, "Event handling task panicked");
            }
        }
        info!("Event worker stopped");
    }

    /// Queues the event on its task's drainer, starting one if needed.
    ///
    /// Enqueueing happens here, under the map lock and in channel-arrival
    /// order, so same-task events keep their order no matter how the spawned
    /// drainers get scheduled.
    async fn dispatch(
        &self,
        drainers: &mut JoinSet<()>,
        event: AssignmentEvent,
        shutdown: watch::Receiver<bool>,
    ) {
        let mut queues = self.task_queues.lock().await;
        let event = match queues.get(&event.task_id) {
            Some(queue) => match queue.send(event) {
                Ok(()) => return,
                // Stale sender with no live drainer; replace it.
                Err(mpsc::error::SendError(event)) => event,
            },
            None => event,
        };

        let task_id = event.task_id;
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(event).ok();
        queues.insert(task_id, tx);
        drainers.spawn(Self::drain(
            Arc::clone(&self.handler),
            Arc::clone(&self.task_queues),
            task_id,
            rx,
            shutdown,
        ));
    }

    /// Handles one task's events in order until the queue runs dry.
    async fn drain(
        handler: Arc<AssignmentLifecycleHandler>,
        task_queues: Arc<TaskQueues>,
        task_id: TaskId,
        mut queue: mpsc::UnboundedReceiver<AssignmentEvent>,
        shutdown: watch::Receiver<bool>,
    ) {
        loop {
            let event = match queue.try_recv() {
                Ok(event) => event,
                Err(_) => {
                    // Re-check under the map lock: once the entry is gone no
                    // further send can land here, so empty means done.
                    let mut queues = task_queues.lock().await;
                    match queue.try_recv() {
                        Ok(event) => event,
                        Err(_) => {
                            queues.remove(&task_id);
                            return;
                        }
                    }
                }
            };
            handler.handle(&event, &shutdown).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::NaiveDate;
    use devcap_domain::{CalendarDay, DayType, EngineerAssignment, EngineerCalendar, Task};
    use devcap_id::{AssignmentId, CalendarId, DayId, EngineerId};

    use crate::stores::MemoryStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn event(assignment: i32, engineer: i32, task: i32, op: &str) -> AssignmentEvent {
        AssignmentEvent {
            assignment_id: AssignmentId::new(assignment),
            engineer_id: EngineerId::new(engineer),
            task_id: TaskId::new(task),
            capacity_share: 0,
            start_date: date(2026, 3, 2),
            end_date: date(2026, 3, 6),
            operation: op.to_string(),
        }
    }

    async fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_task(Task {
                id: TaskId::new(1),
                name: "migration".into(),
                pds_budget: 2,
                start_date: date(2026, 3, 2),
                end_date: date(2026, 3, 2),
                max_resources: 1,
            })
            .await;
        store
            .insert_assignment(EngineerAssignment {
                id: AssignmentId::new(10),
                engineer_id: EngineerId::new(100),
                task_id: TaskId::new(1),
                capacity_share: 0,
                start_date: date(2026, 3, 2),
                end_date: date(2026, 3, 2),
            })
            .await;
        let mut calendar = EngineerCalendar::new(CalendarId::new(5), EngineerId::new(100));
        for (offset, id) in (0..3).zip(1..) {
            calendar.days.push(CalendarDay::new(
                DayId::new(id),
                CalendarId::new(5),
                date(2026, 3, 2 + offset),
                DayType::Available,
            ));
        }
        store.insert_calendar(calendar).await;
        store
    }

    fn worker(store: &Arc<MemoryStore>) -> AssignmentEventWorker {
        AssignmentEventWorker::new(Arc::new(AssignmentLifecycleHandler::new(
            store.clone(),
            store.clone(),
            store.clone(),
        )))
    }

    #[tokio::test]
    async fn worker_processes_events_then_stops_on_channel_close() {
        let store = seeded_store().await;
        let worker = worker(&store);

        let (tx, rx) = mpsc::channel(8);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        tx.send(event(10, 100, 1, "created")).await.unwrap();
        drop(tx);
        worker.run(rx, shutdown_rx).await;

        let calendar = store.calendar(EngineerId::new(100)).await.unwrap();
        let assigned = calendar
            .days
            .iter()
            .filter(|d| d.day_type == DayType::Assigned)
            .count();
        assert_eq!(assigned, 2);
    }

    #[tokio::test]
    async fn worker_handles_same_task_events_in_arrival_order() {
        let store = seeded_store().await;
        let worker = worker(&store);

        let (tx, rx) = mpsc::channel(32);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        // Alternating create/delete pairs for one task: only strict arrival
        // order leaves every day released at the end.
        for _ in 0..5 {
            tx.send(event(10, 100, 1, "created")).await.unwrap();
            tx.send(event(10, 100, 1, "deleted")).await.unwrap();
        }
        drop(tx);
        worker.run(rx, shutdown_rx).await;

        let calendar = store.calendar(EngineerId::new(100)).await.unwrap();
        assert!(calendar.days.iter().all(|d| d.day_type == DayType::Available));
    }

    #[tokio::test]
    async fn worker_prunes_idle_task_queues() {
        let store = seeded_store().await;
        let worker = worker(&store);

        let (tx, rx) = mpsc::channel(8);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        tx.send(event(10, 100, 1, "created")).await.unwrap();
        tx.send(event(10, 100, 1, "deleted")).await.unwrap();
        tx.send(event(99, 999, 42, "created")).await.unwrap();
        drop(tx);
        worker.run(rx, shutdown_rx).await;

        assert!(worker.task_queues.lock().await.is_empty());
    }
}
