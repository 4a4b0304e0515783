//! Store contracts consumed by the allocation engine.
//!
//! Persistence technology lives with the surrounding CRUD layer; the engine
//! only sees these narrow read/write contracts. `MemoryStore` backs tests and
//! the binary's dev mode.

use std::collections::HashMap;

use async_trait::async_trait;
use devcap_domain::{CalendarDay, EngineerAssignment, EngineerCalendar, Task};
use devcap_id::{AssignmentId, EngineerId, TaskId};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Point reads/writes for tasks.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn get_by_id(&self, id: TaskId) -> StoreResult<Option<Task>>;

    /// Returns false when the task no longer exists.
    async fn update(&self, task: &Task) -> StoreResult<bool>;
}

/// Point reads/writes for engineer assignments.
#[async_trait]
pub trait AssignmentStore: Send + Sync {
    async fn get_by_id(&self, id: AssignmentId) -> StoreResult<Option<EngineerAssignment>>;

    /// All assignments linked to a task, ascending by assignment ID.
    async fn get_by_task_id(&self, task_id: TaskId) -> StoreResult<Vec<EngineerAssignment>>;

    /// All assignments held by an engineer, ascending by assignment ID.
    async fn get_by_engineer_id(
        &self,
        engineer_id: EngineerId,
    ) -> StoreResult<Vec<EngineerAssignment>>;

    /// Returns false when the assignment no longer exists.
    async fn update(&self, assignment: &EngineerAssignment) -> StoreResult<bool>;
}

/// Point reads and single-day upserts for engineer calendars.
#[async_trait]
pub trait CalendarStore: Send + Sync {
    async fn get_by_engineer_id(
        &self,
        engineer_id: EngineerId,
    ) -> StoreResult<Option<EngineerCalendar>>;

    /// Upserts one day. Must never cascade onto sibling days; unrelated days,
    /// including ones belonging to other tasks, survive untouched.
    ///
    /// Returns false when the owning calendar does not exist.
    async fn update_day(&self, day: &CalendarDay) -> StoreResult<bool>;
}

/// In-memory store backing tests and the binary's dev mode.
#[derive(Default)]
pub struct MemoryStore {
    tasks: RwLock<HashMap<TaskId, Task>>,
    assignments: RwLock<HashMap<AssignmentId, EngineerAssignment>>,
    calendars: RwLock<HashMap<EngineerId, EngineerCalendar>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_task(&self, task: Task) {
        self.tasks.write().await.insert(task.id, task);
    }

    pub async fn insert_assignment(&self, assignment: EngineerAssignment) {
        self.assignments
            .write()
            .await
            .insert(assignment.id, assignment);
    }

    /// Removes an assignment record, as the CRUD layer does before publishing
    /// a `deleted` event.
    pub async fn remove_assignment(&self, id: AssignmentId) -> Option<EngineerAssignment> {
        self.assignments.write().await.remove(&id)
    }

    pub async fn insert_calendar(&self, mut calendar: EngineerCalendar) {
        calendar.sort_days();
        self.calendars
            .write()
            .await
            .insert(calendar.engineer_id, calendar);
    }

    // Snapshot reads. Unlike the trait getters these cannot fail, and they
    // stay unambiguous when all three store traits are in scope.

    pub async fn task(&self, id: TaskId) -> Option<Task> {
        self.tasks.read().await.get(&id).cloned()
    }

    pub async fn assignment(&self, id: AssignmentId) -> Option<EngineerAssignment> {
        self.assignments.read().await.get(&id).cloned()
    }

    pub async fn calendar(&self, engineer_id: EngineerId) -> Option<EngineerCalendar> {
        self.calendars.read().await.get(&engineer_id).cloned()
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn get_by_id(&self, id: TaskId) -> StoreResult<Option<Task>> {
        Ok(self.tasks.read().await.get(&id).cloned())
    }

    async fn update(&self, task: &Task) -> StoreResult<bool> {
        let mut tasks = self.tasks.write().await;
        match tasks.get_mut(&task.id) {
            Some(existing) => {
                *existing = task.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl AssignmentStore for MemoryStore {
    async fn get_by_id(&self, id: AssignmentId) -> StoreResult<Option<EngineerAssignment>> {
        Ok(self.assignments.read().await.get(&id).cloned())
    }

    async fn get_by_task_id(&self, task_id: TaskId) -> StoreResult<Vec<EngineerAssignment>> {
        let mut linked: Vec<_> = self
            .assignments
            .read()
            .await
            .values()
            .filter(|a| a.task_id == task_id)
            .cloned()
            .collect();
        linked.sort_by_key(|a| a.id);
        Ok(linked)
    }

    async fn get_by_engineer_id(
        &self,
        engineer_id: EngineerId,
    ) -> StoreResult<Vec<EngineerAssignment>> {
        let mut held: Vec<_> = self
            .assignments
            .read()
            .await
            .values()
            .filter(|a| a.engineer_id == engineer_id)
            .cloned()
            .collect();
        held.sort_by_key(|a| a.id);
        Ok(held)
    }

    async fn update(&self, assignment: &EngineerAssignment) -> StoreResult<bool> {
        let mut assignments = self.assignments.write().await;
        match assignments.get_mut(&assignment.id) {
            Some(existing) => {
                *existing = assignment.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl CalendarStore for MemoryStore {
    async fn get_by_engineer_id(
        &self,
        engineer_id: EngineerId,
    ) -> StoreResult<Option<EngineerCalendar>> {
        Ok(self.calendars.read().await.get(&engineer_id).cloned())
    }

    async fn update_day(&self, day: &CalendarDay) -> StoreResult<bool> {
        let mut calendars = self.calendars.write().await;
        let Some(calendar) = calendars.values_mut().find(|c| c.id == day.calendar_id) else {
            debug!(calendar_id = %day.calendar_id, day_id = %day.id, "Calendar not found for day upsert");
            return Ok(false);
        };

        // Single-day upsert: replace in place or insert, siblings untouched.
        match calendar.days.iter_mut().find(|d| d.id == day.id) {
            Some(existing) => *existing = day.clone(),
            None => {
                calendar.days.push(day.clone());
                calendar.sort_days();
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use devcap_domain::DayType;
    use devcap_id::{CalendarId, DayId};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn sample_calendar() -> EngineerCalendar {
        let mut cal = EngineerCalendar::new(CalendarId::new(1), EngineerId::new(1));
        for i in 0..3 {
            cal.days.push(CalendarDay::new(
                DayId::new(i + 1),
                cal.id,
                date(2 + i as u32),
                DayType::Available,
            ));
        }
        cal
    }

    #[tokio::test]
    async fn test_update_day_leaves_siblings_alone() {
        let store = MemoryStore::new();
        store.insert_calendar(sample_calendar()).await;

        let mut day = CalendarDay::new(DayId::new(2), CalendarId::new(1), date(3), DayType::Available);
        day.assign(AssignmentId::new(9)).unwrap();
        assert!(store.update_day(&day).await.unwrap());

        let cal = store.calendar(EngineerId::new(1)).await.unwrap();
        assert_eq!(cal.days.len(), 3);
        assert_eq!(cal.days[1].day_type, DayType::Assigned);
        assert_eq!(cal.days[0].day_type, DayType::Available);
        assert_eq!(cal.days[2].day_type, DayType::Available);
    }

    #[tokio::test]
    async fn test_update_day_without_calendar_is_false() {
        let store = MemoryStore::new();
        let day = CalendarDay::new(DayId::new(1), CalendarId::new(9), date(2), DayType::Available);
        assert!(!store.update_day(&day).await.unwrap());
    }

    #[tokio::test]
    async fn test_get_by_task_id_sorted() {
        let store = MemoryStore::new();
        for id in [5, 1, 3] {
            store
                .insert_assignment(EngineerAssignment {
                    id: AssignmentId::new(id),
                    engineer_id: EngineerId::new(id),
                    task_id: TaskId::new(7),
                    capacity_share: 0,
                    start_date: date(2),
                    end_date: date(2),
                })
                .await;
        }
        let linked = store.get_by_task_id(TaskId::new(7)).await.unwrap();
        let ids: Vec<_> = linked.iter().map(|a| a.id.value()).collect();
        assert_eq!(ids, vec![1, 3, 5]);
    }
}
