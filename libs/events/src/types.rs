//! Assignment event shapes.
//!
//! One event is published per assignment create/delete at the CRUD layer and
//! consumed by the allocation engine. Delivery is at-least-once; the engine
//! converges via idempotent recomputation, so events carry no sequence numbers.

use chrono::NaiveDate;
use devcap_id::{AssignmentId, EngineerId, TaskId};
use serde::{Deserialize, Serialize};

use crate::EventError;

/// All operation names as wire constants.
pub mod operations {
    pub const CREATED: &str = "created";
    pub const DELETED: &str = "deleted";
}

/// Assignment lifecycle operation.
///
/// Closed enum: handlers match it exhaustively, so a new operation kind added
/// here forces every dispatch site to be revisited at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentOperation {
    Created,
    Deleted,
}

impl AssignmentOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => operations::CREATED,
            Self::Deleted => operations::DELETED,
        }
    }
}

impl std::fmt::Display for AssignmentOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AssignmentOperation {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            operations::CREATED => Ok(Self::Created),
            operations::DELETED => Ok(Self::Deleted),
            other => Err(EventError::UnknownOperation(other.to_string())),
        }
    }
}

/// An assignment lifecycle event as it arrives from the transport.
///
/// `operation` is kept as the raw wire string for forward compatibility:
/// an unknown kind still deserializes, gets logged, and is skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentEvent {
    pub assignment_id: AssignmentId,
    pub engineer_id: EngineerId,
    pub task_id: TaskId,
    /// Share as published by the CRUD layer. Informational: the engine
    /// recomputes shares from the calendar, it never trusts this value.
    pub capacity_share: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub operation: String,
}

impl AssignmentEvent {
    /// Parses the wire operation string into the closed enum.
    pub fn operation(&self) -> Result<AssignmentOperation, EventError> {
        self.operation.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_operation_roundtrip() {
        for op in [AssignmentOperation::Created, AssignmentOperation::Deleted] {
            let parsed: AssignmentOperation = op.as_str().parse().unwrap();
            assert_eq!(parsed, op);
        }
    }

    #[test]
    fn test_operation_serialization() {
        assert_eq!(
            serde_json::to_string(&AssignmentOperation::Created).unwrap(),
            "\"created\""
        );
        assert_eq!(
            serde_json::to_string(&AssignmentOperation::Deleted).unwrap(),
            "\"deleted\""
        );
    }

    #[test]
    fn test_unknown_operation_is_an_error() {
        let err = "reassigned".parse::<AssignmentOperation>().unwrap_err();
        assert!(matches!(err, EventError::UnknownOperation(ref s) if s == "reassigned"));
    }

    #[test]
    fn test_event_decodes_with_unknown_operation() {
        // Unknown kinds must decode; rejection happens at dispatch, not decode.
        let json = r#"{
            "assignmentId": 5,
            "engineerId": 2,
            "taskId": 9,
            "capacityShare": 0,
            "startDate": "2026-03-02",
            "endDate": "2026-03-06",
            "operation": "rescheduled"
        }"#;
        let event: AssignmentEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.task_id.value(), 9);
        assert!(event.operation().is_err());
    }

    proptest! {
        // Arbitrary operation strings never panic the parser, and errors
        // carry the verbatim wire value for logging.
        #[test]
        fn prop_operation_parse_total(op in "\\PC*") {
            match op.parse::<AssignmentOperation>() {
                Ok(parsed) => prop_assert_eq!(parsed.as_str(), op),
                Err(EventError::UnknownOperation(raw)) => prop_assert_eq!(raw, op),
                Err(other) => prop_assert!(false, "unexpected error: {}", other),
            }
        }
    }

    #[test]
    fn test_event_roundtrip() {
        let event = AssignmentEvent {
            assignment_id: 1.into(),
            engineer_id: 2.into(),
            task_id: 3.into(),
            capacity_share: 4,
            start_date: date(2026, 1, 5),
            end_date: date(2026, 1, 9),
            operation: operations::CREATED.to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"startDate\":\"2026-01-05\""));
        let parsed: AssignmentEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.assignment_id, event.assignment_id);
        assert_eq!(parsed.operation().unwrap(), AssignmentOperation::Created);
    }
}
