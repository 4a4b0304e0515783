//! Typed ID definitions for all backend entities.
//!
//! Identifiers are database-assigned integers; the newtypes only add
//! compile-time separation between entity kinds.

use crate::define_id;

// =============================================================================
// Planning Entities
// =============================================================================

define_id!(TaskId);
define_id!(EngineerId);
define_id!(AssignmentId);

// =============================================================================
// Calendar Entities
// =============================================================================

define_id!(CalendarId);
define_id!(DayId);
