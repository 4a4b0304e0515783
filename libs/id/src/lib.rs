//! # devcap-id
//!
//! Typed entity IDs for the devcap capacity-planning backend.
//!
//! ## Design Principles
//!
//! - IDs are plain integers on the wire and in the stores; the newtypes exist
//!   so that a `TaskId` can never be passed where an `AssignmentId` is expected
//! - IDs serialize as bare integers to stay compatible with the event shape
//!   and the surrounding CRUD layer
//! - `Ord` follows the raw integer; the allocator relies on ascending ID order
//!   for deterministic tie-breaking

mod macros;
mod types;

pub use types::*;
