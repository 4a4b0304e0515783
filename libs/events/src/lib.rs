//! # devcap-events
//!
//! Assignment lifecycle event definitions for the devcap backend.
//!
//! ## Design Principles
//!
//! - Events describe something that already happened at the CRUD layer; the
//!   engine never rejects one back to its producer
//! - The `operation` field stays a string on the wire so that unknown
//!   operation kinds decode cleanly and can be logged and skipped
//! - Inside the engine, operations are a closed enum matched exhaustively
//!
//! The transport (topic, broker, bus serialization) is an external concern;
//! this crate only defines the decoded shape.

mod error;
mod types;

pub use error::EventError;
pub use types::*;
