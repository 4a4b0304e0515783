//! devcap capacity-engine library.
//!
//! This crate primarily ships a `capacity-engine` binary, but we expose the
//! library surface to enable integration testing and reuse.

pub mod config;
pub mod handler;
pub mod stores;
pub mod worker;
