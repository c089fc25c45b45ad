//! oraexec scenario test suite
//!
//! End-to-end tests of the command executor running against an in-memory
//! scripted driver. The driver behaves like a database client library from
//! the executor's point of view: it opens sessions, binds parameters, fills
//! output values, hands out ref cursors tied to their session, and fails the
//! way a real server would (TNS errors, ORA- codes, slow commands).
//!
//! # Test Categories
//!
//! - Connection policies and handle chaining across calls
//! - Parameter binding (by name, by position, definitions from JSON)
//! - Result shapes (affected rows, raw parameters, XML, JSON)
//! - Ref cursors (draining, staleness, passing a cursor to a second call)
//! - Connection cache (reuse, concurrent creation, expiry)
//! - Error reporting (throw vs. captured failures, timeouts)
//!
//! # Usage
//!
//! ```bash
//! cargo test -p oraexec-driver-tests
//!
//! # With executor logs
//! RUST_LOG=oraexec_command=debug cargo test -p oraexec-driver-tests -- --nocapture
//! ```

#![warn(clippy::all)]

pub mod fixtures;
pub mod memory;

#[cfg(test)]
mod cache_tests;

#[cfg(test)]
mod connection_tests;

#[cfg(test)]
mod cursor_tests;

#[cfg(test)]
mod error_tests;

#[cfg(test)]
mod parameter_tests;

#[cfg(test)]
mod result_tests;
