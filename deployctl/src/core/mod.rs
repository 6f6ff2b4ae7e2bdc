//! Deterministic, pure logic shared by the command layer.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! values and return deterministic outputs suitable for tests.

pub mod flag_order;
pub mod outcome;
pub mod refs;
pub mod target_pattern;
pub mod variables;
