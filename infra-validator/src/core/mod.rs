//! Deterministic, pure logic shared by the validator.
//!
//! Core modules must be free of I/O side effects. They operate on captured
//! command output and return deterministic values suitable for tests.

pub mod parse;
pub mod shapes;
pub mod types;
