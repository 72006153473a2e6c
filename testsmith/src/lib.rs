//! Test-first code-generation loop runner.
//!
//! This crate drives an LLM backend through a fixed generate/execute/classify
//! cycle: propose unit-test ideas for a requirement, write pytest code and a
//! stub implementation, confirm the tests fail against the stub, then generate
//! real implementations until the tests pass. The architecture enforces a
//! strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (workflow state, outcome
//!   classification, transition table). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (artifact files, virtualenv
//!   sandbox, LLM transport, console). Isolated to enable scripting in tests.
//!
//! The [`engine`] module coordinates core logic with I/O to implement the
//! full loop behind the `testsmith run` command.

pub mod core;
pub mod engine;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
