//! Shared test utilities for lint-sweeper integration tests
//!
//! Real git repositories stand in for remotes (a bare seed repository reached
//! over `file://`), while the code host and the linter are in-memory fakes that
//! record every call.

pub mod assertions;
pub mod fakes;
pub mod harness;
pub mod repository;
