//! End-to-end integration tests for the Homelink backend.
//!
//! This crate carries no runtime code; all tests live under `tests/`
//! and drive the skill backend through its HTTP router with in-memory
//! collaborators.
