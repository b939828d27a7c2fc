//! Workspace-level integration tests for the Appwrite client
//!
//! The tests themselves live under `tests/`; this crate only re-exports the
//! library they exercise.

pub use appwrite_client;
