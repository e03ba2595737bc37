//! Shared helpers for the dashboard cache integration tests.

pub mod containers;
