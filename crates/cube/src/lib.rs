//! Cube REST client implementing the dashboard query backend.

pub mod client;
pub mod config;
pub mod health;

pub use client::*;
pub use config::*;
