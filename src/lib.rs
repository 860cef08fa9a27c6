//! vidrelay - short-lived video relay
//!
//! This library crate exposes the core functionality for integration testing.

pub mod acquisition;
pub mod config;
pub mod retention;
pub mod server;
pub mod streaming;
