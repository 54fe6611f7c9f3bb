//! Content Guardian - text moderation service.
//!
//! This crate holds the binary's argument parsing and component wiring, kept
//! in a library so both can be tested without starting a server.

pub mod cli;
pub mod wiring;
