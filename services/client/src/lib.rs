//! Reynard Console Client Library
//!
//! Configuration and the console-side speech collaborators for the Reynard
//! assistant. The `reynard` binary is a thin wrapper around this library and
//! the core crate.

pub mod config;
pub mod voice;
