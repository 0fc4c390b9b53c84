//! CLI command implementations
//!
//! This module contains all command implementations for the arbor CLI.

pub mod entity;
pub mod group;
pub mod info;
pub mod token;
pub mod write_config;
