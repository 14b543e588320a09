//! Library components for the report repointing CLI.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod summary;
pub mod types;
