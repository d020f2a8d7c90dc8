//! CLI subcommand implementations.

pub mod directory;
pub mod register;
pub mod report;
pub mod service;
pub mod status;
mod util;
