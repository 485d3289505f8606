//! Invocation of the external ALDEx2 engine.
//!
//! The statistics are computed by an R script (`run_aldex2.R` by default).
//! This module writes the count table and condition column to a scoped
//! temporary directory, runs the script once, and parses its summary into a
//! [`ResultsTable`](crate::data::ResultsTable).

mod command;
mod config;
mod invoke;

pub use command::{run_command, EngineCommand};
pub use config::{Aldex2Config, DEFAULT_ENGINE};
pub use invoke::aldex2;
