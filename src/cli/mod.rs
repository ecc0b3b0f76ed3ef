//! Command-line interface
//!
//! Argument definitions plus the command handlers and logging utilities.

mod args;
mod commands;
mod logging;

pub use args::{AnalyzeArgs, Cli, Command, PredictArgs, TrainArgs};
pub use commands::run_command;
pub use logging::LogLevel;
