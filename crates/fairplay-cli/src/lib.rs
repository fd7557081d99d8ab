//! Command-line and menu front ends: configuration, reports and exports.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod export;
pub mod menu;
pub mod report;

pub use config::AppConfig;
pub use error::CliError;
