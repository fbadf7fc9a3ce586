pub mod cli;
pub mod commands;
pub mod config;
pub mod disposition;
pub mod error;
pub mod loader;
pub mod models;
pub mod report;
pub mod telemetry;
pub mod validation;

pub use disposition::Disposition;
pub use error::{Result, ReviewError, RuleError};
