use crate::models::NodePath;
use std::path::PathBuf;
use thiserror::Error;

/// Failures that prevent a report from being produced at all.
///
/// Problems found in the API definitions themselves are never errors; they
/// are reported as findings.
#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("Failed to load OpenAPI file: {0}")]
    OpenApiLoadError(String),

    #[error("Cannot read directory {}: {source}", path.display())]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write report {}: {source}", path.display())]
    ReportWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ReviewError>;

/// Failure of a single rule on a single document.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleError {
    #[error("expected {expected} at `{location}`, found {found}")]
    UnexpectedShape {
        location: NodePath,
        expected: &'static str,
        found: &'static str,
    },

    #[error("rule panicked: {0}")]
    Panicked(String),
}
