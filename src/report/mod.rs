mod aggregate;
mod metadata;
mod render;

pub use aggregate::{DocumentReport, Recommendation, SeverityCounts, ValidationReport};
pub use metadata::RunMetadata;
pub use render::{
    DEFAULT_MAX_CRITICAL, DEFAULT_MAX_ITEMS, SummaryLimits, detailed_report_file_name,
    escape_html, render_detailed, render_failure_summary, render_json, render_summary,
};

use crate::error::{Result, ReviewError};
use std::fs;
use std::path::{Path, PathBuf};

pub const JSON_REPORT_FILE: &str = "api-review-report.json";
pub const SUMMARY_FILE: &str = "summary.md";

/// Paths of the files written for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArtifacts {
    pub json: PathBuf,
    pub summary: PathBuf,
    pub detailed: PathBuf,
}

fn write_file(path: PathBuf, content: &str) -> Result<PathBuf> {
    fs::write(&path, content).map_err(|source| ReviewError::ReportWrite {
        path: path.clone(),
        source,
    })?;
    tracing::debug!("Wrote {}", path.display());
    Ok(path)
}

fn ensure_dir(output_dir: &Path) -> Result<()> {
    fs::create_dir_all(output_dir).map_err(|source| ReviewError::ReportWrite {
        path: output_dir.to_path_buf(),
        source,
    })
}

/// Write the JSON report, the summary and the detailed report into
/// `output_dir`, creating it if needed.
pub fn write_artifacts(
    report: &ValidationReport,
    output_dir: &Path,
    limits: &SummaryLimits,
) -> Result<ReportArtifacts> {
    ensure_dir(output_dir)?;

    let json = render_json(report)?;
    Ok(ReportArtifacts {
        json: write_file(output_dir.join(JSON_REPORT_FILE), &json)?,
        summary: write_file(
            output_dir.join(SUMMARY_FILE),
            &render_summary(report, limits),
        )?,
        detailed: write_file(
            output_dir.join(detailed_report_file_name(report)),
            &render_detailed(report),
        )?,
    })
}

/// Best-effort summary for a run that failed before a report existed.
pub fn write_failure_summary(output_dir: &Path, error: &str) -> Result<PathBuf> {
    ensure_dir(output_dir)?;
    write_file(output_dir.join(SUMMARY_FILE), &render_failure_summary(error))
}
