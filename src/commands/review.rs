use crate::loader::DefinitionScanner;
use crate::report::{self, RunMetadata, SummaryLimits, ValidationReport};
use crate::validation::{ReviewOptions, ReviewType, RuleEngine, Severity, resolve_version};
use crate::Result;
use colored::*;
use std::path::{Path, PathBuf};

/// Inputs of one review run.
#[derive(Debug, Clone)]
pub struct ReviewRequest {
    pub path: PathBuf,
    pub tests_dir: Option<PathBuf>,
    pub commonalities_version: String,
    pub review_type: ReviewType,
    pub metadata: RunMetadata,
}

/// Load, evaluate and aggregate. Fails only when the input cannot be read at
/// all; every problem with the definitions themselves is a finding.
pub fn run_review(request: &ReviewRequest) -> Result<ValidationReport> {
    let resolution = resolve_version(&request.commonalities_version);
    tracing::info!(
        "Reviewing {} against Commonalities {} (rules v{})",
        request.path.display(),
        resolution.requested,
        resolution.resolved
    );

    let outcome = DefinitionScanner::new(&request.path)
        .with_tests_dir(request.tests_dir.clone())
        .scan()?;

    let catalog = resolution.resolved.catalog();
    let options = ReviewOptions {
        resolution: resolution.clone(),
        review_type: request.review_type,
    };
    let engine = RuleEngine::new(&catalog, &options);

    let mut findings = outcome.findings;
    findings.extend(engine.run(&outcome.documents, outcome.test_definitions.as_ref()));

    let test_files = outcome.test_definitions.as_ref().map(|definitions| {
        definitions
            .features
            .iter()
            .map(|f| f.file_name.clone())
            .collect()
    });

    Ok(ValidationReport::aggregate(
        &outcome.documents,
        outcome.sources,
        findings,
        resolution,
        request.review_type,
        request.metadata.clone(),
    )
    .with_test_files(test_files))
}

pub fn execute_review(
    request: &ReviewRequest,
    output_dir: &Path,
    limits: &SummaryLimits,
) -> Result<()> {
    println!("{}", "Reviewing API definitions...".bright_blue());
    println!("  Path: {}", request.path.display());
    println!("  Review type: {}", request.review_type);

    let outcome = run_review(request)
        .and_then(|report| report::write_artifacts(&report, output_dir, limits).map(|a| (report, a)));

    let (report, artifacts) = match outcome {
        Ok(done) => done,
        Err(e) => {
            println!("{}", "✗ Review could not run".red().bold());
            println!("  {}", e.to_string().red());
            if let Err(write_error) = report::write_failure_summary(output_dir, &e.to_string()) {
                tracing::warn!("Failed to write failure summary: {}", write_error);
            }
            return Err(e);
        }
    };

    if report.is_fallback() {
        println!(
            "{}",
            format!(
                "⚠ Commonalities {} is not implemented, used v{} rules",
                report.resolution.requested,
                report.resolved_version()
            )
            .yellow()
        );
    }
    println!();

    for document in &report.documents {
        let counts = document.counts();
        println!(
            "  {} {} ({})",
            "API:".bright_cyan(),
            document.api_name.bold(),
            document.file_name
        );
        println!(
            "     {} critical, {} medium, {} low",
            counts.critical.to_string().red(),
            counts.medium.to_string().yellow(),
            counts.low
        );
    }
    for finding in report
        .run_findings
        .iter()
        .filter(|f| f.severity == Severity::Critical)
    {
        println!("  {}", finding.format().red());
    }

    let counts = report.counts();
    println!();
    println!(
        "{}",
        format!(
            "Review completed: {} critical, {} medium, {} low ({})",
            counts.critical,
            counts.medium,
            counts.low,
            report.recommendation()
        )
        .green()
        .bold()
    );
    println!("  Report: {}", artifacts.json.display());
    println!("  Summary: {}", artifacts.summary.display());
    println!("  Detailed: {}", artifacts.detailed.display());

    Ok(())
}
