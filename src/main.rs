use anyhow::Context;
use camara_review::{
    Disposition,
    cli::{Cli, Commands},
    commands::{self, ReviewRequest},
    config::ReviewConfig,
    report::{RunMetadata, SummaryLimits},
    telemetry::{self, TelemetryConfig},
};
use clap::Parser;
use colored::*;
use std::process::ExitCode;

fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    telemetry::init_telemetry(&TelemetryConfig::from_env(cli.verbose));

    let outcome = run(cli);
    if let Err(e) = &outcome {
        eprintln!("{} {:#}", "error:".red().bold(), e);
    }

    // Findings never reach this point; only infrastructure failures do.
    Disposition::from_outcome(&outcome).exit_code()
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ReviewConfig::from_env();

    match cli.command {
        Commands::Review {
            path,
            output,
            commonalities_version,
            review_type,
            tests_dir,
            repo_name,
            issue_number,
            pr_url,
            triggered_by,
            max_critical,
            max_items,
        } => {
            let request = ReviewRequest {
                path,
                tests_dir,
                commonalities_version: commonalities_version
                    .unwrap_or(config.commonalities_version),
                review_type: review_type.unwrap_or(config.review_type),
                metadata: RunMetadata::sanitized(
                    repo_name.as_deref(),
                    issue_number.as_deref(),
                    pr_url.as_deref(),
                    triggered_by.as_deref(),
                ),
            };
            let limits = SummaryLimits {
                max_critical: max_critical.unwrap_or(config.limits.max_critical),
                max_items: max_items.unwrap_or(config.limits.max_items),
            };
            commands::execute_review(&request, &output, &limits)
                .with_context(|| format!("review of {} failed", request.path.display()))?;
        }
        Commands::Rules {
            commonalities_version,
        } => {
            let version = commonalities_version.unwrap_or(config.commonalities_version);
            commands::execute_rules(&version)?;
        }
    }

    Ok(())
}
