use crate::validation::{RulesetVersion, resolve_version};
use crate::Result;
use colored::*;

pub fn execute_rules(commonalities_version: &str) -> Result<()> {
    let implemented: Vec<&str> = RulesetVersion::IMPLEMENTED.iter().map(|v| v.tag()).collect();
    println!(
        "{} {}",
        "Implemented rulesets:".bright_blue(),
        implemented.join(", ")
    );

    let resolution = resolve_version(commonalities_version);
    if resolution.mismatch {
        println!(
            "{}",
            format!(
                "⚠ Commonalities {} is not implemented, showing v{}",
                resolution.requested, resolution.resolved
            )
            .yellow()
        );
    }

    let catalog = resolution.resolved.catalog();
    println!();
    println!(
        "{}",
        format!("Rules v{} ({}):", catalog.version(), catalog.len()).bold()
    );

    for rule in catalog.rules() {
        println!(
            "  {:<40} {:<8} {:<22} {}",
            rule.id().cyan(),
            rule.severity().to_string(),
            rule.category().to_string(),
            rule.summary()
        );
    }

    if !catalog.project_rules().is_empty() {
        println!();
        println!("{}", "Project rules:".bold());
        for rule in catalog.project_rules() {
            println!(
                "  {:<40} {:<8} {:<22} {}",
                rule.id().cyan(),
                rule.severity().to_string(),
                rule.category().to_string(),
                rule.summary()
            );
        }
    }

    Ok(())
}
