use super::finding::{Category, Finding, Severity, Violation};
use super::rule::{ProjectContext, ReviewOptions, Rule, RuleContext};
use super::ruleset::RuleCatalog;
use crate::error::RuleError;
use crate::loader::TestDefinitions;
use crate::models::ApiDocument;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

pub const RULE_ERROR_ID: &str = "rule-evaluation-error";

/// Applies a catalog to loaded documents.
///
/// Every rule call, applicability predicate included, is isolated: an error
/// or a panic inside one rule becomes a critical finding and the remaining
/// rules still run.
pub struct RuleEngine<'a> {
    catalog: &'a RuleCatalog,
    options: &'a ReviewOptions,
}

impl<'a> RuleEngine<'a> {
    pub fn new(catalog: &'a RuleCatalog, options: &'a ReviewOptions) -> Self {
        Self { catalog, options }
    }

    /// Findings for all documents in catalog order, followed by project-level
    /// findings.
    pub fn run(
        &self,
        documents: &[ApiDocument],
        test_definitions: Option<&TestDefinitions>,
    ) -> Vec<Finding> {
        let mut findings = Vec::new();

        for document in documents {
            findings.extend(self.evaluate_document(document));
        }

        if documents.is_empty() {
            return findings;
        }

        let project = ProjectContext {
            documents,
            test_definitions,
            options: self.options,
        };

        for rule in self.catalog.project_rules() {
            let outcome = isolate(|| {
                if !rule.applies_to(&project) {
                    return Ok(None);
                }
                tracing::debug!("Evaluating project rule {}", rule.id());
                rule.check(&project).map(Some)
            });

            match outcome {
                Ok(None) => {}
                Ok(Some(violations)) => findings.extend(violations.into_iter().map(|v| {
                    stamp(
                        rule.id(),
                        rule.severity(),
                        rule.category(),
                        &v.document,
                        v.violation,
                    )
                })),
                Err(e) => {
                    tracing::warn!("Project rule {} failed: {}", rule.id(), e);
                    findings.push(
                        Finding::new(
                            RULE_ERROR_ID,
                            Severity::Critical,
                            Category::Internal,
                            format!("Rule `{}` failed: {}", rule.id(), e),
                        )
                        .with_fix("Report this document shape to the validator maintainers"),
                    );
                }
            }
        }

        findings
    }

    pub fn evaluate_document(&self, document: &ApiDocument) -> Vec<Finding> {
        let ctx = RuleContext::new(document, self.options);
        let mut findings = Vec::new();

        for rule in self.catalog.rules() {
            let outcome = isolate(|| {
                if !rule.applies_to(&ctx) {
                    return Ok(None);
                }
                rule.check(&ctx).map(Some)
            });

            match outcome {
                Ok(None) => {}
                Ok(Some(violations)) => {
                    if !violations.is_empty() {
                        tracing::debug!(
                            "{}: {} reported {} violation(s)",
                            document.file_name,
                            rule.id(),
                            violations.len()
                        );
                    }
                    findings.extend(violations.into_iter().map(|v| {
                        stamp(
                            rule.id(),
                            rule.severity(),
                            rule.category(),
                            &document.file_name,
                            v,
                        )
                    }));
                }
                Err(e) => {
                    tracing::warn!("{}: rule {} failed: {}", document.file_name, rule.id(), e);
                    findings.push(rule_error(rule.as_ref(), document, &e));
                }
            }
        }

        findings
    }
}

fn stamp(
    rule_id: &str,
    severity: Severity,
    category: Category,
    document: &str,
    violation: Violation,
) -> Finding {
    let finding = Finding::new(rule_id, severity, category, violation.message)
        .with_location(violation.location)
        .with_document(document);
    match violation.fix {
        Some(fix) => finding.with_fix(fix),
        None => finding,
    }
}

fn rule_error(rule: &dyn Rule, document: &ApiDocument, error: &RuleError) -> Finding {
    let location = match error {
        RuleError::UnexpectedShape { location, .. } => location.clone(),
        RuleError::Panicked(_) => Default::default(),
    };
    Finding::new(
        RULE_ERROR_ID,
        Severity::Critical,
        Category::Internal,
        format!("Rule `{}` could not evaluate this document: {}", rule.id(), error),
    )
    .with_location(location)
    .with_document(&document.file_name)
}

fn isolate<T>(check: impl FnOnce() -> Result<T, RuleError>) -> Result<T, RuleError> {
    match panic::catch_unwind(AssertUnwindSafe(check)) {
        Ok(result) => result,
        Err(payload) => Err(RuleError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
