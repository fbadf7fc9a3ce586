use camara_review::Disposition;
use camara_review::commands::{ReviewRequest, execute_review, run_review};
use camara_review::report::{
    self, JSON_REPORT_FILE, Recommendation, RunMetadata, SUMMARY_FILE, SummaryLimits,
    ValidationReport, render_json, render_summary,
};
use camara_review::validation::{Finding, ReviewType, Severity};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const REPOSITORY: &str = "tests/fixtures/repository";
const DEFECTS: &str = "tests/fixtures/defects";

fn request(path: &Path, version: &str) -> ReviewRequest {
    ReviewRequest {
        path: path.to_path_buf(),
        tests_dir: None,
        commonalities_version: version.to_string(),
        review_type: ReviewType::ReleaseCandidate,
        metadata: RunMetadata::sanitized(Some("QualityOnDemand"), Some("42"), None, None),
    }
}

fn review(path: &str) -> ValidationReport {
    run_review(&request(Path::new(path), "0.6")).unwrap()
}

fn findings_of<'a>(report: &'a ValidationReport, rule_id: &str) -> Vec<&'a Finding> {
    report.findings().filter(|f| f.rule_id == rule_id).collect()
}

#[test]
fn empty_directory_is_blocked_but_succeeds() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("out");

    let report = run_review(&request(temp_dir.path(), "0.6")).unwrap();
    assert_eq!(report.recommendation(), Recommendation::Blocked);
    assert_eq!(report.counts().critical, 1);
    assert_eq!(report.counts().total(), 1);
    assert!(report.run_findings[0].message.contains("No API definition files found"));

    let outcome = execute_review(
        &request(temp_dir.path(), "0.6"),
        &output,
        &SummaryLimits::default(),
    );
    assert_eq!(Disposition::from_outcome(&outcome), Disposition::Success);
    assert!(output.join(JSON_REPORT_FILE).is_file());
    assert!(output.join(SUMMARY_FILE).is_file());
}

#[test]
fn authentication_required_is_reported() {
    let report = review(DEFECTS);
    let findings = findings_of(&report, "unauthenticated-error-code");
    assert_eq!(findings.len(), 1);
    assert!(findings[0].message.contains("AUTHENTICATION_REQUIRED"));
    assert_eq!(findings[0].document.as_deref(), Some("legacy-codes.yaml"));

    let clean = review(REPOSITORY);
    assert!(findings_of(&clean, "unauthenticated-error-code").is_empty());
}

#[test]
fn described_request_body_schema_points_at_description() {
    let report = review(DEFECTS);
    let findings = findings_of(&report, "request-body-schema-description");
    assert_eq!(findings.len(), 1);
    assert_eq!(
        findings[0].location.to_strings(),
        vec!["components", "schemas", "Foo", "description"]
    );

    let clean = review(REPOSITORY);
    assert!(findings_of(&clean, "request-body-schema-description").is_empty());
}

#[test]
fn undefined_security_scheme_is_critical() {
    let report = review(DEFECTS);
    let findings = findings_of(&report, "security-scheme-defined");
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].severity, Severity::Critical);
    assert!(findings[0].message.contains("`legacyAuth`"));
}

#[test]
fn unparseable_file_does_not_block_the_others() {
    let report = review(DEFECTS);
    assert_eq!(report.documents.len(), 1);
    assert_eq!(report.sources.len(), 2);

    let load_errors = findings_of(&report, "document-load");
    assert_eq!(load_errors.len(), 1);
    assert_eq!(load_errors[0].severity, Severity::Critical);
    assert_eq!(load_errors[0].document.as_deref(), Some("broken.yml"));
}

#[test]
fn wip_version_depends_on_review_type() {
    let report = review(DEFECTS);
    assert_eq!(findings_of(&report, "wip-version-in-release").len(), 1);

    let mut wip = request(Path::new(DEFECTS), "0.6");
    wip.review_type = ReviewType::Wip;
    let report = run_review(&wip).unwrap();
    assert!(findings_of(&report, "wip-version-in-release").is_empty());
}

#[test]
fn repository_layout_enables_test_alignment() {
    let report = review(REPOSITORY);
    assert_eq!(
        report.test_files.as_deref(),
        Some(
            &[
                "location-verification.feature".to_string(),
                "quality-on-demand-createSession.feature".to_string()
            ][..]
        )
    );

    let orphans = findings_of(&report, "test-orphan-files");
    assert_eq!(orphans.len(), 1);
    assert!(orphans[0].message.contains("location-verification.feature"));
    assert!(findings_of(&report, "test-definitions-present").is_empty());
    assert!(findings_of(&report, "test-operation-ids").is_empty());
    assert!(findings_of(&report, "test-feature-version").is_empty());
}

#[test]
fn json_report_is_reproducible() {
    let first = render_json(&review(REPOSITORY)).unwrap();
    let second = render_json(&review(REPOSITORY)).unwrap();
    assert_eq!(first, second);

    let temp_dir = TempDir::new().unwrap();
    let (a, b) = (temp_dir.path().join("a"), temp_dir.path().join("b"));
    let limits = SummaryLimits::default();
    report::write_artifacts(&review(DEFECTS), &a, &limits).unwrap();
    report::write_artifacts(&review(DEFECTS), &b, &limits).unwrap();
    assert_eq!(
        fs::read(a.join(JSON_REPORT_FILE)).unwrap(),
        fs::read(b.join(JSON_REPORT_FILE)).unwrap()
    );
}

#[test]
fn json_counts_match_findings() {
    let report = review(DEFECTS);
    let value: serde_json::Value = serde_json::from_str(&render_json(&report).unwrap()).unwrap();

    let mut critical = value["run_findings"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|f| f["severity"] == "critical")
        .count();
    for document in value["documents"].as_array().unwrap() {
        let listed = document["findings"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|f| f["severity"] == "critical")
            .count();
        assert_eq!(document["counts"]["critical"], listed);
        critical += listed;
    }
    assert_eq!(value["counts"]["critical"], critical);
    assert_eq!(value["recommendation"], "blocked");
}

#[test]
fn unimplemented_version_falls_back_with_notice() {
    let report = run_review(&request(Path::new(REPOSITORY), "0.9")).unwrap();
    assert_eq!(report.resolution.requested, "0.9");
    assert_eq!(report.resolved_version().tag(), "0.6");
    assert!(report.is_fallback());

    let summary = render_summary(&report, &SummaryLimits::default());
    assert!(summary.contains("`0.9` is not implemented"));
    assert!(summary.contains("v0.6 rules"));

    let value: serde_json::Value = serde_json::from_str(&render_json(&report).unwrap()).unwrap();
    assert_eq!(value["version_mismatch"], true);
}

#[test]
fn unwritable_output_is_an_infrastructure_failure() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("not-a-directory");
    fs::write(&output, "occupied").unwrap();

    let outcome = execute_review(
        &request(Path::new(DEFECTS), "0.6"),
        &output,
        &SummaryLimits::default(),
    );
    assert!(outcome.is_err());
    assert_eq!(
        Disposition::from_outcome(&outcome),
        Disposition::InfrastructureFailure
    );
}

#[test]
fn findings_never_change_disposition() {
    let temp_dir = TempDir::new().unwrap();
    for (path, version) in [(DEFECTS, "0.6"), (REPOSITORY, "0.9"), (REPOSITORY, "0.6")] {
        let output = temp_dir.path().join(format!("{}-{}", version, path.len()));
        let outcome = execute_review(
            &request(Path::new(path), version),
            &output,
            &SummaryLimits::default(),
        );
        assert_eq!(Disposition::from_outcome(&outcome), Disposition::Success);
    }
}

#[test]
fn tests_dir_that_is_a_file_still_produces_a_report() {
    let temp_dir = TempDir::new().unwrap();
    let not_a_dir = temp_dir.path().join("tests.feature");
    fs::write(&not_a_dir, "Feature: misplaced\n").unwrap();

    let mut request = request(Path::new(DEFECTS), "0.6");
    request.tests_dir = Some(not_a_dir);
    let report = run_review(&request).unwrap();

    assert_eq!(report.documents.len(), 1);
    assert!(report.test_files.is_none());
    assert_eq!(findings_of(&report, "unauthenticated-error-code").len(), 1);
}
