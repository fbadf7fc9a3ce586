//! Rules aligning Gherkin test definitions with the API definitions they
//! exercise.

use crate::error::RuleError;
use crate::loader::FeatureFile;
use crate::models::{ApiDocument, Node, NodePath};
use crate::validation::{
    Category, ProjectContext, ProjectRuleDefinition, ProjectViolation, RuleContext, Severity,
    Violation,
};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static FEATURE_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"v?\d+\.\d+\.\d+(?:-rc\.\d+|-alpha\.\d+)?").expect("valid feature version regex")
});

static REQUEST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"request\s+"([^"]+)""#).expect("valid request regex"));

/// Lines searched for the `Feature:` header.
const FEATURE_LINE_WINDOW: usize = 2;

pub(super) static RULES: &[ProjectRuleDefinition] = &[
    ProjectRuleDefinition::new(
        "test-definitions-present",
        Category::TestAlignment,
        Severity::Critical,
        "Every API has at least one test definition",
        has_tests,
        test_definitions_present,
    ),
    ProjectRuleDefinition::new(
        "test-wip-in-release",
        Category::TestAlignment,
        Severity::Critical,
        "Test definitions of a release do not mention `wip`",
        is_release_review,
        test_wip_in_release,
    ),
    ProjectRuleDefinition::new(
        "test-wip-review-version",
        Category::TestAlignment,
        Severity::Medium,
        "Test definitions of a wip review reference the `wip` version",
        is_wip_review,
        test_wip_review_version,
    ),
    ProjectRuleDefinition::new(
        "test-feature-line",
        Category::TestAlignment,
        Severity::Medium,
        "Test definitions start with a `Feature:` line",
        has_tests,
        test_feature_line,
    ),
    ProjectRuleDefinition::new(
        "test-feature-version",
        Category::TestAlignment,
        Severity::Medium,
        "The `Feature:` line names the API version",
        has_tests,
        test_feature_version,
    ),
    ProjectRuleDefinition::new(
        "test-operation-ids",
        Category::TestAlignment,
        Severity::Critical,
        "Tests only request operations the API defines",
        has_tests,
        test_operation_ids,
    ),
    ProjectRuleDefinition::new(
        "test-file-operation-name",
        Category::TestAlignment,
        Severity::Low,
        "`<api>-<operationId>.feature` files name an existing operation",
        has_tests,
        test_file_operation_name,
    ),
    ProjectRuleDefinition::new(
        "test-orphan-files",
        Category::TestAlignment,
        Severity::Medium,
        "Every test definition belongs to an API",
        has_tests,
        test_orphan_files,
    ),
];

fn has_tests(ctx: &ProjectContext<'_>) -> bool {
    ctx.test_definitions.is_some() && !ctx.documents.is_empty()
}

fn is_release_review(ctx: &ProjectContext<'_>) -> bool {
    has_tests(ctx) && !ctx.options.review_type.is_wip()
}

fn is_wip_review(ctx: &ProjectContext<'_>) -> bool {
    has_tests(ctx) && ctx.options.review_type.is_wip()
}

/// An API definition together with the feature files assigned to it.
struct Suite<'a> {
    document: &'a ApiDocument,
    api_name: &'a str,
    features: Vec<&'a FeatureFile>,
}

struct Assignment<'a> {
    suites: Vec<Suite<'a>>,
    orphans: Vec<&'a FeatureFile>,
}

fn matches_api(stem: &str, api_name: &str) -> bool {
    stem == api_name
        || stem
            .strip_prefix(api_name)
            .is_some_and(|rest| rest.starts_with('-'))
}

/// Assign every feature file to the API whose name equals its stem or
/// prefixes it followed by `-`. The longest matching name wins.
fn assign<'a>(ctx: &ProjectContext<'a>) -> Assignment<'a> {
    let mut suites: Vec<Suite<'a>> = ctx
        .documents
        .iter()
        .map(|document| Suite {
            document,
            api_name: document.display_name(),
            features: Vec::new(),
        })
        .collect();
    let mut orphans = Vec::new();

    let features = ctx
        .test_definitions
        .map(|defs| defs.features.as_slice())
        .unwrap_or_default();

    for feature in features {
        let best = suites
            .iter()
            .enumerate()
            .filter(|(_, suite)| matches_api(&feature.stem, suite.api_name))
            .max_by_key(|(index, suite)| (suite.api_name.len(), std::cmp::Reverse(*index)))
            .map(|(index, _)| index);
        match best {
            Some(index) => {
                let owner = suites[index].api_name;
                // Documents sharing an api-name share its tests.
                for suite in suites.iter_mut().filter(|s| s.api_name == owner) {
                    suite.features.push(feature);
                }
            }
            None => orphans.push(feature),
        }
    }

    Assignment { suites, orphans }
}

/// Per assigned feature file, the violations `check` finds, owned by the
/// API document the file belongs to.
fn per_feature<F>(ctx: &ProjectContext<'_>, mut check: F) -> Result<Vec<ProjectViolation>, RuleError>
where
    F: FnMut(&Suite<'_>, &FeatureFile) -> Result<Option<Violation>, RuleError>,
{
    let mut violations = Vec::new();
    for suite in assign(ctx).suites {
        for feature in &suite.features {
            if let Some(violation) = check(&suite, feature)? {
                violations.push(ProjectViolation::new(&suite.document.file_name, violation));
            }
        }
    }
    Ok(violations)
}

fn operation_ids(ctx: &ProjectContext<'_>, document: &ApiDocument) -> Result<Vec<String>, RuleError> {
    Ok(RuleContext::new(document, ctx.options)
        .operations()?
        .iter()
        .filter_map(|op| op.get("operationId").and_then(Node::as_text))
        .map(|id| id.into_owned())
        .collect())
}

/// The first `Feature:` line within the header window, with its 1-based
/// line number.
fn feature_line(content: &str) -> Option<(usize, &str)> {
    content
        .lines()
        .take(FEATURE_LINE_WINDOW)
        .map(str::trim)
        .enumerate()
        .find(|(_, line)| line.starts_with("Feature:"))
        .map(|(index, line)| (index + 1, line))
}

fn test_definitions_present(
    ctx: &ProjectContext<'_>,
) -> Result<Vec<ProjectViolation>, RuleError> {
    Ok(assign(ctx)
        .suites
        .into_iter()
        .filter(|suite| suite.features.is_empty())
        .map(|suite| {
            ProjectViolation::new(
                &suite.document.file_name,
                Violation::new(
                    format!("No test files found for API `{}`", suite.api_name),
                    NodePath::root(),
                )
                .with_fix(format!(
                    "Create either `{0}.feature` or `{0}-<operationId>.feature` files",
                    suite.api_name
                )),
            )
        })
        .collect())
}

fn test_wip_in_release(ctx: &ProjectContext<'_>) -> Result<Vec<ProjectViolation>, RuleError> {
    per_feature(ctx, |_, feature| {
        Ok(feature.content.to_lowercase().contains("wip").then(|| {
            Violation::new(
                format!(
                    "Release review should not contain `wip` references in `{}`",
                    feature.file_name
                ),
                NodePath::root(),
            )
            .with_fix("Update test scenarios to use proper version references")
        }))
    })
}

fn test_wip_review_version(ctx: &ProjectContext<'_>) -> Result<Vec<ProjectViolation>, RuleError> {
    per_feature(ctx, |_, feature| {
        Ok((!feature.content.to_lowercase().contains("wip")).then(|| {
            Violation::new(
                format!(
                    "WIP review expects `{}` to reference the `wip` version",
                    feature.file_name
                ),
                NodePath::root(),
            )
            .with_fix("Update test scenarios to use `wip` version references")
        }))
    })
}

fn test_feature_line(ctx: &ProjectContext<'_>) -> Result<Vec<ProjectViolation>, RuleError> {
    per_feature(ctx, |_, feature| {
        Ok(feature_line(&feature.content).is_none().then(|| {
            Violation::new(
                format!(
                    "No Feature line found in first two lines of `{}`",
                    feature.file_name
                ),
                NodePath::root(),
            )
            .with_fix("Add Feature line with API name and version")
        }))
    })
}

fn test_feature_version(ctx: &ProjectContext<'_>) -> Result<Vec<ProjectViolation>, RuleError> {
    per_feature(ctx, |suite, feature| {
        let Some((number, line)) = feature_line(&feature.content) else {
            return Ok(None);
        };
        let version = suite.document.version.as_str();
        let prefixed = format!("v{}", version);
        let mentioned = FEATURE_VERSION_RE
            .find_iter(line)
            .any(|m| m.as_str() == version || m.as_str() == prefixed);
        if mentioned {
            return Ok(None);
        }
        Ok(Some(
            Violation::new(
                format!(
                    "Feature line of `{}` (line {}) doesn't mention API version `{}`",
                    feature.file_name, number, version
                ),
                NodePath::root(),
            )
            .with_fix(format!("Include version `{}` in Feature line: {}", version, line)),
        ))
    })
}

fn test_operation_ids(ctx: &ProjectContext<'_>) -> Result<Vec<ProjectViolation>, RuleError> {
    let mut violations = Vec::new();
    for suite in assign(ctx).suites {
        if suite.features.is_empty() {
            continue;
        }
        let known = operation_ids(ctx, suite.document)?;
        for feature in &suite.features {
            let requested: BTreeSet<&str> = REQUEST_RE
                .captures_iter(&feature.content)
                .filter_map(|caps| caps.get(1))
                .map(|m| m.as_str())
                .collect();
            for operation in requested {
                if known.iter().any(|id| id == operation) {
                    continue;
                }
                violations.push(ProjectViolation::new(
                    &suite.document.file_name,
                    Violation::new(
                        format!(
                            "Test `{}` references unknown operation `{}`",
                            feature.file_name, operation
                        ),
                        NodePath::root(),
                    )
                    .with_fix(format!(
                        "Use valid operation ID from: `{}`",
                        known.join(", ")
                    )),
                ));
            }
        }
    }
    Ok(violations)
}

fn test_file_operation_name(
    ctx: &ProjectContext<'_>,
) -> Result<Vec<ProjectViolation>, RuleError> {
    let mut violations = Vec::new();
    for suite in assign(ctx).suites {
        let known = operation_ids(ctx, suite.document)?;
        for feature in &suite.features {
            let Some(operation) = feature
                .stem
                .strip_prefix(suite.api_name)
                .and_then(|rest| rest.strip_prefix('-'))
            else {
                continue;
            };
            if known.iter().any(|id| id == operation) {
                continue;
            }
            violations.push(ProjectViolation::new(
                &suite.document.file_name,
                Violation::new(
                    format!(
                        "Test file `{}` suggests operation `{}` but it doesn't exist in API",
                        feature.file_name, operation
                    ),
                    NodePath::root(),
                )
                .with_fix(format!(
                    "Check if test file naming is as intended, consider to use valid operation from: `{}`",
                    known.join(", ")
                )),
            ));
        }
    }
    Ok(violations)
}

fn test_orphan_files(ctx: &ProjectContext<'_>) -> Result<Vec<ProjectViolation>, RuleError> {
    let assignment = assign(ctx);
    let Some(first) = assignment.suites.first() else {
        return Ok(Vec::new());
    };
    let names: Vec<&str> = assignment.suites.iter().map(|s| s.api_name).collect();

    Ok(assignment
        .orphans
        .iter()
        .map(|feature| {
            ProjectViolation::new(
                &first.document.file_name,
                Violation::new(
                    format!("Test file `{}` does not match any API", feature.file_name),
                    NodePath::root(),
                )
                .with_fix(format!("Rename to match an API: {}", names.join(", "))),
            )
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::super::testing::{document, options};
    use super::*;
    use crate::loader::TestDefinitions;
    use crate::validation::{ProjectRule, ReviewType};

    const QOD: &str = r#"
info:
  title: Quality On Demand
  version: 1.0.0
servers:
  - url: "{apiRoot}/quality-on-demand/v1"
paths:
  /sessions:
    post:
      operationId: createSession
    get:
      operationId: getSessions
"#;

    const QOD_PROVISIONING: &str = r#"
info:
  title: QoD Provisioning
  version: 0.1.0
servers:
  - url: "{apiRoot}/quality-on-demand-provisioning/v0.1"
paths:
  /device-qos:
    post:
      operationId: provisionDeviceQos
"#;

    fn feature(file_name: &str, content: &str) -> FeatureFile {
        FeatureFile {
            file_name: file_name.to_string(),
            stem: file_name.trim_end_matches(".feature").to_string(),
            content: content.to_string(),
        }
    }

    fn run_with(
        id: &str,
        docs: &[ApiDocument],
        features: Vec<FeatureFile>,
        review_type: ReviewType,
    ) -> Vec<ProjectViolation> {
        let definitions = TestDefinitions {
            features,
            ..Default::default()
        };
        let options = options(review_type);
        let ctx = ProjectContext {
            documents: docs,
            test_definitions: Some(&definitions),
            options: &options,
        };
        let rule = RULES.iter().find(|r| r.id == id).unwrap();
        if !rule.applies_to(&ctx) {
            return Vec::new();
        }
        rule.check(&ctx).unwrap()
    }

    fn run(id: &str, docs: &[ApiDocument], features: Vec<FeatureFile>) -> Vec<ProjectViolation> {
        run_with(id, docs, features, ReviewType::ReleaseCandidate)
    }

    fn apis() -> Vec<ApiDocument> {
        vec![
            document("quality-on-demand.yaml", QOD),
            document("qod-provisioning.yaml", QOD_PROVISIONING),
        ]
    }

    #[test]
    fn test_longest_api_name_wins() {
        let docs = apis();
        let features = vec![
            feature("quality-on-demand-createSession.feature", "Feature: x v1.0.0\n"),
            feature(
                "quality-on-demand-provisioning.feature",
                "Feature: y v0.1.0\n",
            ),
        ];
        let missing = run("test-definitions-present", &docs, features.clone());
        assert!(missing.is_empty(), "{:?}", missing);
        assert!(run("test-orphan-files", &docs, features).is_empty());
    }

    #[test]
    fn test_missing_and_orphan_files() {
        let docs = apis();
        let features = vec![feature("location-verification.feature", "Feature: v1.0.0\n")];

        let missing = run("test-definitions-present", &docs, features.clone());
        assert_eq!(missing.len(), 2);
        assert!(missing[0].violation.message.contains("`quality-on-demand`"));

        let orphans = run("test-orphan-files", &docs, features);
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].document, "quality-on-demand.yaml");
        assert_eq!(orphans[0].violation.location, NodePath::root());
        assert!(orphans[0].violation.message.contains("location-verification.feature"));
        assert!(orphans[0]
            .violation
            .fix
            .as_deref()
            .unwrap()
            .contains("quality-on-demand, quality-on-demand-provisioning"));
    }

    #[test]
    fn test_wip_depends_on_review_type() {
        let docs = vec![document("quality-on-demand.yaml", QOD)];
        let wip = vec![feature("quality-on-demand.feature", "Feature: QoD vwip\n")];
        let released = vec![feature("quality-on-demand.feature", "Feature: QoD v1.0.0\n")];

        assert_eq!(run("test-wip-in-release", &docs, wip.clone()).len(), 1);
        assert!(run("test-wip-in-release", &docs, released.clone()).is_empty());

        assert!(run_with("test-wip-review-version", &docs, wip, ReviewType::Wip).is_empty());
        assert_eq!(
            run_with("test-wip-review-version", &docs, released, ReviewType::Wip).len(),
            1
        );
    }

    #[test]
    fn test_feature_line_and_version() {
        let docs = vec![document("quality-on-demand.yaml", QOD)];
        let features = vec![
            feature("quality-on-demand.feature", "# comment\nFeature: QoD, v1.0.0\n"),
            feature("quality-on-demand-getSessions.feature", "Feature: QoD 0.9.0\n"),
            feature("quality-on-demand-createSession.feature", "\n\nFeature: late\n"),
        ];

        let missing = run("test-feature-line", &docs, features.clone());
        assert_eq!(missing.len(), 1);
        assert!(missing[0].violation.message.contains("createSession"));

        let version = run("test-feature-version", &docs, features);
        assert_eq!(version.len(), 1);
        assert!(version[0].violation.message.contains("getSessions"));
        assert!(version[0].violation.message.contains("`1.0.0`"));
    }

    #[test]
    fn test_unknown_operations() {
        let docs = vec![document("quality-on-demand.yaml", QOD)];
        let content = r#"Feature: QoD v1.0.0
  Scenario: create
    Given the request "createSession"
    And the request "deleteSession"
    And the request "deleteSession"
"#;
        let features = vec![
            feature("quality-on-demand.feature", content),
            feature("quality-on-demand-extendSession.feature", "Feature: v1.0.0\n"),
        ];

        let unknown = run("test-operation-ids", &docs, features.clone());
        assert_eq!(unknown.len(), 1);
        assert!(unknown[0].violation.message.contains("`deleteSession`"));
        assert!(unknown[0].violation.message.contains("quality-on-demand.feature"));
        assert_eq!(unknown[0].violation.location, NodePath::root());

        let naming = run("test-file-operation-name", &docs, features);
        assert_eq!(naming.len(), 1);
        assert!(naming[0].violation.message.contains("`extendSession`"));
    }

    #[test]
    fn test_skipped_without_test_directory() {
        let docs = apis();
        let options = options(ReviewType::ReleaseCandidate);
        let ctx = ProjectContext {
            documents: &docs,
            test_definitions: None,
            options: &options,
        };
        assert!(RULES.iter().all(|rule| !rule.applies_to(&ctx)));
    }
}
