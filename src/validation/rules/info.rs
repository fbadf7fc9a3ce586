use super::{has_info, is_blank, text};
use crate::error::RuleError;
use crate::models::{ApiMaturity, NodePath};
use crate::validation::{Category, RuleContext, RuleDefinition, Severity, Violation};

const LICENSE_NAME: &str = "Apache 2.0";
const LICENSE_URL: &str = "https://www.apache.org/licenses/LICENSE-2.0.html";

pub(super) static RULES: &[RuleDefinition] = &[
    RuleDefinition::new(
        "info-object",
        Category::Info,
        Severity::Critical,
        "The `info` object is present",
        info_object,
    ),
    RuleDefinition::new(
        "info-title",
        Category::Info,
        Severity::Critical,
        "`info.title` is present",
        info_title,
    )
    .when(has_info),
    RuleDefinition::new(
        "info-title-no-api",
        Category::Info,
        Severity::Medium,
        "`info.title` does not include the word API",
        info_title_no_api,
    )
    .when(has_info),
    RuleDefinition::new(
        "info-version-format",
        Category::Info,
        Severity::Critical,
        "`info.version` is `wip` or a semantic version",
        info_version_format,
    )
    .when(has_info),
    RuleDefinition::new(
        "info-license-name",
        Category::Info,
        Severity::Critical,
        "License name is Apache 2.0",
        info_license_name,
    )
    .when(has_info),
    RuleDefinition::new(
        "info-license-url",
        Category::Info,
        Severity::Critical,
        "License URL points to the Apache 2.0 text",
        info_license_url,
    )
    .when(has_info),
    RuleDefinition::new(
        "info-commonalities-version",
        Category::Info,
        Severity::Medium,
        "`x-camara-commonalities` matches the requested release",
        info_commonalities_version,
    )
    .when(has_info),
    RuleDefinition::new(
        "info-terms-of-service",
        Category::Info,
        Severity::Medium,
        "`termsOfService` is absent",
        info_terms_of_service,
    )
    .when(has_info),
    RuleDefinition::new(
        "commonalities-version-fallback",
        Category::Info,
        Severity::Low,
        "Declared Commonalities release differs from the rules applied",
        commonalities_version_fallback,
    )
    .when(is_fallback),
];

fn is_fallback(ctx: &RuleContext<'_>) -> bool {
    ctx.options.resolution.mismatch
}

fn info_object(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    if is_blank(ctx.node(&["info"])?) {
        return Ok(vec![Violation::new(
            "Missing required `info` object",
            NodePath::from_keys(&["info"]),
        )]);
    }
    Ok(Vec::new())
}

fn info_title(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    if is_blank(ctx.node(&["info", "title"])?) {
        return Ok(vec![Violation::new(
            "Missing required `title` field",
            NodePath::from_keys(&["info", "title"]),
        )]);
    }
    Ok(Vec::new())
}

fn info_title_no_api(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    let title = text(ctx.node(&["info", "title"])?);
    if title.contains("API") {
        return Ok(vec![
            Violation::new(
                format!("Title should not include 'API': `{}`", title),
                NodePath::from_keys(&["info", "title"]),
            )
            .with_fix("Remove 'API' from title"),
        ]);
    }
    Ok(Vec::new())
}

fn info_version_format(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    let version = text(ctx.node(&["info", "version"])?);
    if version != "wip" && !ApiMaturity::is_semantic_version(&version) {
        return Ok(vec![
            Violation::new(
                format!("Invalid version format: `{}`", version),
                NodePath::from_keys(&["info", "version"]),
            )
            .with_fix("Use semantic versioning (`x.y.z` or `x.y.z-rc.n` or `x.y.z-alpha.n`)"),
        ]);
    }
    Ok(Vec::new())
}

fn info_license_name(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    if text(ctx.node(&["info", "license", "name"])?) != LICENSE_NAME {
        return Ok(vec![
            Violation::new(
                format!("License must be `{}`", LICENSE_NAME),
                NodePath::from_keys(&["info", "license", "name"]),
            )
            .with_fix(format!("Set `info.license.name` to `{}`", LICENSE_NAME)),
        ]);
    }
    Ok(Vec::new())
}

fn info_license_url(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    if text(ctx.node(&["info", "license", "url"])?) != LICENSE_URL {
        return Ok(vec![
            Violation::new(
                "Incorrect license URL",
                NodePath::from_keys(&["info", "license", "url"]),
            )
            .with_fix(format!("Set `info.license.url` to `{}`", LICENSE_URL)),
        ]);
    }
    Ok(Vec::new())
}

fn info_commonalities_version(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    let expected = &ctx.options.resolution.requested;
    let declared = ctx.node(&["info", "x-camara-commonalities"])?;
    let found = declared
        .and_then(|n| n.as_text())
        .map(|t| t.into_owned());

    if found.as_deref() != Some(expected.as_str()) {
        return Ok(vec![Violation::new(
            format!(
                "Expected commonalities `{}`, found: `{}`",
                expected,
                found.as_deref().unwrap_or("none")
            ),
            NodePath::from_keys(&["info", "x-camara-commonalities"]),
        )]);
    }
    Ok(Vec::new())
}

fn info_terms_of_service(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    let present = ctx
        .mapping(&["info"])?
        .is_some_and(|info| info.contains_key("termsOfService"));
    if present {
        return Ok(vec![
            Violation::new(
                "`termsOfService` should not be in the API definition",
                NodePath::from_keys(&["info", "termsOfService"]),
            )
            .with_fix("Remove `termsOfService` field"),
        ]);
    }
    Ok(Vec::new())
}

fn commonalities_version_fallback(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    let resolved = ctx.options.resolution.resolved.tag();
    let Some(declared) = ctx.info_text("x-camara-commonalities") else {
        return Ok(Vec::new());
    };
    if declared == resolved {
        return Ok(Vec::new());
    }
    Ok(vec![
        Violation::new(
            format!(
                "API declares commonalities v{} but is being validated against v{} rules",
                declared, resolved
            ),
            NodePath::from_keys(&["info", "x-camara-commonalities"]),
        )
        .with_fix(format!(
            "Results may not accurately reflect v{} compliance",
            declared
        )),
    ])
}

#[cfg(test)]
mod tests {
    use super::super::testing::{document, run, run_with};
    use super::*;
    use crate::validation::{ReviewOptions, ReviewType, resolve_version};

    const COMPLETE: &str = r#"
info:
  title: Quality On Demand
  version: 1.0.0-rc.1
  license:
    name: Apache 2.0
    url: https://www.apache.org/licenses/LICENSE-2.0.html
  x-camara-commonalities: 0.6
"#;

    #[test]
    fn test_complete_info_passes() {
        for rule in RULES {
            assert!(run(RULES, rule.id, COMPLETE).is_empty(), "{} fired", rule.id);
        }
    }

    #[test]
    fn test_missing_info() {
        let violations = run(RULES, "info-object", "paths: {}\n");
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].location, NodePath::from_keys(&["info"]));

        assert!(run(RULES, "info-title", "paths: {}\n").is_empty());
    }

    #[test]
    fn test_title_with_api() {
        let yaml = COMPLETE.replace("Quality On Demand", "Quality On Demand API");
        assert_eq!(run(RULES, "info-title-no-api", &yaml).len(), 1);
    }

    #[test]
    fn test_version_format() {
        let wip = COMPLETE.replace("1.0.0-rc.1", "wip");
        assert!(run(RULES, "info-version-format", &wip).is_empty());

        let bad = COMPLETE.replace("1.0.0-rc.1", "v1");
        let violations = run(RULES, "info-version-format", &bad);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("`v1`"));
    }

    #[test]
    fn test_license() {
        let yaml = COMPLETE.replace("name: Apache 2.0", "name: MIT");
        assert_eq!(run(RULES, "info-license-name", &yaml).len(), 1);
        assert!(run(RULES, "info-license-url", &yaml).is_empty());
    }

    #[test]
    fn test_commonalities_version_compares_numbers_as_text() {
        let yaml = COMPLETE.replace("x-camara-commonalities: 0.6", "x-camara-commonalities: 0.5");
        let violations = run(RULES, "info-commonalities-version", &yaml);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("`0.5`"));
    }

    #[test]
    fn test_fallback_note_only_when_resolution_mismatched() {
        let doc = document("sample-api.yaml", COMPLETE);
        let exact = ReviewOptions {
            resolution: resolve_version("0.6"),
            review_type: ReviewType::ReleaseCandidate,
        };
        assert!(run_with(RULES, "commonalities-version-fallback", &doc, &exact).is_empty());

        let doc = document(
            "sample-api.yaml",
            &COMPLETE.replace("x-camara-commonalities: 0.6", "x-camara-commonalities: 0.9"),
        );
        let fallback = ReviewOptions {
            resolution: resolve_version("0.9"),
            review_type: ReviewType::ReleaseCandidate,
        };
        let violations = run_with(RULES, "commonalities-version-fallback", &doc, &fallback);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("v0.9"));
    }
}
