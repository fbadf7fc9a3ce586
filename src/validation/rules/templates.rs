use super::{has_info, text};
use crate::error::RuleError;
use crate::models::NodePath;
use crate::validation::{Category, RuleContext, RuleDefinition, Severity, Violation};
use regex::Regex;
use std::sync::LazyLock;

const AUTHORIZATION_COMPONENTS: [&str; 7] = [
    "# Authorization and authentication",
    "Camara Security and Interoperability Profile",
    "Identity and Consent Management",
    "github.com/camaraproject/IdentityAndConsentManagement",
    "authorization flows to be used will be agreed upon during the onboarding process",
    "three-legged access tokens is mandatory",
    "privacy regulations",
];

const ERROR_RESPONSES_COMPONENTS: [&str; 7] = [
    "# Additional CAMARA error responses",
    "not exhaustive",
    "CAMARA API Design Guide",
    "CAMARA_common.yaml",
    "Commonalities Release",
    "API Readiness Checklist",
    "501 - NOT_IMPLEMENTED",
];

static AUTHORIZATION_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)#\s*Authorization\s+and\s+authentication").expect("valid header regex")
});

static ERROR_RESPONSES_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)#\s*Additional\s+CAMARA\s+error\s+responses").expect("valid header regex")
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

pub(super) static RULES: &[RuleDefinition] = &[
    RuleDefinition::new(
        "authorization-template",
        Category::Templates,
        Severity::Critical,
        "`info.description` carries the authorization and authentication template",
        authorization_template,
    )
    .when(has_info),
    RuleDefinition::new(
        "error-responses-template",
        Category::Templates,
        Severity::Critical,
        "`info.description` carries the additional error responses template",
        error_responses_template,
    )
    .when(has_info),
];

/// Lowercase, collapse whitespace and drop markdown emphasis characters.
fn normalize(text: &str) -> String {
    let collapsed = WHITESPACE.replace_all(text.trim(), " ").to_lowercase();
    collapsed.replace(['*', '_', '`'], "")
}

fn missing_components<'c>(description: &str, components: &[&'c str]) -> Vec<&'c str> {
    let normalized = normalize(description);
    components
        .iter()
        .copied()
        .filter(|component| !normalized.contains(&normalize(component)))
        .collect()
}

fn description_location() -> NodePath {
    NodePath::from_keys(&["info", "description"])
}

fn authorization_template(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    let description = text(ctx.node(&["info", "description"])?);
    if description.is_empty() {
        return Ok(vec![Violation::new(
            "Missing info.description - required for authorization template",
            description_location(),
        )]);
    }

    let mut violations = Vec::new();
    let missing = missing_components(&description, &AUTHORIZATION_COMPONENTS);
    if !missing.is_empty() {
        violations.push(
            Violation::new(
                format!(
                    "Missing required authorization template components: {}",
                    missing.join(", ")
                ),
                description_location(),
            )
            .with_fix(
                "Add the mandatory authorization template as specified in CAMARA-API-access-and-user-consent.md",
            ),
        );
    }
    if !AUTHORIZATION_HEADER.is_match(&description) {
        violations.push(Violation::new(
            "Missing required '# Authorization and authentication' header",
            description_location(),
        ));
    }
    Ok(violations)
}

fn error_responses_template(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    // A missing description is reported by the authorization template rule.
    let description = text(ctx.node(&["info", "description"])?);
    if description.is_empty() {
        return Ok(Vec::new());
    }

    let mut violations = Vec::new();
    let missing = missing_components(&description, &ERROR_RESPONSES_COMPONENTS);
    if !missing.is_empty() {
        violations.push(
            Violation::new(
                format!(
                    "Missing required error responses template components: {}",
                    missing.join(", ")
                ),
                description_location(),
            )
            .with_fix(
                "Add the mandatory 'Additional CAMARA error responses' template from the CAMARA API Design Guide",
            ),
        );
    }
    if !ERROR_RESPONSES_HEADER.is_match(&description) {
        violations.push(Violation::new(
            "Missing required '# Additional CAMARA error responses' header",
            description_location(),
        ));
    }
    Ok(violations)
}

#[cfg(test)]
mod tests {
    use super::super::testing::run;
    use super::*;

    const DESCRIPTION: &str = r#"
info:
  title: Sample
  version: 0.1.0
  description: |
    # Introduction

    Sample service.

    # Authorization and authentication

    The "Camara Security and Interoperability Profile" provides details of how an API consumer
    requests an access token. Please refer to Identity and Consent Management
    (https://github.com/camaraproject/IdentityAndConsentManagement/) for the released version.

    The specific authorization flows to be used will be agreed upon during the onboarding process,
    happening between the API consumer and the API provider, taking into account the declared
    purpose for accessing the API, whilst also being subject to the prevailing legal framework
    dictated by local legislation.

    In cases where personal data is processed by the API and users can exercise their rights
    through mechanisms such as opt-in and/or opt-out, the use of three-legged access tokens is
    mandatory. This ensures that the API remains in compliance with **privacy regulations**.

    # Additional CAMARA error responses

    The list of error codes in this API specification is not exhaustive. Therefore the API
    specification may not document some non-mandatory error statuses as indicated in
    `CAMARA API Design Guide`.

    Please refer to the `CAMARA_common.yaml` of the Commonalities Release associated to the
    API version for a complete list of error responses. The applicable Commonalities Release
    can be identified in the `API Readiness Checklist` document associated to the API version.

    As a specific rule, error `501 - NOT_IMPLEMENTED` can be only a possible error response
    where it is explicitly documented in the API.
"#;

    #[test]
    fn test_full_templates_pass() {
        assert!(run(RULES, "authorization-template", DESCRIPTION).is_empty());
        assert!(run(RULES, "error-responses-template", DESCRIPTION).is_empty());
    }

    #[test]
    fn test_missing_description() {
        let yaml = "info:\n  title: Sample\n  version: 0.1.0\n";
        let violations = run(RULES, "authorization-template", yaml);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].location, description_location());
        assert!(run(RULES, "error-responses-template", yaml).is_empty());
    }

    #[test]
    fn test_missing_header_and_component() {
        let yaml = DESCRIPTION
            .replace("# Additional CAMARA error responses", "Additional errors")
            .replace("not exhaustive", "incomplete");
        let violations = run(RULES, "error-responses-template", &yaml);
        assert_eq!(violations.len(), 2);
        assert!(violations[0].message.contains("not exhaustive"));
        assert!(violations[1].message.contains("header"));
    }

    #[test]
    fn test_normalize_ignores_markdown_and_spacing() {
        assert_eq!(normalize("  Three-Legged\n  **access**   `tokens` "), "three-legged access tokens");
    }
}
