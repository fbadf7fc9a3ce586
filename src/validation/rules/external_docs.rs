use super::{is_blank, text};
use crate::error::RuleError;
use crate::models::NodePath;
use crate::validation::{Category, RuleContext, RuleDefinition, Severity, Violation};

pub(super) static RULES: &[RuleDefinition] = &[
    RuleDefinition::new(
        "external-docs",
        Category::ExternalDocs,
        Severity::Critical,
        "`externalDocs` with a URL is present",
        external_docs,
    ),
    RuleDefinition::new(
        "external-docs-description",
        Category::ExternalDocs,
        Severity::Medium,
        "`externalDocs.description` is present",
        external_docs_description,
    )
    .when(has_external_docs),
    RuleDefinition::new(
        "external-docs-https",
        Category::ExternalDocs,
        Severity::Medium,
        "`externalDocs.url` uses HTTPS",
        external_docs_https,
    )
    .when(has_external_docs),
];

fn has_external_docs(ctx: &RuleContext<'_>) -> bool {
    !is_blank(ctx.root().get("externalDocs"))
}

fn external_docs(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    if is_blank(ctx.node(&["externalDocs"])?) {
        return Ok(vec![
            Violation::new(
                "Missing externalDocs object",
                NodePath::from_keys(&["externalDocs"]),
            )
            .with_fix("Add externalDocs with description and url"),
        ]);
    }
    if is_blank(ctx.node(&["externalDocs", "url"])?) {
        return Ok(vec![Violation::new(
            "Missing externalDocs URL",
            NodePath::from_keys(&["externalDocs", "url"]),
        )]);
    }
    Ok(Vec::new())
}

fn external_docs_description(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    if is_blank(ctx.node(&["externalDocs", "description"])?) {
        return Ok(vec![Violation::new(
            "Missing externalDocs description",
            NodePath::from_keys(&["externalDocs", "description"]),
        )]);
    }
    Ok(Vec::new())
}

fn external_docs_https(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    let url = text(ctx.node(&["externalDocs", "url"])?);
    if !url.is_empty() && !url.starts_with("https://") {
        return Ok(vec![Violation::new(
            format!("External docs URL should use HTTPS: `{}`", url),
            NodePath::from_keys(&["externalDocs", "url"]),
        )]);
    }
    Ok(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::super::testing::run;
    use super::*;

    #[test]
    fn test_missing_external_docs() {
        let violations = run(RULES, "external-docs", "info: {}\n");
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].message, "Missing externalDocs object");
        assert!(run(RULES, "external-docs-description", "info: {}\n").is_empty());
    }

    #[test]
    fn test_plain_http_url() {
        let yaml = "externalDocs:\n  description: Product documentation\n  url: http://example.com/docs\n";
        assert!(run(RULES, "external-docs", yaml).is_empty());
        assert!(run(RULES, "external-docs-description", yaml).is_empty());
        assert_eq!(run(RULES, "external-docs-https", yaml).len(), 1);
    }

    #[test]
    fn test_missing_url_is_critical_only() {
        let yaml = "externalDocs:\n  description: Product documentation\n";
        assert_eq!(run(RULES, "external-docs", yaml).len(), 1);
        assert!(run(RULES, "external-docs-https", yaml).is_empty());
    }
}
