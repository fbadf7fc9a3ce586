use super::text;
use crate::error::RuleError;
use crate::models::{Mapping, Node, NodePath};
use crate::validation::{Category, RuleContext, RuleDefinition, Severity, Violation};

const HEADER_NAME: &str = "x-correlator";
const PATTERN: &str = r"^\w{8}-\w{4}-4\w{3}-[89aAbB]\w{3}-\w{12}$";

pub(super) static RULES: &[RuleDefinition] = &[
    RuleDefinition::new(
        "x-correlator-pattern",
        Category::Correlator,
        Severity::Medium,
        "The correlator header schema uses the Commonalities pattern",
        x_correlator_pattern,
    ),
    RuleDefinition::new(
        "x-correlator-header-name",
        Category::Correlator,
        Severity::Medium,
        "The correlator header is spelled `x-correlator`",
        x_correlator_header_name,
    ),
];

/// Correlator entries of `components.parameters` and `components.headers`,
/// matched case-insensitively on key or declared `name`.
fn correlator_entries<'a>(
    ctx: &RuleContext<'a>,
) -> Result<Vec<(NodePath, &'a str, &'a Mapping)>, RuleError> {
    let mut entries = Vec::new();
    for section in ["parameters", "headers"] {
        let Some(items) = ctx.mapping(&["components", section])? else {
            continue;
        };
        for (key, item) in items {
            let Some(item) = item.as_mapping() else {
                continue;
            };
            let name = item.get("name").and_then(Node::as_str).unwrap_or(key);
            let matches = |s: &str| s.eq_ignore_ascii_case(HEADER_NAME);
            if matches(key) || matches(name) {
                entries.push((NodePath::from_keys(&["components", section, key]), name, item));
            }
        }
    }
    Ok(entries)
}

fn x_correlator_pattern(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    let mut violations = Vec::new();
    for (location, _, item) in correlator_entries(ctx)? {
        let mut schema_location = location.child_key("schema");
        let mut schema = item.get("schema");
        if let Some(reference) = schema.and_then(|s| s.get("$ref")).and_then(Node::as_str) {
            schema = ctx.resolve_ref(reference);
            if let Some(pointer) = reference.strip_prefix("#/") {
                schema_location = NodePath::from_keys(&pointer.split('/').collect::<Vec<_>>());
            }
        }

        let pattern = text(schema.and_then(|s| s.get("pattern")));
        if pattern != PATTERN {
            violations.push(
                Violation::new(
                    "XCorrelator pattern should follow Commonalities 0.6 specification",
                    schema_location.key("pattern"),
                )
                .with_fix(format!("Use pattern: `{}`", PATTERN)),
            );
        }
    }
    Ok(violations)
}

fn x_correlator_header_name(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    let mut violations = Vec::new();
    for (location, name, item) in correlator_entries(ctx)? {
        let declared = item.contains_key("name");
        if name == HEADER_NAME {
            continue;
        }
        let location = if declared {
            location.key("name")
        } else {
            location
        };
        violations.push(
            Violation::new(
                format!("Correlator header should be named `{}`, found `{}`", HEADER_NAME, name),
                location,
            )
            .with_fix(format!("Rename the header to `{}`", HEADER_NAME)),
        );
    }
    Ok(violations)
}

#[cfg(test)]
mod tests {
    use super::super::testing::run;
    use super::*;

    #[test]
    fn test_pattern_through_schema_ref() {
        let yaml = format!(
            r#"
components:
  parameters:
    x-correlator:
      name: x-correlator
      in: header
      schema:
        $ref: '#/components/schemas/XCorrelator'
  schemas:
    XCorrelator:
      type: string
      pattern: '{}'
"#,
            PATTERN
        );
        assert!(run(RULES, "x-correlator-pattern", &yaml).is_empty());
        assert!(run(RULES, "x-correlator-header-name", &yaml).is_empty());
    }

    #[test]
    fn test_wrong_pattern_and_name() {
        let yaml = r#"
components:
  headers:
    X-Correlator:
      schema:
        type: string
        pattern: '^.*$'
"#;
        let pattern = run(RULES, "x-correlator-pattern", yaml);
        assert_eq!(pattern.len(), 1);
        assert_eq!(
            pattern[0].location,
            NodePath::from_keys(&["components", "headers", "X-Correlator", "schema", "pattern"])
        );
        let name = run(RULES, "x-correlator-header-name", yaml);
        assert_eq!(name.len(), 1);
        assert!(name[0].message.contains("`X-Correlator`"));
    }
}
