//! Rules comparing definitions of the same repository with each other.

use crate::error::RuleError;
use crate::models::{ApiDocument, Node, NodePath};
use crate::validation::{
    Category, ProjectContext, ProjectRuleDefinition, ProjectViolation, Severity, Violation,
};

const SHARED_SCHEMAS: [&str; 16] = [
    "XCorrelator",
    "ErrorInfo",
    "Device",
    "DeviceResponse",
    "PhoneNumber",
    "NetworkAccessIdentifier",
    "DeviceIpv4Addr",
    "DeviceIpv6Address",
    "SingleIpv4Addr",
    "Port",
    "Point",
    "Latitude",
    "Longitude",
    "Area",
    "AreaType",
    "Circle",
];

/// Keys that may differ between copies of a shared schema.
const DOCUMENTATION_KEYS: [&str; 3] = ["example", "examples", "description"];

pub(super) static RULES: &[ProjectRuleDefinition] = &[
    ProjectRuleDefinition::new(
        "shared-schema-consistency",
        Category::Consistency,
        Severity::Medium,
        "Common schemas are identical across definitions",
        several_documents,
        shared_schema_consistency,
    ),
    ProjectRuleDefinition::new(
        "license-consistency",
        Category::Consistency,
        Severity::Medium,
        "License information is identical across definitions",
        several_documents,
        license_consistency,
    ),
    ProjectRuleDefinition::new(
        "commonalities-consistency",
        Category::Consistency,
        Severity::Medium,
        "All definitions declare the same Commonalities release",
        several_documents,
        commonalities_consistency,
    ),
];

fn several_documents(ctx: &ProjectContext<'_>) -> bool {
    ctx.documents.len() >= 2
}

/// Structural equality ignoring mapping key order and the `ignored` keys at
/// any depth. Iterative, with an explicit stack of node pairs.
fn equivalent(left: &Node, right: &Node, ignored: &[&str]) -> bool {
    let mut stack = vec![(left, right)];
    while let Some((a, b)) = stack.pop() {
        match (a, b) {
            (Node::Mapping(a), Node::Mapping(b)) => {
                let relevant = |(key, _): &(&String, &Node)| !ignored.contains(&key.as_str());
                let a_count = a.iter().filter(relevant).count();
                let b_count = b.iter().filter(relevant).count();
                if a_count != b_count {
                    return false;
                }
                for (key, a_child) in a.iter().filter(relevant) {
                    match b.get(key) {
                        Some(b_child) => stack.push((a_child, b_child)),
                        None => return false,
                    }
                }
            }
            (Node::Sequence(a), Node::Sequence(b)) => {
                if a.len() != b.len() {
                    return false;
                }
                stack.extend(a.iter().zip(b.iter()));
            }
            (Node::Scalar(a), Node::Scalar(b)) => {
                if a != b {
                    return false;
                }
            }
            _ => return false,
        }
    }
    true
}

/// Compare `select(doc)` of every document against the first document that
/// has one. Differences are owned by the differing document.
fn compare_with_first<'a, F>(
    documents: &'a [ApiDocument],
    select: F,
    ignored: &[&str],
    violation: impl Fn(&ApiDocument, &ApiDocument) -> Violation,
) -> Vec<ProjectViolation>
where
    F: Fn(&'a ApiDocument) -> Option<&'a Node>,
{
    let present: Vec<(&ApiDocument, &Node)> = documents
        .iter()
        .filter_map(|doc| select(doc).map(|node| (doc, node)))
        .collect();

    let Some(((reference_doc, reference), rest)) = present.split_first() else {
        return Vec::new();
    };

    rest.iter()
        .filter(|(_, node)| !equivalent(reference, node, ignored))
        .map(|(doc, _)| ProjectViolation::new(&doc.file_name, violation(reference_doc, doc)))
        .collect()
}

fn shared_schema_consistency(
    ctx: &ProjectContext<'_>,
) -> Result<Vec<ProjectViolation>, RuleError> {
    let mut violations = Vec::new();
    for name in SHARED_SCHEMAS {
        violations.extend(compare_with_first(
            ctx.documents,
            |doc| doc.root.lookup(&["components", "schemas", name]),
            &DOCUMENTATION_KEYS,
            |reference, _| {
                Violation::new(
                    format!(
                        "Schema `{}` differs from the one in `{}`",
                        name, reference.file_name
                    ),
                    NodePath::from_keys(&["components", "schemas", name]),
                )
                .with_fix(format!(
                    "Ensure `{}` schema is identical across all files",
                    name
                ))
            },
        ));
    }
    Ok(violations)
}

fn license_consistency(ctx: &ProjectContext<'_>) -> Result<Vec<ProjectViolation>, RuleError> {
    Ok(compare_with_first(
        ctx.documents,
        |doc| {
            doc.root
                .lookup(&["info", "license"])
                .filter(|license| !license.is_null())
        },
        &[],
        |reference, _| {
            Violation::new(
                format!(
                    "License information differs from the one in `{}`",
                    reference.file_name
                ),
                NodePath::from_keys(&["info", "license"]),
            )
            .with_fix("Ensure all files have identical license information")
        },
    ))
}

fn commonalities_consistency(
    ctx: &ProjectContext<'_>,
) -> Result<Vec<ProjectViolation>, RuleError> {
    let declared = |doc: &ApiDocument| {
        doc.root
            .lookup(&["info", "x-camara-commonalities"])
            .and_then(Node::as_text)
            .map(|t| t.into_owned())
            .filter(|t| !t.is_empty())
    };

    let present: Vec<(&ApiDocument, String)> = ctx
        .documents
        .iter()
        .filter_map(|doc| declared(doc).map(|version| (doc, version)))
        .collect();
    let Some(((reference_doc, reference), rest)) = present.split_first() else {
        return Ok(Vec::new());
    };

    Ok(rest
        .iter()
        .filter(|(_, version)| version != reference)
        .map(|(doc, version)| {
            ProjectViolation::new(
                &doc.file_name,
                Violation::new(
                    format!(
                        "Commonalities version differs: `{}` ({}) vs `{}`",
                        reference, reference_doc.file_name, version
                    ),
                    NodePath::from_keys(&["info", "x-camara-commonalities"]),
                )
                .with_fix("Ensure all files use the same commonalities version"),
            )
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::super::testing::{document, options};
    use super::*;
    use crate::validation::{ProjectRule, ReviewType};

    fn run(id: &str, docs: &[ApiDocument]) -> Vec<ProjectViolation> {
        let options = options(ReviewType::ReleaseCandidate);
        let ctx = ProjectContext {
            documents: docs,
            test_definitions: None,
            options: &options,
        };
        let rule = RULES.iter().find(|r| r.id == id).unwrap();
        if !rule.applies_to(&ctx) {
            return Vec::new();
        }
        rule.check(&ctx).unwrap()
    }

    const FIRST: &str = r#"
info:
  x-camara-commonalities: 0.6
  license:
    name: Apache 2.0
    url: https://www.apache.org/licenses/LICENSE-2.0.html
components:
  schemas:
    XCorrelator:
      type: string
      description: Correlation id
      pattern: ^[a-z]+$
      example: abc
"#;

    #[test]
    fn test_single_document_is_skipped() {
        let docs = vec![document("a.yaml", FIRST)];
        assert!(run("shared-schema-consistency", &docs).is_empty());
    }

    #[test]
    fn test_documentation_differences_are_ignored() {
        let second = FIRST
            .replace("Correlation id", "Another description")
            .replace("example: abc", "example: xyz");
        let docs = vec![document("a.yaml", FIRST), document("b.yaml", &second)];
        assert!(run("shared-schema-consistency", &docs).is_empty());
        assert!(run("license-consistency", &docs).is_empty());
    }

    #[test]
    fn test_differences_owned_by_later_document() {
        let second = FIRST
            .replace("^[a-z]+$", "^[0-9]+$")
            .replace("x-camara-commonalities: 0.6", "x-camara-commonalities: 0.5")
            .replace("name: Apache 2.0", "name: MIT");
        let docs = vec![
            document("a.yaml", FIRST),
            document("b.yaml", &second),
            document("c.yaml", FIRST),
        ];

        for id in [
            "shared-schema-consistency",
            "license-consistency",
            "commonalities-consistency",
        ] {
            let violations = run(id, &docs);
            assert_eq!(violations.len(), 1, "{}", id);
            assert_eq!(violations[0].document, "b.yaml");
        }
    }

    #[test]
    fn test_equivalent_ignores_key_order() {
        let a = document("a.yaml", "x:\n  a: 1\n  b: [1, 2]\n").root;
        let b = document("b.yaml", "x:\n  b: [1, 2]\n  a: 1\n").root;
        let c = document("c.yaml", "x:\n  b: [2, 1]\n  a: 1\n").root;
        assert!(equivalent(&a, &b, &[]));
        assert!(!equivalent(&a, &c, &[]));
    }
}
