//! Rule catalog for Commonalities 0.6.
//!
//! Each submodule exports a `RULES` table. Catalog order is the order of the
//! tables below, then the order within each table.

mod components;
mod consistency;
mod correlator;
mod errors;
mod external_docs;
mod info;
mod naming;
mod operations;
mod references;
mod security;
mod servers;
mod subscriptions;
mod templates;
mod test_alignment;
mod versioning;

use super::rule::{Operation, ProjectRule, Rule, RuleContext};
use super::ruleset::{RuleCatalog, RulesetVersion};
use crate::error::RuleError;
use crate::models::{ApiKind, Node, NodePath};

pub(super) fn catalog_v0_6() -> RuleCatalog {
    let document_tables = [
        info::RULES,
        templates::RULES,
        external_docs::RULES,
        servers::RULES,
        operations::RULES,
        errors::RULES,
        components::RULES,
        security::RULES,
        versioning::RULES,
        naming::RULES,
        correlator::RULES,
        subscriptions::RULES,
        references::RULES,
    ];
    let project_tables = [consistency::RULES, test_alignment::RULES];

    let rules = document_tables
        .into_iter()
        .flatten()
        .map(|rule| Box::new(*rule) as Box<dyn Rule>)
        .collect();
    let project_rules = project_tables
        .into_iter()
        .flatten()
        .map(|rule| Box::new(*rule) as Box<dyn ProjectRule>)
        .collect();

    RuleCatalog::new(RulesetVersion::V0_6, rules, project_rules)
}

/// Absent, null, empty text, or an empty collection.
fn is_blank(node: Option<&Node>) -> bool {
    match node {
        None => true,
        Some(Node::Mapping(map)) => map.is_empty(),
        Some(Node::Sequence(items)) => items.is_empty(),
        Some(other) => other.as_text().is_none_or(|t| t.is_empty()),
    }
}

fn text(node: Option<&Node>) -> String {
    node.and_then(Node::as_text)
        .map(|t| t.into_owned())
        .unwrap_or_default()
}

fn has_info(ctx: &RuleContext<'_>) -> bool {
    !is_blank(ctx.root().get("info"))
}

fn has_components(ctx: &RuleContext<'_>) -> bool {
    !is_blank(ctx.root().get("components"))
}

fn is_subscription(ctx: &RuleContext<'_>) -> bool {
    ctx.document.kind.is_subscription()
}

fn is_explicit_subscription(ctx: &RuleContext<'_>) -> bool {
    ctx.document.kind == ApiKind::ExplicitSubscription
}

fn is_implicit_subscription(ctx: &RuleContext<'_>) -> bool {
    ctx.document.kind == ApiKind::ImplicitSubscription
}

fn is_wip_review(ctx: &RuleContext<'_>) -> bool {
    ctx.options.review_type.is_wip()
}

fn is_release_review(ctx: &RuleContext<'_>) -> bool {
    !ctx.options.review_type.is_wip()
}

/// One entry of a security requirement list: `{scheme: [scopes]}`.
struct Requirement<'a> {
    scheme: &'a str,
    scopes: &'a [Node],
    location: NodePath,
}

/// Flatten a `security` list. Empty requirement objects (`{}`) contribute
/// nothing; the second value reports whether one was present.
fn security_requirements<'a>(
    security: &'a Node,
    base: &NodePath,
) -> Result<(Vec<Requirement<'a>>, bool), RuleError> {
    let Some(items) = security.as_sequence() else {
        if security.is_null() {
            return Ok((Vec::new(), false));
        }
        return Err(RuleError::UnexpectedShape {
            location: base.clone(),
            expected: "sequence",
            found: security.kind_name(),
        });
    };

    let mut requirements = Vec::new();
    let mut has_empty = false;
    for (index, item) in items.iter().enumerate() {
        let Some(map) = item.as_mapping() else {
            continue;
        };
        if map.is_empty() {
            has_empty = true;
        }
        for (scheme, scopes) in map {
            requirements.push(Requirement {
                scheme,
                scopes: scopes.as_sequence().unwrap_or_default(),
                location: base.child_index(index).key(scheme.as_str()),
            });
        }
    }
    Ok((requirements, has_empty))
}

/// Operations declared under `callbacks` of every top-level operation.
fn callback_operations<'a>(ctx: &RuleContext<'a>) -> Result<Vec<Operation<'a>>, RuleError> {
    let mut found = Vec::new();
    for operation in ctx.operations()? {
        let Some(callbacks) = operation.get("callbacks").and_then(Node::as_mapping) else {
            continue;
        };
        for (name, callback) in callbacks {
            let Some(expressions) = callback.as_mapping() else {
                continue;
            };
            for (expression, item) in expressions {
                let Some(item) = item.as_mapping() else {
                    continue;
                };
                for (method, node) in item {
                    if !super::rule::HTTP_METHODS.contains(&method.as_str()) {
                        continue;
                    }
                    let Some(node) = node.as_mapping() else {
                        continue;
                    };
                    found.push(Operation {
                        path: expression,
                        method,
                        node,
                        location: operation
                            .location
                            .child_key("callbacks")
                            .key(name.as_str())
                            .key(expression.as_str())
                            .key(method.as_str()),
                    });
                }
            }
        }
    }
    Ok(found)
}

#[cfg(test)]
pub(super) mod testing {
    use crate::loader::parse_openapi;
    use crate::models::ApiDocument;
    use crate::validation::rule::{ReviewOptions, ReviewType, RuleContext, RuleDefinition};
    use crate::validation::ruleset::resolve_version;
    use crate::validation::{Rule, Violation};
    use std::path::Path;

    pub fn document(file_name: &str, yaml: &str) -> ApiDocument {
        parse_openapi(file_name, Path::new(file_name), yaml)
            .unwrap()
            .document
    }

    pub fn options(review_type: ReviewType) -> ReviewOptions {
        ReviewOptions {
            resolution: resolve_version("0.6"),
            review_type,
        }
    }

    /// Run one rule from `table`, honouring its applicability predicate.
    pub fn run_with(
        table: &[RuleDefinition],
        id: &str,
        document: &ApiDocument,
        options: &ReviewOptions,
    ) -> Vec<Violation> {
        let rule = table
            .iter()
            .find(|r| r.id == id)
            .unwrap_or_else(|| panic!("no rule {}", id));
        let ctx = RuleContext::new(document, options);
        if !rule.applies_to(&ctx) {
            return Vec::new();
        }
        rule.check(&ctx).unwrap()
    }

    pub fn run(table: &[RuleDefinition], id: &str, yaml: &str) -> Vec<Violation> {
        let document = document("sample-api.yaml", yaml);
        run_with(table, id, &document, &options(ReviewType::ReleaseCandidate))
    }
}
