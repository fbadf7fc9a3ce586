use crate::error::RuleError;
use crate::models::{Node, NodePath, Visit, walk};
use crate::validation::{Category, RuleContext, RuleDefinition, Severity, Violation};
use std::collections::BTreeSet;

const SCHEMA_PREFIX: &str = "#/components/schemas/";
const REQUEST_BODY_PREFIX: &str = "#/components/requestBodies/";

pub(super) static RULES: &[RuleDefinition] = &[
    RuleDefinition::new(
        "request-body-schema-description",
        Category::References,
        Severity::Low,
        "Schemas referenced from request bodies carry no `description`",
        request_body_schema_description,
    ),
    RuleDefinition::new(
        "local-ref-resolves",
        Category::References,
        Severity::Critical,
        "Every local `$ref` resolves",
        local_ref_resolves,
    ),
];

/// Name of the schema a `$ref` points at, for `#/components/schemas/<Name>`.
fn schema_name(reference: &str) -> Option<String> {
    let rest = reference.strip_prefix(SCHEMA_PREFIX)?;
    let name = rest.split('/').next().filter(|name| !name.is_empty())?;
    Some(name.replace("~1", "/").replace("~0", "~"))
}

/// Schema names referenced anywhere inside `body`. The walk is iterative so
/// deeply nested bodies cannot exhaust the stack.
fn collect_schema_refs(body: &Node, names: &mut BTreeSet<String>) {
    walk(body, NodePath::root(), |_, node| {
        if let Some(name) = node
            .get("$ref")
            .and_then(Node::as_str)
            .and_then(schema_name)
        {
            names.insert(name);
        }
        Visit::Descend
    });
}

fn request_body_schema_description(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    let mut names = BTreeSet::new();

    for op in ctx.operations()? {
        let Some(mut body) = op.get("requestBody") else {
            continue;
        };
        if let Some(reference) = body.get("$ref").and_then(Node::as_str) {
            if reference.starts_with(REQUEST_BODY_PREFIX) {
                match ctx.resolve_ref(reference) {
                    Some(target) => body = target,
                    None => continue,
                }
            }
        }
        collect_schema_refs(body, &mut names);
    }

    let Some(schemas) = ctx.schemas()? else {
        return Ok(Vec::new());
    };

    Ok(names
        .into_iter()
        .filter(|name| {
            schemas
                .get(name.as_str())
                .and_then(Node::as_mapping)
                .is_some_and(|schema| schema.contains_key("description"))
        })
        .map(|name| {
            Violation::new(
                format!(
                    "Schema `{}` is referenced from a request body and should not have a `description`",
                    name
                ),
                NodePath::from_keys(&["components", "schemas", name.as_str(), "description"]),
            )
            .with_fix("Describe the request body or the property that uses the schema instead")
        })
        .collect())
}

fn local_ref_resolves(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    let root = ctx.root();
    let mut violations = Vec::new();
    walk(root, NodePath::root(), |path, node| {
        if let Some(reference) = node.get("$ref").and_then(Node::as_str) {
            if reference.starts_with("#/") && root.resolve_ref(reference).is_none() {
                violations.push(
                    Violation::new(
                        format!("Local reference `{}` does not resolve", reference),
                        path.child_key("$ref"),
                    )
                    .with_fix("Point the reference at an existing component"),
                );
            }
        }
        Visit::Descend
    });
    Ok(violations)
}

#[cfg(test)]
mod tests {
    use super::super::testing::run;
    use super::*;

    const FOO_BODY: &str = r#"
paths:
  /items:
    post:
      requestBody:
        content:
          application/json:
            schema:
              type: object
              properties:
                item:
                  $ref: '#/components/schemas/Foo'
                other:
                  $ref: '#/components/schemas/Foo'
    put:
      requestBody:
        $ref: '#/components/requestBodies/FooBody'
      responses:
        "200":
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/Bar'
components:
  requestBodies:
    FooBody:
      content:
        application/json:
          schema:
            $ref: '#/components/schemas/Foo'
  schemas:
    Foo:
      type: object
      description: A foo
    Bar:
      type: object
      description: Only used in responses
"#;

    #[test]
    fn test_described_schema_in_request_body() {
        let violations = run(RULES, "request-body-schema-description", FOO_BODY);
        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations[0].location.to_strings(),
            vec!["components", "schemas", "Foo", "description"]
        );
    }

    #[test]
    fn test_schema_without_description() {
        let yaml = FOO_BODY.replace("      description: A foo\n", "");
        assert!(run(RULES, "request-body-schema-description", &yaml).is_empty());
    }

    #[test]
    fn test_deeply_nested_request_body() {
        let depth = 100;
        let mut yaml = String::from("paths:\n  /deep:\n    post:\n      requestBody:\n");
        let mut indent = String::from("        ");
        for _ in 0..depth {
            yaml.push_str(&format!("{}nested:\n", indent));
            indent.push_str("  ");
        }
        yaml.push_str(&format!("{}$ref: '#/components/schemas/Foo'\n", indent));
        yaml.push_str("components:\n  schemas:\n    Foo:\n      description: deep\n");

        let violations = run(RULES, "request-body-schema-description", &yaml);
        assert_eq!(violations.len(), 1);
    }

    #[test]
    fn test_unresolved_local_ref() {
        let yaml = FOO_BODY.replace("FooBody:\n", "OtherBody:\n");
        let violations = run(RULES, "local-ref-resolves", &yaml);
        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations[0].location,
            NodePath::from_keys(&["paths", "/items", "put", "requestBody", "$ref"])
        );
        assert!(run(RULES, "local-ref-resolves", FOO_BODY).is_empty());
    }
}
