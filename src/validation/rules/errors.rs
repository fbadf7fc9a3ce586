use crate::error::RuleError;
use crate::models::{Node, NodePath, Visit, walk};
use crate::validation::{Category, Operation, RuleContext, RuleDefinition, Severity, Violation};

const ERROR_CODES: [&str; 4] = ["400", "401", "403", "404"];
const ERROR_INFO_REF: &str = "#/components/schemas/ErrorInfo";
const JSON: &str = "application/json";
/// Response `$ref` chains longer than this are treated as unresolvable.
const MAX_REF_HOPS: usize = 8;

pub(super) static RULES: &[RuleDefinition] = &[
    RuleDefinition::new(
        "error-response-ref",
        Category::ErrorResponses,
        Severity::Critical,
        "Error response references resolve",
        error_response_ref,
    ),
    RuleDefinition::new(
        "error-response-content",
        Category::ErrorResponses,
        Severity::Medium,
        "Error responses are JSON and use `ErrorInfo`",
        error_response_content,
    ),
    RuleDefinition::new(
        "mandatory-400-response",
        Category::ErrorResponses,
        Severity::Medium,
        "Every operation declares a 400 response",
        mandatory_400_response,
    ),
    RuleDefinition::new(
        "unauthenticated-error-code",
        Category::ErrorCodes,
        Severity::Medium,
        "`UNAUTHENTICATED` is used instead of `AUTHENTICATION_REQUIRED`",
        unauthenticated_error_code,
    ),
    RuleDefinition::new(
        "forbidden-error-code",
        Category::ErrorCodes,
        Severity::Critical,
        "The removed `IDENTIFIER_MISMATCH` code is not used",
        forbidden_error_code,
    ),
];

enum ResolvedResponse<'a> {
    Found(&'a Node),
    Unresolvable(String),
}

/// Follow `$ref` on a response object until a concrete response is reached.
fn resolve_response<'a>(ctx: &RuleContext<'a>, response: &'a Node) -> ResolvedResponse<'a> {
    let mut current = response;
    for _ in 0..MAX_REF_HOPS {
        let Some(reference) = current.get("$ref").and_then(Node::as_str) else {
            return ResolvedResponse::Found(current);
        };
        match ctx.resolve_ref(reference) {
            Some(target) if target.as_mapping().is_some() => current = target,
            _ => return ResolvedResponse::Unresolvable(reference.to_string()),
        }
    }
    ResolvedResponse::Unresolvable(
        current
            .get("$ref")
            .and_then(Node::as_str)
            .unwrap_or_default()
            .to_string(),
    )
}

/// `(code, response, location)` for each declared 400/401/403/404 response.
fn error_responses<'a>(op: &Operation<'a>) -> Vec<(&'static str, &'a Node, NodePath)> {
    let Some(responses) = op.get("responses").and_then(Node::as_mapping) else {
        return Vec::new();
    };
    ERROR_CODES
        .iter()
        .filter_map(|code| {
            responses
                .get(*code)
                .filter(|r| r.as_mapping().is_some())
                .map(|r| (*code, r, op.location.child_key("responses").key(*code)))
        })
        .collect()
}

fn error_response_ref(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    let mut violations = Vec::new();
    for op in ctx.operations()? {
        for (_, response, location) in error_responses(&op) {
            if let ResolvedResponse::Unresolvable(reference) = resolve_response(ctx, response) {
                violations.push(Violation::new(
                    format!(
                        "Cannot resolve response reference: {} ({})",
                        reference,
                        op.label()
                    ),
                    location,
                ));
            }
        }
    }
    Ok(violations)
}

fn references_error_info(schema: &Node) -> bool {
    let direct = |node: &Node| {
        node.get("$ref")
            .and_then(Node::as_str)
            .is_some_and(|r| r.contains(ERROR_INFO_REF))
    };
    if schema.get("$ref").is_some() {
        return direct(schema);
    }
    schema
        .get("allOf")
        .and_then(Node::as_sequence)
        .is_some_and(|items| items.iter().any(direct))
}

fn error_response_content(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    let mut violations = Vec::new();
    for op in ctx.operations()? {
        for (code, response, location) in error_responses(&op) {
            let ResolvedResponse::Found(response) = resolve_response(ctx, response) else {
                continue;
            };
            let Some(media) = response.lookup(&["content", JSON]) else {
                violations.push(Violation::new(
                    format!(
                        "Error response {} should have application/json content: {}",
                        code,
                        op.label()
                    ),
                    location,
                ));
                continue;
            };
            let schema_ok = match media.get("schema") {
                None => false,
                Some(schema) if schema.as_mapping().is_none() => true,
                Some(schema) => references_error_info(schema),
            };
            if !schema_ok {
                violations.push(
                    Violation::new(
                        format!(
                            "Error response {} should reference ErrorInfo schema: {}",
                            code,
                            op.label()
                        ),
                        location,
                    )
                    .with_fix(format!("Use `$ref: '{}'` directly or in `allOf`", ERROR_INFO_REF)),
                );
            }
        }
    }
    Ok(violations)
}

fn mandatory_400_response(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    Ok(ctx
        .operations()?
        .into_iter()
        .filter(|op| {
            !op.get("responses")
                .and_then(Node::as_mapping)
                .is_some_and(|r| r.contains_key("400"))
        })
        .map(|op| {
            Violation::new(
                format!("Missing 400 (Bad Request) response: {}", op.label()),
                op.location.child_key("responses"),
            )
            .with_fix("Add 400 response for validation errors")
        })
        .collect())
}

/// Keys whose scalar value names an error code directly.
const CODE_KEYS: [&str; 3] = ["const", "example", "code"];

/// Every place in the document using `code`: `enum` entries, `const`,
/// `example` and `code` values (which covers `examples.*.value.code`).
fn code_occurrences(ctx: &RuleContext<'_>, code: &str) -> Vec<NodePath> {
    let mut found = Vec::new();
    walk(ctx.root(), NodePath::root(), |path, node| {
        if let Some(values) = node.get("enum").and_then(Node::as_sequence) {
            for (index, value) in values.iter().enumerate() {
                if value.as_str() == Some(code) {
                    found.push(path.child_key("enum").index(index));
                }
            }
        }
        for key in CODE_KEYS {
            if node.get(key).and_then(Node::as_str) == Some(code) {
                found.push(path.child_key(key));
            }
        }
        Visit::Descend
    });
    found
}

fn unauthenticated_error_code(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    Ok(code_occurrences(ctx, "AUTHENTICATION_REQUIRED")
        .into_iter()
        .map(|location| {
            Violation::new(
                "Use `UNAUTHENTICATED` instead of `AUTHENTICATION_REQUIRED`",
                location,
            )
            .with_fix("Replace `AUTHENTICATION_REQUIRED` with `UNAUTHENTICATED`")
        })
        .collect())
}

fn forbidden_error_code(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    Ok(code_occurrences(ctx, "IDENTIFIER_MISMATCH")
        .into_iter()
        .map(|location| {
            Violation::new("Forbidden error code `IDENTIFIER_MISMATCH` found", location)
                .with_fix("Remove `IDENTIFIER_MISMATCH` from the API")
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::super::testing::run;
    use super::*;

    const RESPONSES: &str = r#"
paths:
  /sessions:
    post:
      responses:
        "201":
          description: Created
        "400":
          $ref: '#/components/responses/Generic400'
        "401":
          $ref: '#/components/responses/Missing401'
        "403":
          description: Forbidden
          content:
            text/plain:
              schema:
                type: string
        "404":
          description: Not found
          content:
            application/json:
              schema:
                type: object
    get:
      responses:
        "200":
          description: OK
components:
  responses:
    Generic400:
      description: Bad request
      content:
        application/json:
          schema:
            allOf:
              - $ref: '#/components/schemas/ErrorInfo'
              - type: object
"#;

    #[test]
    fn test_unresolvable_response_ref() {
        let violations = run(RULES, "error-response-ref", RESPONSES);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("Missing401"));
        assert_eq!(
            violations[0].location,
            NodePath::from_keys(&["paths", "/sessions", "post", "responses", "401"])
        );
    }

    #[test]
    fn test_error_response_content() {
        let violations = run(RULES, "error-response-content", RESPONSES);
        let codes: Vec<_> = violations
            .iter()
            .map(|v| v.location.to_strings().last().cloned().unwrap())
            .collect();
        assert_eq!(codes, vec!["403", "404"]);
        assert!(violations[0].message.contains("application/json"));
        assert!(violations[1].message.contains("ErrorInfo"));
    }

    #[test]
    fn test_mandatory_400() {
        let violations = run(RULES, "mandatory-400-response", RESPONSES);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("GET /sessions"));
    }

    #[test]
    fn test_authentication_required_is_reported_anywhere() {
        let yaml = r#"
components:
  responses:
    Generic401:
      content:
        application/json:
          schema:
            properties:
              code:
                enum:
                  - AUTHENTICATION_REQUIRED
                  - UNAUTHENTICATED
"#;
        let violations = run(RULES, "unauthenticated-error-code", yaml);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("AUTHENTICATION_REQUIRED"));
        assert_eq!(
            violations[0].location.to_string(),
            "components.responses.Generic401.content.application/json.schema.properties.code.enum[0]"
        );

        let clean = yaml.replace("- AUTHENTICATION_REQUIRED\n", "");
        assert!(run(RULES, "unauthenticated-error-code", &clean).is_empty());
    }

    #[test]
    fn test_identifier_mismatch() {
        let yaml = "components:\n  schemas:\n    Code:\n      enum: [IDENTIFIER_MISMATCH]\n";
        let violations = run(RULES, "forbidden-error-code", yaml);
        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations[0].location,
            NodePath::from_keys(&["components", "schemas", "Code", "enum"]).index(0)
        );
    }

    #[test]
    fn test_authentication_required_as_const() {
        let yaml = r#"
components:
  schemas:
    Unauthenticated:
      properties:
        code:
          type: string
          const: AUTHENTICATION_REQUIRED
"#;
        let violations = run(RULES, "unauthenticated-error-code", yaml);
        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations[0].location,
            NodePath::from_keys(&[
                "components",
                "schemas",
                "Unauthenticated",
                "properties",
                "code",
                "const"
            ])
        );
    }

    #[test]
    fn test_authentication_required_in_examples() {
        let yaml = r#"
components:
  responses:
    Generic401:
      content:
        application/json:
          examples:
            GENERIC_401_AUTHENTICATION_REQUIRED:
              value:
                status: 401
                code: AUTHENTICATION_REQUIRED
                message: Request not authenticated
"#;
        let violations = run(RULES, "unauthenticated-error-code", yaml);
        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations[0].location.to_string(),
            "components.responses.Generic401.content.application/json.examples.GENERIC_401_AUTHENTICATION_REQUIRED.value.code"
        );

        let clean = yaml.replace("code: AUTHENTICATION_REQUIRED", "code: UNAUTHENTICATED");
        assert!(run(RULES, "unauthenticated-error-code", &clean).is_empty());
    }

    #[test]
    fn test_authentication_required_as_example() {
        let yaml = "components:\n  schemas:\n    Code:\n      type: string\n      example: AUTHENTICATION_REQUIRED\n";
        let violations = run(RULES, "unauthenticated-error-code", yaml);
        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations[0].location,
            NodePath::from_keys(&["components", "schemas", "Code", "example"])
        );
    }
}
