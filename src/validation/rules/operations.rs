use super::{callback_operations, is_blank, security_requirements};
use crate::error::RuleError;
use crate::models::{Node, NodePath};
use crate::validation::{Category, RuleContext, RuleDefinition, Severity, Violation};

const SUCCESS_CODES: [&str; 4] = ["200", "201", "202", "204"];
const WRITE_METHODS: [&str; 3] = ["post", "put", "delete"];

pub(super) static RULES: &[RuleDefinition] = &[
    RuleDefinition::new(
        "paths-defined",
        Category::Operations,
        Severity::Critical,
        "At least one path is declared",
        paths_defined,
    ),
    RuleDefinition::new(
        "operation-id",
        Category::Operations,
        Severity::Critical,
        "Every operation has an `operationId`",
        operation_id,
    ),
    RuleDefinition::new(
        "operation-summary",
        Category::Operations,
        Severity::Medium,
        "Every operation has a `summary`",
        operation_summary,
    ),
    RuleDefinition::new(
        "operation-description",
        Category::Operations,
        Severity::Low,
        "Every operation has a `description`",
        operation_description,
    ),
    RuleDefinition::new(
        "operation-responses",
        Category::Operations,
        Severity::Critical,
        "Every operation declares responses",
        operation_responses,
    ),
    RuleDefinition::new(
        "success-response",
        Category::Operations,
        Severity::Medium,
        "Every operation declares a 2xx response",
        success_response,
    ),
    RuleDefinition::new(
        "write-operation-security",
        Category::Operations,
        Severity::Medium,
        "POST, PUT and DELETE operations declare security",
        write_operation_security,
    ),
    RuleDefinition::new(
        "operation-security-openid",
        Category::Operations,
        Severity::Medium,
        "Operation security uses the `openId` scheme",
        operation_security_openid,
    ),
    RuleDefinition::new(
        "callback-security",
        Category::Operations,
        Severity::Critical,
        "Callback operations require `notificationsBearerAuth`",
        callback_security,
    ),
];

fn paths_defined(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    if is_blank(ctx.node(&["paths"])?) {
        return Ok(vec![Violation::new(
            "No paths defined",
            NodePath::from_keys(&["paths"]),
        )]);
    }
    Ok(Vec::new())
}

/// One violation per operation lacking `key`.
fn missing_field(
    ctx: &RuleContext<'_>,
    key: &str,
    message: &str,
) -> Result<Vec<Violation>, RuleError> {
    Ok(ctx
        .operations()?
        .into_iter()
        .filter(|op| !op.node.contains_key(key))
        .map(|op| Violation::new(format!("{}: {}", message, op.label()), op.location))
        .collect())
}

fn operation_id(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    missing_field(ctx, "operationId", "Missing operationId")
}

fn operation_summary(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    missing_field(ctx, "summary", "Missing summary")
}

fn operation_description(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    missing_field(ctx, "description", "Missing description")
}

fn operation_responses(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    Ok(ctx
        .operations()?
        .into_iter()
        .filter(|op| is_blank(op.get("responses")))
        .map(|op| {
            Violation::new(
                format!("No responses defined: {}", op.label()),
                op.location.child_key("responses"),
            )
        })
        .collect())
}

fn success_response(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    let mut violations = Vec::new();
    for op in ctx.operations()? {
        let Some(responses) = op.get("responses").and_then(Node::as_mapping) else {
            continue;
        };
        if responses.is_empty() {
            continue;
        }
        if !SUCCESS_CODES.iter().any(|code| responses.contains_key(*code)) {
            violations.push(Violation::new(
                format!("No success response (2xx) defined: {}", op.label()),
                op.location.child_key("responses"),
            ));
        }
    }
    Ok(violations)
}

fn write_operation_security(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    Ok(ctx
        .operations()?
        .into_iter()
        .filter(|op| WRITE_METHODS.contains(&op.method) && !op.node.contains_key("security"))
        .map(|op| {
            Violation::new(
                format!(
                    "Consider adding security requirements for modifying operations: {}",
                    op.label()
                ),
                op.location.child_key("security"),
            )
        })
        .collect())
}

fn operation_security_openid(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    let mut violations = Vec::new();
    for op in ctx.operations()? {
        let Some(security) = op.get("security") else {
            continue;
        };
        let location = op.location.child_key("security");
        let (requirements, has_empty) = security_requirements(security, &location)?;
        if requirements.is_empty() && !has_empty {
            continue;
        }
        if !requirements.iter().any(|r| r.scheme == "openId") {
            violations.push(Violation::new(
                format!("Operation should use 'openId' security scheme: {}", op.label()),
                location,
            ));
        }
    }
    Ok(violations)
}

fn callback_security(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    let mut violations = Vec::new();
    for op in callback_operations(ctx)? {
        let location = op.location.child_key("security");
        let Some(security) = op.get("security") else {
            violations.push(
                Violation::new(
                    format!(
                        "Callback operation must have security requirements with notificationsBearerAuth: {}",
                        op.label()
                    ),
                    location,
                )
                .with_fix("Add `security: [{notificationsBearerAuth: []}]` to the callback operation"),
            );
            continue;
        };

        let (requirements, has_empty) = security_requirements(security, &location)?;
        if requirements.iter().any(|r| r.scheme == "notificationsBearerAuth") {
            continue;
        }
        let message = if has_empty {
            format!(
                "Callback operation cannot have only empty security, must include notificationsBearerAuth: {}",
                op.label()
            )
        } else {
            format!(
                "Callback operation must include notificationsBearerAuth: {}",
                op.label()
            )
        };
        violations.push(
            Violation::new(message, location)
                .with_fix("Add notificationsBearerAuth to security requirements"),
        );
    }
    Ok(violations)
}
