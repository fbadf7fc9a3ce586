use super::{is_explicit_subscription, is_implicit_subscription, is_subscription};
use crate::error::RuleError;
use crate::models::{Node, NodePath};
use crate::validation::{Category, RuleContext, RuleDefinition, Severity, Violation};

const CRUD_METHODS: [&str; 4] = ["get", "post", "put", "delete"];

pub(super) static RULES: &[RuleDefinition] = &[
    RuleDefinition::new(
        "subscription-schemas",
        Category::Subscriptions,
        Severity::Medium,
        "Explicit subscription APIs define subscription schemas",
        subscription_schemas,
    )
    .when(is_explicit_subscription),
    RuleDefinition::new(
        "event-schemas",
        Category::Subscriptions,
        Severity::Low,
        "Subscription APIs define event schemas",
        event_schemas,
    )
    .when(is_subscription),
    RuleDefinition::new(
        "subscription-endpoints",
        Category::Subscriptions,
        Severity::Critical,
        "Explicit subscription APIs expose subscription paths",
        subscription_endpoints,
    )
    .when(is_explicit_subscription),
    RuleDefinition::new(
        "subscription-path-operations",
        Category::Subscriptions,
        Severity::Medium,
        "Subscription paths define operations",
        subscription_path_operations,
    )
    .when(is_explicit_subscription),
    RuleDefinition::new(
        "implicit-callbacks",
        Category::Subscriptions,
        Severity::Medium,
        "Implicit subscription APIs define callbacks",
        implicit_callbacks,
    )
    .when(is_implicit_subscription),
];

fn has_schema_named(ctx: &RuleContext<'_>, fragment: &str) -> Result<bool, RuleError> {
    Ok(ctx
        .schemas()?
        .is_some_and(|schemas| schemas.keys().any(|name| name.to_lowercase().contains(fragment))))
}

fn subscription_schemas(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    if has_schema_named(ctx, "subscription")? {
        return Ok(Vec::new());
    }
    Ok(vec![
        Violation::new(
            "Explicit subscription API should define subscription-related schemas",
            NodePath::from_keys(&["components", "schemas"]),
        )
        .with_fix("Add schemas for subscription management"),
    ])
}

fn event_schemas(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    if has_schema_named(ctx, "event")? {
        return Ok(Vec::new());
    }
    Ok(vec![
        Violation::new(
            "Subscription API should define event-related schemas",
            NodePath::from_keys(&["components", "schemas"]),
        )
        .with_fix("Consider adding event payload schemas"),
    ])
}

fn subscription_paths<'a>(ctx: &RuleContext<'a>) -> Result<Vec<(&'a str, &'a Node)>, RuleError> {
    Ok(ctx
        .mapping(&["paths"])?
        .map(|paths| {
            paths
                .iter()
                .filter(|(path, _)| path.to_lowercase().contains("subscription"))
                .map(|(path, item)| (path.as_str(), item))
                .collect()
        })
        .unwrap_or_default())
}

fn subscription_endpoints(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    if !subscription_paths(ctx)?.is_empty() {
        return Ok(Vec::new());
    }
    Ok(vec![
        Violation::new(
            "Explicit subscription API must have subscription endpoints",
            NodePath::from_keys(&["paths"]),
        )
        .with_fix("Add /subscriptions endpoints for CRUD operations"),
    ])
}

fn subscription_path_operations(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    Ok(subscription_paths(ctx)?
        .into_iter()
        .filter_map(|(path, item)| item.as_mapping().map(|item| (path, item)))
        .filter(|(_, item)| !item.keys().any(|method| CRUD_METHODS.contains(&method.as_str())))
        .map(|(path, _)| {
            Violation::new(
                format!("Subscription path `{}` has no operations defined", path),
                NodePath::from_keys(&["paths", path]),
            )
        })
        .collect())
}

fn implicit_callbacks(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    if ctx
        .operations()?
        .iter()
        .any(|op| op.node.contains_key("callbacks"))
    {
        return Ok(Vec::new());
    }
    Ok(vec![
        Violation::new(
            "Implicit subscription API should define callbacks",
            NodePath::from_keys(&["paths"]),
        )
        .with_fix("Add callback definitions for event notifications"),
    ])
}

#[cfg(test)]
mod tests {
    use super::super::testing::run;
    use super::*;

    #[test]
    fn test_regular_api_is_skipped() {
        let yaml = "paths:\n  /sessions:\n    get:\n      responses: {}\n";
        for rule in RULES {
            assert!(run(RULES, rule.id, yaml).is_empty(), "{} fired", rule.id);
        }
    }

    #[test]
    fn test_explicit_subscription_detected_from_schema_name() {
        let yaml = "paths:\n  /devices:\n    get: {}\ncomponents:\n  schemas:\n    SubscriptionRequest:\n      type: object\n";
        assert!(run(RULES, "subscription-schemas", yaml).is_empty());
        assert_eq!(run(RULES, "event-schemas", yaml).len(), 1);
        assert_eq!(run(RULES, "subscription-endpoints", yaml).len(), 1);
    }

    #[test]
    fn test_subscription_path_without_operations() {
        let yaml = r#"
paths:
  /subscriptions:
    parameters: []
  /subscriptions/{subscriptionId}:
    get:
      responses: {}
components:
  schemas:
    Subscription: {}
    CloudEvent: {}
"#;
        let violations = run(RULES, "subscription-path-operations", yaml);
        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations[0].location,
            NodePath::from_keys(&["paths", "/subscriptions"])
        );
        assert!(run(RULES, "event-schemas", yaml).is_empty());
    }

    #[test]
    fn test_implicit_without_callbacks() {
        let yaml = "paths:\n  /check:\n    post: {}\ncomponents:\n  schemas:\n    StatusChangedEvent: {}\n";
        assert_eq!(run(RULES, "implicit-callbacks", yaml).len(), 1);
        assert!(run(RULES, "subscription-endpoints", yaml).is_empty());
    }
}
