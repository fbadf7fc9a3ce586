use super::{has_components, is_blank};
use crate::error::RuleError;
use crate::models::{Node, NodePath};
use crate::validation::{Category, RuleContext, RuleDefinition, Severity, Violation};

const REQUIRED_SCHEMAS: [&str; 2] = ["ErrorInfo", "XCorrelator"];
const ERROR_INFO_PROPERTIES: [&str; 2] = ["code", "message"];

pub(super) static RULES: &[RuleDefinition] = &[
    RuleDefinition::new(
        "components-present",
        Category::Components,
        Severity::Medium,
        "A `components` section is present",
        components_present,
    ),
    RuleDefinition::new(
        "required-common-schemas",
        Category::Components,
        Severity::Critical,
        "`ErrorInfo` and `XCorrelator` schemas are defined",
        required_common_schemas,
    )
    .when(has_components),
    RuleDefinition::new(
        "error-info-properties",
        Category::Components,
        Severity::Critical,
        "`ErrorInfo` declares `code` and `message`",
        error_info_properties,
    )
    .when(has_components),
];

fn components_present(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    if is_blank(ctx.node(&["components"])?) {
        return Ok(vec![Violation::new(
            "No components defined",
            NodePath::from_keys(&["components"]),
        )]);
    }
    Ok(Vec::new())
}

fn required_common_schemas(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    let schemas = ctx.schemas()?;
    Ok(REQUIRED_SCHEMAS
        .iter()
        .filter(|name| !schemas.is_some_and(|s| s.contains_key(**name)))
        .map(|name| {
            Violation::new(
                format!("Missing required `{}` schema", name),
                NodePath::from_keys(&["components", "schemas"]),
            )
            .with_fix(format!(
                "Copy `{}` from CAMARA_common.yaml of the Commonalities release",
                name
            ))
        })
        .collect())
}

fn error_info_properties(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    let Some(error_info) = ctx.mapping(&["components", "schemas", "ErrorInfo"])? else {
        return Ok(Vec::new());
    };
    let properties = error_info.get("properties").and_then(Node::as_mapping);
    Ok(ERROR_INFO_PROPERTIES
        .iter()
        .filter(|prop| !properties.is_some_and(|p| p.contains_key(**prop)))
        .map(|prop| {
            Violation::new(
                format!("Missing required property `{}`", prop),
                NodePath::from_keys(&["components", "schemas", "ErrorInfo", "properties"]),
            )
        })
        .collect())
}
