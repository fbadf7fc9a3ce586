use crate::error::RuleError;
use crate::models::NodePath;
use crate::validation::{Category, RuleContext, RuleDefinition, Severity, Violation};
use regex::Regex;
use std::sync::LazyLock;

static KEBAB_CASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9-]+$").expect("valid kebab-case regex"));

pub(super) static RULES: &[RuleDefinition] = &[
    RuleDefinition::new(
        "filename-kebab-case",
        Category::Naming,
        Severity::Critical,
        "File name is kebab-case",
        filename_kebab_case,
    ),
    RuleDefinition::new(
        "filename-api-name",
        Category::Naming,
        Severity::Critical,
        "File name matches the api-name from `servers[*].url`",
        filename_api_name,
    )
    .when(has_api_name),
    RuleDefinition::new(
        "title-api-name-alignment",
        Category::Naming,
        Severity::Low,
        "`info.title` reflects the api-name",
        title_api_name_alignment,
    )
    .when(has_api_name),
];

fn has_api_name(ctx: &RuleContext<'_>) -> bool {
    ctx.document.api_name.is_some()
}

fn filename_kebab_case(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    let stem = ctx.document.file_stem();
    if KEBAB_CASE.is_match(stem) {
        return Ok(Vec::new());
    }
    Ok(vec![
        Violation::new(
            format!("Filename should use kebab-case: `{}`", stem),
            NodePath::root(),
        )
        .with_fix("Use lowercase letters, numbers, and hyphens only"),
    ])
}

fn filename_api_name(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    let stem = ctx.document.file_stem();
    match ctx.document.api_name.as_deref() {
        Some(api_name) if api_name != stem => Ok(vec![
            Violation::new(
                format!(
                    "Filename `{}` doesn't match api-name `{}` from servers URL",
                    stem, api_name
                ),
                NodePath::root(),
            )
            .with_fix(format!(
                "Rename file to `{}.yaml` to match the api-name from servers[*].url",
                api_name
            )),
        ]),
        _ => Ok(Vec::new()),
    }
}

/// The title mentions the api-name words, or at least one of its longer words.
fn title_reflects(title: &str, api_name: &str) -> bool {
    let title = title.to_lowercase();
    title.contains(&api_name.replace('-', " "))
        || api_name
            .split('-')
            .filter(|word| word.len() > 3)
            .any(|word| title.contains(word))
}

fn title_api_name_alignment(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    let (Some(api_name), Some(title)) = (ctx.document.api_name.as_deref(), ctx.info_text("title"))
    else {
        return Ok(Vec::new());
    };
    if title.is_empty() || title_reflects(&title, api_name) {
        return Ok(Vec::new());
    }
    Ok(vec![
        Violation::new(
            format!("API title `{}` may not align with api-name `{}`", title, api_name),
            NodePath::from_keys(&["info", "title"]),
        )
        .with_fix(format!(
            "Consider if title should reference concepts from api-name `{}`",
            api_name
        )),
    ])
}
