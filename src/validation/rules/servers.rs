use super::{is_blank, text};
use crate::error::RuleError;
use crate::models::NodePath;
use crate::validation::{Category, RuleContext, RuleDefinition, Severity, Violation};

pub(super) static RULES: &[RuleDefinition] = &[
    RuleDefinition::new(
        "servers-defined",
        Category::Servers,
        Severity::Medium,
        "At least one server is declared",
        servers_defined,
    ),
    RuleDefinition::new(
        "server-url-present",
        Category::Servers,
        Severity::Critical,
        "Every server has a URL",
        server_url_present,
    ),
    RuleDefinition::new(
        "server-url-format",
        Category::Servers,
        Severity::Medium,
        "Server URLs start with `{apiRoot}` or `https://`",
        server_url_format,
    ),
    RuleDefinition::new(
        "api-name-from-servers",
        Category::Servers,
        Severity::Medium,
        "An api-name can be extracted from `servers[*].url`",
        api_name_from_servers,
    ),
];

/// `(index, url)` for every server entry; the URL is empty when missing.
fn server_urls(ctx: &RuleContext<'_>) -> Result<Vec<(usize, String)>, RuleError> {
    let servers = ctx.sequence(&["servers"])?.unwrap_or_default();
    Ok(servers
        .iter()
        .enumerate()
        .map(|(index, server)| (index, text(server.get("url"))))
        .collect())
}

fn url_location(index: usize) -> NodePath {
    NodePath::from_keys(&["servers"]).index(index).key("url")
}

fn servers_defined(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    if is_blank(ctx.node(&["servers"])?) {
        return Ok(vec![Violation::new(
            "No servers defined",
            NodePath::from_keys(&["servers"]),
        )]);
    }
    Ok(Vec::new())
}

fn server_url_present(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    Ok(server_urls(ctx)?
        .into_iter()
        .filter(|(_, url)| url.is_empty())
        .map(|(index, _)| {
            Violation::new(
                format!("Server {} missing URL", index + 1),
                url_location(index),
            )
        })
        .collect())
}

fn server_url_format(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    Ok(server_urls(ctx)?
        .into_iter()
        .filter(|(_, url)| {
            !url.is_empty() && !url.starts_with("https://") && !url.starts_with("{apiRoot}")
        })
        .map(|(index, url)| {
            Violation::new(
                format!("Server URL should use HTTPS or template variable: `{}`", url),
                url_location(index),
            )
            .with_fix("Use `{apiRoot}` template or HTTPS URL")
        })
        .collect())
}

fn api_name_from_servers(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    if ctx.document.api_name.is_none() {
        return Ok(vec![
            Violation::new(
                "Cannot extract api-name from servers[*].url",
                NodePath::from_keys(&["servers"]),
            )
            .with_fix("Ensure servers[*].url follows format: {apiRoot}/<api-name>/<api-version>"),
        ]);
    }
    Ok(Vec::new())
}
