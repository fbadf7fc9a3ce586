use super::{
    callback_operations, has_components, is_subscription, security_requirements, text,
};
use crate::error::RuleError;
use crate::models::{Mapping, Node, NodePath};
use crate::validation::{Category, RuleContext, RuleDefinition, Severity, Violation};
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

const OPENID: &str = "openId";
const NOTIFICATIONS_BEARER: &str = "notificationsBearerAuth";
const WELL_KNOWN: &str = ".well-known/openid-configuration";

static SCOPE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9-]+:[a-z0-9-]+(?::[a-z0-9-]+)?$").expect("valid scope regex")
});

pub(super) static RULES: &[RuleDefinition] = &[
    RuleDefinition::new(
        "security-scheme-defined",
        Category::Security,
        Severity::Critical,
        "Every referenced security scheme is declared",
        security_scheme_defined,
    ),
    RuleDefinition::new(
        "openid-scheme-required",
        Category::Security,
        Severity::Critical,
        "An `openId` security scheme is declared",
        openid_scheme_required,
    )
    .when(has_components),
    RuleDefinition::new(
        "notifications-bearer-auth-required",
        Category::Security,
        Severity::Critical,
        "Subscription APIs declare `notificationsBearerAuth`",
        notifications_bearer_auth_required,
    )
    .when(subscription_with_components),
    RuleDefinition::new(
        "openid-scheme-naming",
        Category::Security,
        Severity::Medium,
        "The OpenID Connect scheme is named `openId`",
        openid_scheme_naming,
    ),
    RuleDefinition::new(
        "openid-connect-url",
        Category::Security,
        Severity::Critical,
        "OpenID Connect schemes declare `openIdConnectUrl`",
        openid_connect_url,
    ),
    RuleDefinition::new(
        "openid-connect-url-format",
        Category::Security,
        Severity::Medium,
        "`openIdConnectUrl` is an HTTP(S) well-known configuration URL",
        openid_connect_url_format,
    ),
    RuleDefinition::new(
        "notifications-bearer-auth-scheme",
        Category::Security,
        Severity::Critical,
        "`notificationsBearerAuth` is an HTTP bearer scheme",
        notifications_bearer_auth_scheme,
    ),
    RuleDefinition::new(
        "notifications-bearer-format",
        Category::Security,
        Severity::Medium,
        "`notificationsBearerAuth` bearer format references sinkCredential",
        notifications_bearer_format,
    ),
    RuleDefinition::new(
        "oauth2-scheme",
        Category::Security,
        Severity::Critical,
        "No scheme uses the `oauth2` type",
        oauth2_scheme,
    ),
    RuleDefinition::new(
        "unexpected-scheme-type",
        Category::Security,
        Severity::Medium,
        "Scheme types are `openIdConnect` or `http`",
        unexpected_scheme_type,
    ),
    RuleDefinition::new(
        "scope-naming",
        Category::Security,
        Severity::Medium,
        "Scopes follow `api-name:[resource:]action`",
        scope_naming,
    ),
];

fn subscription_with_components(ctx: &RuleContext<'_>) -> bool {
    is_subscription(ctx) && has_components(ctx)
}

fn scheme_location(name: &str) -> NodePath {
    NodePath::from_keys(&["components", "securitySchemes", name])
}

/// Declared schemes as `(name, definition)`, skipping non-mapping entries.
fn schemes<'a>(ctx: &RuleContext<'a>) -> Result<Vec<(&'a str, &'a Mapping)>, RuleError> {
    Ok(ctx
        .security_schemes()?
        .map(|schemes| {
            schemes
                .iter()
                .filter_map(|(name, def)| def.as_mapping().map(|def| (name.as_str(), def)))
                .collect()
        })
        .unwrap_or_default())
}

fn scheme_type(def: &Mapping) -> Option<&str> {
    def.get("type").and_then(Node::as_str)
}

fn security_scheme_defined(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    let declared = ctx.security_schemes()?;
    let mut sources = Vec::new();
    if let Some(security) = ctx.node(&["security"])? {
        sources.push((security, NodePath::from_keys(&["security"])));
    }
    for op in ctx.operations()?.into_iter().chain(callback_operations(ctx)?) {
        if let Some(security) = op.get("security") {
            sources.push((security, op.location.child_key("security")));
        }
    }

    let mut violations = Vec::new();
    for (security, location) in sources {
        let (requirements, _) = security_requirements(security, &location)?;
        for requirement in requirements {
            if declared.is_some_and(|d| d.contains_key(requirement.scheme)) {
                continue;
            }
            violations.push(
                Violation::new(
                    format!(
                        "Undefined security scheme `{}` referenced",
                        requirement.scheme
                    ),
                    requirement.location,
                )
                .with_fix(format!(
                    "Define `{}` in components.securitySchemes",
                    requirement.scheme
                )),
            );
        }
    }
    Ok(violations)
}

fn openid_scheme_required(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    if ctx
        .security_schemes()?
        .is_some_and(|s| s.contains_key(OPENID))
    {
        return Ok(Vec::new());
    }
    Ok(vec![
        Violation::new(
            "Missing required 'openId' security scheme",
            NodePath::from_keys(&["components", "securitySchemes"]),
        )
        .with_fix("Add openId scheme with type: openIdConnect"),
    ])
}

fn notifications_bearer_auth_required(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    if ctx
        .security_schemes()?
        .is_some_and(|s| s.contains_key(NOTIFICATIONS_BEARER))
    {
        return Ok(Vec::new());
    }
    Ok(vec![
        Violation::new(
            "Subscription APIs must include 'notificationsBearerAuth' security scheme",
            NodePath::from_keys(&["components", "securitySchemes"]),
        )
        .with_fix("Add notificationsBearerAuth scheme for callback authentication"),
    ])
}

fn openid_schemes<'a>(ctx: &RuleContext<'a>) -> Result<Vec<(&'a str, &'a Mapping)>, RuleError> {
    Ok(schemes(ctx)?
        .into_iter()
        .filter(|(_, def)| scheme_type(def) == Some("openIdConnect"))
        .collect())
}

fn openid_scheme_naming(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    Ok(openid_schemes(ctx)?
        .into_iter()
        .filter(|(name, _)| *name != OPENID)
        .map(|(name, _)| {
            Violation::new(
                format!(
                    "OpenID Connect scheme should be named 'openId', found '{}'",
                    name
                ),
                scheme_location(name),
            )
        })
        .collect())
}

fn openid_connect_url(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    Ok(openid_schemes(ctx)?
        .into_iter()
        .filter(|(_, def)| !def.contains_key("openIdConnectUrl"))
        .map(|(name, _)| {
            Violation::new(
                format!("OpenID Connect scheme `{}` missing openIdConnectUrl", name),
                scheme_location(name).key("openIdConnectUrl"),
            )
        })
        .collect())
}

fn openid_connect_url_format(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    let mut violations = Vec::new();
    for (name, def) in openid_schemes(ctx)? {
        let Some(url) = def.get("openIdConnectUrl") else {
            continue;
        };
        let url = text(Some(url));
        let location = scheme_location(name).key("openIdConnectUrl");

        let web = Url::parse(&url)
            .ok()
            .filter(|parsed| matches!(parsed.scheme(), "http" | "https"));
        if web.is_none() {
            violations.push(Violation::new(
                format!("OpenID Connect URL should use HTTPS: `{}`", url),
                location.clone(),
            ));
        }
        if !url.contains(WELL_KNOWN) {
            violations.push(Violation::new(
                format!(
                    "OpenID Connect URL should point to well-known configuration: `{}`",
                    url
                ),
                location,
            ));
        }
    }
    Ok(violations)
}

fn notifications_bearer<'a>(ctx: &RuleContext<'a>) -> Result<Option<&'a Mapping>, RuleError> {
    Ok(schemes(ctx)?
        .into_iter()
        .find(|(name, _)| *name == NOTIFICATIONS_BEARER)
        .map(|(_, def)| def))
}

fn notifications_bearer_auth_scheme(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    let Some(def) = notifications_bearer(ctx)? else {
        return Ok(Vec::new());
    };
    let mut violations = Vec::new();
    if scheme_type(def) != Some("http") {
        violations.push(Violation::new(
            format!("Notifications Bearer Auth scheme `{}` must have type 'http'", NOTIFICATIONS_BEARER),
            scheme_location(NOTIFICATIONS_BEARER).key("type"),
        ));
    }
    if def.get("scheme").and_then(Node::as_str) != Some("bearer") {
        violations.push(Violation::new(
            format!(
                "Notifications Bearer Auth scheme `{}` must have scheme 'bearer'",
                NOTIFICATIONS_BEARER
            ),
            scheme_location(NOTIFICATIONS_BEARER).key("scheme"),
        ));
    }
    Ok(violations)
}

fn notifications_bearer_format(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    let Some(def) = notifications_bearer(ctx)? else {
        return Ok(Vec::new());
    };
    if text(def.get("bearerFormat")).contains("sinkCredential") {
        return Ok(Vec::new());
    }
    Ok(vec![Violation::new(
        format!(
            "Notifications Bearer Auth scheme `{}` should reference sinkCredential in bearerFormat",
            NOTIFICATIONS_BEARER
        ),
        scheme_location(NOTIFICATIONS_BEARER).key("bearerFormat"),
    )])
}

fn oauth2_scheme(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    Ok(schemes(ctx)?
        .into_iter()
        .filter(|(_, def)| scheme_type(def) == Some("oauth2"))
        .map(|(name, _)| {
            Violation::new(
                format!(
                    "Use 'openIdConnect' type instead of 'oauth2' for scheme '{}'",
                    name
                ),
                scheme_location(name).key("type"),
            )
            .with_fix("CAMARA requires OpenID Connect, not OAuth2")
        })
        .collect())
}

fn unexpected_scheme_type(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    Ok(schemes(ctx)?
        .into_iter()
        .filter(|(_, def)| !matches!(scheme_type(def), Some("openIdConnect" | "http" | "oauth2")))
        .map(|(name, def)| {
            Violation::new(
                format!(
                    "Unexpected security scheme type '{}' for '{}'",
                    scheme_type(def).unwrap_or("none"),
                    name
                ),
                scheme_location(name).key("type"),
            )
        })
        .collect())
}

fn scope_naming(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    let mut violations = Vec::new();
    for op in ctx.operations()? {
        let Some(security) = op.get("security") else {
            continue;
        };
        let (requirements, _) = security_requirements(security, &op.location.child_key("security"))?;
        for requirement in requirements {
            for (index, scope) in requirement.scopes.iter().enumerate() {
                let scope = text(Some(scope));
                if SCOPE_NAME.is_match(&scope) {
                    continue;
                }
                violations.push(Violation::new(
                    format!(
                        "Scope name should follow pattern `api-name:[resource:]action`: `{}` ({})",
                        scope,
                        op.label()
                    ),
                    requirement.location.child_index(index),
                ));
            }
        }
    }
    Ok(violations)
}

#[cfg(test)]
mod tests {
    use super::super::testing::run;
    use super::*;

    const SCHEMES: &str = r#"
security:
  - openId: []
paths:
  /retrieve:
    post:
      security:
        - openId:
            - device-status:roaming:read
            - Device_Status_Read
        - legacyKey: []
      responses:
        "200":
          description: OK
components:
  securitySchemes:
    openId:
      type: openIdConnect
      openIdConnectUrl: https://example.com/.well-known/openid-configuration
    secondary:
      type: openIdConnect
      openIdConnectUrl: ftp://example.com/config
    legacy:
      type: oauth2
    apiKey:
      type: apiKey
    notificationsBearerAuth:
      type: http
      scheme: basic
"#;

    #[test]
    fn test_undefined_scheme_on_operation() {
        let violations = run(RULES, "security-scheme-defined", SCHEMES);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("`legacyKey`"));
        assert_eq!(
            violations[0].location,
            NodePath::from_keys(&["paths", "/retrieve", "post", "security"])
                .index(1)
                .key("legacyKey")
        );
    }

    #[test]
    fn test_undefined_top_level_scheme_without_components() {
        let violations = run(RULES, "security-scheme-defined", "security:\n  - openId: []\n");
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("`openId`"));
    }

    #[test]
    fn test_openid_scheme_checks() {
        assert!(run(RULES, "openid-scheme-required", SCHEMES).is_empty());

        let naming = run(RULES, "openid-scheme-naming", SCHEMES);
        assert_eq!(naming.len(), 1);
        assert!(naming[0].message.contains("secondary"));

        let format = run(RULES, "openid-connect-url-format", SCHEMES);
        assert_eq!(format.len(), 2);
        assert!(format.iter().all(|v| v.location == scheme_location("secondary").key("openIdConnectUrl")));
    }

    #[test]
    fn test_scheme_types() {
        assert_eq!(run(RULES, "oauth2-scheme", SCHEMES).len(), 1);
        let unexpected = run(RULES, "unexpected-scheme-type", SCHEMES);
        assert_eq!(unexpected.len(), 1);
        assert!(unexpected[0].message.contains("'apiKey'"));
    }

    #[test]
    fn test_notifications_bearer_auth() {
        let scheme = run(RULES, "notifications-bearer-auth-scheme", SCHEMES);
        assert_eq!(scheme.len(), 1);
        assert!(scheme[0].message.contains("'bearer'"));
        assert_eq!(run(RULES, "notifications-bearer-format", SCHEMES).len(), 1);
    }

    #[test]
    fn test_scope_naming() {
        let violations = run(RULES, "scope-naming", SCHEMES);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("Device_Status_Read"));
    }
}
