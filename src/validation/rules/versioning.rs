use super::{is_release_review, is_wip_review, text};
use crate::error::RuleError;
use crate::models::NodePath;
use crate::validation::{Category, RuleContext, RuleDefinition, Severity, Violation};

const WIP_VERSION: &str = "wip";
const WIP_URL_SEGMENT: &str = "vwip";

pub(super) static RULES: &[RuleDefinition] = &[
    RuleDefinition::new(
        "wip-version-in-release",
        Category::Versioning,
        Severity::Critical,
        "Release reviews do not use version `wip`",
        wip_version_in_release,
    )
    .when(is_release_review),
    RuleDefinition::new(
        "wip-server-url-in-release",
        Category::Versioning,
        Severity::Critical,
        "Release reviews do not use a `vwip` server URL",
        wip_server_url_in_release,
    )
    .when(is_release_review),
    RuleDefinition::new(
        "wip-review-version",
        Category::Versioning,
        Severity::Medium,
        "Work-in-progress reviews use version `wip`",
        wip_review_version,
    )
    .when(is_wip_review),
    RuleDefinition::new(
        "wip-review-server-url",
        Category::Versioning,
        Severity::Medium,
        "Work-in-progress reviews use a `vwip` server URL",
        wip_review_server_url,
    )
    .when(is_wip_review),
];

fn version(ctx: &RuleContext<'_>) -> Result<String, RuleError> {
    Ok(text(ctx.node(&["info", "version"])?))
}

/// URL of the first server, if any server is declared.
fn first_server_url(ctx: &RuleContext<'_>) -> Result<Option<String>, RuleError> {
    Ok(ctx
        .sequence(&["servers"])?
        .and_then(|servers| servers.first())
        .map(|server| text(server.get("url"))))
}

fn first_url_location() -> NodePath {
    NodePath::from_keys(&["servers"]).index(0).key("url")
}

fn wip_version_in_release(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    if version(ctx)? == WIP_VERSION {
        return Ok(vec![
            Violation::new(
                "Work-in-progress version `wip` cannot be released",
                NodePath::from_keys(&["info", "version"]),
            )
            .with_fix("Update to proper semantic version (e.g., `0.1.0-rc.1`)"),
        ]);
    }
    Ok(Vec::new())
}

fn wip_server_url_in_release(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    if first_server_url(ctx)?.is_some_and(|url| url.contains(WIP_URL_SEGMENT)) {
        return Ok(vec![
            Violation::new(
                "Work-in-progress server URL (`vwip`) cannot be used in release",
                first_url_location(),
            )
            .with_fix("Update to production server URL"),
        ]);
    }
    Ok(Vec::new())
}

fn wip_review_version(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    let version = version(ctx)?;
    if version != WIP_VERSION {
        return Ok(vec![
            Violation::new(
                format!("WIP review expects version `wip`, found: `{}`", version),
                NodePath::from_keys(&["info", "version"]),
            )
            .with_fix("Use version `wip` for work-in-progress development"),
        ]);
    }
    Ok(Vec::new())
}

fn wip_review_server_url(ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
    if first_server_url(ctx)?.is_some_and(|url| !url.contains(WIP_URL_SEGMENT)) {
        return Ok(vec![
            Violation::new(
                "WIP review expects server URL to contain `vwip`",
                first_url_location(),
            )
            .with_fix("Use `vwip` in server URL for work-in-progress development"),
        ]);
    }
    Ok(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::super::testing::{document, options, run_with};
    use super::*;
    use crate::validation::ReviewType;

    const WIP: &str = "info:\n  version: wip\nservers:\n  - url: \"{apiRoot}/qod/vwip\"\n";
    const RELEASE: &str = "info:\n  version: 1.0.0\nservers:\n  - url: \"{apiRoot}/qod/v1\"\n";

    fn ids(yaml: &str, review_type: ReviewType) -> Vec<&'static str> {
        let doc = document("qod.yaml", yaml);
        let options = options(review_type);
        RULES
            .iter()
            .filter(|rule| !run_with(RULES, rule.id, &doc, &options).is_empty())
            .map(|rule| rule.id)
            .collect()
    }

    #[test]
    fn test_wip_document_in_release_review() {
        assert_eq!(
            ids(WIP, ReviewType::ReleaseCandidate),
            vec!["wip-version-in-release", "wip-server-url-in-release"]
        );
        assert!(ids(WIP, ReviewType::Wip).is_empty());
    }

    #[test]
    fn test_release_document_in_wip_review() {
        assert!(ids(RELEASE, ReviewType::PublicRelease).is_empty());
        assert_eq!(
            ids(RELEASE, ReviewType::Wip),
            vec!["wip-review-version", "wip-review-server-url"]
        );
    }
}
