use super::node::Node;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;
use url::Url;

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\.(\d+)\.(\d+)(?:-(rc|alpha)\.(\d+))?$").expect("valid version regex")
});

static URL_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v\d+").expect("valid url version regex"));

const OPERATION_METHODS: [&str; 5] = ["get", "post", "put", "delete", "patch"];

/// One parsed API definition file. Built once by the loader, read-only after.
#[derive(Debug, Clone)]
pub struct ApiDocument {
    pub file_name: String,
    pub source_path: PathBuf,
    pub root: Node,
    pub title: String,
    pub version: String,
    pub maturity: ApiMaturity,
    pub kind: ApiKind,
    /// `<api-name>` segment of `servers[*].url`, if one could be extracted.
    pub api_name: Option<String>,
}

impl ApiDocument {
    /// File name without its extension.
    pub fn file_stem(&self) -> &str {
        self.file_name
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(&self.file_name)
    }

    /// The api-name if known, otherwise the file stem.
    pub fn display_name(&self) -> &str {
        self.api_name.as_deref().unwrap_or_else(|| self.file_stem())
    }
}

/// Release maturity, derived from `info.version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApiMaturity {
    WorkInProgress,
    Alpha,
    ReleaseCandidate,
    Initial,
    Stable,
    Unknown,
}

impl ApiMaturity {
    pub fn from_version(version: &str) -> Self {
        if version == "wip" {
            return ApiMaturity::WorkInProgress;
        }
        let Some(caps) = VERSION_RE.captures(version) else {
            return ApiMaturity::Unknown;
        };
        match caps.get(4).map(|m| m.as_str()) {
            Some("alpha") => ApiMaturity::Alpha,
            Some("rc") => ApiMaturity::ReleaseCandidate,
            _ if &caps[1] == "0" => ApiMaturity::Initial,
            _ => ApiMaturity::Stable,
        }
    }

    /// Matches `x.y.z`, `x.y.z-rc.n` and `x.y.z-alpha.n`.
    pub fn is_semantic_version(version: &str) -> bool {
        VERSION_RE.is_match(version)
    }
}

impl fmt::Display for ApiMaturity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiMaturity::WorkInProgress => write!(f, "work in progress"),
            ApiMaturity::Alpha => write!(f, "alpha"),
            ApiMaturity::ReleaseCandidate => write!(f, "release candidate"),
            ApiMaturity::Initial => write!(f, "initial"),
            ApiMaturity::Stable => write!(f, "stable"),
            ApiMaturity::Unknown => write!(f, "unknown"),
        }
    }
}

/// Subscription style of an API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApiKind {
    Regular,
    ImplicitSubscription,
    ExplicitSubscription,
}

impl ApiKind {
    pub fn is_subscription(self) -> bool {
        !matches!(self, ApiKind::Regular)
    }

    pub fn detect(root: &Node) -> Self {
        let paths = root.get("paths").and_then(Node::as_mapping);

        if let Some(paths) = paths {
            if paths.keys().any(|p| p.to_lowercase().contains("/subscription")) {
                return ApiKind::ExplicitSubscription;
            }

            for path_item in paths.values().filter_map(Node::as_mapping) {
                for (method, operation) in path_item {
                    if !OPERATION_METHODS.contains(&method.as_str()) {
                        continue;
                    }
                    let Some(operation) = operation.as_mapping() else {
                        continue;
                    };
                    if operation.contains_key("callbacks") {
                        return ApiKind::ImplicitSubscription;
                    }
                    if has_event_like_response(operation.get("responses")) {
                        return ApiKind::ImplicitSubscription;
                    }
                }
            }
        }

        let schemas = root
            .lookup(&["components", "schemas"])
            .and_then(Node::as_mapping);
        if let Some(schemas) = schemas {
            for name in schemas.keys() {
                let name = name.to_lowercase();
                if name.contains("subscription") {
                    return ApiKind::ExplicitSubscription;
                }
                if ["webhook", "event", "notification"].iter().any(|k| name.contains(k)) {
                    return ApiKind::ImplicitSubscription;
                }
            }
        }

        ApiKind::Regular
    }
}

fn has_event_like_response(responses: Option<&Node>) -> bool {
    let Some(responses) = responses.and_then(Node::as_mapping) else {
        return false;
    };
    responses
        .values()
        .filter_map(|response| response.get("content").and_then(Node::as_mapping))
        .flat_map(|content| content.values())
        .filter_map(|media| media.get("schema"))
        .any(|schema| {
            ["webhook", "event", "notification", "callback"]
                .iter()
                .any(|keyword| schema.contains_text(keyword))
        })
}

impl fmt::Display for ApiKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiKind::Regular => write!(f, "Regular API"),
            ApiKind::ImplicitSubscription => write!(f, "Implicit Subscription API"),
            ApiKind::ExplicitSubscription => write!(f, "Explicit Subscription API"),
        }
    }
}

/// Extract `<api-name>` from `servers[*].url` of the form
/// `{apiRoot}/<api-name>/<api-version>`.
///
/// When servers disagree the alphabetically first name is returned.
pub fn api_name_from_servers(root: &Node) -> Option<String> {
    let servers = root.get("servers")?.as_sequence()?;
    let mut names = BTreeSet::new();

    for server in servers {
        let Some(url) = server.get("url").and_then(Node::as_str) else {
            continue;
        };
        if url.is_empty() {
            continue;
        }

        let path = if let Some(rest) = url.strip_prefix("{apiRoot}/") {
            rest.to_string()
        } else if url.starts_with("http://") || url.starts_with("https://") {
            match Url::parse(url) {
                Ok(parsed) => parsed.path().trim_start_matches('/').to_string(),
                Err(_) => continue,
            }
        } else {
            url.trim_start_matches('/').to_string()
        };

        let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
        match parts.as_slice() {
            [] => {}
            [single] => {
                if !URL_VERSION_RE.is_match(single) {
                    names.insert((*single).to_string());
                }
            }
            [name, ..] => {
                names.insert((*name).to_string());
            }
        }
    }

    names.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Node {
        Node::from(serde_yaml::from_str::<serde_yaml::Value>(yaml).unwrap())
    }

    #[test]
    fn test_maturity_from_version() {
        assert_eq!(ApiMaturity::from_version("wip"), ApiMaturity::WorkInProgress);
        assert_eq!(ApiMaturity::from_version("0.2.0-alpha.1"), ApiMaturity::Alpha);
        assert_eq!(ApiMaturity::from_version("1.0.0-rc.2"), ApiMaturity::ReleaseCandidate);
        assert_eq!(ApiMaturity::from_version("0.3.1"), ApiMaturity::Initial);
        assert_eq!(ApiMaturity::from_version("2.1.0"), ApiMaturity::Stable);
        assert_eq!(ApiMaturity::from_version("v1"), ApiMaturity::Unknown);
    }

    #[test]
    fn test_api_name_from_servers() {
        let root = parse("servers:\n  - url: '{apiRoot}/location-verification/v1'\n");
        assert_eq!(api_name_from_servers(&root).as_deref(), Some("location-verification"));

        let root = parse("servers:\n  - url: https://example.com/quality-on-demand/v0.11\n");
        assert_eq!(api_name_from_servers(&root).as_deref(), Some("quality-on-demand"));

        let root = parse("servers:\n  - url: '{apiRoot}/v1'\n");
        assert_eq!(api_name_from_servers(&root), None);

        let root = parse("info: {}\n");
        assert_eq!(api_name_from_servers(&root), None);
    }

    #[test]
    fn test_detect_kind() {
        let explicit = parse("paths:\n  /subscriptions:\n    post: {}\n");
        assert_eq!(ApiKind::detect(&explicit), ApiKind::ExplicitSubscription);

        let implicit = parse("paths:\n  /sessions:\n    post:\n      callbacks:\n        onEvent: {}\n");
        assert_eq!(ApiKind::detect(&implicit), ApiKind::ImplicitSubscription);

        let regular = parse("paths:\n  /verify:\n    post:\n      responses:\n        '200':\n          description: OK\n");
        assert_eq!(ApiKind::detect(&regular), ApiKind::Regular);
    }
}
