use serde::Serialize;
use url::Url;

const MAX_REPOSITORY_LEN: usize = 100;
const MAX_ISSUE_LEN: usize = 20;
const MAX_ACTOR_LEN: usize = 39;

/// Context about what triggered a run. Copied into report headers and never
/// interpreted by the rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pull_request_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triggered_by: Option<String>,
}

impl RunMetadata {
    /// Build metadata from untrusted input.
    ///
    /// Repository names keep `[A-Za-z0-9_-]` (at most 100 chars), issue
    /// numbers keep digits (at most 20, `0` means none), actors keep
    /// `[A-Za-z0-9-]` and pull request URLs must be http(s). Values that are
    /// empty after cleaning are dropped.
    pub fn sanitized(
        repository: Option<&str>,
        issue_number: Option<&str>,
        pull_request_url: Option<&str>,
        triggered_by: Option<&str>,
    ) -> Self {
        Self {
            repository: repository
                .map(|r| keep(r, |c| c.is_ascii_alphanumeric() || c == '_' || c == '-', MAX_REPOSITORY_LEN))
                .filter(|r| !r.is_empty()),
            issue_number: issue_number
                .map(|n| keep(n, |c| c.is_ascii_digit(), MAX_ISSUE_LEN))
                .filter(|n| !n.is_empty() && n.chars().any(|c| c != '0')),
            pull_request_url: pull_request_url.and_then(clean_url),
            triggered_by: triggered_by
                .map(|a| keep(a, |c| c.is_ascii_alphanumeric() || c == '-', MAX_ACTOR_LEN))
                .filter(|a| !a.is_empty()),
        }
    }
}

fn keep(value: &str, allowed: impl Fn(char) -> bool, max_len: usize) -> String {
    value.chars().filter(|c| allowed(*c)).take(max_len).collect()
}

fn clean_url(value: &str) -> Option<String> {
    let url = Url::parse(value.trim()).ok()?;
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}
