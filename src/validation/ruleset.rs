use super::rule::{ProjectRule, Rule};
use super::rules;
use serde::{Serialize, Serializer};
use std::fmt;

/// A Commonalities release with an implemented rule catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RulesetVersion {
    V0_6,
}

impl RulesetVersion {
    /// Every implemented version, oldest first.
    pub const IMPLEMENTED: &'static [RulesetVersion] = &[RulesetVersion::V0_6];

    pub fn tag(self) -> &'static str {
        match self {
            RulesetVersion::V0_6 => "0.6",
        }
    }

    fn number(self) -> (u32, u32) {
        match self {
            RulesetVersion::V0_6 => (0, 6),
        }
    }

    pub fn latest() -> Self {
        Self::IMPLEMENTED
            .iter()
            .copied()
            .max_by_key(|v| v.number())
            .unwrap_or(RulesetVersion::V0_6)
    }

    pub fn catalog(self) -> RuleCatalog {
        match self {
            RulesetVersion::V0_6 => rules::catalog_v0_6(),
        }
    }
}

impl fmt::Display for RulesetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl Serialize for RulesetVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.tag())
    }
}

/// Outcome of mapping a requested version onto an implemented catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionResolution {
    pub requested: String,
    pub resolved: RulesetVersion,
    pub mismatch: bool,
}

impl VersionResolution {
    pub fn exact(version: RulesetVersion) -> Self {
        Self {
            requested: version.tag().to_string(),
            resolved: version,
            mismatch: false,
        }
    }
}

/// Pick the catalog for `requested`. Never fails.
///
/// An exact `major.minor` match is used as is. Otherwise the highest
/// implemented version not above the request is chosen, or the latest one when
/// nothing qualifies or the request does not parse. Any inexact match sets the
/// mismatch flag.
pub fn resolve_version(requested: &str) -> VersionResolution {
    let requested = requested.trim();

    let resolved = match parse_major_minor(requested) {
        Some(number) => {
            if let Some(exact) = RulesetVersion::IMPLEMENTED
                .iter()
                .find(|v| v.number() == number)
            {
                return VersionResolution {
                    requested: requested.to_string(),
                    resolved: *exact,
                    mismatch: false,
                };
            }
            RulesetVersion::IMPLEMENTED
                .iter()
                .copied()
                .filter(|v| v.number() < number)
                .max_by_key(|v| v.number())
                .unwrap_or_else(RulesetVersion::latest)
        }
        None => RulesetVersion::latest(),
    };

    tracing::warn!(
        "Commonalities {} has no rule catalog; validating with {} rules",
        requested,
        resolved
    );

    VersionResolution {
        requested: requested.to_string(),
        resolved,
        mismatch: true,
    }
}

/// `[v]major.minor[.patch]`
fn parse_major_minor(text: &str) -> Option<(u32, u32)> {
    let text = text.strip_prefix(['v', 'V']).unwrap_or(text);
    let mut parts = text.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    if let Some(patch) = parts.next() {
        patch.parse::<u32>().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some((major, minor))
}

/// The ordered rules of one ruleset version.
pub struct RuleCatalog {
    version: RulesetVersion,
    rules: Vec<Box<dyn Rule>>,
    project_rules: Vec<Box<dyn ProjectRule>>,
}

impl RuleCatalog {
    pub fn new(
        version: RulesetVersion,
        rules: Vec<Box<dyn Rule>>,
        project_rules: Vec<Box<dyn ProjectRule>>,
    ) -> Self {
        Self {
            version,
            rules,
            project_rules,
        }
    }

    pub fn version(&self) -> RulesetVersion {
        self.version
    }

    pub fn rules(&self) -> &[Box<dyn Rule>] {
        &self.rules
    }

    pub fn project_rules(&self) -> &[Box<dyn ProjectRule>] {
        &self.project_rules
    }

    pub fn len(&self) -> usize {
        self.rules.len() + self.project_rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
