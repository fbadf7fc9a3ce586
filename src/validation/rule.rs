use super::finding::{Category, Severity, Violation};
use super::ruleset::VersionResolution;
use crate::error::RuleError;
use crate::loader::TestDefinitions;
use crate::models::{ApiDocument, Mapping, Node, NodePath};
use clap::ValueEnum;
use serde::Serialize;
use std::fmt;

pub const HTTP_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// Kind of review requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReviewType {
    #[default]
    ReleaseCandidate,
    Wip,
    PublicRelease,
}

impl ReviewType {
    pub fn is_wip(self) -> bool {
        matches!(self, ReviewType::Wip)
    }
}

impl fmt::Display for ReviewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewType::ReleaseCandidate => write!(f, "release-candidate"),
            ReviewType::Wip => write!(f, "wip"),
            ReviewType::PublicRelease => write!(f, "public-release"),
        }
    }
}

/// Inputs every rule may consult besides the document itself.
#[derive(Debug, Clone)]
pub struct ReviewOptions {
    pub resolution: VersionResolution,
    pub review_type: ReviewType,
}

/// An operation found under `paths`.
#[derive(Debug, Clone)]
pub struct Operation<'a> {
    pub path: &'a str,
    pub method: &'a str,
    pub node: &'a Mapping,
    pub location: NodePath,
}

impl<'a> Operation<'a> {
    /// `"POST /sessions"`
    pub fn label(&self) -> String {
        format!("{} {}", self.method.to_uppercase(), self.path)
    }

    pub fn get(&self, key: &str) -> Option<&'a Node> {
        self.node.get(key)
    }
}

/// View of one document handed to document rules.
pub struct RuleContext<'a> {
    pub document: &'a ApiDocument,
    pub options: &'a ReviewOptions,
}

impl<'a> RuleContext<'a> {
    pub fn new(document: &'a ApiDocument, options: &'a ReviewOptions) -> Self {
        Self { document, options }
    }

    pub fn root(&self) -> &'a Node {
        &self.document.root
    }

    /// Node at `keys`. Absent and null nodes are `None`; a non-mapping on the
    /// way is a shape error.
    pub fn node(&self, keys: &[&str]) -> Result<Option<&'a Node>, RuleError> {
        let mut current = self.root();
        let mut location = NodePath::root();

        for key in keys {
            match current {
                Node::Mapping(map) => match map.get(*key) {
                    Some(child) => {
                        current = child;
                        location = location.key(*key);
                    }
                    None => return Ok(None),
                },
                other if other.is_null() => return Ok(None),
                other => {
                    return Err(RuleError::UnexpectedShape {
                        location,
                        expected: "mapping",
                        found: other.kind_name(),
                    });
                }
            }
        }

        Ok((!current.is_null()).then_some(current))
    }

    pub fn mapping(&self, keys: &[&str]) -> Result<Option<&'a Mapping>, RuleError> {
        match self.node(keys)? {
            None => Ok(None),
            Some(Node::Mapping(map)) => Ok(Some(map)),
            Some(other) => Err(RuleError::UnexpectedShape {
                location: NodePath::from_keys(keys),
                expected: "mapping",
                found: other.kind_name(),
            }),
        }
    }

    pub fn sequence(&self, keys: &[&str]) -> Result<Option<&'a [Node]>, RuleError> {
        match self.node(keys)? {
            None => Ok(None),
            Some(Node::Sequence(items)) => Ok(Some(items)),
            Some(other) => Err(RuleError::UnexpectedShape {
                location: NodePath::from_keys(keys),
                expected: "sequence",
                found: other.kind_name(),
            }),
        }
    }

    /// Text of a scalar under `info`.
    pub fn info_text(&self, key: &str) -> Option<String> {
        self.root()
            .lookup(&["info", key])
            .and_then(Node::as_text)
            .map(|t| t.into_owned())
    }

    pub fn schemas(&self) -> Result<Option<&'a Mapping>, RuleError> {
        self.mapping(&["components", "schemas"])
    }

    pub fn security_schemes(&self) -> Result<Option<&'a Mapping>, RuleError> {
        self.mapping(&["components", "securitySchemes"])
    }

    pub fn resolve_ref(&self, reference: &str) -> Option<&'a Node> {
        self.root().resolve_ref(reference)
    }

    /// Every operation under `paths`, in document order. Path items and
    /// operations that are not mappings are skipped.
    pub fn operations(&self) -> Result<Vec<Operation<'a>>, RuleError> {
        let Some(paths) = self.mapping(&["paths"])? else {
            return Ok(Vec::new());
        };

        let mut operations = Vec::new();
        for (path, item) in paths {
            let Some(item) = item.as_mapping() else {
                continue;
            };
            for (method, operation) in item {
                if !HTTP_METHODS.contains(&method.as_str()) {
                    continue;
                }
                let Some(node) = operation.as_mapping() else {
                    continue;
                };
                operations.push(Operation {
                    path,
                    method,
                    node,
                    location: NodePath::from_keys(&["paths", path, method]),
                });
            }
        }
        Ok(operations)
    }
}

/// A check applied to one document at a time.
pub trait Rule: Send + Sync {
    fn id(&self) -> &str;
    fn category(&self) -> Category;
    fn severity(&self) -> Severity;
    fn summary(&self) -> &str;

    /// Whether the rule inspects this document at all.
    fn applies_to(&self, _ctx: &RuleContext<'_>) -> bool {
        true
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError>;
}

pub type CheckFn = fn(&RuleContext<'_>) -> Result<Vec<Violation>, RuleError>;
pub type AppliesFn = fn(&RuleContext<'_>) -> bool;

/// Table entry implementing [`Rule`] with plain functions.
#[derive(Clone, Copy)]
pub struct RuleDefinition {
    pub id: &'static str,
    pub category: Category,
    pub severity: Severity,
    pub summary: &'static str,
    applies: Option<AppliesFn>,
    check: CheckFn,
}

impl RuleDefinition {
    pub const fn new(
        id: &'static str,
        category: Category,
        severity: Severity,
        summary: &'static str,
        check: CheckFn,
    ) -> Self {
        Self {
            id,
            category,
            severity,
            summary,
            applies: None,
            check,
        }
    }

    pub const fn when(mut self, applies: AppliesFn) -> Self {
        self.applies = Some(applies);
        self
    }
}

impl Rule for RuleDefinition {
    fn id(&self) -> &str {
        self.id
    }

    fn category(&self) -> Category {
        self.category
    }

    fn severity(&self) -> Severity {
        self.severity
    }

    fn summary(&self) -> &str {
        self.summary
    }

    fn applies_to(&self, ctx: &RuleContext<'_>) -> bool {
        self.applies.is_none_or(|applies| applies(ctx))
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
        (self.check)(ctx)
    }
}

/// View of the whole run handed to project rules.
pub struct ProjectContext<'a> {
    pub documents: &'a [ApiDocument],
    pub test_definitions: Option<&'a TestDefinitions>,
    pub options: &'a ReviewOptions,
}

/// A violation attributed to one document by a project rule.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectViolation {
    pub document: String,
    pub violation: Violation,
}

impl ProjectViolation {
    pub fn new(document: impl Into<String>, violation: Violation) -> Self {
        Self {
            document: document.into(),
            violation,
        }
    }
}

/// A check that compares several documents, or documents with their tests.
pub trait ProjectRule: Send + Sync {
    fn id(&self) -> &str;
    fn category(&self) -> Category;
    fn severity(&self) -> Severity;
    fn summary(&self) -> &str;

    fn applies_to(&self, _ctx: &ProjectContext<'_>) -> bool {
        true
    }

    fn check(&self, ctx: &ProjectContext<'_>) -> Result<Vec<ProjectViolation>, RuleError>;
}

pub type ProjectCheckFn = fn(&ProjectContext<'_>) -> Result<Vec<ProjectViolation>, RuleError>;
pub type ProjectAppliesFn = fn(&ProjectContext<'_>) -> bool;

/// Table entry implementing [`ProjectRule`] with plain functions.
#[derive(Clone, Copy)]
pub struct ProjectRuleDefinition {
    pub id: &'static str,
    pub category: Category,
    pub severity: Severity,
    pub summary: &'static str,
    applies: ProjectAppliesFn,
    check: ProjectCheckFn,
}

impl ProjectRuleDefinition {
    pub const fn new(
        id: &'static str,
        category: Category,
        severity: Severity,
        summary: &'static str,
        applies: ProjectAppliesFn,
        check: ProjectCheckFn,
    ) -> Self {
        Self {
            id,
            category,
            severity,
            summary,
            applies,
            check,
        }
    }
}

impl ProjectRule for ProjectRuleDefinition {
    fn id(&self) -> &str {
        self.id
    }

    fn category(&self) -> Category {
        self.category
    }

    fn severity(&self) -> Severity {
        self.severity
    }

    fn summary(&self) -> &str {
        self.summary
    }

    fn applies_to(&self, ctx: &ProjectContext<'_>) -> bool {
        (self.applies)(ctx)
    }

    fn check(&self, ctx: &ProjectContext<'_>) -> Result<Vec<ProjectViolation>, RuleError> {
        (self.check)(ctx)
    }
}
