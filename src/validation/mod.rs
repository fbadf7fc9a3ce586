mod engine;
mod finding;
mod rule;
mod rules;
mod ruleset;

pub use engine::{RULE_ERROR_ID, RuleEngine};
pub use finding::{Category, Finding, Severity, Violation};
pub use rule::{
    HTTP_METHODS, Operation, ProjectContext, ProjectRule, ProjectRuleDefinition, ProjectViolation,
    ReviewOptions, ReviewType, Rule, RuleContext, RuleDefinition,
};
pub use ruleset::{RuleCatalog, RulesetVersion, VersionResolution, resolve_version};
