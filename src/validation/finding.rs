use crate::models::NodePath;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Finding severity. Ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Medium,
    Low,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Critical, Severity::Medium, Severity::Low];

    pub fn icon(self) -> &'static str {
        match self {
            Severity::Critical => "🔴",
            Severity::Medium => "🟡",
            Severity::Low => "🔵",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Critical => write!(f, "critical"),
            Severity::Medium => write!(f, "medium"),
            Severity::Low => write!(f, "low"),
        }
    }
}

/// Rule grouping used for listing and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Loading,
    Info,
    Templates,
    ExternalDocs,
    Servers,
    Operations,
    ErrorResponses,
    ErrorCodes,
    Components,
    Security,
    Versioning,
    Naming,
    Correlator,
    Subscriptions,
    References,
    Consistency,
    TestAlignment,
    Internal,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Category::Loading => "Loading",
            Category::Info => "Info Object",
            Category::Templates => "Description Templates",
            Category::ExternalDocs => "External Docs",
            Category::Servers => "Servers",
            Category::Operations => "Operations",
            Category::ErrorResponses => "Error Responses",
            Category::ErrorCodes => "Error Codes",
            Category::Components => "Components",
            Category::Security => "Security",
            Category::Versioning => "Versioning",
            Category::Naming => "Naming",
            Category::Correlator => "Correlator",
            Category::Subscriptions => "Subscriptions",
            Category::References => "References",
            Category::Consistency => "Project Consistency",
            Category::TestAlignment => "Test Alignment",
            Category::Internal => "Internal",
        };
        write!(f, "{}", label)
    }
}

/// One reported rule violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub rule_id: String,
    pub severity: Severity,
    pub category: Category,
    pub message: String,
    pub location: NodePath,
    /// File name of the owning document; `None` for run-level findings.
    pub document: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub fix: Option<String>,
}

impl Finding {
    pub fn new(
        rule_id: impl Into<String>,
        severity: Severity,
        category: Category,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            severity,
            category,
            message: message.into(),
            location: NodePath::root(),
            document: None,
            fix: None,
        }
    }

    pub fn with_location(mut self, location: NodePath) -> Self {
        self.location = location;
        self
    }

    pub fn with_document(mut self, file_name: impl Into<String>) -> Self {
        self.document = Some(file_name.into());
        self
    }

    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.fix = Some(fix.into());
        self
    }

    /// Format the finding as a single console line.
    pub fn format(&self) -> String {
        let mut parts = Vec::new();
        if let Some(document) = &self.document {
            parts.push(format!("[{}]", document));
        }
        parts.push(format!("[{}]", self.rule_id));
        if !self.location.is_root() {
            parts.push(format!("{}:", self.location));
        }
        parts.push(self.message.clone());
        parts.join(" ")
    }
}

/// What a rule reports; the engine turns it into a [`Finding`] by stamping
/// the rule's identity and the owning document.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub message: String,
    pub location: NodePath,
    pub fix: Option<String>,
}

impl Violation {
    pub fn new(message: impl Into<String>, location: NodePath) -> Self {
        Self {
            message: message.into(),
            location,
            fix: None,
        }
    }

    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.fix = Some(fix.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_orders_critical_first() {
        let mut severities = vec![Severity::Low, Severity::Critical, Severity::Medium];
        severities.sort();
        assert_eq!(severities, Severity::ALL.to_vec());
    }

    #[test]
    fn test_format_includes_context() {
        let finding = Finding::new("info-title", Severity::Critical, Category::Info, "Missing title")
            .with_document("qod.yaml")
            .with_location(NodePath::from_keys(&["info", "title"]));
        assert_eq!(finding.format(), "[qod.yaml] [info-title] info.title: Missing title");
    }
}
