use super::metadata::RunMetadata;
use crate::loader::SourceFile;
use crate::models::{ApiDocument, ApiKind, ApiMaturity};
use crate::validation::{Finding, ReviewType, RulesetVersion, Severity, VersionResolution};
use serde::Serialize;
use std::fmt;

/// Number of findings per severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub medium: usize,
    pub low: usize,
}

impl SeverityCounts {
    pub fn tally<'a>(findings: impl IntoIterator<Item = &'a Finding>) -> Self {
        let mut counts = Self::default();
        for finding in findings {
            match finding.severity {
                Severity::Critical => counts.critical += 1,
                Severity::Medium => counts.medium += 1,
                Severity::Low => counts.low += 1,
            }
        }
        counts
    }

    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Critical => self.critical,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
        }
    }

    pub fn total(&self) -> usize {
        self.critical + self.medium + self.low
    }
}

/// Advisory verdict shown to reviewers. Never affects the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Ready,
    Conditional,
    Blocked,
}

impl Recommendation {
    pub fn from_counts(counts: &SeverityCounts) -> Self {
        if counts.critical > 0 {
            Recommendation::Blocked
        } else if counts.medium > 0 {
            Recommendation::Conditional
        } else {
            Recommendation::Ready
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recommendation::Ready => write!(f, "ready"),
            Recommendation::Conditional => write!(f, "conditional"),
            Recommendation::Blocked => write!(f, "blocked"),
        }
    }
}

/// Identity of one reviewed definition and the findings it owns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentReport {
    pub file_name: String,
    pub api_name: String,
    pub title: String,
    pub version: String,
    pub maturity: ApiMaturity,
    pub kind: ApiKind,
    pub findings: Vec<Finding>,
}

impl DocumentReport {
    fn new(document: &ApiDocument) -> Self {
        Self {
            file_name: document.file_name.clone(),
            api_name: document.display_name().to_string(),
            title: document.title.clone(),
            version: document.version.clone(),
            maturity: document.maturity,
            kind: document.kind,
            findings: Vec::new(),
        }
    }

    pub fn counts(&self) -> SeverityCounts {
        SeverityCounts::tally(&self.findings)
    }
}

/// Everything one run produced, grouped for rendering.
///
/// Counts and the recommendation are always derived from the findings held
/// here; they are never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    pub metadata: RunMetadata,
    pub review_type: ReviewType,
    pub resolution: VersionResolution,
    pub sources: Vec<SourceFile>,
    pub documents: Vec<DocumentReport>,
    /// Findings not owned by a loaded document, such as an empty input
    /// directory or a file that failed to parse.
    pub run_findings: Vec<Finding>,
    /// Feature files seen, or `None` when no test directory exists.
    pub test_files: Option<Vec<String>>,
}

impl ValidationReport {
    /// Group `findings` by owning document. Findings naming a document that
    /// was not loaded are kept as run-level findings.
    pub fn aggregate(
        documents: &[ApiDocument],
        sources: Vec<SourceFile>,
        findings: Vec<Finding>,
        resolution: VersionResolution,
        review_type: ReviewType,
        metadata: RunMetadata,
    ) -> Self {
        let mut reports: Vec<DocumentReport> = documents.iter().map(DocumentReport::new).collect();
        let mut run_findings = Vec::new();

        for finding in findings {
            let owner = finding
                .document
                .as_deref()
                .and_then(|name| reports.iter_mut().find(|r| r.file_name == name));
            match owner {
                Some(report) => report.findings.push(finding),
                None => run_findings.push(finding),
            }
        }

        Self {
            metadata,
            review_type,
            resolution,
            sources,
            documents: reports,
            run_findings,
            test_files: None,
        }
    }

    pub fn with_test_files(mut self, test_files: Option<Vec<String>>) -> Self {
        self.test_files = test_files;
        self
    }

    /// Run-level findings first, then each document's in order.
    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.run_findings
            .iter()
            .chain(self.documents.iter().flat_map(|d| d.findings.iter()))
    }

    pub fn counts(&self) -> SeverityCounts {
        SeverityCounts::tally(self.findings())
    }

    pub fn recommendation(&self) -> Recommendation {
        Recommendation::from_counts(&self.counts())
    }

    pub fn resolved_version(&self) -> RulesetVersion {
        self.resolution.resolved
    }

    pub fn is_fallback(&self) -> bool {
        self.resolution.mismatch
    }

    /// Whether the cross-definition consistency rules had anything to compare.
    pub fn consistency_checked(&self) -> bool {
        self.documents.len() >= 2
    }
}
