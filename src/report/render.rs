use super::aggregate::{DocumentReport, Recommendation, SeverityCounts, ValidationReport};
use super::metadata::RunMetadata;
use crate::error::Result;
use crate::loader::SourceFile;
use crate::models::ApiKind;
use crate::validation::{Finding, ReviewType, Severity};
use indexmap::IndexMap;
use serde::Serialize;

/// Critical items shown in the summary before the rest is counted.
pub const DEFAULT_MAX_CRITICAL: usize = 20;
/// Critical plus medium items shown in the summary.
pub const DEFAULT_MAX_ITEMS: usize = 25;
/// Critical items repeated at the end of the detailed report.
const DETAILED_CRITICAL_DIGEST: usize = 10;

const COMMON_MANUAL_CHECKS: [&str; 7] = [
    "Info.description for device or phone number (if applicable)",
    "Business logic appropriateness review",
    "Documentation quality assessment",
    "API design patterns validation",
    "Use case coverage evaluation",
    "Security considerations beyond structure",
    "Performance implications assessment",
];

const EXPLICIT_SUBSCRIPTION_CHECKS: [&str; 4] = [
    "Subscription lifecycle management review",
    "Event delivery mechanism validation",
    "Webhook endpoint security review",
    "Subscription filtering logic validation",
];

const IMPLICIT_SUBSCRIPTION_CHECKS: [&str; 3] = [
    "Event callback mechanism review",
    "Implicit subscription trigger validation",
    "Event payload structure review",
];

/// Size limits for the summary posted to a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryLimits {
    pub max_critical: usize,
    pub max_items: usize,
}

impl Default for SummaryLimits {
    fn default() -> Self {
        Self {
            max_critical: DEFAULT_MAX_CRITICAL,
            max_items: DEFAULT_MAX_ITEMS,
        }
    }
}

#[derive(Serialize)]
struct ReportPayload<'a> {
    requested_version: &'a str,
    resolved_version: String,
    version_mismatch: bool,
    review_type: ReviewType,
    metadata: &'a RunMetadata,
    recommendation: Recommendation,
    counts: SeverityCounts,
    sources: &'a [SourceFile],
    documents: Vec<DocumentPayload<'a>>,
    run_findings: &'a [Finding],
    #[serde(skip_serializing_if = "Option::is_none")]
    test_files: Option<&'a [String]>,
}

#[derive(Serialize)]
struct DocumentPayload<'a> {
    #[serde(flatten)]
    document: &'a DocumentReport,
    counts: SeverityCounts,
}

/// Machine-readable report. Contains no timestamps, so identical input
/// yields identical output.
pub fn render_json(report: &ValidationReport) -> Result<String> {
    let payload = ReportPayload {
        requested_version: &report.resolution.requested,
        resolved_version: report.resolved_version().tag().to_string(),
        version_mismatch: report.is_fallback(),
        review_type: report.review_type,
        metadata: &report.metadata,
        recommendation: report.recommendation(),
        counts: report.counts(),
        sources: &report.sources,
        documents: report
            .documents
            .iter()
            .map(|document| DocumentPayload {
                document,
                counts: document.counts(),
            })
            .collect(),
        run_findings: &report.run_findings,
        test_files: report.test_files.as_deref(),
    };
    let mut json = serde_json::to_string_pretty(&payload)?;
    json.push('\n');
    Ok(json)
}

/// Escape text that ends up inside markdown rendered as HTML.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            '>' => escaped.push_str("&gt;"),
            '<' => escaped.push_str("&lt;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn kind_icon(kind: ApiKind) -> &'static str {
    match kind {
        ApiKind::ExplicitSubscription => "🔔",
        ApiKind::ImplicitSubscription => "📧",
        ApiKind::Regular => "📄",
    }
}

fn recommendation_banner(recommendation: Recommendation) -> &'static str {
    match recommendation {
        Recommendation::Ready => "✅ **Ready for Release**",
        Recommendation::Conditional => "⚠️ **Conditional Approval**",
        Recommendation::Blocked => "❌ **Critical Issues Found**",
    }
}

fn fallback_notice(report: &ValidationReport) -> Option<String> {
    report.is_fallback().then(|| {
        format!(
            "> ⚠️ **Note**: Commonalities version `{}` is not implemented by this validator. \
             Validation was performed using the v{} rules.",
            report.resolution.requested,
            report.resolved_version()
        )
    })
}

fn write_metadata(out: &mut String, report: &ValidationReport) {
    let metadata = &report.metadata;
    if let Some(repository) = &metadata.repository {
        out.push_str(&format!("**Repository**: {}  \n", repository));
    }
    if let Some(issue) = &metadata.issue_number {
        out.push_str(&format!("**Issue/PR**: #{}  \n", issue));
    }
    if let Some(url) = &metadata.pull_request_url {
        out.push_str(&format!("**Pull Request**: {}  \n", url));
    }
    if let Some(actor) = &metadata.triggered_by {
        out.push_str(&format!("**Triggered by**: @{}  \n", actor));
    }
    out.push_str(&format!("**Review Type**: {}  \n", report.review_type));
    out.push_str(&format!(
        "**Commonalities Version**: {} (rules v{})\n",
        report.resolution.requested,
        report.resolved_version()
    ));
}

/// Label used for a finding's source in listings.
fn source_label<'a>(report: &'a ValidationReport, finding: &'a Finding) -> &'a str {
    match &finding.document {
        Some(name) => report
            .documents
            .iter()
            .find(|d| &d.file_name == name)
            .map(|d| d.api_name.as_str())
            .unwrap_or(name.as_str()),
        None => "Run",
    }
}

/// Bounded markdown summary for posting as a comment.
pub fn render_summary(report: &ValidationReport, limits: &SummaryLimits) -> String {
    let counts = report.counts();
    let recommendation = report.recommendation();
    let mut out = String::new();

    out.push_str("## CAMARA API Review\n\n");
    write_metadata(&mut out, report);
    out.push('\n');

    if let Some(notice) = fallback_notice(report) {
        out.push_str(&format!("{}\n\n", notice));
    }

    out.push_str(&format!("### {}\n\n", recommendation_banner(recommendation)));

    if report.documents.is_empty() {
        out.push_str("❌ **No API definition files found**\n\n");
        out.push_str("Please ensure YAML files are located in `/code/API_definitions/`\n\n");
    } else {
        out.push_str("**APIs Reviewed**:\n");
        for document in &report.documents {
            out.push_str(&format!(
                "- {} `{}` v{} ({})\n",
                kind_icon(document.kind),
                document.api_name,
                document.version,
                document.kind
            ));
        }
        out.push('\n');

        out.push_str("| File | 🔴 Critical | 🟡 Medium | 🔵 Low |\n");
        out.push_str("|------|------------|-----------|--------|\n");
        for document in &report.documents {
            let c = document.counts();
            out.push_str(&format!(
                "| `{}` | {} | {} | {} |\n",
                document.file_name, c.critical, c.medium, c.low
            ));
        }
        out.push('\n');
    }

    out.push_str("**Issues Summary**:\n");
    for severity in Severity::ALL {
        out.push_str(&format!(
            "- {} {}: {}\n",
            severity.icon(),
            capitalize(&severity.to_string()),
            counts.get(severity)
        ));
    }
    out.push('\n');

    let critical: Vec<&Finding> = report
        .findings()
        .filter(|f| f.severity == Severity::Critical)
        .collect();
    let medium: Vec<&Finding> = report
        .findings()
        .filter(|f| f.severity == Severity::Medium)
        .collect();

    if !critical.is_empty() || !medium.is_empty() {
        out.push_str("**Issues Requiring Attention**:\n");

        let critical_shown = critical.len().min(limits.max_critical).min(limits.max_items);
        if critical_shown > 0 {
            out.push_str(&format!("\n**🔴 Critical Issues ({}):**\n", critical_shown));
            for finding in &critical[..critical_shown] {
                write_summary_item(&mut out, report, finding);
            }
        }

        let medium_shown = medium
            .len()
            .min(limits.max_items.saturating_sub(critical_shown));
        if medium_shown > 0 {
            out.push_str(&format!("\n**🟡 Medium Priority Issues ({}):**\n", medium_shown));
            for finding in &medium[..medium_shown] {
                write_summary_item(&mut out, report, finding);
            }
        }

        let hidden = critical.len() + medium.len() - critical_shown - medium_shown;
        if hidden > 0 {
            out.push_str(&format!(
                "\n*Note: {} additional issues not shown above. See detailed report for complete analysis.*\n",
                hidden
            ));
        }
        out.push('\n');
    }

    let recommendation_line = match recommendation {
        Recommendation::Ready => "✅ Approved for release".to_string(),
        Recommendation::Conditional => {
            "⚠️ Approved with medium-priority improvements recommended".to_string()
        }
        Recommendation::Blocked => format!(
            "❌ Address {} critical issue(s) before release",
            counts.critical
        ),
    };
    out.push_str(&format!("**Recommendation**: {}\n", recommendation_line));
    out.push_str(&format!(
        "\n📄 **Detailed Report**: {}\n",
        detailed_report_file_name(report)
    ));
    out.push_str("\n*This recommendation is advisory. The final decision rests with the reviewers.*\n");

    out
}

fn write_summary_item(out: &mut String, report: &ValidationReport, finding: &Finding) {
    out.push_str(&format!(
        "- *{}*: **{}** - {}\n",
        source_label(report, finding),
        finding.category,
        single_line(&finding.message)
    ));
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `api_review_<repo>[_comment<n>]_v<version>.md`, with the version's dots
/// replaced by underscores.
pub fn detailed_report_file_name(report: &ValidationReport) -> String {
    let version: String = report
        .resolution
        .requested
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let mut name = String::from("api_review");
    if let Some(repository) = &report.metadata.repository {
        name.push('_');
        name.push_str(repository);
    }
    if let Some(issue) = &report.metadata.issue_number {
        name.push_str("_comment");
        name.push_str(issue);
    }
    name.push_str("_v");
    name.push_str(&version);
    name.push_str(".md");
    name
}

fn write_finding(out: &mut String, finding: &Finding) {
    out.push_str(&format!(
        "**{} {}**: {} (`{}`)\n",
        finding.severity.icon(),
        capitalize(&finding.severity.to_string()),
        finding.category,
        finding.rule_id
    ));
    out.push_str(&format!("- **Description**: {}\n", escape_html(&finding.message)));
    if !finding.location.is_root() {
        out.push_str(&format!("- **Location**: `{}`\n", finding.location));
    }
    if let Some(fix) = &finding.fix {
        out.push_str(&format!("- **Fix**: {}\n", escape_html(fix)));
    }
    out.push('\n');
}

/// Full markdown report listing every finding.
pub fn render_detailed(report: &ValidationReport) -> String {
    let counts = report.counts();
    let mut out = String::new();

    out.push_str("# CAMARA API Review Report\n\n");
    write_metadata(&mut out, report);
    out.push('\n');
    if let Some(notice) = fallback_notice(report) {
        out.push_str(&format!("{}\n\n", notice));
    }

    out.push_str("## Executive Summary\n\n");
    out.push_str(&format!("- **APIs Reviewed**: {}\n", report.documents.len()));
    out.push_str(&format!("- **Critical Issues**: {}\n", counts.critical));
    out.push_str(&format!("- **Medium Issues**: {}\n", counts.medium));
    out.push_str(&format!("- **Low Issues**: {}\n", counts.low));
    out.push_str(&format!("- **Recommendation**: {}\n", report.recommendation()));
    out.push_str(&format!(
        "- **Multi-file Consistency**: {}\n",
        if report.consistency_checked() {
            "✅ Checked"
        } else {
            "⏭️ Skipped (single file)"
        }
    ));
    out.push_str(&format!(
        "- **Test Alignment**: {}\n\n",
        if report.test_files.is_some() {
            "✅ Checked"
        } else {
            "⏭️ Skipped (no tests found)"
        }
    ));

    let mut kinds: IndexMap<ApiKind, usize> = IndexMap::new();
    for document in &report.documents {
        *kinds.entry(document.kind).or_default() += 1;
    }
    if !kinds.is_empty() {
        out.push_str("### API Types Detected\n\n");
        for (kind, count) in &kinds {
            out.push_str(&format!("- **{}**: {}\n", kind, count));
        }
        out.push('\n');
    }

    if !report.run_findings.is_empty() {
        out.push_str("## Run Issues\n\n");
        for finding in &report.run_findings {
            if let Some(document) = &finding.document {
                out.push_str(&format!("**File**: `{}`  \n", document));
            }
            write_finding(&mut out, finding);
        }
    }

    out.push_str("## Individual API Analysis\n\n");
    for document in &report.documents {
        let c = document.counts();
        out.push_str(&format!("### `{}` v{}\n\n", document.api_name, document.version));
        out.push_str(&format!("**File**: `{}`  \n", document.file_name));
        out.push_str(&format!("**Title**: {}  \n", escape_html(&document.title)));
        out.push_str(&format!("**Type**: {}  \n", document.kind));
        out.push_str(&format!("**Maturity**: {}  \n", document.maturity));
        out.push_str(&format!(
            "**Issues**: {} critical, {} medium, {} low\n\n",
            c.critical, c.medium, c.low
        ));

        if document.findings.is_empty() {
            out.push_str("✅ **No issues found**\n\n");
            continue;
        }
        out.push_str("#### Issues Found\n\n");
        for finding in &document.findings {
            write_finding(&mut out, finding);
        }
    }

    if let Some(test_files) = &report.test_files {
        out.push_str("## Test Definitions\n\n");
        if test_files.is_empty() {
            out.push_str("❌ **No test files found**\n\n");
        } else {
            for file in test_files {
                out.push_str(&format!("- `{}`\n", file));
            }
            out.push('\n');
        }
    }

    let critical: Vec<&Finding> = report
        .findings()
        .filter(|f| f.severity == Severity::Critical)
        .collect();
    if !critical.is_empty() {
        out.push_str("## Critical Issues Requiring Immediate Attention\n\n");
        for finding in critical.iter().take(DETAILED_CRITICAL_DIGEST) {
            out.push_str(&format!(
                "- **{}**: {}",
                finding.category,
                escape_html(&finding.message)
            ));
            if !finding.location.is_root() {
                out.push_str(&format!(" (`{}`)", finding.location));
            }
            out.push('\n');
        }
        if critical.len() > DETAILED_CRITICAL_DIGEST {
            out.push_str(&format!(
                "\n*... and {} more critical issues listed above.*\n",
                critical.len() - DETAILED_CRITICAL_DIGEST
            ));
        }
        out.push('\n');
    }

    let manual = manual_checks(report);
    if !manual.is_empty() {
        out.push_str("## Manual Review Required\n\n");
        for check in manual {
            out.push_str(&format!("- {}\n", check));
        }
        out.push('\n');
    }

    out
}

/// Checks no rule can automate, by the kinds of API reviewed. Sorted.
fn manual_checks(report: &ValidationReport) -> Vec<&'static str> {
    let mut checks = Vec::new();
    for document in &report.documents {
        checks.extend(COMMON_MANUAL_CHECKS);
        match document.kind {
            ApiKind::ExplicitSubscription => checks.extend(EXPLICIT_SUBSCRIPTION_CHECKS),
            ApiKind::ImplicitSubscription => checks.extend(IMPLICIT_SUBSCRIPTION_CHECKS),
            ApiKind::Regular => {}
        }
    }
    checks.sort_unstable();
    checks.dedup();
    checks
}

/// Summary written when the review could not run at all.
pub fn render_failure_summary(error: &str) -> String {
    let mut out = String::new();
    out.push_str("## CAMARA API Review\n\n");
    out.push_str("### ❌ **Validation could not run**\n\n");
    out.push_str(&format!("Error: {}\n\n", escape_html(&single_line(error))));
    out.push_str("No findings were produced. Please check the workflow logs for details.\n");
    out
}
