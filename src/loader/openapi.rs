use crate::error::{Result, ReviewError};
use crate::models::{ApiDocument, ApiKind, ApiMaturity, Node, NodePath, api_name_from_servers};
use crate::validation::{Category, Finding, Severity};
use serde_yaml::Value;
use std::fs;
use std::path::Path;

pub const LOAD_RULE: &str = "document-load";
pub const METADATA_RULE: &str = "document-metadata";

const VERSION_PLACEHOLDER: &str = "unknown";

/// A parsed document together with the findings raised while loading it.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub document: ApiDocument,
    pub findings: Vec<Finding>,
}

/// Load an OpenAPI definition from a file
pub fn load_openapi<P: AsRef<Path>>(path: P) -> Result<LoadedDocument> {
    let path = path.as_ref();

    let content = fs::read_to_string(path).map_err(|e| {
        ReviewError::OpenApiLoadError(format!("Failed to read file {}: {}", path.display(), e))
    })?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    parse_openapi(&file_name, path, &content)
}

/// Parse OpenAPI YAML text into an [`ApiDocument`].
///
/// Only YAML syntax and a mapping root are required. Missing `info.title` or
/// `info.version` are replaced with file-derived placeholders and reported as
/// a low severity finding.
pub fn parse_openapi(file_name: &str, source_path: &Path, content: &str) -> Result<LoadedDocument> {
    let value: Value = serde_yaml::from_str(content)
        .map_err(|e| ReviewError::OpenApiLoadError(format!("Failed to parse YAML: {}", e)))?;

    let root = Node::from(value);
    if root.as_mapping().is_none() {
        return Err(ReviewError::OpenApiLoadError(format!(
            "Document root must be a mapping, found {}",
            root.kind_name()
        )));
    }

    let stem = file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(file_name);

    let mut missing = Vec::new();
    let title = match root.lookup(&["info", "title"]).and_then(Node::as_text) {
        Some(title) if !title.trim().is_empty() => title.into_owned(),
        _ => {
            missing.push("title");
            stem.to_string()
        }
    };
    let version = match root.lookup(&["info", "version"]).and_then(Node::as_text) {
        Some(version) if !version.trim().is_empty() => version.into_owned(),
        _ => {
            missing.push("version");
            VERSION_PLACEHOLDER.to_string()
        }
    };

    let mut findings = Vec::new();
    if !missing.is_empty() {
        let fields = missing
            .iter()
            .map(|field| format!("info.{}", field))
            .collect::<Vec<_>>()
            .join(", ");
        findings.push(
            Finding::new(
                METADATA_RULE,
                Severity::Low,
                Category::Loading,
                format!("Missing {}; using placeholder `{}` v{}", fields, title, version),
            )
            .with_location(NodePath::from_keys(&["info"]))
            .with_document(file_name),
        );
    }

    let document = ApiDocument {
        file_name: file_name.to_string(),
        source_path: source_path.to_path_buf(),
        maturity: ApiMaturity::from_version(&version),
        kind: ApiKind::detect(&root),
        api_name: api_name_from_servers(&root),
        title,
        version,
        root,
    };

    Ok(LoadedDocument { document, findings })
}
