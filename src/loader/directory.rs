use super::features::{TestDefinitions, load_test_definitions};
use super::openapi::{LOAD_RULE, load_openapi};
use crate::error::{Result, ReviewError};
use crate::models::ApiDocument;
use crate::validation::{Category, Finding, Severity};
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const NO_DEFINITIONS_RULE: &str = "definition-files-present";
pub const TEST_LOAD_RULE: &str = "test-definition-load";

const DEFINITION_EXTENSIONS: [&str; 2] = ["yaml", "yml"];
const DEFINITIONS_SUBDIR: [&str; 2] = ["code", "API_definitions"];
const TESTS_SUBDIR: [&str; 2] = ["code", "Test_definitions"];

/// A candidate definition file and whether it could be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFile {
    pub file_name: String,
    pub loaded: bool,
}

/// Everything read from disk for one run, before any rule is evaluated.
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub directory: PathBuf,
    pub sources: Vec<SourceFile>,
    pub documents: Vec<ApiDocument>,
    pub findings: Vec<Finding>,
    pub test_definitions: Option<TestDefinitions>,
}

/// Scanner for API definition files.
///
/// Accepts either a directory holding the definitions directly, or a
/// repository root with a `code/API_definitions` directory.
pub struct DefinitionScanner {
    root_dir: PathBuf,
    tests_dir: Option<PathBuf>,
}

impl DefinitionScanner {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            tests_dir: None,
        }
    }

    /// Read test definitions from `dir` instead of `code/Test_definitions`.
    pub fn with_tests_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.tests_dir = dir;
        self
    }

    pub fn definitions_dir(&self) -> PathBuf {
        let nested = DEFINITIONS_SUBDIR
            .iter()
            .fold(self.root_dir.clone(), |dir, part| dir.join(part));
        if nested.is_dir() {
            nested
        } else {
            self.root_dir.clone()
        }
    }

    pub fn tests_dir(&self) -> PathBuf {
        self.tests_dir.clone().unwrap_or_else(|| {
            TESTS_SUBDIR
                .iter()
                .fold(self.root_dir.clone(), |dir, part| dir.join(part))
        })
    }

    /// Load every definition file.
    ///
    /// Unparseable files become critical findings and loading continues. A
    /// missing or empty directory yields a single critical finding. Only a
    /// definitions directory that exists but cannot be listed is an error;
    /// test definition problems are findings.
    pub fn scan(&self) -> Result<LoadOutcome> {
        let directory = self.definitions_dir();
        let files = list_definition_files(&directory)?;

        let mut outcome = LoadOutcome {
            directory: directory.clone(),
            sources: Vec::new(),
            documents: Vec::new(),
            findings: Vec::new(),
            test_definitions: None,
        };

        if files.is_empty() {
            tracing::warn!("No API definition files found in {}", directory.display());
            outcome.findings.push(
                Finding::new(
                    NO_DEFINITIONS_RULE,
                    Severity::Critical,
                    Category::Loading,
                    format!("No API definition files found in `{}`", directory.display()),
                )
                .with_fix("Place `.yaml` or `.yml` files under `code/API_definitions/`"),
            );
            return Ok(outcome);
        }

        for path in &files {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();

            match load_openapi(path) {
                Ok(loaded) => {
                    tracing::debug!(
                        "Loaded {} ({} v{})",
                        file_name,
                        loaded.document.title,
                        loaded.document.version
                    );
                    outcome.sources.push(SourceFile {
                        file_name,
                        loaded: true,
                    });
                    outcome.findings.extend(loaded.findings);
                    outcome.documents.push(loaded.document);
                }
                Err(e) => {
                    tracing::warn!("Failed to load {}: {}", path.display(), e);
                    outcome.findings.push(
                        Finding::new(LOAD_RULE, Severity::Critical, Category::Loading, e.to_string())
                            .with_document(&file_name)
                            .with_fix("Fix the YAML syntax so the definition can be parsed"),
                    );
                    outcome.sources.push(SourceFile {
                        file_name,
                        loaded: false,
                    });
                }
            }
        }

        outcome.test_definitions = match load_test_definitions(&self.tests_dir()) {
            Ok(definitions) => definitions,
            Err(e) => {
                tracing::warn!("Skipping test definitions: {}", e);
                outcome.findings.push(
                    Finding::new(
                        TEST_LOAD_RULE,
                        Severity::Critical,
                        Category::TestAlignment,
                        format!("Failed to read test definitions: {}", e),
                    )
                    .with_fix("Make the test definitions directory readable"),
                );
                None
            }
        };
        if let Some(definitions) = &outcome.test_definitions {
            for (file_name, reason) in &definitions.unreadable {
                outcome.findings.push(Finding::new(
                    TEST_LOAD_RULE,
                    Severity::Critical,
                    Category::TestAlignment,
                    format!("Failed to read test file `{}`: {}", file_name, reason),
                ));
            }
        }

        tracing::info!(
            "Loaded {} of {} definition file(s) from {}",
            outcome.documents.len(),
            files.len(),
            directory.display()
        );

        Ok(outcome)
    }
}

/// Definition files in `dir`, sorted by path. Missing directories are empty.
fn list_definition_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(ReviewError::DirectoryUnreadable {
                path: dir.to_path_buf(),
                source,
            });
        }
    };

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|source| ReviewError::DirectoryUnreadable {
                path: dir.to_path_buf(),
                source,
            })?
            .path();
        let recognised = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                DEFINITION_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            });
        if path.is_file() && recognised {
            files.push(path);
        }
    }
    files.sort();

    Ok(files)
}
