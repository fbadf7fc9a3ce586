use crate::error::{Result, ReviewError};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// One Gherkin `.feature` file from the test definitions directory.
#[derive(Debug, Clone)]
pub struct FeatureFile {
    pub file_name: String,
    pub stem: String,
    pub content: String,
}

/// Contents of a test definitions directory.
#[derive(Debug, Clone, Default)]
pub struct TestDefinitions {
    pub directory: PathBuf,
    pub features: Vec<FeatureFile>,
    /// Files that exist but could not be read, with the reason.
    pub unreadable: Vec<(String, String)>,
}

/// Read every `*.feature` file in `dir`, sorted by file name.
///
/// Returns `Ok(None)` when the directory does not exist or is not a
/// directory.
pub fn load_test_definitions(dir: &Path) -> Result<Option<TestDefinitions>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
            return Ok(None);
        }
        Err(source) => {
            return Err(ReviewError::DirectoryUnreadable {
                path: dir.to_path_buf(),
                source,
            });
        }
    };

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|source| ReviewError::DirectoryUnreadable {
                path: dir.to_path_buf(),
                source,
            })?
            .path();
        let is_feature = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("feature"));
        if path.is_file() && is_feature {
            paths.push(path);
        }
    }
    paths.sort();

    let mut definitions = TestDefinitions {
        directory: dir.to_path_buf(),
        ..Default::default()
    };

    for path in paths {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        match fs::read_to_string(&path) {
            Ok(content) => definitions.features.push(FeatureFile {
                file_name,
                stem,
                content,
            }),
            Err(e) => {
                tracing::warn!("Failed to read test definition {}: {}", path.display(), e);
                definitions.unreadable.push((file_name, e.to_string()));
            }
        }
    }

    Ok(Some(definitions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_directory_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let result = load_test_definitions(&temp_dir.path().join("Test_definitions")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_regular_file_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("Test_definitions");
        fs::write(&file, "not a directory").unwrap();
        assert!(load_test_definitions(&file).unwrap().is_none());
    }

    #[test]
    fn test_reads_only_feature_files_in_order() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("b-api.feature"), "Feature: B\n").unwrap();
        fs::write(temp_dir.path().join("a-api.feature"), "Feature: A\n").unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "ignored").unwrap();

        let definitions = load_test_definitions(temp_dir.path()).unwrap().unwrap();
        let stems: Vec<_> = definitions.features.iter().map(|f| f.stem.as_str()).collect();
        assert_eq!(stems, vec!["a-api", "b-api"]);
    }
}
