pub mod directory;
pub mod features;
pub mod openapi;

pub use directory::{DefinitionScanner, LoadOutcome, SourceFile};
pub use features::{FeatureFile, TestDefinitions, load_test_definitions};
pub use openapi::{LoadedDocument, load_openapi, parse_openapi};
