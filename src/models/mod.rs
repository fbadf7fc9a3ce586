//! Document model shared by the loader, the rules and the report.

pub mod document;
pub mod node;
pub mod path;

pub use document::{ApiDocument, ApiKind, ApiMaturity, api_name_from_servers};
pub use node::{Mapping, Node, Scalar, Visit, find_all, walk};
pub use path::{NodePath, PathSegment};
