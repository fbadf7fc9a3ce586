pub mod review;
pub mod rules;

pub use review::{ReviewRequest, execute_review, run_review};
pub use rules::execute_rules;
