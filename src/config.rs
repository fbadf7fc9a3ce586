use crate::report::{DEFAULT_MAX_CRITICAL, DEFAULT_MAX_ITEMS, SummaryLimits};
use crate::validation::{ReviewType, RulesetVersion};
use clap::ValueEnum;

/// Review defaults read from the environment. Command-line flags take
/// precedence over every value here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewConfig {
    pub commonalities_version: String,
    pub review_type: ReviewType,
    pub limits: SummaryLimits,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            commonalities_version: RulesetVersion::latest().tag().to_string(),
            review_type: ReviewType::default(),
            limits: SummaryLimits::default(),
        }
    }
}

impl ReviewConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let commonalities_version = lookup("CAMARA_COMMONALITIES_VERSION")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.commonalities_version);

        let review_type = match lookup("CAMARA_REVIEW_TYPE") {
            Some(value) => ReviewType::from_str(value.trim(), true).unwrap_or_else(|_| {
                tracing::warn!(
                    "Ignoring unknown CAMARA_REVIEW_TYPE `{}`, using {}",
                    value,
                    defaults.review_type
                );
                defaults.review_type
            }),
            None => defaults.review_type,
        };

        let limit = |key: &str, default: usize| {
            lookup(key)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(default)
        };

        Self {
            commonalities_version,
            review_type,
            limits: SummaryLimits {
                max_critical: limit("CAMARA_REVIEW_MAX_CRITICAL", DEFAULT_MAX_CRITICAL),
                max_items: limit("CAMARA_REVIEW_MAX_ITEMS", DEFAULT_MAX_ITEMS),
            },
        }
    }
}
