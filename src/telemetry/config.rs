/// Output format of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Filter used when `RUST_LOG` is not set.
    pub default_filter: String,
    pub format: LogFormat,
}

impl TelemetryConfig {
    pub fn from_env(verbose: bool) -> Self {
        let format = match std::env::var("REVIEW_LOG_FORMAT")
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        };

        let level = if verbose { "debug" } else { "info" };

        Self {
            default_filter: format!("camara_review={}", level),
            format,
        }
    }
}
