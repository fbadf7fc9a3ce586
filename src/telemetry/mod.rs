mod config;

pub use config::{LogFormat, TelemetryConfig};

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// Logs go to stderr so stdout only carries command output. `RUST_LOG`
/// overrides the configured default filter.
pub fn init_telemetry(config: &TelemetryConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true);

    let installed = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };

    if let Err(e) = installed {
        eprintln!("Failed to initialize tracing: {}", e);
        return;
    }

    tracing::debug!("Tracing initialized ({:?} format)", config.format);
}
