use std::fmt;

use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::EngineConfig;

pub const LOG_FORMAT_VAR: &str = "VALIDATION_LOG_FORMAT";

/// Log output format types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable text format with timestamp, level, target, and message
    Text,
    /// JSON lines with timestamp, level, target, and message fields
    Json,
}

impl LogFormat {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "text" => Some(LogFormat::Text),
            _ => None,
        }
    }

    /// Parses a format string from environment or returns the default Text format
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use validatable::utils::logger::LogFormat;
    ///
    /// assert_eq!(LogFormat::from_env_or_default(), LogFormat::Text); // default
    /// std::env::set_var("VALIDATION_LOG_FORMAT", "json");
    /// assert_eq!(LogFormat::from_env_or_default(), LogFormat::Json);
    /// ```
    pub fn from_env_or_default() -> Self {
        std::env::var(LOG_FORMAT_VAR)
            .ok()
            .and_then(|s| LogFormat::parse(&s))
            .unwrap_or(LogFormat::Text)
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Text => f.write_str("text"),
            LogFormat::Json => f.write_str("json"),
        }
    }
}

/// Local wall-clock timestamps with millisecond precision.
#[derive(Debug, Clone, Copy, Default)]
struct LocalTimestamp;

impl FormatTime for LocalTimestamp {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Initializes the tracing subscriber with console output and env filter.
///
/// Sets up:
/// - Environment filter for log level control (`RUST_LOG`, default `info`)
/// - A `fmt` layer in the requested [`LogFormat`]
/// - Log-to-tracing bridge so the engine's `log` macros are captured
///
/// The format comes from [`EngineConfig::global`] (`VALIDATION_LOG_FORMAT`). Safe to
/// call multiple times: if a global subscriber is already set, it returns `Ok(())`.
///
/// # Examples
///
/// ```
/// use validatable::utils::logger::init_logging;
///
/// let _ = init_logging();
/// ```
pub fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    init_logging_with(EngineConfig::global().log_format)
}

/// [`init_logging`] with an explicit format.
pub fn init_logging_with(format: LogFormat) -> Result<(), Box<dyn std::error::Error>> {
    use tracing_log::LogTracer;
    use tracing_subscriber::fmt;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let text_layer = (format == LogFormat::Text).then(|| {
        fmt::layer()
            .with_timer(LocalTimestamp)
            .with_target(true)
            .with_thread_names(true)
    });
    let json_layer = (format == LogFormat::Json).then(|| {
        fmt::layer()
            .json()
            .with_timer(LocalTimestamp)
            .with_target(true)
            .with_current_span(false)
    });

    // Bridge `log` records into tracing; a second init is a no-op.
    let _ = LogTracer::init();

    let result = tracing_subscriber::registry()
        .with(env_filter)
        .with(text_layer)
        .with(json_layer)
        .try_init();

    if let Err(e) = result {
        eprintln!(
            "Tracing subscriber already initialized or failed to initialize: {:?}",
            e
        );
    }
    Ok(())
}
