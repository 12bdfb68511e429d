//! Logging for the bridge
//!
//! Subscriber setup uses `tracing-subscriber` with `tracing-appender` writers.
//! The `log_*` helpers emit the structured events the binding layer produces,
//! so field names stay consistent across modules.

use crate::errors::BindError;
use crate::infrastructure::config::{LogFormatName, LoggingConfig};
use crate::interop::{CallableShape, Signature};
use std::path::Path;
use tracing::Level;
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with timestamps
    Pretty,
    /// Compact format for production
    Compact,
    /// JSON format for structured logging
    Json,
}

/// Log output destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
    /// File with daily rotation
    File { directory: String, prefix: String },
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub format: LogFormat,
    pub output: LogOutput,
    /// Whether to include span events
    pub span_events: bool,
    /// Custom filter directives (e.g., "laf=debug,mlua=info")
    pub filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Pretty,
            output: LogOutput::Stderr,
            span_events: false,
            filter: None,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }
}

impl From<&LoggingConfig> for LogConfig {
    fn from(section: &LoggingConfig) -> Self {
        let level = section.level.parse::<Level>().unwrap_or(Level::INFO);
        let format = match section.format {
            LogFormatName::Pretty => LogFormat::Pretty,
            LogFormatName::Compact => LogFormat::Compact,
            LogFormatName::Json => LogFormat::Json,
        };

        Self {
            level,
            format,
            filter: section.filter.clone(),
            ..Self::default()
        }
    }
}

/// Initialize the global logging system
///
/// Returns a `WorkerGuard` that must be kept alive for the duration of the program
/// to ensure all logs are flushed. A second initialization is ignored.
pub fn init_logging(config: LogConfig) -> Option<WorkerGuard> {
    let filter = build_filter(&config);
    let span_events = span_events_config(config.span_events);

    let (writer, guard) = match &config.output {
        LogOutput::Stdout => tracing_appender::non_blocking(std::io::stdout()),
        LogOutput::Stderr => tracing_appender::non_blocking(std::io::stderr()),
        LogOutput::File { directory, prefix } => {
            tracing_appender::non_blocking(rolling::daily(directory, prefix))
        }
    };

    let installed = match config.format {
        LogFormat::Pretty => {
            let layer = fmt::layer()
                .with_writer(writer)
                .pretty()
                .with_span_events(span_events)
                .with_filter(filter);

            tracing_subscriber::registry().with(layer).try_init()
        }
        LogFormat::Compact => {
            let layer = fmt::layer()
                .with_writer(writer)
                .compact()
                .with_span_events(span_events)
                .with_filter(filter);

            tracing_subscriber::registry().with(layer).try_init()
        }
        LogFormat::Json => {
            let layer = fmt::layer()
                .with_writer(writer)
                .json()
                .with_span_events(span_events)
                .with_filter(filter);

            tracing_subscriber::registry().with(layer).try_init()
        }
    };

    installed.ok().map(|_| guard)
}

fn build_filter(config: &LogConfig) -> EnvFilter {
    let base_filter = EnvFilter::from_default_env()
        .add_directive(config.level.into());

    match &config.filter {
        Some(filter_str) => {
            filter_str.split(',')
                .fold(base_filter, |filter, directive| {
                    filter.add_directive(directive.parse().unwrap_or_else(|_| {
                        tracing::warn!("Invalid filter directive: {}", directive);
                        config.level.into()
                    }))
                })
        }
        None => base_filter,
    }
}

fn span_events_config(enabled: bool) -> FmtSpan {
    if enabled {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    }
}

/// Initialize logging with defaults for development
pub fn init_dev_logging() -> Option<WorkerGuard> {
    init_logging(LogConfig {
        level: Level::DEBUG,
        format: LogFormat::Pretty,
        output: LogOutput::Stderr,
        span_events: true,
        filter: Some("laf=trace".to_string()),
    })
}

/// Initialize logging to daily-rotated JSON files under `log_dir`
pub fn init_file_logging(log_dir: impl AsRef<Path>) -> Option<WorkerGuard> {
    init_logging(LogConfig {
        level: Level::INFO,
        format: LogFormat::Json,
        output: LogOutput::File {
            directory: log_dir.as_ref().to_string_lossy().to_string(),
            prefix: "laf".to_string(),
        },
        span_events: false,
        filter: Some("laf=info".to_string()),
    })
}

pub fn log_bind(name: &str, shape: CallableShape, signature: &Signature) {
    tracing::debug!(
        event = "bind",
        function = name,
        shape = ?shape,
        signature = %signature,
        "Bound native callable"
    );
}

pub fn log_call_error(name: &str, error: &BindError) {
    tracing::debug!(
        event = "call_error",
        function = name,
        kind = ?error.kind,
        "{}", error
    );
}

pub fn log_type_registered(type_name: &str, identifier: &str) {
    tracing::debug!(event = "type_registered", type_name, identifier, "Registered type identity");
}

pub fn log_methods_attached(identifier: &str, count: usize) {
    tracing::debug!(event = "methods_attached", identifier, methods = count, "Attached method table");
}

pub fn log_handle_created(identifier: &str) {
    tracing::trace!(event = "handle_created", identifier);
}

pub fn log_handle_released(identifier: &str, early: bool) {
    tracing::trace!(event = "handle_released", identifier, early);
}
