//! # Logging & Tracing Infrastructure
//!
//! Structured logging on top of `tracing`:
//! - Pretty, JSON and compact output
//! - Per-crate filtering with dependency noise capped at `warn`
//! - Path helpers so per-file log lines do not leak full library paths
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
//!
//! let config = LoggingConfig::default()
//!     .with_format(LogFormat::Pretty)
//!     .with_level(LogLevel::Debug);
//!
//! init_logging(config)?;
//! tracing::info!("Library engine started");
//! ```
//!
//! `init_logging` installs a global subscriber and can only succeed once per
//! process.

use crate::error::{Error, Result};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::Path;
use std::str::FromStr;
use tracing_subscriber::{
    filter::EnvFilter, fmt::format::FmtSpan, layer::SubscriberExt, registry::Registry,
    util::SubscriberInitExt, Layer,
};

/// Crates whose level follows `LoggingConfig::level` when no custom filter is set.
const WORKSPACE_CRATES: &[&str] = &[
    "library_sync_workspace",
    "core_runtime",
    "core_library",
    "core_metadata",
    "core_sync",
    "core_service",
    "bridge_desktop",
];

/// Dependencies that are only interesting when they complain.
const QUIET_DEPENDENCIES: &[&str] = &["sqlx", "lofty", "walkdir"];

/// Minimum severity a log line needs to be emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(Error::Config(format!("Unknown log level: {}", other))),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, multi-line
    Pretty,
    /// One JSON object per line
    Json,
    /// Single-line text
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        #[cfg(debug_assertions)]
        return Self::Pretty;

        #[cfg(not(debug_assertions))]
        return Self::Json;
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub level: LogLevel,
    /// Custom filter directives (e.g. `"core_sync=trace,sqlx=info"`), replaces
    /// the per-crate default entirely
    pub filter: Option<String>,
    /// Log span enter/exit for `#[instrument]`ed functions
    pub enable_spans: bool,
    pub display_target: bool,
    pub display_thread_info: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            filter: None,
            enable_spans: false,
            display_target: true,
            display_thread_info: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_spans(mut self, enable: bool) -> Self {
        self.enable_spans = enable;
        self
    }

    pub fn with_target(mut self, display: bool) -> Self {
        self.display_target = display;
        self
    }

    pub fn with_thread_info(mut self, display: bool) -> Self {
        self.display_thread_info = display;
        self
    }
}

/// Initialize the global logging subscriber.
///
/// # Errors
///
/// `Error::Config` for an invalid filter, `Error::Internal` if a global
/// subscriber is already installed.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = build_filter(&config)?;
    let layer = build_fmt_layer(&config).with_filter(filter);

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| Error::Internal(format!("Failed to initialize logging: {}", e)))
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let directives = match &config.filter {
        Some(custom) => custom.clone(),
        None => default_directives(config.level),
    };

    EnvFilter::try_new(directives).map_err(|e| Error::Config(format!("Invalid log filter: {}", e)))
}

fn default_directives(level: LogLevel) -> String {
    WORKSPACE_CRATES
        .iter()
        .map(|krate| format!("{}={}", krate, level))
        .chain(QUIET_DEPENDENCIES.iter().map(|dep| format!("{}=warn", dep)))
        .collect::<Vec<_>>()
        .join(",")
}

fn build_fmt_layer(config: &LoggingConfig) -> Box<dyn Layer<Registry> + Send + Sync> {
    let span_events = if config.enable_spans {
        FmtSpan::ACTIVE
    } else {
        FmtSpan::NONE
    };

    let base = tracing_subscriber::fmt::layer()
        .with_target(config.display_target)
        .with_thread_ids(config.display_thread_info)
        .with_thread_names(config.display_thread_info)
        .with_writer(io::stdout);

    match config.format {
        LogFormat::Pretty => base.pretty().with_span_events(span_events).boxed(),
        LogFormat::Json => base
            .json()
            .flatten_event(true)
            .with_current_span(config.enable_spans)
            .with_span_list(config.enable_spans)
            .boxed(),
        LogFormat::Compact => base.compact().with_span_events(span_events).boxed(),
    }
}

/// Strip a full file path to its basename for log output.
///
/// ```ignore
/// use core_runtime::logging::strip_path;
///
/// tracing::warn!(file = %strip_path("/home/me/Music/song.mp3"), "Unreadable tags");
/// // Logs: file="song.mp3"
/// ```
pub fn strip_path(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// [`strip_path`] for `Path` values.
pub fn display_file_name(path: &Path) -> String {
    strip_path(&path.to_string_lossy()).to_string()
}
