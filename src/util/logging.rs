//! Structured logging setup for startupgen
//!
//! Diagnostics always go to stderr; stdout and the output file are reserved
//! for generated scripts.
//!
//! # Environment
//!
//! - `STARTUPGEN_LOG_LEVEL` - trace, debug, info, warn or error
//! - `STARTUPGEN_LOG_JSON` - `true` for JSON lines
//! - `RUST_LOG` - standard filtering, replaces the default directive
//!
//! # Example
//!
//! ```no_run
//! use startupgen::util::logging;
//!
//! logging::init_from_env();
//! tracing::info!("Generating startup script");
//! ```

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_LEVEL_VAR: &str = "STARTUPGEN_LOG_LEVEL";
pub const LOG_JSON_VAR: &str = "STARTUPGEN_LOG_JSON";

static INIT: Once = Once::new();

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: Level,
    /// Use JSON output format (for log collectors)
    pub use_json: bool,
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: true,
        }
    }
}

impl LoggingConfig {
    /// Level from the command line, falling back to the environment.
    ///
    /// An explicit `--log-level` wins over `-v`/`-q`, which win over
    /// `STARTUPGEN_LOG_LEVEL`.
    pub fn from_args(log_level: Option<&str>, verbose: bool, quiet: bool) -> Self {
        let level = if let Some(level_str) = log_level {
            parse_level(level_str)
        } else if verbose {
            Level::DEBUG
        } else if quiet {
            Level::ERROR
        } else {
            let level_str = env::var(LOG_LEVEL_VAR).unwrap_or_else(|_| "info".to_string());
            parse_level(&level_str)
        };

        Self {
            level,
            use_json: json_from_env(),
            ..Default::default()
        }
    }
}

fn json_from_env() -> bool {
    env::var(LOG_JSON_VAR)
        .ok()
        .and_then(|v| v.trim().to_lowercase().parse::<bool>().ok())
        .unwrap_or(false)
}

/// Parses a log level, case-insensitively. Unknown values fall back to INFO.
///
/// ```
/// use startupgen::util::logging::parse_level;
/// use tracing::Level;
///
/// assert_eq!(parse_level("debug"), Level::DEBUG);
/// assert_eq!(parse_level("bogus"), Level::INFO);
/// ```
pub fn parse_level(level_str: &str) -> Level {
    match level_str.trim().to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}

fn build_filter(level: Level) -> EnvFilter {
    if env::var("RUST_LOG").is_ok() {
        return EnvFilter::from_default_env();
    }
    EnvFilter::new(format!("startupgen={}", level))
}

/// Installs the global subscriber. Only the first call has any effect.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = build_filter(config.level);

        if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_target(config.include_target)
                        .with_writer(std::io::stderr),
                )
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_target(config.include_target)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
    });
}

pub fn init_from_env() {
    init_logging(LoggingConfig::from_args(None, false, false));
}

pub fn init_from_args(log_level: Option<&str>, verbose: bool, quiet: bool) {
    init_logging(LoggingConfig::from_args(log_level, verbose, quiet));
}
