//! Structured logging setup for contact graph routing hosts
//!
//! The routing crates only emit events through the `tracing` facade. This
//! crate installs a subscriber for them: JSONL or pretty console output,
//! optional rotated JSONL files, `RUST_LOG` filtering, and the local node id
//! of the active router attached to spans.
//!
//! # Quick Start
//!
//! ```no_run
//! use cgr_logging::{CgrSubscriberBuilder, LogConfig};
//!
//! // Development mode with pretty human-readable output
//! let _guard = CgrSubscriberBuilder::new()
//!     .with_config(LogConfig::development())
//!     .init();
//! ```
//!
//! # Node Context
//!
//! Use [`NodeContextGuard`] to tag everything a router logs in a scope:
//!
//! ```
//! use cgr_logging::NodeContextGuard;
//!
//! let _guard = NodeContextGuard::new(1);
//! tracing::info!("Recomputing next hops");
//! ```

pub mod config;
pub mod context;
pub mod layers;

pub use config::{ConsoleConfig, FileConfig, JsonlConfig, LogConfig, RotationStrategy};
pub use context::{NodeContextData, NodeContextGuard};
pub use layers::{NodeContextExtension, NodeContextLayer, jsonl_layer};

use std::fs;

use thiserror::Error;
use tracing::level_filters::{LevelFilter, ParseLevelFilterError};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Errors raised while installing the subscriber
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log level {level:?}: {source}")]
    InvalidLevel {
        level: String,
        source: ParseLevelFilterError,
    },

    #[error("Failed to create log directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to create log file: {0}")]
    Appender(#[from] InitError),

    #[error("A global subscriber is already set: {0}")]
    AlreadyInitialized(#[from] TryInitError),
}

/// Builder for configuring and initializing the logging subscriber
///
/// By default, console output uses JSONL format. Use `LogConfig::development()`
/// for human-readable pretty output during development.
pub struct CgrSubscriberBuilder {
    config: LogConfig,
}

impl CgrSubscriberBuilder {
    /// Create a new subscriber builder with default configuration
    pub fn new() -> Self {
        Self {
            config: LogConfig::default(),
        }
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.default_level = level.into();
        self
    }

    /// Enable or disable console output
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.config.console.enabled = enabled;
        self
    }

    /// Configure file output
    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Initialize the subscriber globally
    ///
    /// Returns the guard of the file writer, which must be kept alive for the
    /// duration of the program. Failures are reported on stderr and leave
    /// logging disabled.
    pub fn init(self) -> Option<WorkerGuard> {
        match self.try_init() {
            Ok(guard) => guard,
            Err(error) => {
                eprintln!("Warning: failed to initialize logging: {error}");
                None
            }
        }
    }

    /// Try to initialize the subscriber globally
    ///
    /// Fails if a level does not parse, the log directory cannot be created,
    /// or a global subscriber has already been set.
    pub fn try_init(self) -> Result<Option<WorkerGuard>, LoggingError> {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.config.default_level));

        let console = &self.config.console;
        let console_level = match &console.level {
            Some(level) => level.parse::<LevelFilter>().map_err(|source| {
                LoggingError::InvalidLevel {
                    level: level.clone(),
                    source,
                }
            })?,
            None => LevelFilter::TRACE,
        };

        // Separate pretty and JSONL layers keep the formatter types apart
        let pretty_layer = (console.enabled && console.pretty).then(|| {
            tracing_subscriber::fmt::layer()
                .with_ansi(console.ansi)
                .with_target(true)
                .with_filter(console_level)
        });
        let json_layer = (console.enabled && !console.pretty).then(|| {
            jsonl_layer(std::io::stdout, &self.config.jsonl).with_filter(console_level)
        });

        let (file_layer, guard) = match &self.config.file {
            Some(file_config) => {
                let (writer, guard) = file_writer(file_config)?;
                (Some(jsonl_layer(writer, &self.config.jsonl)), Some(guard))
            }
            None => (None, None),
        };

        Registry::default()
            .with(env_filter)
            .with(NodeContextLayer::new())
            .with(pretty_layer)
            .with(json_layer)
            .with(file_layer)
            .try_init()?;

        Ok(guard)
    }
}

impl Default for CgrSubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-blocking writer for the configured log file
fn file_writer(config: &FileConfig) -> Result<(NonBlocking, WorkerGuard), LoggingError> {
    fs::create_dir_all(&config.directory)?;

    let rotation = match config.rotation {
        RotationStrategy::Daily => Rotation::DAILY,
        RotationStrategy::Hourly => Rotation::HOURLY,
        RotationStrategy::Never => Rotation::NEVER,
    };
    let mut builder = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(config.prefix.as_str())
        .filename_suffix("log");
    if let Some(max_files) = config.max_files {
        builder = builder.max_log_files(max_files);
    }

    let appender = builder.build(&config.directory)?;
    Ok(tracing_appender::non_blocking(appender))
}

/// Initialize logging with default settings (JSONL to console)
pub fn init_default() {
    CgrSubscriberBuilder::new().init();
}

/// Initialize logging for development (verbose, pretty console output)
pub fn init_development() {
    CgrSubscriberBuilder::new()
        .with_config(LogConfig::development())
        .init();
}

/// Initialize logging for testing (minimal output)
///
/// Safe to call from every test; only the first call installs a subscriber.
pub fn init_testing() {
    let _ = CgrSubscriberBuilder::new()
        .with_config(LogConfig::testing())
        .try_init();
}
