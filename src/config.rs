//! Client configuration and logging
//!
//! A [`Config`] is owned by the caller and only ever read by the engine. It
//! carries the minimum [`LogLevel`] and an optional log callback. When no
//! callback is installed, messages at or above the minimum level are forwarded
//! to [`tracing`] under the `memschema` target.
//!
//! The remaining knobs bound a free pass run over untrusted data:
//! - `strict`: report abandoned branches as [`crate::release::FreeError::Incomplete`]
//! - `max_depth`: abandon branches nested deeper than the limit
//! - `max_sequence_len`: abandon sequences whose decoded count exceeds the limit

use std::fmt;
use std::sync::Arc;

/// Severity of a log message, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Notice => "NOTICE",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// Client log callback
pub type LogFn = dyn Fn(LogLevel, fmt::Arguments<'_>) + Send + Sync;

/// Engine configuration
#[derive(Clone)]
pub struct Config {
    log_level: LogLevel,
    logger: Option<Arc<LogFn>>,
    strict: bool,
    max_depth: Option<usize>,
    max_sequence_len: Option<u64>,
}

impl Config {
    pub fn new() -> Self {
        Config {
            log_level: LogLevel::Warning,
            logger: None,
            strict: false,
            max_depth: None,
            max_sequence_len: None,
        }
    }

    /// Set the minimum level a message needs to be emitted
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Route log messages to `logger` instead of `tracing`
    pub fn with_logger<F>(mut self, logger: F) -> Self
    where
        F: Fn(LogLevel, fmt::Arguments<'_>) + Send + Sync + 'static,
    {
        self.logger = Some(Arc::new(logger));
        self
    }

    /// Report abandoned branches as an error instead of success
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_max_sequence_len(mut self, len: u64) -> Self {
        self.max_sequence_len = Some(len);
        self
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    pub fn max_sequence_len(&self) -> Option<u64> {
        self.max_sequence_len
    }

    /// Emit a message if `level` reaches the configured minimum
    pub fn log(&self, level: LogLevel, args: fmt::Arguments<'_>) {
        if level < self.log_level {
            return;
        }

        match &self.logger {
            Some(logger) => logger(level, args),
            None => match level {
                LogLevel::Debug => tracing::debug!(target: "memschema", "{}", args),
                LogLevel::Info | LogLevel::Notice => {
                    tracing::info!(target: "memschema", "{}", args)
                }
                LogLevel::Warning => tracing::warn!(target: "memschema", "{}", args),
                LogLevel::Error => tracing::error!(target: "memschema", "{}", args),
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("log_level", &self.log_level)
            .field("logger", &self.logger.as_ref().map(|_| "<callback>"))
            .field("strict", &self.strict)
            .field("max_depth", &self.max_depth)
            .field("max_sequence_len", &self.max_sequence_len)
            .finish()
    }
}

/// Log through a [`Config`] with `format!`-style arguments
macro_rules! cfg_log {
    ($cfg:expr, $level:expr, $($arg:tt)+) => {
        $cfg.log($level, format_args!($($arg)+))
    };
}

pub(crate) use cfg_log;
