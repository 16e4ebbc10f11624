//! Log file setup using `tracing` and `tracing-subscriber`.
//!
//! Structured entries go to the log file named in the configuration; the
//! filter honours `RUST_LOG` and defaults to `info`. Human-readable progress
//! lines are printed separately by [`crate::logs`].

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing_subscriber::{
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::{Config, LogFileMode, LogFormat};
use crate::error::WorkbenchError;

/// Where and how to write log entries.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub path: PathBuf,
    pub mode: LogFileMode,
    pub format: LogFormat,
    /// Filter used when `RUST_LOG` is unset.
    pub default_directive: String,
}

impl LogConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            path: config.log_file_path.clone(),
            mode: config.log_file_mode,
            format: config.log_format,
            default_directive: "info".to_string(),
        }
    }
}

/// Open the log file according to `mode`.
pub fn open_log_file(config: &LogConfig) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.create(true);
    match config.mode {
        LogFileMode::Append => options.append(true),
        LogFileMode::Truncate => options.write(true).truncate(true),
    };
    options.open(&config.path)
}

/// Install the global subscriber. Call once at start-up; a second call fails
/// with [`WorkbenchError::Subscriber`].
pub fn init_logging(config: &LogConfig) -> Result<(), WorkbenchError> {
    let file = open_log_file(config).map_err(|source| WorkbenchError::Logging {
        path: config.path.clone(),
        source,
    })?;
    let writer = SharedFileWriter::new(file);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_directive));

    match config.format {
        LogFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_target(true)
                .with_current_span(false);
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .try_init()
                .map_err(|e| WorkbenchError::Subscriber(e.to_string()))?;
        }
        LogFormat::Text => {
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .try_init()
                .map_err(|e| WorkbenchError::Subscriber(e.to_string()))?;
        }
    }
    Ok(())
}

#[derive(Clone)]
struct SharedFileWriter {
    file: Arc<Mutex<File>>,
}

impl SharedFileWriter {
    fn new(file: File) -> Self {
        Self {
            file: Arc::new(Mutex::new(file)),
        }
    }
}

struct SharedFileGuard {
    file: Arc<Mutex<File>>,
}

impl Write for SharedFileGuard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .file
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?;
        guard.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self
            .file
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?;
        guard.flush()
    }
}

impl<'a> MakeWriter<'a> for SharedFileWriter {
    type Writer = SharedFileGuard;

    fn make_writer(&'a self) -> Self::Writer {
        SharedFileGuard {
            file: Arc::clone(&self.file),
        }
    }
}
