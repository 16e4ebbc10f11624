//! Error types for the Workbench task runner.
//!
//! - [`ConfigError`] - configuration file loading and validation
//! - [`CsvError`] - input CSV reading and parsing
//! - [`ApiError`] - Drupal REST API calls
//! - [`MediaError`] - media file upload
//! - [`PreprocessError`] - external preprocessor commands
//! - [`RowError`] - per-row failures (logged, never fatal)
//! - [`WorkbenchError`] - top-level errors that end the run
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while loading the YAML configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("Failed to read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid YAML or unknown values.
    #[error("Invalid configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A required key is absent.
    #[error("Missing required configuration key: {0}")]
    MissingKey(&'static str),

    /// A key holds an unusable value.
    #[error("Invalid value for '{key}': {message}")]
    InvalidValue { key: &'static str, message: String },
}

// =============================================================================
// CSV Errors
// =============================================================================

/// Errors while reading the input CSV.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed record.
    #[error("Line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// Header row has a blank or repeated column name.
    #[error("Invalid CSV header: {0}")]
    InvalidHeader(String),
}

// =============================================================================
// Drupal API Errors
// =============================================================================

/// Errors from the Drupal REST API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The configured host is not a usable base URL.
    #[error("Invalid host URL '{0}'")]
    InvalidUrl(String),

    /// Transport-level failure (connection refused, TLS, ...).
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a status we do not accept.
    #[error("{method} {path} returned HTTP {status}")]
    UnexpectedStatus {
        method: String,
        path: String,
        status: u16,
    },

    /// The response body did not have the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// JSON decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Media Errors
// =============================================================================

/// Errors while attaching a media file to a node.
#[derive(Debug, Error)]
pub enum MediaError {
    /// The file named in the CSV does not exist under `input_dir`.
    #[error("File not found: {0}")]
    MissingFile(PathBuf),

    /// The file exists but could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Drupal refused the upload.
    #[error("Media upload for {file} returned HTTP {status}")]
    Rejected { file: String, status: u16 },

    /// `media_use_tid` is a URI no taxonomy term carries.
    #[error("No taxonomy term found for media use URI {0}")]
    UnknownMediaUse(String),

    /// Transport or response error.
    #[error(transparent)]
    Api(#[from] ApiError),
}

// =============================================================================
// Preprocessor Errors
// =============================================================================

/// Errors from an external preprocessor command.
#[derive(Debug, Error)]
pub enum PreprocessError {
    /// The command could not be started.
    #[error("Could not run preprocessor {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The command exited unsuccessfully.
    #[error("Preprocessor {command} exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
}

// =============================================================================
// Row Errors
// =============================================================================

/// Why a single CSV row could not be processed.
///
/// Drivers log these and move on to the next row.
#[derive(Debug, Error)]
pub enum RowError {
    /// The row lacks a value the task needs.
    #[error("Row has no value in column '{0}'")]
    MissingValue(String),

    /// The target node does not answer the existence check.
    #[error("Node {0} not found or not accessible")]
    NodeUnreachable(String),

    /// The created node's id could not be determined.
    #[error("Could not determine id of created node: {0}")]
    MissingNodeId(String),

    /// API failure.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Media failure.
    #[error(transparent)]
    Media(#[from] MediaError),

    /// The record could not be read as a row.
    #[error("Row could not be read: {0}")]
    Unreadable(String),
}

// =============================================================================
// Top-level Errors
// =============================================================================

/// Errors that end the run.
#[derive(Debug, Error)]
pub enum WorkbenchError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// CSV error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// API error outside of row processing (field definitions, client setup).
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Log file could not be opened.
    #[error("Could not open log file {path}: {source}")]
    Logging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The global log subscriber could not be installed.
    #[error("Could not install log subscriber: {0}")]
    Subscriber(String),

    /// Media setup that every upload depends on failed.
    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    /// Writing the rollback CSV failed.
    #[error("Could not write {path}: {message}")]
    Output { path: PathBuf, message: String },

    /// `--check` found problems.
    #[error("Input check found {0} error(s)")]
    CheckFailed(usize),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type for a whole run.
pub type WorkbenchResult<T> = Result<T, WorkbenchError>;
