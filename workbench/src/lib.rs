//! # Islandora Workbench - CSV batch loading for Drupal/Islandora
//!
//! Workbench reads a CSV file and applies one task to every row against a
//! Drupal site's REST API: create nodes, update them, delete them, or attach
//! media files to them.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  CSV File   │────▶│   Parser    │────▶│ Field Mapper│────▶│ Drupal REST │
//! │  (any enc.) │     │  (auto-enc) │     │ (per field) │     │  (JSON/PUT) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use workbench::{parse_csv_file, run_task, Config, DrupalClient};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::load("create.yml").unwrap();
//!     let client = DrupalClient::new(&config).unwrap();
//!     let input = parse_csv_file(config.input_csv_path(), config.delimiter_byte(), &config.subdelimiter).unwrap();
//!     let summary = run_task(&client, &config, input).await.unwrap();
//!     println!("{}", summary);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`config`] - YAML task configuration
//! - [`models`] - Field definitions, field values, node payloads
//! - [`parser`] - CSV parsing with encoding detection
//! - [`transform`] - Field mapping and preprocessors
//! - [`drupal`] - REST API access
//! - [`media`] - Media type detection and upload
//! - [`tasks`] - Create, update, delete, add_media and `--check`
//! - [`logging`] / [`logs`] - Log file and console progress

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Field mapping
pub mod transform;

// Drupal
pub mod drupal;
pub mod media;

// Tasks
pub mod tasks;

// Logging
pub mod logging;
pub mod logs;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ApiError, ConfigError, CsvError, MediaError, PreprocessError, RowError, WorkbenchError,
    WorkbenchResult,
};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{Config, LogFileMode, LogFormat, Preprocessor, Task};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    Cardinality, FieldDefinition, FieldDefinitions, FieldPayload, FieldType, FieldValue,
    NodePayload, TargetType,
};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{detect_encoding, parse_bytes, parse_csv_file, CsvRow, ParseResult, RejectedRow};

// =============================================================================
// Re-exports - Field Mapper
// =============================================================================

pub use transform::{map_field, map_row, CardinalityClass, MappedField, MappingWarning};

// =============================================================================
// Re-exports - Drupal
// =============================================================================

pub use drupal::{ApiRequest, ApiResponse, DrupalApi, DrupalClient};
pub use media::{resolve_media_use_tid, upload_media, MediaType};

// =============================================================================
// Re-exports - Tasks
// =============================================================================

pub use tasks::{check_input, run_task, CheckReport, TaskSummary};
