//! Task drivers.
//!
//! A run applies one task to every CSV row, strictly in order. A row that
//! fails is logged and skipped; the run always continues with the next row.
//!
//! ```text
//! ┌─────────┐    ┌──────────────┐    ┌────────────┐    ┌──────────────┐
//! │ CSV row │───▶│ preprocessors│───▶│   driver   │───▶│ Drupal REST  │
//! └─────────┘    └──────────────┘    │ (map_row)  │    └──────────────┘
//!                                    └────────────┘
//! ```

pub mod add_media;
pub mod check;
pub mod create;
pub mod delete;
pub mod update;

use std::collections::BTreeMap;
use std::fmt;

use crate::config::{Config, Task};
use crate::drupal::DrupalApi;
use crate::error::{RowError, WorkbenchResult};
use crate::logs::{log_info, LogEntry};
use crate::media::resolve_media_use_tid;
use crate::models::FieldDefinitions;
use crate::parser::ParseResult;
use crate::transform::{apply_preprocessors, MappingWarning};

pub use check::{check_input, CheckReport};

/// CSV column holding the target node of update, delete and add_media rows.
pub const NODE_ID_COLUMN: &str = "node_id";
/// CSV column holding the node title on create.
pub const TITLE_COLUMN: &str = "title";
/// CSV column naming a media file relative to `input_dir`.
pub const FILE_COLUMN: &str = "file";

/// Columns that are never mapped to fields.
pub fn reserved_columns(config: &Config) -> Vec<&str> {
    vec![
        config.id_field.as_str(),
        TITLE_COLUMN,
        FILE_COLUMN,
        NODE_ID_COLUMN,
    ]
}

/// A node made by the create task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedNode {
    /// Value of the configured id column.
    pub record_id: String,
    pub node_id: String,
    pub url: String,
}

/// What happened to a row that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Completed,
    Created(CreatedNode),
    Skipped(String),
}

/// Counts for a whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSummary {
    pub task: Task,
    pub processed: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Nodes made by a create run, in CSV order.
    pub created: Vec<CreatedNode>,
}

impl TaskSummary {
    pub fn new(task: Task) -> Self {
        Self {
            task,
            processed: 0,
            succeeded: 0,
            skipped: 0,
            failed: 0,
            created: Vec::new(),
        }
    }

    /// Id-field value → URL of the node made for it.
    pub fn id_map(&self) -> BTreeMap<&str, &str> {
        self.created
            .iter()
            .map(|n| (n.record_id.as_str(), n.url.as_str()))
            .collect()
    }

    /// Count a row result, logging skips and failures.
    pub fn record(&mut self, line: usize, result: Result<RowOutcome, RowError>) {
        self.processed += 1;
        match result {
            Ok(RowOutcome::Completed) => self.succeeded += 1,
            Ok(RowOutcome::Created(node)) => {
                self.succeeded += 1;
                self.created.push(node);
            }
            Ok(RowOutcome::Skipped(reason)) => {
                self.skipped += 1;
                LogEntry::info(reason).at_line(line).emit();
            }
            Err(e @ (RowError::NodeUnreachable(_) | RowError::MissingValue(_))) => {
                self.skipped += 1;
                LogEntry::warning(format!("{}; skipping row", e))
                    .at_line(line)
                    .emit();
            }
            Err(e) => {
                self.failed += 1;
                LogEntry::error(e.to_string()).at_line(line).emit();
            }
        }
    }
}

impl fmt::Display for TaskSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Task {}: {} rows processed, {} succeeded, {} skipped, {} failed",
            self.task.as_str(),
            self.processed,
            self.succeeded,
            self.skipped,
            self.failed
        )
    }
}

/// Log mapping warnings for a row.
pub(crate) fn report_warnings(line: usize, warnings: &[MappingWarning]) {
    for warning in warnings {
        LogEntry::warning(warning.to_string()).at_line(line).emit();
    }
}

/// Whether the run will upload any media.
pub(crate) fn uploads_media(config: &Config, input: &ParseResult) -> bool {
    match config.task {
        Task::AddMedia => true,
        Task::Create => input.rows.iter().any(|r| r.non_empty(FILE_COLUMN).is_some()),
        Task::Update | Task::Delete => false,
    }
}

/// Run the configured task over every row.
///
/// Only failures that affect the whole run are returned as errors: field
/// definitions that cannot be fetched, a media use URI with no term, or a
/// rollback file that cannot be written.
pub async fn run_task<A: DrupalApi>(
    api: &A,
    config: &Config,
    input: ParseResult,
) -> WorkbenchResult<TaskSummary> {
    let mut config = config.clone();
    if uploads_media(&config, &input) {
        config.media_use_tid = resolve_media_use_tid(api, &config.media_use_tid).await?;
    }
    let config = &config;

    let definitions = match config.task {
        Task::Create | Task::Update => {
            log_info(format!(
                "Fetching field definitions for content type '{}'...",
                config.content_type
            ));
            api.field_definitions(&config.content_type).await?
        }
        Task::Delete | Task::AddMedia => FieldDefinitions::new(),
    };

    let preprocessors = config.preprocessors();
    let mut summary = TaskSummary::new(config.task);
    log_info(format!(
        "Starting {} task on {} rows",
        config.task.as_str(),
        input.rows.len() + input.rejected.len()
    ));

    for rejected in input.rejected {
        summary.record(rejected.line, Err(RowError::Unreadable(rejected.message)));
    }

    for mut row in input.rows {
        apply_preprocessors(&mut row, &preprocessors, &config.subdelimiter).await;

        let result = match config.task {
            Task::Create => create::create_node(api, config, &definitions, &row).await,
            Task::Update => update::update_node(api, config, &definitions, &row).await,
            Task::Delete => delete::delete_node(api, &row).await,
            Task::AddMedia => add_media::add_media(api, config, &row).await,
        };
        summary.record(row.line, result);
    }

    if config.task == Task::Create && !summary.created.is_empty() {
        let path = config.rollback_csv_path();
        create::write_rollback_csv(&path, &summary.created)?;
        log_info(format!(
            "Ids of created nodes written to {}",
            path.display()
        ));
    }

    log_info(summary.to_string());
    Ok(summary)
}
