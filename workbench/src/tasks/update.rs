//! Update task: merge row values into existing nodes.
//!
//! Titles are never changed. Fields whose cells are empty, or whose values
//! are all already present, are left out of the PATCH body entirely.

use reqwest::Method;

use super::{report_warnings, reserved_columns, RowOutcome, NODE_ID_COLUMN};
use crate::config::Config;
use crate::drupal::{ApiRequest, DrupalApi};
use crate::error::{ApiError, RowError};
use crate::logs::LogEntry;
use crate::models::{FieldDefinitions, NodePayload};
use crate::parser::CsvRow;
use crate::transform::map_row;

pub async fn update_node<A: DrupalApi>(
    api: &A,
    config: &Config,
    definitions: &FieldDefinitions,
    row: &CsvRow,
) -> Result<RowOutcome, RowError> {
    let node_id = row
        .non_empty(NODE_ID_COLUMN)
        .ok_or_else(|| RowError::MissingValue(NODE_ID_COLUMN.to_string()))?;
    if !api.ping_node(node_id).await {
        return Err(RowError::NodeUnreachable(node_id.to_string()));
    }

    let existing = api.node_field_values(node_id, definitions).await?;
    let reserved = reserved_columns(config);
    let (fields, warnings) = map_row(
        row,
        definitions,
        Some(&existing),
        &config.subdelimiter,
        &reserved,
    );
    report_warnings(row.line, &warnings);

    if fields.is_empty() {
        return Ok(RowOutcome::Skipped(format!(
            "Nothing to update on node {}",
            node_id
        )));
    }

    let mut payload = NodePayload::for_update(&config.content_type);
    payload.fields = fields;
    let body = serde_json::to_value(&payload).map_err(ApiError::from)?;

    let request = ApiRequest::new(Method::PATCH, ["node", node_id]).json(body);
    api.issue_request(request.clone())
        .await?
        .expect_status(&request, &[200])?;

    LogEntry::success(format!(
        "Node {}/node/{} updated",
        config.host, node_id
    ))
    .at_line(row.line)
    .emit();
    Ok(RowOutcome::Completed)
}
