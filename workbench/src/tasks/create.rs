//! Create task: one new node per row, optionally with a media file.

use reqwest::Method;
use serde_json::Value;
use std::path::Path;

use super::{
    report_warnings, reserved_columns, CreatedNode, RowOutcome, FILE_COLUMN, NODE_ID_COLUMN,
    TITLE_COLUMN,
};
use crate::config::Config;
use crate::drupal::{ApiRequest, ApiResponse, DrupalApi};
use crate::error::{ApiError, RowError, WorkbenchError, WorkbenchResult};
use crate::logs::LogEntry;
use crate::media::upload_media;
use crate::models::{FieldDefinitions, NodePayload};
use crate::parser::CsvRow;
use crate::transform::map_row;

/// Create the node described by `row`.
///
/// A failed media upload is reported but does not undo the node.
pub async fn create_node<A: DrupalApi>(
    api: &A,
    config: &Config,
    definitions: &FieldDefinitions,
    row: &CsvRow,
) -> Result<RowOutcome, RowError> {
    let title = row
        .non_empty(TITLE_COLUMN)
        .ok_or_else(|| RowError::MissingValue(TITLE_COLUMN.to_string()))?;
    let record_id = row.get(&config.id_field).unwrap_or_default().to_string();

    let reserved = reserved_columns(config);
    let (fields, warnings) = map_row(row, definitions, None, &config.subdelimiter, &reserved);
    report_warnings(row.line, &warnings);

    let mut payload = NodePayload::for_create(&config.content_type, title, config.published);
    payload.fields = fields;
    let body = serde_json::to_value(&payload).map_err(ApiError::from)?;

    let request = ApiRequest::new(Method::POST, ["node"]).json(body);
    let response = api
        .issue_request(request.clone())
        .await?
        .expect_status(&request, &[201])?;

    let node_id = created_node_id(&response).ok_or_else(|| {
        RowError::MissingNodeId(format!("no Location header or nid for '{}'", title))
    })?;
    let url = format!("{}/node/{}", config.host, node_id);
    LogEntry::success(format!(
        "Node for '{}' (record {}) created at {}",
        title, record_id, url
    ))
    .at_line(row.line)
    .emit();

    if let Some(file) = row.non_empty(FILE_COLUMN) {
        match upload_media(api, config, &node_id, file).await {
            Ok(media_type) => LogEntry::success(format!("{} media for {} created", media_type, file))
                .at_line(row.line)
                .with_indent(1)
                .emit(),
            Err(e) => LogEntry::warning(format!(
                "Node {} created but media for {} was not: {}",
                node_id, file, e
            ))
            .at_line(row.line)
            .with_indent(1)
            .emit(),
        }
    }

    Ok(RowOutcome::Created(CreatedNode {
        record_id,
        node_id,
        url,
    }))
}

/// Id of a just-created node: last segment of the `Location` header, or the
/// `nid` in the response body.
pub fn created_node_id(response: &ApiResponse) -> Option<String> {
    let from_location = response.header("location").and_then(|location| {
        let path = location.split(['?', '#']).next().unwrap_or_default();
        path.trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()))
            .map(str::to_string)
    });
    from_location.or_else(|| {
        let body = response.json().ok()?;
        match body.pointer("/nid/0/value")? {
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    })
}

/// Write the ids of created nodes, one per line under a `node_id` header.
pub fn write_rollback_csv(path: &Path, created: &[CreatedNode]) -> WorkbenchResult<()> {
    let output_error = |message: String| WorkbenchError::Output {
        path: path.to_path_buf(),
        message,
    };

    let mut writer = csv::Writer::from_path(path).map_err(|e| output_error(e.to_string()))?;
    writer
        .write_record([NODE_ID_COLUMN])
        .map_err(|e| output_error(e.to_string()))?;
    for node in created {
        writer
            .write_record([node.node_id.as_str()])
            .map_err(|e| output_error(e.to_string()))?;
    }
    writer.flush().map_err(|e| output_error(e.to_string()))?;
    Ok(())
}
