//! Delete task.

use reqwest::Method;

use super::{RowOutcome, NODE_ID_COLUMN};
use crate::drupal::{ApiRequest, DrupalApi};
use crate::error::RowError;
use crate::logs::LogEntry;
use crate::parser::CsvRow;

/// Delete the node named in the row's `node_id` column. Media attached to the
/// node are left in place.
pub async fn delete_node<A: DrupalApi>(api: &A, row: &CsvRow) -> Result<RowOutcome, RowError> {
    let node_id = row
        .non_empty(NODE_ID_COLUMN)
        .ok_or_else(|| RowError::MissingValue(NODE_ID_COLUMN.to_string()))?;
    if !api.ping_node(node_id).await {
        return Err(RowError::NodeUnreachable(node_id.to_string()));
    }

    let request = ApiRequest::new(Method::DELETE, ["node", node_id]);
    api.issue_request(request.clone())
        .await?
        .expect_status(&request, &[204])?;

    LogEntry::success(format!("Node {} deleted", node_id))
        .at_line(row.line)
        .emit();
    Ok(RowOutcome::Completed)
}
