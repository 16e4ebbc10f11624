//! Add-media task: attach a file to an existing node.

use super::{RowOutcome, FILE_COLUMN, NODE_ID_COLUMN};
use crate::config::Config;
use crate::drupal::DrupalApi;
use crate::error::RowError;
use crate::logs::LogEntry;
use crate::media::upload_media;
use crate::parser::CsvRow;

pub async fn add_media<A: DrupalApi>(
    api: &A,
    config: &Config,
    row: &CsvRow,
) -> Result<RowOutcome, RowError> {
    let node_id = row
        .non_empty(NODE_ID_COLUMN)
        .ok_or_else(|| RowError::MissingValue(NODE_ID_COLUMN.to_string()))?;
    let file = row
        .non_empty(FILE_COLUMN)
        .ok_or_else(|| RowError::MissingValue(FILE_COLUMN.to_string()))?;
    if !api.ping_node(node_id).await {
        return Err(RowError::NodeUnreachable(node_id.to_string()));
    }

    let media_type = upload_media(api, config, node_id, file).await?;
    LogEntry::success(format!(
        "{} media for {} added to node {}",
        media_type, file, node_id
    ))
    .at_line(row.line)
    .emit();
    Ok(RowOutcome::Completed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{test_config, Task};
    use crate::drupal::mock::MockDrupal;
    use crate::error::MediaError;
    use reqwest::Method;
    use serde_json::json;
    use std::collections::HashMap;

    fn row(node_id: &str, file: &str) -> CsvRow {
        CsvRow::new(
            2,
            HashMap::from([
                ("node_id".to_string(), node_id.to_string()),
                ("file".to_string(), file.to_string()),
            ]),
        )
    }

    #[tokio::test]
    async fn test_add_media() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("talk.mp3"), b"ID3").unwrap();
        let mut config = test_config(Task::AddMedia);
        config.input_dir = dir.path().to_path_buf();
        let api = MockDrupal::new().with_node("12", json!({}));

        let outcome = add_media(&api, &config, &row("12", "talk.mp3"))
            .await
            .unwrap();
        assert_eq!(outcome, RowOutcome::Completed);
        let puts = api.requests_with(Method::PUT);
        assert_eq!(puts.len(), 1);
        assert_eq!(puts[0].path[3], "audio");
    }

    #[tokio::test]
    async fn test_unreachable_node() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("talk.mp3"), b"ID3").unwrap();
        let mut config = test_config(Task::AddMedia);
        config.input_dir = dir.path().to_path_buf();
        let api = MockDrupal::new();

        let err = add_media(&api, &config, &row("12", "talk.mp3"))
            .await
            .unwrap_err();
        assert!(matches!(err, RowError::NodeUnreachable(_)));
        assert!(api.requests_with(Method::PUT).is_empty());
    }

    #[tokio::test]
    async fn test_empty_file_cell() {
        let config = test_config(Task::AddMedia);
        let api = MockDrupal::new().with_node("12", json!({}));

        let err = add_media(&api, &config, &row("12", "")).await.unwrap_err();
        assert!(matches!(err, RowError::MissingValue(column) if column == "file"));
        assert!(api.requests().is_empty());
    }

    #[tokio::test]
    async fn test_missing_file() {
        let config = test_config(Task::AddMedia);
        let api = MockDrupal::new().with_node("12", json!({}));

        let err = add_media(&api, &config, &row("12", "gone.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, RowError::Media(MediaError::MissingFile(_))));
    }
}
