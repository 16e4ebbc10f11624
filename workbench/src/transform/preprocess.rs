//! External preprocessor commands.
//!
//! A preprocessor is invoked as `command <subdelimiter> <value>` and its
//! trimmed standard output replaces the cell. A failing command leaves the
//! cell as it was.

use tokio::process::Command;
use tracing::{debug, error};

use crate::config::Preprocessor;
use crate::error::PreprocessError;
use crate::parser::CsvRow;

/// Run one preprocessor on one value.
pub async fn run_preprocessor(
    command: &str,
    subdelimiter: &str,
    value: &str,
) -> Result<String, PreprocessError> {
    let output = Command::new(command)
        .arg(subdelimiter)
        .arg(value)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| PreprocessError::Spawn {
            command: command.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(PreprocessError::Failed {
            command: command.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Apply every configured preprocessor to `row` in place.
///
/// Returns the number of failures; each one is logged.
pub async fn apply_preprocessors(
    row: &mut CsvRow,
    preprocessors: &[Preprocessor],
    subdelimiter: &str,
) -> usize {
    let mut failures = 0;
    for preprocessor in preprocessors {
        let Some(value) = row.non_empty(&preprocessor.field).map(str::to_string) else {
            continue;
        };
        match run_preprocessor(&preprocessor.command, subdelimiter, &value).await {
            Ok(replacement) => {
                debug!(
                    line = row.line,
                    field = %preprocessor.field,
                    "preprocessed value"
                );
                row.set(&preprocessor.field, replacement);
            }
            Err(e) => {
                error!(line = row.line, field = %preprocessor.field, "{}", e);
                failures += 1;
            }
        }
    }
    failures
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    async fn test_successful_preprocessor_replaces_value() {
        let dir = tempfile::tempdir().unwrap();
        let upper = script(dir.path(), "upper.sh", r#"printf '%s\n' "$2" | tr a-z A-Z"#);

        let mut row = CsvRow::from_pairs(2, [("field_note", "quiet|calm")], "|");
        let preprocessors = vec![Preprocessor {
            field: "field_note".into(),
            command: upper.to_string_lossy().into_owned(),
        }];

        let failures = apply_preprocessors(&mut row, &preprocessors, "|").await;
        assert_eq!(failures, 0);
        assert_eq!(row.get("field_note"), Some("QUIET|CALM"));
    }

    #[tokio::test]
    async fn test_failing_preprocessor_keeps_value() {
        let dir = tempfile::tempdir().unwrap();
        let broken = script(dir.path(), "broken.sh", "echo nope >&2\nexit 3");

        let mut row = CsvRow::from_pairs(2, [("field_note", "original")], "|");
        let preprocessors = vec![Preprocessor {
            field: "field_note".into(),
            command: broken.to_string_lossy().into_owned(),
        }];

        let failures = apply_preprocessors(&mut row, &preprocessors, "|").await;
        assert_eq!(failures, 1);
        assert_eq!(row.get("field_note"), Some("original"));

        let err = run_preprocessor(&broken.to_string_lossy(), "|", "x")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[tokio::test]
    async fn test_missing_command_is_spawn_error() {
        let err = run_preprocessor("/nonexistent/preprocessor", "|", "x")
            .await
            .unwrap_err();
        assert!(matches!(err, PreprocessError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_empty_cell_not_preprocessed() {
        let mut row = CsvRow::from_pairs(2, [("field_note", "")], "|");
        let preprocessors = vec![Preprocessor {
            field: "field_note".into(),
            command: "/nonexistent/preprocessor".into(),
        }];
        assert_eq!(apply_preprocessors(&mut row, &preprocessors, "|").await, 0);
    }
}
