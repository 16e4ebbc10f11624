//! `--check`: validate configuration and CSV without changing anything.
//!
//! Only GET requests are issued (field definitions, media use term). Every
//! problem is collected so a single run reports all of them.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use super::{reserved_columns, uploads_media, FILE_COLUMN, NODE_ID_COLUMN, TITLE_COLUMN};
use crate::config::{Config, Task};
use crate::drupal::DrupalApi;
use crate::logs::{log_info, log_success, LogEntry};
use crate::media::resolve_media_use_tid;
use crate::models::{FieldDefinitions, FieldType};
use crate::parser::ParseResult;
use crate::transform::{split_typed_relation_string, split_values};

/// Longest title Drupal stores.
pub const MAX_TITLE_LENGTH: usize = 255;

static NODE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").expect("valid regex"));

/// A problem found by the check, tied to a CSV line when row-specific.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckIssue {
    pub line: Option<usize>,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    pub errors: Vec<CheckIssue>,
    pub warnings: Vec<CheckIssue>,
}

impl CheckReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, line: Option<usize>, message: impl Into<String>) {
        self.errors.push(CheckIssue {
            line,
            message: message.into(),
        });
    }

    fn warning(&mut self, line: Option<usize>, message: impl Into<String>) {
        self.warnings.push(CheckIssue {
            line,
            message: message.into(),
        });
    }

    /// Log every issue, then a one-line verdict.
    pub fn emit(&self) {
        for issue in &self.warnings {
            with_line(LogEntry::warning(issue.message.clone()), issue.line).emit();
        }
        for issue in &self.errors {
            with_line(LogEntry::error(issue.message.clone()), issue.line).emit();
        }
        if self.is_ok() {
            log_success(format!(
                "Configuration and input data appear to be valid ({} warning(s))",
                self.warnings.len()
            ));
        } else {
            log_info(format!(
                "{} error(s) and {} warning(s) found",
                self.errors.len(),
                self.warnings.len()
            ));
        }
    }
}

fn with_line(entry: LogEntry, line: Option<usize>) -> LogEntry {
    match line {
        Some(line) => entry.at_line(line),
        None => entry,
    }
}

/// Columns a task cannot run without.
pub fn required_columns(config: &Config) -> Vec<&str> {
    match config.task {
        Task::Create => vec![TITLE_COLUMN, config.id_field.as_str(), FILE_COLUMN],
        Task::Update | Task::Delete => vec![NODE_ID_COLUMN],
        Task::AddMedia => vec![NODE_ID_COLUMN, FILE_COLUMN],
    }
}

/// Check `input` against `config` and, for create and update, the content
/// type's field definitions.
pub async fn check_input<A: DrupalApi>(
    api: &A,
    config: &Config,
    input: &ParseResult,
) -> CheckReport {
    let mut report = CheckReport::default();
    let csv_path = config.input_csv_path();

    for column in required_columns(config) {
        if !input.has_column(column) {
            report.error(
                None,
                format!(
                    "Required column '{}' not found in {}",
                    column,
                    csv_path.display()
                ),
            );
        }
    }

    if matches!(config.task, Task::Create | Task::Update) {
        match api.field_definitions(&config.content_type).await {
            Ok(definitions) => check_fields(&mut report, config, input, &definitions),
            Err(e) => report.error(
                None,
                format!(
                    "Could not retrieve field definitions for content type '{}': {}",
                    config.content_type, e
                ),
            ),
        }
    }

    if uploads_media(config, input) {
        if let Err(e) = resolve_media_use_tid(api, &config.media_use_tid).await {
            report.error(None, e.to_string());
        }
    }

    for rejected in &input.rejected {
        report.error(Some(rejected.line), rejected.message.clone());
    }

    check_rows(&mut report, config, input);
    report
}

fn check_fields(
    report: &mut CheckReport,
    config: &Config,
    input: &ParseResult,
    definitions: &FieldDefinitions,
) {
    let reserved = reserved_columns(config);

    for column in &input.headers {
        if !reserved.contains(&column.as_str()) && !definitions.contains_key(column) {
            report.error(
                None,
                format!(
                    "Column '{}' is not a field of content type '{}'",
                    column, config.content_type
                ),
            );
        }
    }

    if config.task == Task::Create {
        let mut required: Vec<_> = definitions
            .values()
            .filter(|d| d.required && !input.has_column(&d.name))
            .collect();
        required.sort_by(|a, b| a.name.cmp(&b.name));
        for definition in required {
            report.error(
                None,
                format!(
                    "Required field '{}' ({}) has no column in the CSV",
                    definition.name, definition.label
                ),
            );
        }
    }

    for row in &input.rows {
        for column in row.columns() {
            let (Some(definition), Some(cell)) = (definitions.get(column), row.non_empty(column))
            else {
                continue;
            };
            let values = split_values(cell, &config.subdelimiter);

            if definition.field_type == FieldType::TypedRelation {
                let (_, malformed) = split_typed_relation_string(
                    cell,
                    &config.subdelimiter,
                    &definition.target_type_or_default(),
                );
                for value in malformed {
                    report.error(
                        Some(row.line),
                        format!(
                            "Value '{}' in field '{}' is not of the form namespace:relation:id",
                            value, column
                        ),
                    );
                }
            }

            if let Some(limit) = definition.cardinality.limit() {
                if values.len() > limit {
                    report.warning(
                        Some(row.line),
                        format!(
                            "Field '{}' takes at most {} value(s) but has {}; extra values will be dropped",
                            column,
                            limit,
                            values.len()
                        ),
                    );
                }
            }
        }
    }
}

fn check_rows(report: &mut CheckReport, config: &Config, input: &ParseResult) {
    let mut seen_ids: HashMap<&str, usize> = HashMap::new();

    for row in &input.rows {
        if config.task == Task::Create {
            match row.non_empty(&config.id_field) {
                Some(id) => {
                    if let Some(&first) = seen_ids.get(id) {
                        report.error(
                            Some(row.line),
                            format!(
                                "Duplicate value '{}' in column '{}' (first seen on line {})",
                                id, config.id_field, first
                            ),
                        );
                    } else {
                        seen_ids.insert(id, row.line);
                    }
                }
                None if input.has_column(&config.id_field) => report.error(
                    Some(row.line),
                    format!("Empty value in column '{}'", config.id_field),
                ),
                None => {}
            }

            match row.non_empty(TITLE_COLUMN) {
                Some(title)
                    if config.validate_title_length
                        && title.chars().count() > MAX_TITLE_LENGTH =>
                {
                    report.error(
                        Some(row.line),
                        format!("Title is longer than {} characters", MAX_TITLE_LENGTH),
                    )
                }
                Some(_) => {}
                None if input.has_column(TITLE_COLUMN) => {
                    report.error(Some(row.line), "Empty title")
                }
                None => {}
            }
        }

        if matches!(config.task, Task::Update | Task::Delete | Task::AddMedia)
            && input.has_column(NODE_ID_COLUMN)
        {
            match row.non_empty(NODE_ID_COLUMN) {
                Some(node_id) if NODE_ID.is_match(node_id) => {}
                Some(node_id) => report.error(
                    Some(row.line),
                    format!("node_id '{}' is not numeric", node_id),
                ),
                None => report.error(Some(row.line), "Empty node_id"),
            }
        }

        if matches!(config.task, Task::Create | Task::AddMedia) && input.has_column(FILE_COLUMN) {
            match row.non_empty(FILE_COLUMN) {
                Some(file) => {
                    let path = config.media_file_path(file);
                    if !path.is_file() {
                        report.error(
                            Some(row.line),
                            format!("File {} does not exist", path.display()),
                        );
                    }
                }
                None if config.task == Task::AddMedia => {
                    report.error(Some(row.line), "Empty file column")
                }
                None => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::drupal::mock::MockDrupal;
    use crate::parser::parse_str;
    use reqwest::Method;
    use serde_json::json;

    const ORIGINAL_FILE: &str = "http://pcdm.org/use#OriginalFile";

    fn api_with_fields() -> MockDrupal {
        MockDrupal::new().with_term_uri(ORIGINAL_FILE, 17).with_remote_fields(
            "islandora_object",
            vec![
                (
                    "field_subject",
                    json!({"required": false, "label": "Subject"}),
                    json!({"type": "entity_reference", "cardinality": 2, "settings": {"target_type": "taxonomy_term"}}),
                ),
                (
                    "field_linked_agent",
                    json!({"required": false, "label": "Contributors"}),
                    json!({"type": "typed_relation", "cardinality": -1, "settings": {"target_type": "taxonomy_term"}}),
                ),
                (
                    "field_model",
                    json!({"required": true, "label": "Model"}),
                    json!({"type": "entity_reference", "cardinality": 1, "settings": {"target_type": "taxonomy_term"}}),
                ),
            ],
        )
    }

    fn messages(issues: &[CheckIssue]) -> Vec<String> {
        issues.iter().map(|i| i.message.clone()).collect()
    }

    #[tokio::test]
    async fn test_valid_create_input() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"x").unwrap();
        let mut config = test_config(Task::Create);
        config.input_dir = dir.path().to_path_buf();
        let input = parse_str(
            "id,title,file,field_model,field_linked_agent\n1,One,a.jpg,3,relators:aut:45\n2,Two,,3,\n",
            b',',
            "|",
        )
        .unwrap();

        let api = api_with_fields();
        let report = check_input(&api, &config, &input).await;
        assert!(report.is_ok(), "{:?}", report.errors);
        assert!(report.warnings.is_empty());
        assert!(api
            .requests()
            .iter()
            .all(|r| r.method == Method::GET));
    }

    #[tokio::test]
    async fn test_create_errors() {
        let config = test_config(Task::Create);
        let long_title = "x".repeat(256);
        let content = format!(
            "id,title,file,field_bogus,field_linked_agent,field_subject\n\
             1,One,,a,aut:45,1|2|3\n\
             1,,,b,,\n\
             2,{},missing.tif,c,,\n",
            long_title
        );
        let input = parse_str(&content, b',', "|").unwrap();

        let report = check_input(&api_with_fields(), &config, &input).await;
        let errors = messages(&report.errors);
        assert!(errors.iter().any(|m| m.contains("'field_bogus'")));
        assert!(errors.iter().any(|m| m.contains("'field_model'")));
        assert!(errors.iter().any(|m| m.contains("Duplicate value '1'")));
        assert!(errors.iter().any(|m| m == "Empty title"));
        assert!(errors.iter().any(|m| m.contains("longer than 255")));
        assert!(errors.iter().any(|m| m.contains("missing.tif")));
        assert!(errors.iter().any(|m| m.contains("'aut:45'")));

        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].line, Some(2));
        assert!(report.warnings[0].message.contains("field_subject"));
    }

    #[tokio::test]
    async fn test_title_length_check_can_be_disabled() {
        let mut config = test_config(Task::Create);
        config.validate_title_length = false;
        let content = format!("id,title,file,field_model\n1,{},,3\n", "y".repeat(300));
        let input = parse_str(&content, b',', "|").unwrap();

        let report = check_input(&api_with_fields(), &config, &input).await;
        assert!(report.is_ok(), "{:?}", report.errors);
    }

    #[tokio::test]
    async fn test_missing_required_columns() {
        let config = test_config(Task::AddMedia);
        let input = parse_str("node_id\n4\n", b',', "|").unwrap();

        let api = MockDrupal::new().with_term_uri(ORIGINAL_FILE, 17);
        let report = check_input(&api, &config, &input).await;
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].message.contains("'file'"));
    }

    #[tokio::test]
    async fn test_node_id_must_be_numeric() {
        let config = test_config(Task::Delete);
        let input = parse_str("node_id\n4\nabc\n5x\n", b',', "|").unwrap();

        let report = check_input(&MockDrupal::new(), &config, &input).await;
        let lines: Vec<_> = report.errors.iter().map(|i| i.line).collect();
        assert_eq!(lines, vec![Some(3), Some(4)]);
    }

    #[tokio::test]
    async fn test_unavailable_field_definitions() {
        let config = test_config(Task::Update);
        let input = parse_str("node_id,field_subject\n4,1\n", b',', "|").unwrap();

        let report = check_input(&MockDrupal::new(), &config, &input).await;
        assert!(!report.is_ok());
        assert!(report.errors[0].message.contains("field definitions"));
    }

    #[tokio::test]
    async fn test_typed_relation_check_matches_mapper() {
        let config = test_config(Task::Update);
        let input = parse_str(
            "node_id,field_linked_agent\n4,relators:aut:abc\n5,aut:45\n",
            b',',
            "|",
        )
        .unwrap();

        let report = check_input(&api_with_fields(), &config, &input).await;
        let lines: Vec<_> = report.errors.iter().map(|i| i.line).collect();
        assert_eq!(lines, vec![Some(3)]);
        assert!(report.errors[0].message.contains("'aut:45'"));
    }

    #[tokio::test]
    async fn test_unreadable_rows_reported() {
        let config = test_config(Task::Delete);
        let input = parse_str("node_id\n4\n5,extra\n6\n", b',', "|").unwrap();

        let report = check_input(&MockDrupal::new(), &config, &input).await;
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].line, Some(3));
        assert!(report.errors[0].message.contains("2 fields"));
    }

    #[tokio::test]
    async fn test_unknown_media_use_uri_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"x").unwrap();
        let mut config = test_config(Task::AddMedia);
        config.input_dir = dir.path().to_path_buf();
        let input = parse_str("node_id,file\n4,a.jpg\n", b',', "|").unwrap();

        let report = check_input(&MockDrupal::new(), &config, &input).await;
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].message.contains(ORIGINAL_FILE));

        config.media_use_tid = "17".into();
        let api = MockDrupal::new();
        let report = check_input(&api, &config, &input).await;
        assert!(report.is_ok(), "{:?}", report.errors);
        assert!(api.requests().is_empty());
    }
}
