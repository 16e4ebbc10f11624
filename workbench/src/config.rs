//! Run configuration.
//!
//! A YAML file names the task, the Drupal host and credentials, and where the
//! input CSV lives. It is loaded once at start-up into a [`Config`] that every
//! driver receives by reference.
//!
//! ```yaml
//! task: create
//! host: "http://localhost:8000"
//! username: admin
//! password: islandora
//! input_dir: input_data
//! input_csv: metadata.csv
//! media_use_tid: 17
//! preprocessors:
//!   - field_subject: /usr/local/bin/lookup_terms
//! ```
//!
//! When `password` is absent it is read from `ISLANDORA_PASSWORD`
//! (a `.env` file in the working directory is loaded first).

use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ConfigResult};

/// Environment variable consulted when the YAML has no `password`.
pub const PASSWORD_ENV_VAR: &str = "ISLANDORA_PASSWORD";

/// Name of the file listing nodes created by a `create` run.
pub const ROLLBACK_CSV: &str = "rollback.csv";

/// The operation a run performs on every CSV row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    Create,
    Update,
    Delete,
    AddMedia,
}

impl Task {
    pub fn as_str(&self) -> &'static str {
        match self {
            Task::Create => "create",
            Task::Update => "update",
            Task::Delete => "delete",
            Task::AddMedia => "add_media",
        }
    }
}

/// How the log file is opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum LogFileMode {
    #[default]
    #[serde(rename = "append", alias = "a")]
    Append,
    #[serde(rename = "write", alias = "w")]
    Truncate,
}

/// Log file line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// An external command that rewrites one column before mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preprocessor {
    pub field: String,
    pub command: String,
}

/// Everything a run needs, loaded from YAML.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub task: Task,
    pub host: String,
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,

    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,
    #[serde(default = "default_input_csv")]
    pub input_csv: PathBuf,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default = "default_subdelimiter")]
    pub subdelimiter: String,

    #[serde(default = "default_content_type")]
    pub content_type: String,
    #[serde(default = "default_media_use_tid", deserialize_with = "string_or_number")]
    pub media_use_tid: String,
    #[serde(default = "default_drupal_filesystem")]
    pub drupal_filesystem: String,
    #[serde(default = "default_id_field")]
    pub id_field: String,
    #[serde(default = "default_true")]
    pub published: bool,
    #[serde(default = "default_true")]
    pub validate_title_length: bool,

    #[serde(default = "default_log_file_path")]
    pub log_file_path: PathBuf,
    #[serde(default)]
    pub log_file_mode: LogFileMode,
    #[serde(default)]
    pub log_format: LogFormat,

    #[serde(default)]
    preprocessors: Vec<BTreeMap<String, String>>,
}

fn default_input_dir() -> PathBuf {
    PathBuf::from("input_data")
}

fn default_input_csv() -> PathBuf {
    PathBuf::from("metadata.csv")
}

fn default_delimiter() -> char {
    ','
}

fn default_subdelimiter() -> String {
    "|".to_string()
}

fn default_content_type() -> String {
    "islandora_object".to_string()
}

fn default_media_use_tid() -> String {
    "http://pcdm.org/use#OriginalFile".to_string()
}

fn default_drupal_filesystem() -> String {
    "fedora://".to_string()
}

fn default_id_field() -> String {
    "id".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_file_path() -> PathBuf {
    PathBuf::from("workbench.log")
}

/// Term ids are usually written as bare numbers in YAML.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

impl Config {
    /// Read, parse and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from a YAML string.
    pub fn from_yaml(content: &str) -> ConfigResult<Self> {
        let mut config: Config = serde_yaml::from_str(content)?;
        if config.password.is_none() {
            config.password = env::var(PASSWORD_ENV_VAR).ok();
        }
        config.validate()?;
        Ok(config)
    }

    fn validate(&mut self) -> ConfigResult<()> {
        self.host = self.host.trim().trim_end_matches('/').to_string();
        if self.host.is_empty() {
            return Err(ConfigError::MissingKey("host"));
        }
        if !(self.host.starts_with("http://") || self.host.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                key: "host",
                message: format!("'{}' must start with http:// or https://", self.host),
            });
        }
        if self.username.trim().is_empty() {
            return Err(ConfigError::MissingKey("username"));
        }
        if self.password.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::MissingKey("password"));
        }

        if !self.delimiter.is_ascii() || self.delimiter == '"' || self.delimiter == '\n' {
            return Err(ConfigError::InvalidValue {
                key: "delimiter",
                message: format!("'{}' cannot be used as a CSV delimiter", self.delimiter),
            });
        }
        if self.subdelimiter.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "subdelimiter",
                message: "must not be empty".to_string(),
            });
        }
        if self.subdelimiter == self.delimiter.to_string() {
            return Err(ConfigError::InvalidValue {
                key: "subdelimiter",
                message: "must differ from delimiter".to_string(),
            });
        }

        if self.content_type.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "content_type",
                message: "must not be empty".to_string(),
            });
        }
        if self.id_field.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "id_field",
                message: "must not be empty".to_string(),
            });
        }

        for entry in &self.preprocessors {
            if entry.len() != 1 {
                return Err(ConfigError::InvalidValue {
                    key: "preprocessors",
                    message: "each entry must map one field name to one command".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Path of the input CSV (`input_csv` relative to `input_dir`).
    pub fn input_csv_path(&self) -> PathBuf {
        self.input_dir.join(&self.input_csv)
    }

    /// Path of a media file named in the CSV.
    pub fn media_file_path(&self, file: &str) -> PathBuf {
        self.input_dir.join(file)
    }

    /// Where a `create` run records the nodes it made.
    pub fn rollback_csv_path(&self) -> PathBuf {
        self.input_dir.join(ROLLBACK_CSV)
    }

    /// The delimiter as the byte the CSV reader expects.
    pub fn delimiter_byte(&self) -> u8 {
        // validate() guarantees an ASCII delimiter
        self.delimiter as u8
    }

    pub fn password(&self) -> &str {
        self.password.as_deref().unwrap_or_default()
    }

    /// Configured preprocessors, in file order.
    pub fn preprocessors(&self) -> Vec<Preprocessor> {
        self.preprocessors
            .iter()
            .flat_map(|entry| {
                entry.iter().map(|(field, command)| Preprocessor {
                    field: field.clone(),
                    command: command.clone(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
pub(crate) fn test_config(task: Task) -> Config {
    Config::from_yaml(&format!(
        "task: {}\nhost: http://localhost:8000/\nusername: admin\npassword: secret\n",
        task.as_str()
    ))
    .expect("test config")
}
