use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Settings file picked up from the working directory when `--config` is absent.
pub const DEFAULT_SETTINGS_FILE: &str = "dbspec.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliSettings {
    pub output: OutputFormat,
    pub log_format: LogFormat,
    pub log_level: String,
    pub deny_warnings: bool,
}

impl Default for CliSettings {
    fn default() -> Self {
        Self {
            output: OutputFormat::Text,
            log_format: LogFormat::Text,
            log_level: "warn".to_string(),
            deny_warnings: false,
        }
    }
}

/// Values given on the command line; `None` keeps the configured value.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub output: Option<OutputFormat>,
    pub log_format: Option<LogFormat>,
    pub log_level: Option<String>,
    pub deny_warnings: bool,
}

impl CliSettings {
    pub fn with_overrides(mut self, overrides: SettingsOverrides) -> Self {
        if let Some(output) = overrides.output {
            self.output = output;
        }
        if let Some(log_format) = overrides.log_format {
            self.log_format = log_format;
        }
        if let Some(log_level) = overrides.log_level {
            self.log_level = log_level;
        }
        self.deny_warnings |= overrides.deny_warnings;
        self
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid settings in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

pub type SettingsResult<T> = std::result::Result<T, SettingsError>;

/// Load settings from an explicit file, or from `dbspec.toml` when present.
///
/// An explicit path must exist; the default file is optional.
pub fn load_settings(explicit: Option<&Path>) -> SettingsResult<CliSettings> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_SETTINGS_FILE);
            if !default.exists() {
                return Ok(CliSettings::default());
            }
            default
        }
    };

    let content = std::fs::read_to_string(&path).map_err(|source| SettingsError::Read {
        path: path.clone(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| SettingsError::Parse { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn settings_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(content.as_bytes()).expect("write settings");
        file
    }

    #[test]
    fn file_values_replace_defaults() {
        let file = settings_file("output = \"json\"\nlog_level = \"debug\"\n");
        let settings = load_settings(Some(file.path())).expect("load settings");
        assert_eq!(settings.output, OutputFormat::Json);
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.log_format, LogFormat::Text);
        assert!(!settings.deny_warnings);
    }

    #[test]
    fn flags_replace_file_values() {
        let file = settings_file("output = \"json\"\nlog_format = \"json\"\n");
        let settings = load_settings(Some(file.path()))
            .expect("load settings")
            .with_overrides(SettingsOverrides {
                output: Some(OutputFormat::Text),
                log_level: Some("info".to_string()),
                deny_warnings: true,
                ..SettingsOverrides::default()
            });
        assert_eq!(settings.output, OutputFormat::Text);
        assert_eq!(settings.log_format, LogFormat::Json);
        assert_eq!(settings.log_level, "info");
        assert!(settings.deny_warnings);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = load_settings(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, SettingsError::Read { .. }));
    }

    #[test]
    fn malformed_file_names_the_path() {
        let file = settings_file("output = \"xml\"\n");
        let err = load_settings(Some(file.path())).unwrap_err();
        assert!(matches!(err, SettingsError::Parse { .. }));
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }
}
