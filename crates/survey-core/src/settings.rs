use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, SurveyError};
use crate::models::AnalysisConfig;

/// Largest accepted `top_n`, from the command line or a config file.
pub const MAX_TOP_N: u32 = 1000;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Descriptive analytics over a membership survey export
#[derive(Parser, Debug, Clone)]
#[command(
    name = "survey-dash",
    about = "Descriptive analytics over a membership survey export",
    version
)]
pub struct Settings {
    /// Survey export (CSV with a header row)
    #[arg(default_value = "survey_data.csv")]
    pub input: PathBuf,

    /// Year that membership tenure is measured against
    #[arg(long, default_value = "2024")]
    pub reference_year: i32,

    /// Number of countries kept in the top-countries table (1-1000)
    #[arg(
        long,
        default_value = "5",
        value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_TOP_N))
    )]
    pub top_n: u32,

    /// JSON file providing `reference_year` and/or `top_n`
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Report output format
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Log file path (logs go to stderr when unset)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

// ── ConfigFile ─────────────────────────────────────────────────────────────────

/// Optional JSON configuration, e.g. `{"reference_year": 2023, "top_n": 3}`.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_n: Option<u32>,
}

impl ConfigFile {
    /// Load and validate a config file. Unlike the CLI defaults, a config
    /// file that was asked for must exist and parse.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| SurveyError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let parsed: ConfigFile = serde_json::from_str(&content)?;
        if let Some(n) = parsed.top_n {
            if !(1..=MAX_TOP_N).contains(&n) {
                return Err(SurveyError::Config(format!(
                    "top_n must be between 1 and {} (got {} in {})",
                    MAX_TOP_N,
                    n,
                    path.display()
                )));
            }
        }
        Ok(parsed)
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse the process arguments and merge an optional config file.
    pub fn load() -> Result<Self> {
        Self::load_from_args(std::env::args_os().collect())
    }

    /// Same as [`load`](Self::load) with an explicit argument list.
    ///
    /// Values from `--config` fill every field that was not given explicitly
    /// on the command line; the CLI always wins.
    pub fn load_from_args(args: Vec<std::ffi::OsString>) -> Result<Self> {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if let Some(path) = settings.config.clone() {
            let file = ConfigFile::load_from(&path)?;
            if !is_arg_explicitly_set(&matches, "reference_year") {
                if let Some(year) = file.reference_year {
                    settings.reference_year = year;
                }
            }
            if !is_arg_explicitly_set(&matches, "top_n") {
                if let Some(n) = file.top_n {
                    settings.top_n = n;
                }
            }
        }

        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }

        Ok(settings)
    }

    /// The pipeline tunables carried by these settings.
    pub fn analysis_config(&self) -> AnalysisConfig {
        AnalysisConfig {
            reference_year: self.reference_year,
            top_n: self.top_n as usize,
        }
    }

    pub fn wants_json(&self) -> bool {
        self.format == "json"
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(tmp: &TempDir, body: &str) -> PathBuf {
        let path = tmp.path().join("survey.json");
        std::fs::write(&path, body).expect("write config");
        path
    }

    fn args(list: &[&str]) -> Vec<std::ffi::OsString> {
        list.iter().map(|s| std::ffi::OsString::from(*s)).collect()
    }

    // ── defaults ──────────────────────────────────────────────────────────────

    #[test]
    fn test_settings_default_values() {
        let settings = Settings::parse_from(["survey-dash"]);

        assert_eq!(settings.input, PathBuf::from("survey_data.csv"));
        assert_eq!(settings.reference_year, 2024);
        assert_eq!(settings.top_n, 5);
        assert!(settings.config.is_none());
        assert_eq!(settings.format, "text");
        assert_eq!(settings.log_level, "INFO");
        assert!(settings.log_file.is_none());
        assert!(!settings.debug);
    }

    #[test]
    fn test_settings_cli_parsing() {
        let settings = Settings::parse_from([
            "survey-dash",
            "export.csv",
            "--reference-year",
            "2030",
            "--top-n",
            "3",
            "--format",
            "json",
        ]);
        assert_eq!(settings.input, PathBuf::from("export.csv"));
        assert_eq!(settings.analysis_config().reference_year, 2030);
        assert_eq!(settings.analysis_config().top_n, 3);
        assert!(settings.wants_json());
    }

    #[test]
    fn test_settings_top_n_zero_rejected() {
        let result = Settings::try_parse_from(["survey-dash", "--top-n", "0"]);
        assert!(result.is_err());
    }

    // ── config file merge ─────────────────────────────────────────────────────

    #[test]
    fn test_config_file_fills_unset_values() {
        let tmp = TempDir::new().expect("tempdir");
        let path = write_config(&tmp, r#"{"reference_year": 2020, "top_n": 3}"#);

        let settings = Settings::load_from_args(args(&[
            "survey-dash",
            "--config",
            path.to_str().unwrap(),
        ]))
        .expect("load");

        assert_eq!(settings.reference_year, 2020);
        assert_eq!(settings.top_n, 3);
    }

    #[test]
    fn test_cli_overrides_config_file() {
        let tmp = TempDir::new().expect("tempdir");
        let path = write_config(&tmp, r#"{"reference_year": 2020, "top_n": 3}"#);

        let settings = Settings::load_from_args(args(&[
            "survey-dash",
            "--config",
            path.to_str().unwrap(),
            "--top-n",
            "10",
        ]))
        .expect("load");

        assert_eq!(settings.reference_year, 2020);
        assert_eq!(settings.top_n, 10);
    }

    #[test]
    fn test_config_file_partial() {
        let tmp = TempDir::new().expect("tempdir");
        let path = write_config(&tmp, r#"{"top_n": 2}"#);
        let file = ConfigFile::load_from(&path).expect("load");
        assert_eq!(
            file,
            ConfigFile {
                reference_year: None,
                top_n: Some(2)
            }
        );
    }

    #[test]
    fn test_config_file_rejects_zero_top_n() {
        let tmp = TempDir::new().expect("tempdir");
        let path = write_config(&tmp, r#"{"top_n": 0}"#);
        let err = ConfigFile::load_from(&path).unwrap_err();
        assert!(matches!(err, SurveyError::Config(_)));
    }

    #[test]
    fn test_config_file_rejects_out_of_range_top_n() {
        let tmp = TempDir::new().expect("tempdir");
        let path = write_config(&tmp, r#"{"top_n": 5000}"#);

        let err = Settings::load_from_args(args(&[
            "survey-dash",
            "--config",
            path.to_str().unwrap(),
        ]))
        .unwrap_err();
        assert!(matches!(err, SurveyError::Config(_)));
    }

    #[test]
    fn test_config_file_accepts_max_top_n() {
        let tmp = TempDir::new().expect("tempdir");
        let path = write_config(&tmp, r#"{"top_n": 1000}"#);
        let file = ConfigFile::load_from(&path).expect("load");
        assert_eq!(file.top_n, Some(MAX_TOP_N));
    }

    #[test]
    fn test_settings_top_n_above_max_rejected() {
        let result = Settings::try_parse_from(["survey-dash", "--top-n", "1001"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_config_file_rejects_unknown_keys() {
        let tmp = TempDir::new().expect("tempdir");
        let path = write_config(&tmp, r#"{"topn": 2}"#);
        let err = ConfigFile::load_from(&path).unwrap_err();
        assert!(matches!(err, SurveyError::JsonParse(_)));
    }

    #[test]
    fn test_config_file_missing_is_error() {
        let tmp = TempDir::new().expect("tempdir");
        let err = ConfigFile::load_from(&tmp.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, SurveyError::FileRead { .. }));
    }

    #[test]
    fn test_debug_overrides_log_level() {
        let settings =
            Settings::load_from_args(args(&["survey-dash", "--debug"])).expect("load");
        assert_eq!(settings.log_level, "DEBUG");
    }
}
