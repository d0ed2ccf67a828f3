//! Validation settings, layered from a TOML config file and CLI arguments.
//! CLI values always win over file values.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{CovcheckError, Result};

/// Resolved settings for a single validation run.
#[derive(Debug, Clone)]
pub struct Config {
    pub coverage_file: PathBuf,
    /// Line coverage threshold, in percent.
    pub line: Option<f64>,
    /// Branch coverage threshold, in percent.
    pub branch: Option<f64>,
    /// Where to write the serialized coverage tree as JSON.
    pub output: Option<PathBuf>,
    /// Suppress passing-check output.
    pub silent: bool,
}

/// A partial set of settings. Used both for the `[tool.covcheck]` file
/// section and for CLI overrides; `None` means "not specified here".
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub line: Option<f64>,
    pub branch: Option<f64>,
    pub output: Option<PathBuf>,
    pub silent: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    tool: Option<ToolSection>,
}

#[derive(Debug, Deserialize)]
struct ToolSection {
    covcheck: Option<CovcheckSection>,
}

#[derive(Debug, Deserialize)]
struct CovcheckSection {
    #[serde(flatten)]
    settings: Settings,
    group: Option<HashMap<String, Group>>,
}

#[derive(Debug, Deserialize)]
struct Group {
    coverage: Option<Settings>,
}

impl Config {
    /// Resolve a config from an optional TOML file plus CLI overrides.
    ///
    /// When a group name is given, the file's `[tool.covcheck.group.<name>]`
    /// table must exist and only its `coverage` sub-table is applied; without
    /// a group, the top-level `[tool.covcheck]` values apply.
    pub fn create(
        coverage_file: impl Into<PathBuf>,
        config_file: Option<&Path>,
        group: Option<&str>,
        overrides: &Settings,
    ) -> Result<Config> {
        let mut config = Config {
            coverage_file: coverage_file.into(),
            line: None,
            branch: None,
            output: None,
            silent: false,
        };

        if let Some(path) = config_file {
            let text = std::fs::read_to_string(path)?;
            let file: ConfigFile = toml::from_str(&text)?;
            if let Some(section) = file.tool.and_then(|t| t.covcheck) {
                config.apply_section(&section, group)?;
            }
        }

        config.apply(overrides);
        Ok(config)
    }

    fn apply_section(&mut self, section: &CovcheckSection, group: Option<&str>) -> Result<()> {
        match group {
            Some(name) => {
                let selected = section
                    .group
                    .as_ref()
                    .and_then(|groups| groups.get(name))
                    .ok_or_else(|| CovcheckError::GroupNotFound(name.to_string()))?;
                if let Some(settings) = &selected.coverage {
                    self.apply(settings);
                }
            }
            None => self.apply(&section.settings),
        }
        Ok(())
    }

    fn apply(&mut self, settings: &Settings) {
        if let Some(line) = settings.line {
            self.line = Some(line);
        }
        if let Some(branch) = settings.branch {
            self.branch = Some(branch);
        }
        if let Some(output) = &settings.output {
            self.output = Some(output.clone());
        }
        if let Some(silent) = settings.silent {
            self.silent = silent;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const EXAMPLE_CONFIG: &str = "\
[tool.covcheck]
line = 2.0
branch = 3.0
silent = true
";

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pyproject.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_create_cli_only() {
        let overrides = Settings {
            line: Some(4.0),
            branch: Some(5.0),
            silent: Some(true),
            ..Settings::default()
        };
        let config = Config::create("coverage.xml", None, None, &overrides).unwrap();
        assert_eq!(config.line, Some(4.0));
        assert_eq!(config.branch, Some(5.0));
        assert!(config.silent);
        assert!(config.output.is_none());
    }

    #[test]
    fn test_create_from_file() {
        let (_dir, path) = write_config(EXAMPLE_CONFIG);
        let config =
            Config::create("coverage.xml", Some(&path), None, &Settings::default()).unwrap();
        assert_eq!(config.line, Some(2.0));
        assert_eq!(config.branch, Some(3.0));
        assert!(config.silent);
    }

    #[test]
    fn test_cli_overrides_file() {
        let (_dir, path) = write_config(EXAMPLE_CONFIG);
        let overrides = Settings {
            line: Some(4.0),
            branch: Some(5.0),
            silent: Some(true),
            ..Settings::default()
        };
        let config = Config::create("coverage.xml", Some(&path), None, &overrides).unwrap();
        assert_eq!(config.line, Some(4.0));
        assert_eq!(config.branch, Some(5.0));
        assert!(config.silent);
    }

    #[test]
    fn test_group_selection() {
        let content = "\
[tool.covcheck]
line = 90.0

[tool.covcheck.group.unit.coverage]
line = 75.0
branch = 60.0

[tool.covcheck.group.integration.coverage]
line = 50.0
";
        let (_dir, path) = write_config(content);

        let config =
            Config::create("coverage.xml", Some(&path), Some("unit"), &Settings::default())
                .unwrap();
        // Group values apply instead of the top-level ones.
        assert_eq!(config.line, Some(75.0));
        assert_eq!(config.branch, Some(60.0));

        let config = Config::create(
            "coverage.xml",
            Some(&path),
            Some("integration"),
            &Settings::default(),
        )
        .unwrap();
        assert_eq!(config.line, Some(50.0));
        assert_eq!(config.branch, None);
    }

    #[test]
    fn test_group_not_found() {
        let (_dir, path) = write_config(EXAMPLE_CONFIG);
        let err = Config::create(
            "coverage.xml",
            Some(&path),
            Some("missing"),
            &Settings::default(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Group 'missing' not found in config");
    }

    #[test]
    fn test_invalid_toml() {
        let (_dir, path) = write_config("not [ valid toml");
        let err =
            Config::create("coverage.xml", Some(&path), None, &Settings::default()).unwrap_err();
        assert!(matches!(err, CovcheckError::Toml(_)));
    }

    #[test]
    fn test_unrelated_file_sections_ignored() {
        let (_dir, path) = write_config("[tool.other]\nkey = 1\n");
        let config =
            Config::create("coverage.xml", Some(&path), None, &Settings::default()).unwrap();
        assert_eq!(config.line, None);
        assert_eq!(config.branch, None);
        assert!(!config.silent);
    }
}
