//! Threshold evaluation against a parsed coverage report.
//!
//! This layer returns structured outcomes; printing and exit codes are the
//! binary's concern.

use crate::config::Config;
use crate::error::{CovcheckError, Result};
use crate::model::CoverageResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    Line,
    Branch,
}

impl CheckKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckKind::Line => "line",
            CheckKind::Branch => "branch",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            CheckKind::Line => "Line",
            CheckKind::Branch => "Branch",
        }
    }
}

/// Outcome of a single threshold comparison.
#[derive(Debug, Clone)]
pub struct Check {
    pub kind: CheckKind,
    /// Measured coverage, in percent.
    pub actual: f64,
    /// Configured minimum, in percent.
    pub threshold: f64,
}

impl Check {
    pub fn passed(&self) -> bool {
        self.actual >= self.threshold
    }

    pub fn message(&self) -> String {
        if self.passed() {
            format!("{} coverage passed: {:.2}%", self.kind.label(), self.actual)
        } else {
            format!(
                "{} coverage ({:.2}%) below threshold ({}%)",
                self.kind.label(),
                self.actual,
                self.threshold
            )
        }
    }
}

/// Outcome of a whole validation run.
#[derive(Debug, Default)]
pub struct Validation {
    pub checks: Vec<Check>,
}

impl Validation {
    pub fn passed(&self) -> bool {
        self.checks.iter().all(Check::passed)
    }
}

/// Validate coverage per the config: parse the report, optionally write the
/// serialized tree as JSON, and compare rates against configured thresholds.
pub fn validate_coverage(config: &Config) -> Result<Validation> {
    validate_thresholds(config)?;

    let result = CoverageResult::from_xml_file(&config.coverage_file)?;

    if let Some(path) = &config.output {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, &result.root().serialize())?;
    }

    if config.line.is_none() && config.branch.is_none() && config.output.is_none() {
        return Err(CovcheckError::NothingToCheck);
    }

    let summary = result.summary();
    let mut validation = Validation::default();

    if let Some(threshold) = config.line {
        validation.checks.push(Check {
            kind: CheckKind::Line,
            actual: summary.line_rate() * 100.0,
            threshold,
        });
    }
    if let Some(threshold) = config.branch {
        validation.checks.push(Check {
            kind: CheckKind::Branch,
            actual: summary.branch_rate() * 100.0,
            threshold,
        });
    }

    Ok(validation)
}

/// Thresholds are percentages and must be within [0, 100].
fn validate_thresholds(config: &Config) -> Result<()> {
    for (kind, threshold) in [("line", config.line), ("branch", config.branch)] {
        if let Some(value) = threshold {
            if !(0.0..=100.0).contains(&value) {
                return Err(CovcheckError::InvalidThreshold { kind, value });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config(line: Option<f64>, branch: Option<f64>) -> Config {
        Config {
            coverage_file: PathBuf::from("coverage.xml"),
            line,
            branch,
            output: None,
            silent: false,
        }
    }

    #[test]
    fn test_invalid_threshold() {
        let err = validate_coverage(&config(Some(101.0), Some(100.0))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid threshold for line coverage (101). Must be between 0 and 100"
        );

        let err = validate_coverage(&config(Some(50.0), Some(-1.0))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid threshold for branch coverage (-1). Must be between 0 and 100"
        );
    }

    #[test]
    fn test_check_messages() {
        let check = Check {
            kind: CheckKind::Line,
            actual: 75.624,
            threshold: 100.0,
        };
        assert!(!check.passed());
        assert_eq!(
            check.message(),
            "Line coverage (75.62%) below threshold (100%)"
        );

        let check = Check {
            kind: CheckKind::Branch,
            actual: 50.575,
            threshold: 50.0,
        };
        assert!(check.passed());
        assert_eq!(check.message(), "Branch coverage passed: 50.57%");
    }

    #[test]
    fn test_threshold_boundary_passes() {
        let check = Check {
            kind: CheckKind::Line,
            actual: 80.0,
            threshold: 80.0,
        };
        assert!(check.passed());
    }
}
