use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use covcheck::config::{Config, Settings};
use covcheck::validate;

/// covcheck — Validate XML coverage reports against line/branch thresholds.
#[derive(Parser)]
#[command(name = "covcheck", version, about)]
struct Cli {
    /// Path to the XML coverage file.
    coverage_file: PathBuf,

    /// Line coverage percentage threshold.
    #[arg(long)]
    line: Option<f64>,

    /// Branch coverage percentage threshold.
    #[arg(long)]
    branch: Option<f64>,

    /// Path to a file where the serialized coverage tree is saved as JSON.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Do not print passing coverage results.
    #[arg(long)]
    silent: bool,

    /// Path to a TOML config file with a [tool.covcheck] section.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Name of a coverage group from the config file.
    #[arg(long)]
    group: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => fail_with_error("One or more quality checks failed."),
        Err(err) => fail_with_error(&format!("{:#}", err)),
    }
}

/// Run validation, printing check results. Returns whether all checks passed.
fn run(cli: Cli) -> Result<bool> {
    let overrides = Settings {
        line: cli.line,
        branch: cli.branch,
        output: cli.output,
        silent: cli.silent.then_some(true),
    };

    let config = Config::create(
        cli.coverage_file,
        cli.config.as_deref(),
        cli.group.as_deref(),
        &overrides,
    )
    .context("Failed to load config")?;

    let validation = validate::validate_coverage(&config)
        .with_context(|| format!("Failed to validate {}", config.coverage_file.display()))?;

    for check in &validation.checks {
        if check.passed() {
            if !config.silent {
                println!("{}", check.message());
            }
        } else {
            eprintln!("{}", check.message().red().bold());
        }
    }

    Ok(validation.passed())
}

fn fail_with_error(message: &str) -> ExitCode {
    eprintln!("{}", message.red().bold());
    ExitCode::FAILURE
}
