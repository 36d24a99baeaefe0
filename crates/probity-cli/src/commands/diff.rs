//! Diff command
//!
//! Usage: probity diff <ACTUAL> <EXPECTED> [--epsilon F] [--max-depth N] [--format FORMAT]

use clap::{Args, ValueEnum};
use probity_core::compare::{Comparator, Difference, DEFAULT_MAX_DEPTH};
use probity_core::json::{summarize, JsonComparator};
use probity_core::reporting::render_markdown;
use probity_core::{log_op_end, log_op_start, Configuration, Failure};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One line per difference
    Text,
    /// JSON array of differences
    Json,
    /// Markdown report
    Markdown,
}

#[derive(Debug, Args)]
pub struct DiffArgs {
    /// Actual JSON document
    pub actual: PathBuf,

    /// Expected JSON document
    pub expected: PathBuf,

    /// Relative tolerance for non-integral numbers
    #[arg(long)]
    pub epsilon: Option<f64>,

    /// Maximum nesting depth compared before reporting "too deep"
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Returns `Ok(true)` when the documents are structurally equal.
pub fn execute(args: DiffArgs) -> Result<bool, Box<dyn std::error::Error>> {
    let start = Instant::now();
    log_op_start!("cli_diff");
    let actual = super::read_json(&args.actual)?;
    let expected = super::read_json(&args.expected)?;

    let epsilon = args
        .epsilon
        .unwrap_or_else(|| Configuration::global().tolerance_default);
    let comparator = JsonComparator::new(
        Comparator::new()
            .with_epsilon(epsilon)
            .with_max_depth(args.max_depth),
    );
    let differences = comparator.compare(&actual, &expected);

    log_op_end!(
        "cli_diff",
        duration_ms = start.elapsed().as_millis() as u64,
        diff_count = differences.len()
    );

    let output = match args.format {
        OutputFormat::Text => render_text(&differences),
        OutputFormat::Json => format!("{}\n", serde_json::to_string_pretty(&differences)?),
        OutputFormat::Markdown => {
            let failures = if differences.is_empty() {
                Vec::new()
            } else {
                vec![Failure::from_differences(
                    format!(
                        "{} differs from {} ({} difference(s))",
                        args.actual.display(),
                        args.expected.display(),
                        differences.len()
                    ),
                    summarize(&actual),
                    summarize(&expected),
                    &differences,
                    differences.len(),
                )]
            };
            render_markdown(&failures)
        }
    };
    print!("{}", output);

    Ok(differences.is_empty())
}

fn render_text(differences: &[Difference]) -> String {
    if differences.is_empty() {
        return "No differences.\n".to_string();
    }
    let mut out = String::new();
    for difference in differences {
        out.push_str(&difference.to_string());
        out.push('\n');
    }
    out.push_str(&format!("{} difference(s)\n", differences.len()));
    out
}
