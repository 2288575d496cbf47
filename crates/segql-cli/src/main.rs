//! segql - translate SQL row expressions into native filters and virtual columns

use anyhow::Context;
use clap::Parser;
use segql_eval::ExecutionBudget;
use std::path::PathBuf;
use tracing::info;

mod config;
mod logging;
mod plan;

use config::Config;

#[derive(Parser, Debug)]
#[command(name = "segql")]
#[command(version)]
#[command(about = "Translate SQL predicates and projections into a native segment-scan plan")]
#[command(long_about = "Translate SQL predicates and projections into a native segment-scan plan

The row signature and planner settings come from the YAML config file:

  planner:
    force_virtual_columns: false
    virtual_column_prefix: v
  signature:
    - { name: url, type: STRING }
    - { name: hits, type: LONG }

EXAMPLES:
  segql --filter \"REGEXP_LIKE(LOWER(url), '^https://') AND hits >= 10\"
  segql --project \"host=REGEXP_EXTRACT(url, '//([^/]+)', 1)\" --rows rows.json --max-rows 100 --pretty")]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, value_name = "FILE", default_value = "segql.yaml")]
    config: PathBuf,

    /// Boolean expression to push down
    #[arg(short, long, value_name = "EXPR")]
    filter: Option<String>,

    /// Projection as `name=EXPR` or a bare expression; may be repeated
    #[arg(short, long = "project", value_name = "[NAME=]EXPR")]
    projections: Vec<String>,

    /// JSON array of row objects to run the plan against
    #[arg(short, long, value_name = "FILE")]
    rows: Option<PathBuf>,

    /// Fail when the plan selects more than this many rows
    #[arg(long, value_name = "N", requires = "rows")]
    max_rows: Option<usize>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = if cli.config.exists() {
        Config::load(&cli.config).with_context(|| format!("Loading {}", cli.config.display()))?
    } else {
        Config::from_env()?
    };
    config.apply_logging_env();
    logging::init()?;

    info!(
        columns = config.signature.len(),
        force_virtual_columns = config.planner.force_virtual_columns,
        "Configuration loaded"
    );

    let rows: Option<Vec<serde_json::Value>> = match &cli.rows {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Reading rows from {}", path.display()))?;
            Some(serde_json::from_str(&contents).context("Rows file must be a JSON array")?)
        }
        None => None,
    };

    let budget = ExecutionBudget {
        max_rows: cli.max_rows,
    };
    let report = plan::build_report(
        &config,
        cli.filter.as_deref(),
        &cli.projections,
        rows.as_deref(),
        &budget,
    )?;

    let output = if cli.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{output}");
    Ok(())
}
