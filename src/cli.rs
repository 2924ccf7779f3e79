use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::application::{initialize, Application, InitOptions};
use crate::expressions::Expression;
use crate::session::{self, format_durations, format_millis, format_operators, format_snapshot};
use crate::types::ExpressionStatus;

#[derive(Parser)]
#[command(name = "calcflow")]
#[command(about = "Calcflow - concurrent arithmetic evaluation with simulated operator costs", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate one or more expressions concurrently
    Eval {
        /// Expressions to evaluate
        #[arg(required = true)]
        expressions: Vec<String>,

        /// Identifier for each expression, in order (random when omitted)
        #[arg(long = "id")]
        ids: Vec<String>,

        /// Operator duration override, e.g. `*=250` or `division=0`
        #[arg(long = "set", value_parser = parse_override)]
        overrides: Vec<(String, String)>,

        /// Print the in-flight operators while waiting
        #[arg(long)]
        progress: bool,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Estimate how long an expression would take
    Estimate {
        /// Expression to estimate
        expression: String,
    },

    /// Show the configured operator durations
    Ops {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the effective configuration as TOML
    Config,

    /// Interactive session reading commands from stdin
    Session,
}

/// Run the CLI by parsing process arguments
pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli).await
}

/// Run the CLI with provided arguments
pub async fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli).await
}

/// Internal function that handles CLI commands
async fn run_cli_with_args(cli: Cli) -> Result<()> {
    // Load and validate configuration before executing any command
    let app = initialize(InitOptions {
        config_path: cli.config,
        ..Default::default()
    })?;

    init_tracing(&app.config.logging.level);

    match cli.command {
        Commands::Eval {
            expressions,
            ids,
            overrides,
            progress,
            json,
        } => {
            app.operator_service
                .reconfigure_millis(&overrides[..])
                .context("Invalid --set value")?;

            eval(&app, expressions, ids, progress, json).await?;
        }

        Commands::Estimate { expression } => {
            let estimate = app.operator_service.estimate(&expression)?;
            println!("{}", format_millis(estimate));
        }

        Commands::Ops { json } => {
            let durations = app.operator_service.durations();
            if json {
                let table: serde_json::Map<String, serde_json::Value> = durations
                    .iter()
                    .map(|(op, d)| (op.symbol().to_string(), (d.as_millis() as u64).into()))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&table)?);
            } else {
                println!("{}", format_durations(&durations));
            }
        }

        Commands::Config => {
            print!("{}", app.config.to_toml()?);
        }

        Commands::Session => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let mut stdout = tokio::io::stdout();
            session::run_session(&app, stdin, &mut stdout).await?;
            app.expression_service.wait_idle().await;
        }
    }

    Ok(())
}

async fn eval(
    app: &Application,
    expressions: Vec<String>,
    ids: Vec<String>,
    progress: bool,
    json: bool,
) -> Result<()> {
    let mut rejected = 0;
    let mut submitted: Vec<Arc<Expression>> = Vec::new();

    for (index, raw) in expressions.iter().enumerate() {
        let id = ids
            .get(index)
            .cloned()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        match app.expression_service.submit(id.as_str(), raw).await {
            Ok(expression) => submitted.push(expression),
            Err(e) => {
                rejected += 1;
                eprintln!("{id} rejected {raw}: {e}");
            }
        }
    }

    let mut interval = tokio::time::interval(app.config.evaluation.poll_interval());
    loop {
        interval.tick().await;

        let pending = submitted
            .iter()
            .filter(|expression| expression.outcome().is_pending())
            .count();
        if pending == 0 {
            break;
        }

        if progress {
            let in_flight = app.operator_service.in_flight();
            eprintln!("{pending} pending, in flight: [{}]", format_operators(&in_flight));
        }
    }

    let snapshots: Vec<_> = submitted.iter().map(|e| e.snapshot()).collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&snapshots)?);
    } else {
        for snapshot in &snapshots {
            println!("{}", format_snapshot(snapshot));
        }
    }

    app.expression_service.wait_idle().await;

    let failed = snapshots
        .iter()
        .filter(|s| s.status == ExpressionStatus::Failed)
        .count();
    if failed + rejected > 0 {
        bail!("{failed} expression(s) failed, {rejected} rejected");
    }

    Ok(())
}

/// `OP=MS`, as accepted by `--set`
fn parse_override(text: &str) -> Result<(String, String), String> {
    text.split_once('=')
        .map(|(op, ms)| (op.trim().to_string(), ms.trim().to_string()))
        .ok_or_else(|| format!("expected OP=MS, got '{text}'"))
}

/// Logs go to stderr; `RUST_LOG` overrides the configured level
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // A subscriber may already be installed when run_cli_from_args is called twice
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
