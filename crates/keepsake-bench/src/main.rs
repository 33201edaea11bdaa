//! Benchmark keepsake memory strategies against scripted conversations.
//!
//! Reads the API key from the `OPENROUTER_KEY` environment variable. Logs go
//! to stderr and are filtered with `RUST_LOG` (default `info`).
//!
//! # Examples
//!
//! ```sh
//! # Every strategy against every scenario, four jobs at a time
//! keepsake-bench run --scenarios scenarios/
//!
//! # Resume an interrupted run: recorded pairs are skipped
//! keepsake-bench run --scenarios scenarios/ --output results.json
//!
//! # Structured engine only, cheaper delegation model
//! keepsake-bench run --scenarios scenarios/ --strategy structured \
//!   --delegation-model anthropic/claude-3.5-haiku
//!
//! # Parse a saved model reply and print the resulting store
//! keepsake-bench parse reply.txt
//! ```

use std::io::Read;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use keepsake::api::{DEFAULT_MODEL, ModelClient, OpenRouterClient, RetryConfig, RetryingClient};
use keepsake::knowledge::{CompressionConfig, KnowledgeStore, parse_sections, render_store};
use keepsake::strategy::{DEFAULT_WINDOW, StrategyKind};
use keepsake_bench::{JobRunner, RunConfig, RunSummary, load_scenarios};
use tracing_subscriber::EnvFilter;

/// Benchmark keepsake memory strategies against scripted conversations.
#[derive(Parser)]
#[command(name = "keepsake-bench", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run (strategy × scenario) jobs and append results to the log
    Run(RunArgs),
    /// Run the section parser over a text file and print the rendered store
    Parse(ParseArgs),
}

#[derive(Args)]
struct RunArgs {
    // ── Inputs ─────────────────────────────────────────────────
    /// Scenario file, or a directory of *.json scenario files
    #[arg(long)]
    scenarios: PathBuf,

    /// Result log; existing records are skipped
    #[arg(long, default_value = "results.json")]
    output: PathBuf,

    // ── Selection ──────────────────────────────────────────────
    /// Strategy to run (repeatable). Default: all
    #[arg(long = "strategy")]
    strategies: Vec<String>,

    /// Only scenarios whose name contains this text
    #[arg(long = "scenario")]
    scenario_filter: Option<String>,

    /// Keep only the first N scenarios after filtering
    #[arg(long)]
    sample: Option<usize>,

    // ── Execution ──────────────────────────────────────────────
    /// Maximum jobs in flight
    #[arg(long, default_value_t = 4)]
    concurrency: usize,

    /// Run jobs one at a time
    #[arg(long)]
    sequential: bool,

    /// Retries for transient model errors
    #[arg(long, default_value_t = 3)]
    retries: u32,

    // ── Models ─────────────────────────────────────────────────
    /// Model answering the scenario turns
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Model used for compression calls. Default: same as --model
    #[arg(long)]
    delegation_model: Option<String>,

    /// Maximum tokens per assistant reply
    #[arg(long, default_value_t = 1024)]
    max_tokens: u32,

    // ── Strategy tuning ────────────────────────────────────────
    /// Messages between compression cycles
    #[arg(long, default_value_t = 8)]
    compress_every: usize,

    /// Messages kept verbatim after a compression cycle
    #[arg(long, default_value_t = 4)]
    recent_window: usize,

    /// Window size for the sliding-window baseline
    #[arg(long, default_value_t = DEFAULT_WINDOW)]
    window: usize,
}

#[derive(Args)]
struct ParseArgs {
    /// Text file to parse, or `-` for stdin
    input: PathBuf,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Run(args) => run(args).await,
        Command::Parse(args) => parse(args),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

async fn run(args: RunArgs) -> keepsake::Result<i32> {
    let mut compression = CompressionConfig::default()
        .with_compress_every(args.compress_every)
        .with_recent_window(args.recent_window);
    compression.model = args.delegation_model;
    compression.validate()?;

    let strategy_filter = args
        .strategies
        .iter()
        .map(|name| {
            StrategyKind::parse(name, &compression, args.window).map(|k| k.name().to_string())
        })
        .collect::<keepsake::Result<Vec<_>>>()?;

    let config = RunConfig::new(args.output)
        .with_concurrency(args.concurrency)
        .with_sequential(args.sequential)
        .with_strategy_filter(strategy_filter)
        .with_scenario_filter(args.scenario_filter)
        .with_sample(args.sample)
        .with_model(Some(args.model.clone()))
        .with_max_tokens(args.max_tokens);
    config.validate()?;

    let scenarios = load_scenarios(&args.scenarios)?;
    let client: Arc<dyn ModelClient> = Arc::new(RetryingClient::new(
        OpenRouterClient::from_env(args.model)?,
        RetryConfig::with_retries(args.retries),
    ));

    let strategies = StrategyKind::all(&compression, args.window);
    let summary = JobRunner::new(config, client)
        .run(&strategies, scenarios)
        .await?;

    print_summary(&summary);
    Ok(if summary.is_success() { 0 } else { 1 })
}

fn print_summary(summary: &RunSummary) {
    println!(
        "{} planned, {} cached, {} executed, {} failed ({} record(s) in log)",
        summary.planned, summary.cached, summary.executed, summary.failed, summary.total_records
    );
    for failure in &summary.failures {
        println!(
            "  FAILED {} × {}: {}",
            failure.strategy, failure.scenario, failure.error
        );
    }
    println!("Manifest: {}", summary.manifest_path.display());
}

fn parse(args: ParseArgs) -> keepsake::Result<i32> {
    let text = if args.input.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(&args.input)?
    };

    let parsed = parse_sections(&text);
    let mut store = KnowledgeStore::new();
    let stats = store.merge(&parsed);

    print!("{}", render_store(&store));
    eprintln!(
        "{} fact(s), {} replaced, {} correction(s), {} overflow line(s)",
        stats.inserted, stats.replaced, stats.corrections_added, stats.overflow
    );
    Ok(0)
}
