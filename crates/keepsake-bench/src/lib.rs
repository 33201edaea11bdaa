//! Resumable benchmark harness for keepsake memory strategies.
//!
//! Runs every (strategy × scenario) pair, scores how much of the scenario
//! each strategy still remembers, and persists one record per completed job
//! so an interrupted run can pick up where it stopped.
//!
//! # Library usage
//!
//! ```ignore
//! use keepsake::prelude::*;
//! use keepsake_bench::{JobRunner, RunConfig, load_scenarios};
//! use std::sync::Arc;
//!
//! let client: Arc<dyn ModelClient> = Arc::new(OpenRouterClient::from_env("anthropic/claude-sonnet-4")?);
//! let scenarios = load_scenarios("scenarios/".as_ref())?;
//! let strategies = StrategyKind::all(&CompressionConfig::default(), 8);
//!
//! let summary = JobRunner::new(RunConfig::new("results.json").with_concurrency(2), client)
//!     .run(&strategies, scenarios)
//!     .await?;
//! println!("{} executed, {} failed", summary.executed, summary.failed);
//! ```
//!
//! # Binary
//!
//! ```sh
//! # Run every strategy against a directory of scenarios
//! keepsake-bench run --scenarios scenarios/ --output results.json
//!
//! # Only the structured engine, two scenarios, one job at a time
//! keepsake-bench run --scenarios scenarios/ --strategy structured --sample 2 --sequential
//!
//! # Check how the section parser reads a model reply
//! keepsake-bench parse reply.txt
//! ```

pub mod config;
pub mod events;
pub mod job;
pub mod limiter;
pub mod manifest;
pub mod record;
pub mod results;
pub mod runner;
pub mod scenario;

pub use config::RunConfig;
pub use events::{FnObserver, LoggingObserver, NoopObserver, RunEvent, RunObserver};
pub use job::{BenchmarkJob, execute_job};
pub use limiter::ConcurrencyLimiter;
pub use manifest::{RunManifest, manifest_path_for};
pub use record::ResultRecord;
pub use results::ResultLog;
pub use runner::{JobFailure, JobRunner, RunSummary};
pub use scenario::{Probe, Scenario, Turn, load_scenarios};
