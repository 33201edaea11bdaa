//! Job runner: many strategies × many scenarios, bounded and resumable.
//!
//! A run loads the existing result log, skips every `(strategy, scenario)`
//! pair already recorded, and dispatches the rest either through a
//! [`ConcurrencyLimiter`] or strictly one after another. Each completed job
//! is appended to the log immediately, so a crash or a rate-limit storm
//! loses at most the jobs in flight. Failed jobs are logged with their
//! identity and left out of the log; the next run picks them up again.

use crate::config::RunConfig;
use crate::events::{LoggingObserver, RunEvent, RunObserver};
use crate::job::{BenchmarkJob, execute_job};
use crate::limiter::ConcurrencyLimiter;
use crate::manifest::{RunManifest, manifest_path_for};
use crate::results::ResultLog;
use crate::scenario::Scenario;
use futures::future::join_all;
use keepsake::api::ModelClient;
use keepsake::strategy::StrategyKind;
use keepsake::{KeepsakeError, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// A job that did not produce a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    pub strategy: String,
    pub scenario: String,
    pub error: String,
}

/// What a run did, mirrored in the manifest.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub planned: usize,
    pub cached: usize,
    pub executed: usize,
    pub failed: usize,
    pub total_records: usize,
    pub failures: Vec<JobFailure>,
    pub manifest_path: PathBuf,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

pub struct JobRunner {
    config: RunConfig,
    client: Arc<dyn ModelClient>,
    observer: Arc<dyn RunObserver>,
}

impl JobRunner {
    pub fn new(config: RunConfig, client: Arc<dyn ModelClient>) -> Self {
        Self {
            config,
            client,
            observer: Arc::new(LoggingObserver),
        }
    }

    pub fn with_observer(mut self, observer: impl RunObserver + 'static) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Apply the filters and sample, and build the job list.
    ///
    /// Fails if a strategy filter names no known strategy or nothing is
    /// left to run.
    pub fn plan(
        &self,
        strategies: &[StrategyKind],
        scenarios: Vec<Scenario>,
    ) -> Result<Vec<BenchmarkJob>> {
        for name in &self.config.strategy_filter {
            if !strategies.iter().any(|s| s.name().eq_ignore_ascii_case(name)) {
                return Err(KeepsakeError::Config(format!(
                    "strategy filter '{name}' matches no strategy"
                )));
            }
        }
        let strategies: Vec<&StrategyKind> = strategies
            .iter()
            .filter(|s| self.config.wants_strategy(s.name()))
            .collect();

        let mut scenarios: Vec<Arc<Scenario>> = scenarios
            .into_iter()
            .filter(|s| self.config.wants_scenario(&s.name))
            .map(Arc::new)
            .collect();
        if let Some(sample) = self.config.sample {
            scenarios.truncate(sample);
        }

        if strategies.is_empty() || scenarios.is_empty() {
            return Err(KeepsakeError::Config(
                "nothing to run after applying filters".into(),
            ));
        }

        let mut jobs = Vec::with_capacity(strategies.len() * scenarios.len());
        for strategy in &strategies {
            for scenario in &scenarios {
                jobs.push(BenchmarkJob::new((*strategy).clone(), Arc::clone(scenario)));
            }
        }
        Ok(jobs)
    }

    /// Run every planned job not already in the result log.
    ///
    /// Configuration problems fail before any job starts. Job failures do
    /// not fail the run; they are counted in the summary.
    pub async fn run(
        &self,
        strategies: &[StrategyKind],
        scenarios: Vec<Scenario>,
    ) -> Result<RunSummary> {
        self.config.validate()?;
        for strategy in strategies {
            strategy.validate()?;
        }
        let limiter = if self.config.sequential {
            None
        } else {
            Some(ConcurrencyLimiter::new(self.config.concurrency)?)
        };

        let started_at = chrono::Utc::now().to_rfc3339();
        let jobs = self.plan(strategies, scenarios)?;
        let log = ResultLog::load(&self.config.output).await?;
        let done = log.completed_pairs().await;

        let (cached, pending): (Vec<BenchmarkJob>, Vec<BenchmarkJob>) =
            jobs.iter().cloned().partition(|job| done.contains(&job.key()));
        for job in &cached {
            self.observer.on_event(&RunEvent::JobCached {
                strategy: job.strategy_name(),
                scenario: job.scenario_name(),
            });
        }
        self.observer.on_event(&RunEvent::RunStarted {
            planned: jobs.len(),
            cached: cached.len(),
            concurrency: self.effective_concurrency(),
            sequential: self.config.sequential,
        });

        let outcomes: Vec<std::result::Result<(), JobFailure>> = match limiter {
            Some(ref limiter) => {
                join_all(
                    pending
                        .iter()
                        .map(|job| limiter.run(self.run_job(job, &log))),
                )
                .await
            }
            None => {
                let mut outcomes = Vec::with_capacity(pending.len());
                for job in &pending {
                    outcomes.push(self.run_job(job, &log).await);
                }
                outcomes
            }
        };

        let failures: Vec<JobFailure> = outcomes.into_iter().filter_map(|o| o.err()).collect();
        let total_records = log.len().await;
        let summary = RunSummary {
            planned: jobs.len(),
            cached: cached.len(),
            executed: pending.len() - failures.len(),
            failed: failures.len(),
            total_records,
            failures,
            manifest_path: manifest_path_for(&self.config.output),
        };

        let manifest = RunManifest {
            started_at,
            finished_at: chrono::Utc::now().to_rfc3339(),
            output_path: self.config.output.display().to_string(),
            strategy_filter: self.config.strategy_filter.clone(),
            scenario_filter: self.config.scenario_filter.clone(),
            sample: self.config.sample,
            concurrency: self.effective_concurrency(),
            sequential: self.config.sequential,
            strategies: unique_strategy_names(&jobs),
            planned_runs: summary.planned,
            cached_runs: summary.cached,
            executed_runs: summary.executed,
            failed_runs: summary.failed,
            total_records,
        };
        match manifest.write(&summary.manifest_path).await {
            Ok(()) => info!("Manifest written to {}", summary.manifest_path.display()),
            Err(e) => warn!(
                "Failed to write manifest {}: {e}",
                summary.manifest_path.display()
            ),
        }

        self.observer.on_event(&RunEvent::RunFinished {
            executed: summary.executed,
            failed: summary.failed,
            cached: summary.cached,
            total_records,
        });
        Ok(summary)
    }

    async fn run_job(
        &self,
        job: &BenchmarkJob,
        log: &ResultLog,
    ) -> std::result::Result<(), JobFailure> {
        self.observer.on_event(&RunEvent::JobStarted {
            strategy: job.strategy_name(),
            scenario: job.scenario_name(),
        });

        match execute_job(job, Arc::clone(&self.client), &self.config).await {
            Ok(record) => {
                self.observer
                    .on_event(&RunEvent::JobCompleted { record: &record });
                log.append(record).await;
                Ok(())
            }
            Err(e) => {
                let error = e.to_string();
                error!(
                    "[{} × {}] job failed: {error}",
                    job.strategy_name(),
                    job.scenario_name()
                );
                self.observer.on_event(&RunEvent::JobFailed {
                    strategy: job.strategy_name(),
                    scenario: job.scenario_name(),
                    error: &error,
                });
                Err(JobFailure {
                    strategy: job.strategy_name().to_string(),
                    scenario: job.scenario_name().to_string(),
                    error,
                })
            }
        }
    }

    fn effective_concurrency(&self) -> usize {
        if self.config.sequential {
            1
        } else {
            self.config.concurrency
        }
    }
}

fn unique_strategy_names(jobs: &[BenchmarkJob]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for job in jobs {
        if !names.iter().any(|n| n == job.strategy_name()) {
            names.push(job.strategy_name().to_string());
        }
    }
    names
}
