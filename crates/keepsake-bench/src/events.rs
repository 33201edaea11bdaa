//! Run events and observers for the [`JobRunner`](crate::runner::JobRunner).
//!
//! The runner reports progress through [`RunEvent`] variants. Callers
//! implement [`RunObserver`] to drive logging, progress output or tests.
//!
//! | Observer | Use case |
//! |----------|----------|
//! | [`NoopObserver`] | Tests or quiet runs |
//! | [`LoggingObserver`] | Progress via `tracing` |
//! | [`FnObserver`] | Quick closures for simple callbacks |

use crate::record::ResultRecord;
use tracing::{debug, info};

/// Lifecycle events emitted during a run.
#[derive(Debug)]
pub enum RunEvent<'a> {
    /// Jobs are planned and about to be dispatched.
    RunStarted {
        planned: usize,
        cached: usize,
        concurrency: usize,
        sequential: bool,
    },
    /// A job was skipped because the result log already has it.
    JobCached { strategy: &'a str, scenario: &'a str },
    /// A job acquired a slot and started running.
    JobStarted { strategy: &'a str, scenario: &'a str },
    JobCompleted { record: &'a ResultRecord },
    JobFailed {
        strategy: &'a str,
        scenario: &'a str,
        error: &'a str,
    },
    RunFinished {
        executed: usize,
        failed: usize,
        cached: usize,
        total_records: usize,
    },
}

/// Receives [`RunEvent`]s. Called from concurrent jobs, so implementations
/// must be thread-safe.
pub trait RunObserver: Send + Sync {
    fn on_event(&self, event: &RunEvent<'_>) {
        let _ = event;
    }
}

pub struct NoopObserver;
impl RunObserver for NoopObserver {}

/// An observer backed by a closure.
pub struct FnObserver<F>(F);

impl<F> FnObserver<F>
where
    F: Fn(&RunEvent<'_>) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> RunObserver for FnObserver<F>
where
    F: Fn(&RunEvent<'_>) + Send + Sync,
{
    fn on_event(&self, event: &RunEvent<'_>) {
        (self.0)(event)
    }
}

/// An observer that logs events via `tracing`.
pub struct LoggingObserver;

impl RunObserver for LoggingObserver {
    fn on_event(&self, event: &RunEvent<'_>) {
        match event {
            RunEvent::RunStarted {
                planned,
                cached,
                concurrency,
                sequential,
            } => {
                let mode = if *sequential {
                    "sequential".to_string()
                } else {
                    format!("concurrency {concurrency}")
                };
                info!("Starting {planned} job(s), {cached} cached, {mode}");
            }
            RunEvent::JobCached { strategy, scenario } => {
                debug!("[{strategy} × {scenario}] cached, skipping");
            }
            RunEvent::JobStarted { strategy, scenario } => {
                debug!("[{strategy} × {scenario}] started");
            }
            RunEvent::JobCompleted { record } => {
                info!(
                    "[{} × {}] retention {:.2} ({}/{} probes), {} tokens, {} cycle(s), {}ms",
                    record.strategy,
                    record.scenario,
                    record.retention_score,
                    record.probes_passed,
                    record.probes_total,
                    record.total_tokens(),
                    record.compression_cycles,
                    record.duration_ms
                );
            }
            RunEvent::JobFailed {
                strategy,
                scenario,
                error,
            } => {
                debug!("[{strategy} × {scenario}] failed: {error}");
            }
            RunEvent::RunFinished {
                executed,
                failed,
                cached,
                total_records,
            } => {
                info!(
                    "Run finished: {executed} executed, {failed} failed, {cached} cached, \
                     {total_records} record(s) in log"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn fn_observer_receives_events() {
        let count = AtomicUsize::new(0);
        let observer = FnObserver::new(|event| {
            if matches!(event, RunEvent::JobCached { .. }) {
                count.fetch_add(1, Ordering::SeqCst);
            }
        });
        observer.on_event(&RunEvent::JobCached {
            strategy: "structured",
            scenario: "travel-kyoto",
        });
        observer.on_event(&RunEvent::JobStarted {
            strategy: "structured",
            scenario: "travel-kyoto",
        });
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn logging_and_noop_accept_every_event() {
        let events = [
            RunEvent::RunStarted {
                planned: 2,
                cached: 1,
                concurrency: 2,
                sequential: false,
            },
            RunEvent::JobFailed {
                strategy: "structured",
                scenario: "x",
                error: "model call failed",
            },
            RunEvent::RunFinished {
                executed: 1,
                failed: 1,
                cached: 1,
                total_records: 2,
            },
        ];
        for event in &events {
            LoggingObserver.on_event(event);
            NoopObserver.on_event(event);
        }
    }
}
