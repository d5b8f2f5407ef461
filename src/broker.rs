//! Broker: the shared, thread-safe handle around one [`JobStore`].
//!
//! Every operation takes the store lock, runs to completion, and releases
//! it before any logging or metric work. The periodic sweep goes through
//! the same lock, so it is serialized with submit/claim/report/fetch.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use opentelemetry::KeyValue;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::model::*;
use crate::store::JobStore;
use crate::telemetry::job::{record_transition, start_job_span};
use crate::telemetry::metrics;

/// Timing for the background sweeper.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// How often the sweep runs.
    pub interval: Duration,
    /// How long an in-progress or completed job may sit untouched.
    pub stale_after: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            stale_after: Duration::from_secs(300),
        }
    }
}

/// Cloneable handle to a single job store.
#[derive(Clone, Default)]
pub struct Broker {
    store: Arc<Mutex<JobStore>>,
    shutdown: Arc<Notify>,
}

/// Store operations never leave partial state behind, so a poisoned lock
/// still guards a consistent store.
fn lock(store: &Mutex<JobStore>) -> MutexGuard<'_, JobStore> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Broker {
    /// Create a broker over an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn locked<T>(&self, f: impl FnOnce(&mut JobStore) -> T) -> T {
        let mut store = lock(&self.store);
        f(&mut store)
    }

    pub fn submit(&self, new: NewJob) -> Result<()> {
        let span = start_job_span("submit", Some(new.id.as_str()));
        let id = new.id.clone();
        let result = self.locked(|store| store.submit(new));

        let label = match &result {
            Ok(()) => "ok",
            Err(Error::Duplicate { .. }) => "duplicate",
            Err(_) => "invalid",
        };
        metrics::jobs_submitted().add(1, &[KeyValue::new("result", label)]);

        span.in_scope(|| match &result {
            Ok(()) => info!(id = %id, "job queued"),
            Err(e) => debug!(error = %e, "submit rejected"),
        });
        result
    }

    /// Claim the oldest pending job. See [`JobStore::claim`].
    pub fn claim(&self) -> Result<Job> {
        let span = start_job_span("claim", None);
        match self.locked(JobStore::claim) {
            Ok(job) => {
                span.record("job.id", job.id.as_str());
                record_transition(&span, Stage::Pending, Stage::InProgress);
                Ok(job)
            }
            Err(e) => {
                if matches!(e, Error::EmptyQueue) {
                    metrics::empty_claims().add(1, &[]);
                }
                Err(e)
            }
        }
    }

    pub fn report(&self, report: Report) -> Result<ReportOutcome> {
        let span = start_job_span("report", Some(report.id.as_str()));
        let outcome = self.locked(|store| store.report(report));
        match &outcome {
            Ok(ReportOutcome::Requeued) => {
                record_transition(&span, Stage::InProgress, Stage::Pending)
            }
            Ok(ReportOutcome::Completed) => {
                record_transition(&span, Stage::InProgress, Stage::Completed)
            }
            Err(e) => span.in_scope(|| debug!(error = %e, "report rejected")),
        }
        outcome
    }

    /// Fetch a result; a completed job is consumed by this call.
    pub fn fetch_result(&self, id: &str) -> Result<Job> {
        let span = start_job_span("fetch_result", Some(id));
        let result = self.locked(|store| store.fetch_result(id));
        match &result {
            Ok(_) => {
                metrics::results_delivered().add(1, &[]);
                span.in_scope(|| info!("result delivered"));
            }
            Err(e) if e.is_retry_later() => {
                span.in_scope(|| debug!(reason = %e, "result not ready"))
            }
            Err(_) => {}
        }
        result
    }

    pub fn summaries(&self) -> QueueSnapshot {
        self.locked(|store| store.summaries())
    }

    /// Run one sweep now. The background sweeper calls the same path.
    pub fn sweep(
        &self,
        now: chrono::DateTime<Utc>,
        stale_after: chrono::Duration,
    ) -> SweepReport {
        sweep_store(&self.store, now, stale_after)
    }

    /// Start the periodic sweeper.
    ///
    /// The first sweep runs one `interval` after start. The task exits on
    /// [`Broker::shutdown`] or once every handle to the store is dropped.
    pub fn spawn_sweeper(&self, config: SweepConfig) -> Result<JoinHandle<()>> {
        if config.interval.is_zero() {
            return Err(Error::Config("sweep interval must be non-zero".to_string()));
        }
        let stale_after = chrono::Duration::from_std(config.stale_after)
            .map_err(|e| Error::Config(format!("stale_after out of range: {e}")))?;

        let weak_store = Arc::downgrade(&self.store);
        let shutdown = Arc::clone(&self.shutdown);
        let interval = config.interval;

        Ok(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(
                interval_secs = interval.as_secs_f64(),
                stale_after_secs = stale_after.num_seconds(),
                "sweeper started"
            );

            loop {
                tokio::select! {
                    _ = shutdown.notified() => {
                        info!("sweeper shutting down");
                        return;
                    }
                    _ = ticker.tick() => {}
                }

                let Some(store) = weak_store.upgrade() else {
                    debug!("store dropped, sweeper exiting");
                    return;
                };
                sweep_store(&store, Utc::now(), stale_after);
            }
        }))
    }

    /// Signal the sweeper to stop.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }
}

fn sweep_store(
    store: &Mutex<JobStore>,
    now: chrono::DateTime<Utc>,
    stale_after: chrono::Duration,
) -> SweepReport {
    let report = lock(store).sweep(now, stale_after);

    if report.total() > 0 {
        warn!(
            in_progress = ?report.in_progress,
            completed = ?report.completed,
            "evicted stale jobs"
        );
    } else {
        debug!("sweep found nothing stale");
    }

    let evicted = metrics::jobs_evicted();
    for (stage, ids) in [
        (Stage::InProgress, &report.in_progress),
        (Stage::Completed, &report.completed),
    ] {
        if !ids.is_empty() {
            evicted.add(ids.len() as u64, &[KeyValue::new("stage", stage.as_str())]);
        }
    }
    report
}
