//! Job lifecycle store.
//!
//! Owns the pending, in-progress and completed collections and every rule
//! that moves a job between them. Purely synchronous and free of I/O; the
//! [`Broker`](crate::broker::Broker) wraps it in a lock for shared use.
//!
//! Each collection is an ordered lane (`seq -> id`) backed by one id index.
//! A job's `seq` is reassigned whenever it enters a lane, so lane order is
//! insertion order and a requeued job lands at the tail.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};

use crate::error::{Error, Result};
use crate::model::*;

struct Slot {
    stage: Stage,
    seq: u64,
    job: Job,
}

/// The three-stage job store. All state transitions go through here.
#[derive(Default)]
pub struct JobStore {
    index: HashMap<String, Slot>,
    lanes: [BTreeMap<u64, String>; 3],
    next_seq: u64,
}

fn lane(stage: Stage) -> usize {
    match stage {
        Stage::Pending => 0,
        Stage::InProgress => 1,
        Stage::Completed => 2,
    }
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a new job at the tail of pending.
    pub fn submit(&mut self, new: NewJob) -> Result<()> {
        self.submit_at(new, Utc::now())
    }

    pub fn submit_at(&mut self, new: NewJob, now: DateTime<Utc>) -> Result<()> {
        let missing = if new.url.is_empty() {
            Some("url")
        } else if new.id.is_empty() {
            Some("id")
        } else if new.kind.is_empty() {
            Some("type")
        } else {
            None
        };
        if let Some(field) = missing {
            return Err(Error::Validation { field });
        }

        // Any tracked copy counts, not just pending, so an id never lives
        // in two collections at once.
        if self.index.contains_key(&new.id) {
            return Err(Error::Duplicate { id: new.id });
        }

        let mut payload = new.payload;
        payload.retain(|k, _| is_payload_key(k));

        let job = Job {
            id: new.id,
            url: new.url,
            kind: new.kind,
            result: None,
            created_at: now,
            updated_at: now,
            payload,
        };
        self.insert(Stage::Pending, job);
        Ok(())
    }

    /// Hand the oldest pending job to a worker.
    ///
    /// Returns the record as it was *before* the claim refreshed
    /// `updated_at`.
    pub fn claim(&mut self) -> Result<Job> {
        self.claim_at(Utc::now())
    }

    pub fn claim_at(&mut self, now: DateTime<Utc>) -> Result<Job> {
        let Some(id) = self.lanes[lane(Stage::Pending)]
            .first_key_value()
            .map(|(_, id)| id.clone())
        else {
            return Err(Error::EmptyQueue);
        };

        let before = self.get(&id).cloned().ok_or_else(|| desync(&id))?;
        self.relocate(&id, Stage::InProgress, now)?;
        Ok(before)
    }

    /// Record a worker's outcome for an in-progress job.
    pub fn report(&mut self, report: Report) -> Result<ReportOutcome> {
        self.report_at(report, Utc::now())
    }

    pub fn report_at(
        &mut self,
        mut report: Report,
        now: DateTime<Utc>,
    ) -> Result<ReportOutcome> {
        let missing = if !is_truthy(&report.result) {
            Some("result")
        } else if report.id.is_empty() {
            Some("id")
        } else if report.url.is_empty() {
            Some("url")
        } else {
            None
        };
        if let Some(field) = missing {
            return Err(Error::Validation { field });
        }

        if self.stage_of(&report.id) != Some(Stage::InProgress) {
            return Err(Error::NotInProgress { id: report.id });
        }

        let id = report.id.clone();
        if !report.completed {
            self.relocate(&id, Stage::Pending, now)?;
            return Ok(ReportOutcome::Requeued);
        }

        report.fields.retain(|k, _| is_payload_key(k) && k != "result");
        let job = self.relocate(&id, Stage::Completed, now)?;
        job.merge_report(report, now);
        Ok(ReportOutcome::Completed)
    }

    /// Look up a job's result. A completed job is removed on read.
    pub fn fetch_result(&mut self, id: &str) -> Result<Job> {
        match self.stage_of(id) {
            Some(Stage::Completed) => self
                .remove(id)
                .map(|slot| slot.job)
                .ok_or_else(|| desync(id)),
            Some(Stage::InProgress) => Err(Error::StillProcessing { id: id.to_owned() }),
            Some(Stage::Pending) => Err(Error::StillQueued { id: id.to_owned() }),
            None => Err(Error::NotFound { id: id.to_owned() }),
        }
    }

    /// Url and timestamps of every tracked job, per collection, in order.
    pub fn summaries(&self) -> QueueSnapshot {
        QueueSnapshot {
            pending: self.summarize(Stage::Pending),
            in_progress: self.summarize(Stage::InProgress),
            completed: self.summarize(Stage::Completed),
        }
    }

    /// Evict in-progress and completed jobs untouched for longer than
    /// `stale_after`. Pending jobs are never evicted.
    pub fn sweep(&mut self, now: DateTime<Utc>, stale_after: Duration) -> SweepReport {
        SweepReport {
            in_progress: self.evict_stale(Stage::InProgress, now, stale_after),
            completed: self.evict_stale(Stage::Completed, now, stale_after),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Job> {
        self.index.get(id).map(|slot| &slot.job)
    }

    pub fn stage_of(&self, id: &str) -> Option<Stage> {
        self.index.get(id).map(|slot| slot.stage)
    }

    pub fn len(&self, stage: Stage) -> usize {
        self.lanes[lane(stage)].len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn insert(&mut self, stage: Stage, job: Job) {
        let seq = self.bump_seq();
        self.lanes[lane(stage)].insert(seq, job.id.clone());
        self.index.insert(job.id.clone(), Slot { stage, seq, job });
    }

    fn remove(&mut self, id: &str) -> Option<Slot> {
        let slot = self.index.remove(id)?;
        self.lanes[lane(slot.stage)].remove(&slot.seq);
        Some(slot)
    }

    /// Move a job to the tail of `to`, refreshing `updated_at`.
    fn relocate(&mut self, id: &str, to: Stage, now: DateTime<Utc>) -> Result<&mut Job> {
        let seq = self.bump_seq();
        let slot = self.index.get_mut(id).ok_or_else(|| desync(id))?;
        let from = slot.stage;
        if !from.can_transition_to(to) {
            return Err(Error::InvalidTransition { from, to });
        }

        self.lanes[lane(from)].remove(&slot.seq);
        self.lanes[lane(to)].insert(seq, id.to_owned());
        slot.stage = to;
        slot.seq = seq;
        slot.job.touch(now);
        Ok(&mut slot.job)
    }

    fn summarize(&self, stage: Stage) -> Vec<JobSummary> {
        self.lanes[lane(stage)]
            .values()
            .filter_map(|id| self.get(id))
            .map(Job::summary)
            .collect()
    }

    fn evict_stale(
        &mut self,
        stage: Stage,
        now: DateTime<Utc>,
        stale_after: Duration,
    ) -> Vec<String> {
        // Collect first, then remove, so eviction never disturbs the walk.
        let stale: Vec<String> = self.lanes[lane(stage)]
            .values()
            .filter(|id| {
                self.get(id)
                    .is_some_and(|job| now.signed_duration_since(job.updated_at) > stale_after)
            })
            .cloned()
            .collect();

        for id in &stale {
            self.remove(id);
        }
        stale
    }
}

fn desync(id: &str) -> Error {
    Error::Other(format!("store index out of sync for id {id}"))
}
