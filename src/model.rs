//! Core data model.
//!
//! A job is a URL to be processed by some external worker. The broker only
//! tracks where each job sits in its lifecycle; everything else the caller
//! sends along is carried verbatim in `payload`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys backed by a dedicated [`Job`] field. They never land in the
/// free-form payload.
pub const JOB_FIELD_KEYS: &[&str] = &["id", "url", "type", "createdAt", "updatedAt"];

/// Whether `key` may be carried in a job's payload.
pub fn is_payload_key(key: &str) -> bool {
    !JOB_FIELD_KEYS.contains(&key)
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// A unit of work tracked by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Caller-supplied identifier. The sole key.
    pub id: String,

    /// Target the worker should process. Opaque to the broker.
    pub url: String,

    /// Caller-supplied classifier. Not interpreted.
    #[serde(rename = "type")]
    pub kind: String,

    /// Attached by the worker on completion. A `result` sent at submit
    /// time rides in `payload` until then.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Any other fields the producer (and later the worker) sent.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Job {
    /// Summary row used by queue listings.
    pub fn summary(&self) -> JobSummary {
        JobSummary {
            url: self.url.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Fold a completed report into this job. Report fields win.
    pub(crate) fn merge_report(&mut self, report: Report, now: DateTime<Utc>) {
        self.url = report.url;
        self.result = Some(report.result);
        if let Some(kind) = report.kind.filter(|k| !k.is_empty()) {
            self.kind = kind;
        }
        self.payload.remove("result");
        self.payload.extend(report.fields);
        self.payload.entry("completed").or_insert(Value::Bool(true));
        self.touch(now);
    }

    /// Refresh `updated_at`, never moving it before `created_at`.
    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now.max(self.created_at);
    }
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Which collection a job currently lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Submitted, waiting for a worker.
    Pending,
    /// Claimed by a worker, awaiting its report.
    InProgress,
    /// Reported done, awaiting producer pickup.
    Completed,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Pending, Stage::InProgress, Stage::Completed];

    /// Can a tracked job move from self to `to`?
    pub fn can_transition_to(self, to: Stage) -> bool {
        use Stage::*;
        matches!(
            (self, to),
            (Pending, InProgress)
                | (InProgress, Pending) // worker gave up, requeue
                | (InProgress, Completed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Pending => "pending",
            Stage::InProgress => "in_progress",
            Stage::Completed => "completed",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// A job as submitted by a producer. Empty strings count as missing.
#[derive(Debug, Clone, Default)]
pub struct NewJob {
    pub id: String,
    pub url: String,
    pub kind: String,
    pub payload: Map<String, Value>,
}

impl NewJob {
    pub fn new(id: impl Into<String>, url: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            kind: kind.into(),
            payload: Map::new(),
        }
    }

    pub fn field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }
}

/// A worker's report on a claimed job.
#[derive(Debug, Clone)]
pub struct Report {
    pub id: String,
    pub url: String,
    /// Must be truthy (see [`is_truthy`]) to count as present.
    pub result: Value,
    /// Falsy means "give it back to the queue".
    pub completed: bool,
    /// Optional replacement for the job's `type`.
    pub kind: Option<String>,
    /// Every other caller field, merged into the job on completion
    /// (including the caller's own `completed` value).
    pub fields: Map<String, Value>,
}

impl Report {
    pub fn new(id: impl Into<String>, url: impl Into<String>, result: Value) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            result,
            completed: false,
            kind: None,
            fields: Map::new(),
        }
    }

    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// What a report did to the job. Callers only see a generic ack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    Requeued,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Read-only projection of all three collections, in collection order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSnapshot {
    pub pending: Vec<JobSummary>,
    pub in_progress: Vec<JobSummary>,
    pub completed: Vec<JobSummary>,
}

/// Ids evicted by one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub in_progress: Vec<String>,
    pub completed: Vec<String>,
}

impl SweepReport {
    pub fn total(&self) -> usize {
        self.in_progress.len() + self.completed.len()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// JSON truthiness: `null`, `false`, `0`, `NaN` and `""` are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
