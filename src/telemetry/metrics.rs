//! Metric instrument factories.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! Without an OTLP endpoint the global provider is a no-op.

use opentelemetry::metrics::{Counter, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("job-broker")
}

/// Counter: submit attempts.
/// Labels: `result` ("ok" | "duplicate" | "invalid").
pub fn jobs_submitted() -> Counter<u64> {
    meter()
        .u64_counter("broker.jobs.submitted")
        .with_description("Number of job submissions")
        .build()
}

/// Counter: stage transitions.
/// Labels: `from`, `to`.
pub fn job_transitions() -> Counter<u64> {
    meter()
        .u64_counter("broker.jobs.transitions")
        .with_description("Number of job stage transitions")
        .build()
}

/// Counter: jobs dropped by the sweep.
/// Labels: `stage`.
pub fn jobs_evicted() -> Counter<u64> {
    meter()
        .u64_counter("broker.jobs.evicted")
        .with_description("Number of stale jobs evicted by the sweep")
        .build()
}

/// Counter: completed results handed back to producers.
pub fn results_delivered() -> Counter<u64> {
    meter()
        .u64_counter("broker.results.delivered")
        .with_description("Number of completed results consumed")
        .build()
}

/// Counter: claims that found the pending queue empty.
pub fn empty_claims() -> Counter<u64> {
    meter()
        .u64_counter("broker.claims.empty")
        .with_description("Number of claims against an empty queue")
        .build()
}
