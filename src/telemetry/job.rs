//! Job span helpers.

use tracing::Span;

use crate::model::Stage;

/// Start a span for one broker operation on a job.
///
/// `job.id` may be empty (e.g. a claim before the job is known) and can be
/// filled in with `span.record("job.id", ..)`.
pub fn start_job_span(operation: &'static str, id: Option<&str>) -> Span {
    let span = tracing::info_span!(
        "broker.job",
        "job.operation" = operation,
        "job.id" = tracing::field::Empty,
    );
    if let Some(id) = id {
        span.record("job.id", id);
    }
    span
}

/// Emit a stage transition event scoped to the given span.
pub fn record_transition(span: &Span, from: Stage, to: Stage) {
    span.in_scope(|| {
        tracing::info!(from = %from, to = %to, "stage_transition");
    });
    super::metrics::job_transitions().add(
        1,
        &[
            opentelemetry::KeyValue::new("from", from.as_str()),
            opentelemetry::KeyValue::new("to", to.as_str()),
        ],
    );
}
