//! Integration tests for telemetry initialization and span helpers.

use job_broker::model::Stage;
use job_broker::telemetry::job::{record_transition, start_job_span};
use job_broker::telemetry::{TelemetryConfig, init_telemetry};

#[test]
fn telemetry_initializes_without_endpoint() {
    // A global subscriber can only be set once per process, so a second
    // init in the same binary is allowed to fail.
    let config = TelemetryConfig {
        endpoint: None,
        service_name: "job-broker-test".to_string(),
        default_filter: "debug".to_string(),
    };
    if let Ok(guard) = init_telemetry(config) {
        assert!(!guard.is_exporting());
        guard.force_flush();
    }
}

#[test]
fn job_span_records_transition() {
    let span = start_job_span("claim", None);
    span.record("job.id", "42");
    record_transition(&span, Stage::Pending, Stage::InProgress);

    let span = start_job_span("report", Some("42"));
    record_transition(&span, Stage::InProgress, Stage::Completed);
}
