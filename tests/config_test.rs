use std::collections::HashMap;
use std::time::Duration;

use job_broker::config::Config;
use job_broker::error::Error;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name| vars.get(name).cloned()
}

#[test]
fn config_defaults_when_unset() {
    let config = Config::from_lookup(lookup(&[])).unwrap();
    assert_eq!(config.bind_addr.port(), 5000);
    assert_eq!(config.sweep_interval, Duration::from_secs(300));
    assert_eq!(config.stale_after, Duration::from_secs(300));
    assert_eq!(config.cors_allow_origin, "*");
    assert!(config.otel_endpoint.is_none());
    assert_eq!(config.service_name, "job-broker");
    assert_eq!(config.log_level, "info");
}

#[test]
fn config_reads_overrides() {
    let config = Config::from_lookup(lookup(&[
        ("BROKER_ADDR", "127.0.0.1:8080"),
        ("SWEEP_INTERVAL_SECS", "30"),
        ("STALE_AFTER_SECS", " 60 "),
        ("CORS_ALLOW_ORIGIN", "https://app.test"),
        ("OTEL_ENDPOINT", "http://localhost:4317"),
        ("OTEL_SERVICE_NAME", "broker-eu"),
        ("LOG_LEVEL", "debug"),
    ]))
    .unwrap();

    assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
    let sweep = config.sweep();
    assert_eq!(sweep.interval, Duration::from_secs(30));
    assert_eq!(sweep.stale_after, Duration::from_secs(60));
    assert_eq!(config.cors_allow_origin, "https://app.test");
    assert_eq!(config.otel_endpoint.as_deref(), Some("http://localhost:4317"));
    assert_eq!(config.service_name, "broker-eu");
    assert_eq!(config.log_level, "debug");
}

#[test]
fn config_rejects_bad_values() {
    let result = Config::from_lookup(lookup(&[("BROKER_ADDR", "not-an-addr")]));
    assert!(matches!(result, Err(Error::Config(_))));

    let result = Config::from_lookup(lookup(&[("STALE_AFTER_SECS", "five")]));
    assert!(matches!(result, Err(Error::Config(_))));

    let result = Config::from_lookup(lookup(&[("SWEEP_INTERVAL_SECS", "0")]));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn empty_otel_endpoint_means_disabled() {
    let config = Config::from_lookup(lookup(&[("OTEL_ENDPOINT", "")])).unwrap();
    assert!(config.otel_endpoint.is_none());
}
