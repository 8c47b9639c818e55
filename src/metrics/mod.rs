//! Metrics module
//!
//! Prometheus counters and histograms describing one verifier run. They are
//! observations only; nothing in the workflow asserts on them.

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

lazy_static! {
    // API metrics
    pub static ref API_CALLS_TOTAL: CounterVec = register_counter_vec!(
        "cloud_disk_e2e_api_calls_total",
        "Total API calls by endpoint and outcome",
        &["endpoint", "outcome"]
    ).unwrap();

    pub static ref API_CALL_DURATION: HistogramVec = register_histogram_vec!(
        "cloud_disk_e2e_api_call_duration_seconds",
        "API call duration in seconds",
        &["endpoint"],
        vec![0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0]
    ).unwrap();

    // Workflow metrics
    pub static ref WORKFLOW_STEPS_TOTAL: CounterVec = register_counter_vec!(
        "cloud_disk_e2e_workflow_steps_total",
        "Workflow steps reached",
        &["stage"]
    ).unwrap();

    pub static ref WORKFLOW_RUNS_TOTAL: CounterVec = register_counter_vec!(
        "cloud_disk_e2e_workflow_runs_total",
        "Workflow runs by result",
        &["result"]  // "passed", "degraded" or "failed"
    ).unwrap();

    // Storage probe metrics
    pub static ref STORAGE_PROBE_OPS_TOTAL: CounterVec = register_counter_vec!(
        "cloud_disk_e2e_storage_probe_ops_total",
        "Storage probe operations by outcome",
        &["operation", "outcome"]
    ).unwrap();
}

/// Record one API call
pub fn record_api_call(endpoint: &str, outcome: &str, duration_secs: f64) {
    API_CALLS_TOTAL
        .with_label_values(&[endpoint, outcome])
        .inc();
    API_CALL_DURATION
        .with_label_values(&[endpoint])
        .observe(duration_secs);
}

/// Record that the workflow reached a stage
pub fn record_workflow_step(stage: &str) {
    WORKFLOW_STEPS_TOTAL.with_label_values(&[stage]).inc();
}

/// Record the end of a workflow run
pub fn record_workflow_run(result: &str) {
    WORKFLOW_RUNS_TOTAL.with_label_values(&[result]).inc();
}

/// Record a storage probe operation
pub fn record_storage_op(operation: &str, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    STORAGE_PROBE_OPS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
}

/// Render every registered metric in the Prometheus text format
pub fn gather_text() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
