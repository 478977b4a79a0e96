use once_cell::sync::OnceCell;
use opentelemetry::metrics::{Counter, Histogram, Meter};
use opentelemetry::{KeyValue, global};
use tracing::info;

struct StageMetrics {
    runs: Counter<u64>,
    duration_ms: Histogram<f64>,
    memories_recalled: Counter<u64>,
}

static METRICS: OnceCell<StageMetrics> = OnceCell::new();

fn handles() -> &'static StageMetrics {
    METRICS.get_or_init(|| {
        let meter: Meter = global::meter("productresearch.crew");
        StageMetrics {
            runs: meter
                .u64_counter("crew_stage_runs_total")
                .with_description("Crew stage executions by stage and status")
                .init(),
            duration_ms: meter
                .f64_histogram("crew_stage_duration_ms")
                .with_description("Crew stage runtime in milliseconds")
                .init(),
            memories_recalled: meter
                .u64_counter("crew_memories_recalled_total")
                .with_description("Long-term memory items handed to agents")
                .init(),
        }
    })
}

/// Hint to operators that OTEL metrics export can be configured externally.
pub fn init_metrics_from_env(service_name: &str) {
    if std::env::var("PRODUCTRESEARCH_OTEL_METRICS_ENDPOINT").is_ok() {
        info!(
            target = "telemetry",
            "PRODUCTRESEARCH_OTEL_METRICS_ENDPOINT detected for {service_name}. Configure an OTLP meter provider in your deployment to export crew metrics."
        );
    }
}

/// Record OTEL metrics for one crew stage (no-op if no provider installed).
pub fn record_stage_metrics(stage: &str, status: &str, duration_ms: u64, memories: usize) {
    let metrics = handles();
    let attrs = [
        KeyValue::new("stage", stage.to_string()),
        KeyValue::new("status", status.to_string()),
    ];

    metrics.runs.add(1, &attrs);
    metrics.duration_ms.record(duration_ms as f64, &attrs);
    if memories > 0 {
        metrics.memories_recalled.add(memories as u64, &attrs);
    }
}
