use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Database Metrics (MongoDB)
    pub static ref DB_OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "db_operations_total",
        "Total number of database operations",
        &["operation", "collection", "status"]
    )
    .unwrap();

    pub static ref DB_OPERATION_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "db_operation_duration_seconds",
        "Database operation duration in seconds",
        &["operation", "collection"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .unwrap();

    // Reduction Metrics
    pub static ref SCORM_EVENTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "scorm_events_total",
        "Total number of SCORM runtime events reduced",
        &["kind"]
    )
    .unwrap();

    pub static ref SCORM_REDUCTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "scorm_reductions_total",
        "Total number of event batches reduced",
        &["status"]
    )
    .unwrap();

    pub static ref SCORM_VALUE_REJECTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "scorm_value_rejections_total",
        "Total number of runtime values dropped as unparseable or negative",
        &["field"]
    )
    .unwrap();
}

/// Renders all metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e)))
}

/// Helper: track database operation with metrics
pub async fn track_db_operation<F, T, E>(
    operation: &str,
    collection: &str,
    future: F,
) -> Result<T, E>
where
    F: std::future::Future<Output = Result<T, E>>,
{
    let start = std::time::Instant::now();
    let result = future.await;
    let duration = start.elapsed().as_secs_f64();

    let status = if result.is_ok() { "success" } else { "error" };

    DB_OPERATIONS_TOTAL
        .with_label_values(&[operation, collection, status])
        .inc();

    DB_OPERATION_DURATION_SECONDS
        .with_label_values(&[operation, collection])
        .observe(duration);

    result
}

pub fn record_value_rejection(field: &str) {
    SCORM_VALUE_REJECTIONS_TOTAL
        .with_label_values(&[field])
        .inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        let _ = HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/health", "200"])
            .get();
        let _ = SCORM_EVENTS_TOTAL.with_label_values(&["activity"]).get();
    }

    #[test]
    fn test_render_metrics() {
        SCORM_REDUCTIONS_TOTAL.with_label_values(&["success"]).inc();

        let result = render_metrics();
        assert!(result.is_ok());
        let output = result.unwrap();
        assert!(output.contains("scorm_reductions_total"));
    }

    #[tokio::test]
    async fn track_db_operation_passes_result_through() {
        let ok: Result<u8, String> =
            track_db_operation("find", "test_collection", async { Ok(7) }).await;
        assert_eq!(ok, Ok(7));

        let err: Result<u8, String> = track_db_operation("find", "test_collection", async {
            Err("boom".to_string())
        })
        .await;
        assert!(err.is_err());
        assert!(
            DB_OPERATIONS_TOTAL
                .with_label_values(&["find", "test_collection", "error"])
                .get()
                >= 1
        );
    }
}
