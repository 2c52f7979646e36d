use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Control plane API usage metrics
#[derive(Debug, Default)]
pub struct ApiMetrics {
    pub total_requests: AtomicU64,
    pub not_found: AtomicU64,
    pub errors: AtomicU64,
    pub status_probes: AtomicU64,
}

impl ApiMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_not_found(&self) {
        self.not_found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_status_probe(&self) {
        self.status_probes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> ApiStats {
        ApiStats {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            status_probes: self.status_probes.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            total_requests = stats.total_requests,
            not_found = stats.not_found,
            errors = stats.errors,
            status_probes = stats.status_probes,
            "Control plane API metrics"
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiStats {
    pub total_requests: u64,
    pub not_found: u64,
    pub errors: u64,
    pub status_probes: u64,
}

/// Global metrics instance
static API_METRICS: std::sync::LazyLock<ApiMetrics> = std::sync::LazyLock::new(ApiMetrics::new);

pub fn api_metrics() -> &'static ApiMetrics {
    &API_METRICS
}

/// Time an operation and log its duration when finished
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn finish(self) {
        let duration = self.start.elapsed();
        info!(
            operation = %self.operation,
            duration_ms = duration.as_millis() as u64,
            "Operation completed"
        );
    }
}
