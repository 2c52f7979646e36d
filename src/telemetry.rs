use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

/// Initialize structured JSON logging.
///
/// `RUST_LOG` wins over the configured level when it is set.
pub fn init_telemetry(log_level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(log_level)?,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .try_init()?;

    tracing::debug!("Telemetry initialized with structured logging");
    Ok(())
}

/// Generate a correlation ID for linking the calls of one operation
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Create a span with the common resource operation attributes
pub fn create_operation_span(
    operation: &str,
    resource_id: Option<&str>,
    correlation_id: &str,
) -> tracing::Span {
    tracing::info_span!(
        "resource_operation",
        operation = operation,
        resource.id = resource_id,
        correlation.id = correlation_id,
        otel.kind = "internal"
    )
}
