// Virtual Cluster Provider Library - lifecycle management of managed virtual clusters
// This exposes the core components for testing and integration

pub mod api;
pub mod config;
pub mod errors;
pub mod observability;
pub mod resource;
pub mod schema;
pub mod telemetry;
pub mod waiter;

// Re-export key types for easy access
pub use api::{EmrContainersApi, HttpEmrContainersClient};
pub use config::ProviderConfig;
pub use errors::{ApiError, ProviderError};
pub use observability::{api_metrics, ApiMetrics, OperationTimer};
pub use resource::{ResourceData, Timeouts, VirtualClusterResource, RESOURCE_TYPE};
pub use schema::{is_valid_name, virtual_cluster_schema};
pub use telemetry::{create_operation_span, generate_correlation_id, init_telemetry};
pub use waiter::{StateChangeConf, WaitError};
