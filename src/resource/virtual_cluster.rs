use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::types::{format_timestamp, virtual_cluster_state, CreateVirtualClusterInput, VirtualCluster};
use crate::api::EmrContainersApi;
use crate::config::TimeoutsConfig;
use crate::errors::{ApiError, ProviderError, WaitAction};
use crate::observability::{api_metrics, OperationTimer};
use crate::resource::data::ResourceData;
use crate::resource::expand::{expand_container_provider, flatten_container_provider};
use crate::schema::{virtual_cluster_schema, Block};
use crate::waiter::{RefreshError, Refreshed, StateChangeConf, WaitError};

/// Type name the resource is registered under.
pub const RESOURCE_TYPE: &str = "emrcontainers_virtual_cluster";

pub const STATUS_NOT_FOUND: &str = "NotFound";
pub const STATUS_UNKNOWN: &str = "Unknown";

/// Maximum amount of time to wait for a virtual cluster creation
pub const VIRTUAL_CLUSTER_CREATED_TIMEOUT: Duration = Duration::from_secs(90 * 60);
/// Maximum amount of time to wait for a virtual cluster deletion
pub const VIRTUAL_CLUSTER_DELETED_TIMEOUT: Duration = Duration::from_secs(90 * 60);
/// Delay between two status checks
pub const VIRTUAL_CLUSTER_POLL_DELAY: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub delete: Duration,
    pub delay: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create: VIRTUAL_CLUSTER_CREATED_TIMEOUT,
            delete: VIRTUAL_CLUSTER_DELETED_TIMEOUT,
            delay: VIRTUAL_CLUSTER_POLL_DELAY,
        }
    }
}

impl From<&TimeoutsConfig> for Timeouts {
    fn from(config: &TimeoutsConfig) -> Self {
        Self {
            create: config.create_timeout(),
            delete: config.delete_timeout(),
            delay: config.poll_delay(),
        }
    }
}

/// The virtual cluster resource: create, read, delete and import.
///
/// The control plane client is passed into every operation; nothing is
/// cached between calls.
#[derive(Debug, Clone, Default)]
pub struct VirtualClusterResource {
    timeouts: Timeouts,
}

impl VirtualClusterResource {
    pub fn new(timeouts: Timeouts) -> Self {
        Self { timeouts }
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    pub fn schema(&self) -> &'static Block {
        virtual_cluster_schema()
    }

    pub async fn create<C>(&self, conn: &C, d: &mut ResourceData) -> Result<(), ProviderError>
    where
        C: EmrContainersApi + ?Sized,
    {
        let errors = self.schema().validate(d.attributes());
        if !errors.is_empty() {
            return Err(ProviderError::InvalidConfig { errors });
        }

        let timer = OperationTimer::new("create_virtual_cluster");
        let input = CreateVirtualClusterInput {
            name: d
                .get_str("name")
                .ok_or(ProviderError::MissingAttribute("name"))?
                .to_string(),
            container_provider: expand_container_provider(d.get_list("container_provider")),
            client_token: Uuid::new_v4().to_string(),
        };

        info!(name = %input.name, provider = ?input.container_provider, "Creating virtual cluster");
        let out = conn
            .create_virtual_cluster(&input)
            .await
            .map_err(ProviderError::Create)?;

        let id = out
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                ProviderError::Create(ApiError::InvalidResponse(
                    "create response carries no virtual cluster id".to_string(),
                ))
            })?;
        d.set_id(id);
        d.mark_new_resource();

        wait_virtual_cluster_created(conn, d.id(), self.timeouts.create, self.timeouts.delay)
            .await
            .map_err(|source| ProviderError::Wait {
                id: d.id().to_string(),
                action: WaitAction::Creation,
                source,
            })?;

        timer.finish();
        self.read(conn, d).await
    }

    pub async fn read<C>(&self, conn: &C, d: &mut ResourceData) -> Result<(), ProviderError>
    where
        C: EmrContainersApi + ?Sized,
    {
        let id = d.id().to_string();

        let vc = match find_virtual_cluster_by_id(conn, &id).await {
            Ok(Some(vc)) => vc,
            Ok(None) => {
                warn!(id = %id, "Virtual cluster not found, removing from state");
                d.set_id("");
                return Ok(());
            }
            Err(e) if e.is_not_found() && !d.is_new_resource() => {
                warn!(id = %id, "Virtual cluster not found, removing from state");
                d.set_id("");
                return Ok(());
            }
            Err(source) => return Err(ProviderError::Read { id, source }),
        };

        d.set("arn", vc.arn.clone());
        d.set(
            "container_provider",
            Value::Array(flatten_container_provider(vc.container_provider.as_ref())),
        );
        d.set(
            "created_at",
            vc.created_at.as_ref().map(format_timestamp).unwrap_or_default(),
        );
        d.set("name", vc.name.clone());
        d.set("state", vc.state.clone());

        Ok(())
    }

    pub async fn delete<C>(&self, conn: &C, d: &mut ResourceData) -> Result<(), ProviderError>
    where
        C: EmrContainersApi + ?Sized,
    {
        let id = d.id().to_string();
        let timer = OperationTimer::new("delete_virtual_cluster");

        info!(id = %id, "Deleting virtual cluster");
        match conn.delete_virtual_cluster(&id).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                debug!(id = %id, "Virtual cluster already gone");
                return Ok(());
            }
            Err(source) => return Err(ProviderError::Delete { id, source }),
        }

        wait_virtual_cluster_deleted(conn, &id, self.timeouts.delete, self.timeouts.delay)
            .await
            .map_err(|source| ProviderError::Wait {
                id: id.clone(),
                action: WaitAction::Deletion,
                source,
            })?;

        timer.finish();
        Ok(())
    }

    /// Pass-through import: the id is all that is needed, the following read fills the rest.
    pub fn import(&self, id: &str) -> Vec<ResourceData> {
        vec![ResourceData::with_id(id)]
    }
}

/// Returns the virtual cluster with the given id, or `None` when the
/// service answers without one.
pub async fn find_virtual_cluster_by_id<C>(
    conn: &C,
    id: &str,
) -> Result<Option<VirtualCluster>, ApiError>
where
    C: EmrContainersApi + ?Sized,
{
    let output = conn.describe_virtual_cluster(id).await?;
    Ok(output.virtual_cluster)
}

/// Status probe used by the waiters.
pub async fn status_virtual_cluster<C>(
    conn: &C,
    id: &str,
) -> Result<Refreshed<VirtualCluster>, RefreshError<ApiError>>
where
    C: EmrContainersApi + ?Sized,
{
    api_metrics().record_status_probe();

    match find_virtual_cluster_by_id(conn, id).await {
        Err(e) if e.is_not_found() => Ok(Refreshed::absent(STATUS_NOT_FOUND)),
        Err(e) => Err(RefreshError::new(STATUS_UNKNOWN, e)),
        Ok(None) => Ok(Refreshed::absent(STATUS_NOT_FOUND)),
        Ok(Some(vc)) => {
            let state = vc.state().to_string();
            Ok(Refreshed::found(vc, state))
        }
    }
}

/// Waits for a virtual cluster to become RUNNING.
///
/// No pending set: the service reports no transitional state while creating,
/// so any other state is tolerated until the deadline.
pub async fn wait_virtual_cluster_created<C>(
    conn: &C,
    id: &str,
    timeout: Duration,
    delay: Duration,
) -> Result<Option<VirtualCluster>, WaitError<ApiError>>
where
    C: EmrContainersApi + ?Sized,
{
    StateChangeConf::new(
        vec![],
        vec![virtual_cluster_state::RUNNING.to_string()],
        timeout,
        delay,
        || status_virtual_cluster(conn, id),
    )
    .wait_for_state()
    .await
}

/// Waits for a virtual cluster to become TERMINATED. A cluster that
/// disappears altogether counts as deleted.
pub async fn wait_virtual_cluster_deleted<C>(
    conn: &C,
    id: &str,
    timeout: Duration,
    delay: Duration,
) -> Result<Option<VirtualCluster>, WaitError<ApiError>>
where
    C: EmrContainersApi + ?Sized,
{
    let result = StateChangeConf::new(
        vec![virtual_cluster_state::TERMINATING.to_string()],
        vec![virtual_cluster_state::TERMINATED.to_string()],
        timeout,
        delay,
        || status_virtual_cluster(conn, id),
    )
    .with_not_found_checks(0)
    .wait_for_state()
    .await;

    match result {
        Err(WaitError::NotFound { .. }) => Ok(None),
        other => other,
    }
}
