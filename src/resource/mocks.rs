// In-memory control plane for testing - no network

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::api::types::{
    CreateVirtualClusterInput, CreateVirtualClusterOutput, DeleteVirtualClusterOutput,
    DescribeVirtualClusterOutput, VirtualCluster,
};
use crate::api::EmrContainersApi;
use crate::errors::ApiError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeCall {
    Create { name: String },
    Describe { id: String },
    Delete { id: String },
}

#[derive(Debug, Default)]
struct FakeState {
    clusters: HashMap<String, VirtualCluster>,
    /// States reported by successive describes; the last one sticks
    script: VecDeque<String>,
    create_states: Vec<String>,
    delete_states: Vec<String>,
    create_failure: Option<(String, u16)>,
    describe_failure: Option<(String, u16)>,
    vanish_after_delete: bool,
    next_id: u32,
    calls: Vec<FakeCall>,
}

/// Scripted fake of the control plane that stores clusters in memory
#[derive(Debug)]
pub struct FakeEmrContainers {
    state: Mutex<FakeState>,
}

impl Default for FakeEmrContainers {
    fn default() -> Self {
        Self::new()
    }
}

fn service_error(code: &str, status: u16) -> ApiError {
    ApiError::Service {
        code: code.to_string(),
        message: format!("injected {code}"),
        status,
    }
}

fn not_found(id: &str) -> ApiError {
    ApiError::NotFound {
        message: format!("Virtual cluster {id} doesn't exist."),
    }
}

impl FakeEmrContainers {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                create_states: vec!["RUNNING".to_string()],
                delete_states: vec!["TERMINATED".to_string()],
                ..FakeState::default()
            }),
        }
    }

    pub fn with_create_states(self, states: &[&str]) -> Self {
        self.state.lock().unwrap().create_states = states.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_delete_states(self, states: &[&str]) -> Self {
        self.state.lock().unwrap().delete_states = states.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn insert_cluster(&self, cluster: VirtualCluster) {
        self.state
            .lock()
            .unwrap()
            .clusters
            .insert(cluster.id.clone(), cluster);
    }

    pub fn fail_create_with(&self, code: &str, status: u16) {
        self.state.lock().unwrap().create_failure = Some((code.to_string(), status));
    }

    pub fn fail_describe_with(&self, code: &str, status: u16) {
        self.state.lock().unwrap().describe_failure = Some((code.to_string(), status));
    }

    /// Delete removes the cluster outright instead of reporting TERMINATING
    pub fn vanish_after_delete(&self) {
        self.state.lock().unwrap().vanish_after_delete = true;
    }

    pub fn calls(&self) -> Vec<FakeCall> {
        self.state.lock().unwrap().calls.clone()
    }
}

#[async_trait]
impl EmrContainersApi for FakeEmrContainers {
    async fn create_virtual_cluster(
        &self,
        input: &CreateVirtualClusterInput,
    ) -> Result<CreateVirtualClusterOutput, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(FakeCall::Create {
            name: input.name.clone(),
        });

        if let Some((code, status)) = &state.create_failure {
            return Err(service_error(code, *status));
        }

        state.next_id += 1;
        let id = format!("vc{:04}", state.next_id);
        let arn = format!("arn:aws:emr-containers:us-west-2:123456789012:/virtualclusters/{id}");

        state.clusters.insert(
            id.clone(),
            VirtualCluster {
                id: id.clone(),
                arn: Some(arn.clone()),
                name: Some(input.name.clone()),
                state: None,
                container_provider: input.container_provider.clone(),
                created_at: Some(Utc::now()),
            },
        );
        state.script = state.create_states.iter().cloned().collect();

        Ok(CreateVirtualClusterOutput {
            id: Some(id),
            name: Some(input.name.clone()),
            arn: Some(arn),
        })
    }

    async fn describe_virtual_cluster(
        &self,
        id: &str,
    ) -> Result<DescribeVirtualClusterOutput, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(FakeCall::Describe { id: id.to_string() });

        if let Some((code, status)) = &state.describe_failure {
            return Err(service_error(code, *status));
        }

        let next_state = if state.script.len() > 1 {
            state.script.pop_front()
        } else {
            state.script.front().cloned()
        };

        let cluster = state.clusters.get_mut(id).ok_or_else(|| not_found(id))?;
        if let Some(next_state) = next_state {
            cluster.state = Some(next_state);
        }

        Ok(DescribeVirtualClusterOutput {
            virtual_cluster: Some(cluster.clone()),
        })
    }

    async fn delete_virtual_cluster(
        &self,
        id: &str,
    ) -> Result<DeleteVirtualClusterOutput, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(FakeCall::Delete { id: id.to_string() });

        if !state.clusters.contains_key(id) {
            return Err(not_found(id));
        }

        if state.vanish_after_delete {
            state.clusters.remove(id);
        } else if let Some(cluster) = state.clusters.get_mut(id) {
            cluster.state = Some("TERMINATING".to_string());
        }
        state.script = state.delete_states.iter().cloned().collect();

        Ok(DeleteVirtualClusterOutput {
            id: Some(id.to_string()),
        })
    }
}
