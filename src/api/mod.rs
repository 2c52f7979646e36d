// Remote control-plane client for virtual clusters

pub mod client;
pub mod types;

pub use client::{EmrContainersApi, HttpEmrContainersClient};
#[cfg(any(test, feature = "testing"))]
pub use client::MockEmrContainersApi;
pub use types::{
    ContainerInfo, ContainerProvider, CreateVirtualClusterInput, CreateVirtualClusterOutput,
    DeleteVirtualClusterOutput, DescribeVirtualClusterOutput, EksInfo, VirtualCluster,
};
