// Virtual cluster resource - lifecycle operations over an injected control plane client

pub mod data;
pub mod expand;
pub mod virtual_cluster;

#[cfg(test)]
pub mod mocks;

pub use data::ResourceData;
pub use virtual_cluster::{Timeouts, VirtualClusterResource, RESOURCE_TYPE};
