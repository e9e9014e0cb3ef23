//! The data model: `Pod`, `ReplicationController`, `Service`, `Endpoints`, `Minion`.
mod endpoints;
mod minion;
mod pod;
mod replication_controller;
mod service;

pub use endpoints::{Endpoints, EndpointsSubset};
pub use minion::Minion;
pub use pod::{Container, ContainerPort, ContainerState, ContainerStatus, Pod, PodPhase, PodSpec, PodStatus, Protocol};
pub use replication_controller::{PodTemplateSpec, ReplicationController, ReplicationControllerSpec, ReplicationControllerStatus};
pub use service::{Service, ServiceSpec};
