use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::meta::{ObjectMeta, Resource};
use crate::params::FieldIndexable;
use crate::types::pod::PodSpec;

/// Desired-count reconciler for a labeled pod set.
///
/// Invariants (enforced by the registry, not this type): the selector must match the
/// template's labels; deletion requires `spec.replicas == 0` (stop-before-delete).
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReplicationController {
    #[serde(flatten)]
    pub metadata: ObjectMeta,
    pub spec: ReplicationControllerSpec,
    #[serde(default)]
    pub status: ReplicationControllerStatus,
}

impl Resource for ReplicationController {
    const KIND: &'static str = "ReplicationController";
    const PLURAL: &'static str = "replicationcontrollers";

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

impl FieldIndexable for ReplicationController {}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReplicationControllerSpec {
    pub replicas: u32,
    pub selector: BTreeMap<String, String>,
    pub template: PodTemplateSpec,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PodTemplateSpec {
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    pub spec: PodSpec,
}

/// Observed replica count, reported by the replication controller manager for
/// operational visibility; never consulted by any invariant.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReplicationControllerStatus {
    #[serde(default)]
    pub replicas: u32,
}
