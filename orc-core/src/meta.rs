//! The object header every stored entity carries, and accessors over it.
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::gvk::TypeMeta;

/// Metadata common to every persisted entity: `kind`/`apiVersion` (flattened from
/// [`TypeMeta`]), a per-kind-unique `id`, the store-assigned `resourceVersion`, labels and
/// annotations, and the creation timestamp.
///
/// `resourceVersion` is `None` until the object has been written through the registry at
/// least once; the codec (`orc-core::codec`) is the only place that fills it in.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Unique id within this kind. Immutable after creation.
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<DateTime<Utc>>,
}

impl ObjectMeta {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

/// An accessor trait for every kind stored by the registry.
///
/// Mirrors the role of `kube::Resource`: it lets the registry, codec and REST surface
/// work generically over `Pod`, `ReplicationController`, `Service`, `Endpoints` and
/// `Minion` without a shared base class.
pub trait Resource {
    /// The `kind` string stamped on the wire form, e.g. `"Pod"`.
    const KIND: &'static str;
    /// The plural path segment used in the REST surface, e.g. `"pods"`.
    const PLURAL: &'static str;

    fn meta(&self) -> &ObjectMeta;
    fn meta_mut(&mut self) -> &mut ObjectMeta;
}

/// Convenience accessors layered over [`Resource`], matching the ergonomics of
/// `kube::ResourceExt` (`.name()`, `.labels()`, `.resource_version()`, ...).
pub trait ResourceExt: Resource {
    fn id(&self) -> &str {
        &self.meta().id
    }

    fn resource_version(&self) -> Option<&str> {
        self.meta().resource_version.as_deref()
    }

    fn labels(&self) -> &BTreeMap<String, String> {
        &self.meta().labels
    }

    fn labels_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.meta_mut().labels
    }

    fn annotations(&self) -> &BTreeMap<String, String> {
        &self.meta().annotations
    }

    /// The canonical REST path for this object, derived rather than stored.
    fn self_link(&self, api_version: &str) -> String
    where
        Self: Sized,
    {
        format!("/api/{api_version}/{}/{}", Self::PLURAL, self.id())
    }
}

impl<K: Resource> ResourceExt for K {}

/// Stamps `kind`/`apiVersion` onto a type at the value level, used by the codec to tag
/// the wire form without requiring every concrete type to carry a redundant field.
pub fn type_meta_of<K: Resource>(api_version: &str) -> TypeMeta {
    TypeMeta {
        api_version: api_version.to_string(),
        kind: K::KIND.to_string(),
    }
}
