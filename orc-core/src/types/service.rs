use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::meta::{ObjectMeta, Resource};
use crate::params::FieldIndexable;

/// A stable virtual endpoint fronting a labeled pod set.
///
/// Creating a `Service` also creates an empty [`Endpoints`](crate::types::Endpoints) of the
/// same id; the endpoints controller fills it in as matching pods come up.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    #[serde(flatten)]
    pub metadata: ObjectMeta,
    pub spec: ServiceSpec,
}

impl Resource for Service {
    const KIND: &'static str = "Service";
    const PLURAL: &'static str = "services";

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

impl FieldIndexable for Service {}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpec {
    pub port: u16,
    pub selector: BTreeMap<String, String>,
}
