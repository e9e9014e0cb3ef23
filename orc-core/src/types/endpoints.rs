use serde::{Deserialize, Serialize};

use crate::meta::{ObjectMeta, Resource};
use crate::params::FieldIndexable;

/// The derived current membership of a [`Service`](crate::types::Service), keyed by the
/// same id. Written solely by the endpoints controller; a client write is allowed to
/// succeed too, but the controller's next pass always wins (CAS, last writer).
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Endpoints {
    #[serde(flatten)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub subsets: Vec<EndpointsSubset>,
}

impl Resource for Endpoints {
    const KIND: &'static str = "Endpoints";
    const PLURAL: &'static str = "endpoints";

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

impl FieldIndexable for Endpoints {}

/// One `(host, port)` tuple backing the service, kept sorted so repeated convergence
/// passes that land on the same membership produce identical wire output.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub struct EndpointsSubset {
    pub host: String,
    pub port: u16,
}
