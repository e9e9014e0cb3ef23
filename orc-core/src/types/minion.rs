use serde::{Deserialize, Serialize};

use crate::meta::{ObjectMeta, Resource};
use crate::params::FieldIndexable;

/// A worker host. Membership is static for this core: the set is given at bootstrap
/// (`orc-server` config) rather than reconciled through its own lifecycle, so
/// `Minion` objects are registry-readable but never created or deleted through the REST
/// surface.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Minion {
    #[serde(flatten)]
    pub metadata: ObjectMeta,
    pub address: String,
}

impl Resource for Minion {
    const KIND: &'static str = "Minion";
    const PLURAL: &'static str = "minions";

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

impl FieldIndexable for Minion {}
