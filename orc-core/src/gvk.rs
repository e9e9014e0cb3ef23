//! `kind`/`apiVersion` tagging, the wire-level identity of an object's type.
use serde::{Deserialize, Serialize};

/// Type information flattened into every wire object.
///
/// This is how the codec (`orc-core::codec`) tells which concrete Rust type a decoded
/// JSON/YAML document should become, and how an encoded document tells a client what it
/// got back.
#[derive(Deserialize, Serialize, Clone, Default, Debug, Eq, PartialEq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct TypeMeta {
    pub api_version: String,
    pub kind: String,
}

impl TypeMeta {
    pub fn new(api_version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
        }
    }
}
