//! Bidirectional conversion between the internal object model and its wire shapes.
//!
//! Every kind round-trips through a single `serde`-derived representation: the
//! same struct is serialized as JSON or YAML depending on what the caller negotiated, so
//! the two formats can never drift from each other the way a hand-maintained JSON schema
//! and a hand-maintained YAML schema would.
mod error;
mod format;
mod registry;

pub use error::CodecError;
pub use format::Format;
pub use registry::{KnownKind, KNOWN_KINDS};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::gvk::TypeMeta;
use crate::meta::Resource;

/// The only API version this core currently speaks. A second version would add an entry
/// to the conversion table below rather than a new field on every type.
pub const API_VERSION: &str = "v1";

/// Encode `obj` to a [`serde_json::Value`] with `kind`/`apiVersion` stamped on (flattened
/// alongside the object's own fields, matching the wire shape `{kind, apiVersion, id,
/// resourceVersion, ...}`).
pub fn encode<K>(obj: &K) -> Result<serde_json::Value, CodecError>
where
    K: Resource + Serialize,
{
    let mut value = serde_json::to_value(obj).map_err(CodecError::Encode)?;
    let type_meta = TypeMeta::new(API_VERSION, K::KIND);
    merge_type_meta(&mut value, &type_meta);
    Ok(value)
}

/// Decode a wire value into `K`, checking that its `kind`/`apiVersion` match `K::KIND`
/// and [`API_VERSION`] before handing it to `serde`. A caller with an unknown kind
/// string never reaches this function — it resolves the kind via [`KNOWN_KINDS`] first
/// and picks the matching typed path.
pub fn decode<K>(value: serde_json::Value) -> Result<K, CodecError>
where
    K: Resource + DeserializeOwned,
{
    if let Some(type_meta) = read_type_meta(&value) {
        if type_meta.kind != K::KIND {
            return Err(CodecError::KindMismatch {
                expected: K::KIND,
                found: type_meta.kind,
            });
        }
        if type_meta.api_version != API_VERSION {
            return Err(CodecError::UnsupportedVersion(type_meta.api_version));
        }
    }
    serde_json::from_value(value).map_err(CodecError::Decode)
}

/// Stamp the `resourceVersion` the store assigned on write. The codec is the only place
/// this field is set — the registry calls this right after a successful store write, and
/// parses the caller-supplied one back out on update to feed CAS.
pub fn stamp_resource_version<K: Resource>(obj: &mut K, index: u64) {
    obj.meta_mut().resource_version = Some(index.to_string());
}

/// Parse a caller-supplied `resourceVersion` string back into the store index it names,
/// for feeding into a CAS `prevIndex`. Absent or unparseable is "no expectation" — callers
/// that require one reject `None` themselves (`Update` does; `Create` doesn't apply).
pub fn parse_resource_version(raw: &str) -> Option<u64> {
    raw.parse().ok()
}

fn merge_type_meta(value: &mut serde_json::Value, type_meta: &TypeMeta) {
    if let serde_json::Value::Object(map) = value {
        map.insert("kind".into(), serde_json::Value::String(type_meta.kind.clone()));
        map.insert(
            "apiVersion".into(),
            serde_json::Value::String(type_meta.api_version.clone()),
        );
    }
}

fn read_type_meta(value: &serde_json::Value) -> Option<TypeMeta> {
    let map = value.as_object()?;
    let kind = map.get("kind")?.as_str()?.to_string();
    let api_version = map.get("apiVersion")?.as_str()?.to_string();
    Some(TypeMeta { api_version, kind })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Minion;

    #[test]
    fn encode_stamps_kind_and_api_version() {
        let minion = Minion {
            metadata: crate::meta::ObjectMeta::new("host-a"),
            address: "10.0.0.1:7000".into(),
        };
        let value = encode(&minion).unwrap();
        assert_eq!(value["kind"], "Minion");
        assert_eq!(value["apiVersion"], API_VERSION);
        assert_eq!(value["id"], "host-a");
    }

    #[test]
    fn decode_rejects_kind_mismatch() {
        let mut value = serde_json::json!({
            "id": "x",
            "address": "10.0.0.1:7000",
        });
        value["kind"] = "Service".into();
        value["apiVersion"] = API_VERSION.into();
        let err = decode::<Minion>(value).unwrap_err();
        assert!(matches!(err, CodecError::KindMismatch { .. }));
    }

    #[test]
    fn decode_accepts_missing_type_meta() {
        let value = serde_json::json!({
            "id": "host-a",
            "address": "10.0.0.1:7000",
        });
        let minion: Minion = decode(value).unwrap();
        assert_eq!(minion.metadata.id, "host-a");
    }

    #[test]
    fn round_trip_is_identity_on_known_fields() {
        let minion = Minion {
            metadata: crate::meta::ObjectMeta::new("host-a"),
            address: "10.0.0.1:7000".into(),
        };
        let encoded = encode(&minion).unwrap();
        let decoded: Minion = decode(encoded).unwrap();
        assert_eq!(minion, decoded);
    }
}
