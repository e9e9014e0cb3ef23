//! Resolves the `<kind>` path segment to the typed registry/watch operation it names.
//! One match per verb, each arm a single call into the concrete per-kind registry —
//! mirroring `orc_core::codec::registry`'s own choice not to erase the kind behind a
//! `dyn Resource`, since the set of kinds is fixed at compile time.
use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use orc_core::codec::{self, Format, KnownKind};
use orc_core::meta::{Resource, ResourceExt};
use orc_core::{Error, ListParams, Result as CoreResult, WatchEvent, WatchParams};
use orc_registry::Registries;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::state::Watches;

pub async fn get(registries: &Registries, kind: KnownKind, id: &str) -> CoreResult<serde_json::Value> {
    match kind {
        KnownKind::Pod => encode_one(registries.pods.get(id).await?),
        KnownKind::ReplicationController => encode_one(registries.replication_controllers.get(id).await?),
        KnownKind::Service => encode_one(registries.services.get(id).await?),
        KnownKind::Endpoints => encode_one(registries.endpoints.get(id).await?),
        KnownKind::Minion => encode_one(registries.minions.get(id).await?),
    }
}

/// Returns the encoded collection plus the highest `resourceVersion` observed, usable to
/// start a watch where the list left off.
pub async fn list(registries: &Registries, kind: KnownKind, params: &ListParams) -> CoreResult<(Vec<serde_json::Value>, Option<u64>)> {
    match kind {
        KnownKind::Pod => encode_list(registries.pods.list(params).await?),
        KnownKind::ReplicationController => encode_list(registries.replication_controllers.list(params).await?),
        KnownKind::Service => encode_list(registries.services.list(params).await?),
        KnownKind::Endpoints => encode_list(registries.endpoints.list(params).await?),
        KnownKind::Minion => encode_list(registries.minions.list(params).await?),
    }
}

pub async fn create(registries: &Registries, kind: KnownKind, format: Format, body: &[u8]) -> CoreResult<serde_json::Value> {
    match kind {
        KnownKind::Pod => create_one(format, body, |obj| registries.pods.create(obj)).await,
        KnownKind::ReplicationController => create_one(format, body, |obj| registries.replication_controllers.create(obj)).await,
        KnownKind::Service => create_one(format, body, |obj| registries.services.create(obj)).await,
        KnownKind::Endpoints => create_one(format, body, |obj| registries.endpoints.create(obj)).await,
        KnownKind::Minion => create_one(format, body, |obj| registries.minions.create(obj)).await,
    }
}

pub async fn update(registries: &Registries, kind: KnownKind, format: Format, id: &str, body: &[u8]) -> CoreResult<serde_json::Value> {
    match kind {
        KnownKind::Pod => update_one(format, id, body, |obj| registries.pods.update(obj)).await,
        KnownKind::ReplicationController => update_one(format, id, body, |obj| registries.replication_controllers.update(obj)).await,
        KnownKind::Service => update_one(format, id, body, |obj| registries.services.update(obj)).await,
        KnownKind::Endpoints => update_one(format, id, body, |obj| registries.endpoints.update(obj)).await,
        KnownKind::Minion => update_one(format, id, body, |obj| registries.minions.update(obj)).await,
    }
}

pub async fn delete(registries: &Registries, kind: KnownKind, id: &str) -> CoreResult<serde_json::Value> {
    match kind {
        KnownKind::Pod => encode_one(registries.pods.delete(id).await?),
        KnownKind::ReplicationController => encode_one(registries.replication_controllers.delete(id).await?),
        KnownKind::Service => encode_one(registries.services.delete(id).await?),
        KnownKind::Endpoints => encode_one(registries.endpoints.delete(id).await?),
        KnownKind::Minion => encode_one(registries.minions.delete(id).await?),
    }
}

/// A chunked stream of newline-delimited, format-encoded `WatchEvent`s. A stream
/// error becomes a terminal `WatchEvent::Error` chunk rather than a torn HTTP body.
pub async fn watch(
    watches: &Watches,
    kind: KnownKind,
    format: Format,
    params: &WatchParams,
) -> CoreResult<Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>> {
    match kind {
        KnownKind::Pod => Ok(to_lines(watches.pods.subscribe(params).await?, format)),
        KnownKind::ReplicationController => Ok(to_lines(watches.replication_controllers.subscribe(params).await?, format)),
        KnownKind::Service => Ok(to_lines(watches.services.subscribe(params).await?, format)),
        KnownKind::Endpoints => Ok(to_lines(watches.endpoints.subscribe(params).await?, format)),
        KnownKind::Minion => Ok(to_lines(watches.minions.subscribe(params).await?, format)),
    }
}

fn to_lines<K, S>(stream: S, format: Format) -> Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>
where
    K: Serialize + Send + 'static,
    S: Stream<Item = CoreResult<WatchEvent<K>>> + Send + 'static,
{
    Box::pin(stream.map(move |item| {
        let event = item.unwrap_or_else(|err| WatchEvent::Error(err.to_status()));
        let mut line = format.encode(&event).unwrap_or_else(|_| b"{}".to_vec());
        line.push(b'\n');
        Ok(Bytes::from(line))
    }))
}

fn encode_one<K: Resource + Serialize>(obj: K) -> CoreResult<serde_json::Value> {
    codec::encode(&obj).map_err(encode_err)
}

fn encode_list<K: Resource + ResourceExt + Serialize>(objs: Vec<K>) -> CoreResult<(Vec<serde_json::Value>, Option<u64>)> {
    let max_version = objs
        .iter()
        .filter_map(|o| o.resource_version().and_then(codec::parse_resource_version))
        .max();
    let values = objs.iter().map(codec::encode).collect::<Result<Vec<_>, _>>().map_err(encode_err)?;
    Ok((values, max_version))
}

async fn create_one<K, Upd, Fut>(format: Format, body: &[u8], creator: Upd) -> CoreResult<serde_json::Value>
where
    K: Resource + ResourceExt + Serialize + DeserializeOwned,
    Upd: FnOnce(K) -> Fut,
    Fut: Future<Output = CoreResult<K>>,
{
    let obj: K = decode_body(format, body)?;
    encode_one(creator(obj).await?)
}

async fn update_one<K, Upd, Fut>(format: Format, id: &str, body: &[u8], updater: Upd) -> CoreResult<serde_json::Value>
where
    K: Resource + ResourceExt + Serialize + DeserializeOwned,
    Upd: FnOnce(K) -> Fut,
    Fut: Future<Output = CoreResult<K>>,
{
    let obj: K = decode_body(format, body)?;
    if obj.id() != id {
        return Err(Error::Invalid {
            kind: K::KIND,
            id: id.to_string(),
            message: "body id does not match the URL path".to_string(),
        });
    }
    encode_one(updater(obj).await?)
}

fn decode_body<K>(format: Format, body: &[u8]) -> CoreResult<K>
where
    K: Resource + DeserializeOwned,
{
    let invalid = |message: String| Error::Invalid {
        kind: K::KIND,
        id: String::new(),
        message,
    };
    let value: serde_json::Value = format.decode(body).map_err(|e| invalid(e.to_string()))?;
    codec::decode(value).map_err(|e| invalid(e.to_string()))
}

fn encode_err(err: codec::CodecError) -> Error {
    Error::Internal(err.to_string())
}
