//! Shared data model, selectors, codec and error types for the orchestrator core.
//!
//! This crate has no knowledge of HTTP or of any particular storage backend; it is the
//! vocabulary that `orc-store`, `orc-registry`, `orc-runtime` and `orc-api` all share.

pub mod codec;
pub mod error;
pub mod gvk;
pub mod labels;
pub mod meta;
pub mod params;
pub mod types;
pub mod watch;

pub use error::{Error, Result, Status};
pub use gvk::TypeMeta;
pub use labels::Selector;
pub use meta::{ObjectMeta, Resource, ResourceExt};
pub use params::{FieldIndexable, FieldSelector, ListParams, WatchParams};
pub use watch::WatchEvent;
