//! Wire shape of a watch stream event.
//!
//! A watch is a chunked stream of newline-delimited JSON (or YAML, per content
//! negotiation) objects of this shape, in `resourceVersion` order, terminated on error by
//! an `Error` event carrying a [`Status`](crate::error::Status).
use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::error::Status;

#[derive(Deserialize, Serialize, Clone)]
#[serde(tag = "type", content = "object", rename_all = "UPPERCASE")]
pub enum WatchEvent<K> {
    Added(K),
    Modified(K),
    /// Carries the last known state of the object before deletion.
    Deleted(K),
    Error(Status),
}

impl<K> WatchEvent<K> {
    /// The carried object, for every variant except `Error`. Used by anything that wants
    /// to re-apply a selector to an already-decoded event without matching on the variant
    /// itself (the watch multiplexer, the control loops).
    pub fn object(&self) -> Option<&K> {
        match self {
            WatchEvent::Added(obj) | WatchEvent::Modified(obj) | WatchEvent::Deleted(obj) => Some(obj),
            WatchEvent::Error(_) => None,
        }
    }
}

impl<K> Debug for WatchEvent<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WatchEvent::Added(_) => write!(f, "Added event"),
            WatchEvent::Modified(_) => write!(f, "Modified event"),
            WatchEvent::Deleted(_) => write!(f, "Deleted event"),
            WatchEvent::Error(s) => write!(f, "Error event: {s:?}"),
        }
    }
}
