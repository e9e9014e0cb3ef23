use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Transport-level failures from the persistence adapter. The registry (`orc-registry`) is
/// the boundary that translates these into `orc_core::Error` — nothing above this crate
/// should ever match on a variant here directly.
#[derive(Debug, Error)]
pub enum Error {
    #[error("key {0:?} not found")]
    NotFound(String),

    #[error("compare-and-swap failed on {key:?}: expected index {expected:?}, found {actual}")]
    Conflict {
        key: String,
        expected: Option<u64>,
        actual: u64,
    },

    /// A retryable failure, synthesized by the adapter itself as an ambient concern, and
    /// retried with bounded exponential backoff before ever reaching a caller. A real
    /// distributed backend would raise this for connection resets, leader elections, and
    /// the like; `MemStore` only produces it when deliberately injected by a test.
    #[error("transient store error: {0}")]
    Transient(String),
}

impl Error {
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Transient(_))
    }
}
