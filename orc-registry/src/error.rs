use orc_core::Error;
use orc_store::Error as StoreError;

/// Translate a transport-level store error into the domain error the caller's `kind`
/// reports it as. `orc-store`'s `Conflict` means different things depending on context
/// (a genuine optimistic-concurrency conflict on update, or "already exists" on create) —
/// callers that need that distinction match on the store error themselves before falling
/// back to this for everything else.
pub(crate) fn translate(err: StoreError, kind: &'static str, id: &str) -> Error {
    match err {
        StoreError::NotFound(_) => Error::NotFound {
            kind,
            id: id.to_string(),
        },
        StoreError::Conflict { .. } => Error::Conflict {
            kind,
            id: id.to_string(),
            reason: "resourceVersion mismatch".to_string(),
        },
        StoreError::Transient(msg) => Error::ServerTimeout(msg),
    }
}

pub(crate) fn internal_err(err: impl std::fmt::Display) -> Error {
    Error::Internal(err.to_string())
}
