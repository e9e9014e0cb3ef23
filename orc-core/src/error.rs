//! The domain-level error hierarchy every registry and control-loop operation returns.
//!
//! `orc-store` has its own, lower-level `Error` for transport/CAS failures; the registry
//! is the boundary that translates those into one of the kinds below, so the REST surface
//! only ever has to map `orc_core::Error` to HTTP (see `orc-api::error`), never a store
//! internal.
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The error kinds named in the specification's error handling design: each carries a
/// human message and a machine-readable reason.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{kind} {id:?} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} {id:?} already exists")]
    AlreadyExists { kind: &'static str, id: String },

    #[error("conflict updating {kind} {id:?}: {reason}")]
    Conflict {
        kind: &'static str,
        id: String,
        reason: String,
    },

    #[error("{kind} {id:?} is invalid: {message}")]
    Invalid {
        kind: &'static str,
        id: String,
        message: String,
    },

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("server timeout: {0}")]
    ServerTimeout(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn reason(&self) -> &'static str {
        match self {
            Error::NotFound { .. } => "NotFound",
            Error::AlreadyExists { .. } => "AlreadyExists",
            Error::Conflict { .. } => "Conflict",
            Error::Invalid { .. } => "Invalid",
            Error::Unauthorized => "Unauthorized",
            Error::Forbidden(_) => "Forbidden",
            Error::ServerTimeout(_) => "ServerTimeout",
            Error::Internal(_) => "Internal",
        }
    }

    /// The HTTP status code the REST surface maps this kind to.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            Error::Conflict { .. } => 409,
            Error::Invalid { .. } => 422,
            Error::Unauthorized => 401,
            Error::Forbidden(_) => 403,
            Error::AlreadyExists { .. } => 409,
            Error::ServerTimeout(_) => 504,
            Error::Internal(_) => 500,
        }
    }

    pub fn to_status(&self) -> Status {
        Status {
            code: self.http_status(),
            status: "Failure".to_string(),
            message: self.to_string(),
            reason: self.reason().to_string(),
        }
    }
}

/// The structured error body returned on every non-2xx REST response, and carried inside
/// an `Error` watch event.
///
/// Equivalent in role to `kube_core::response::Status`, simplified to the fields the
/// specification actually names (`{status, message, reason, code}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub code: u16,
    pub status: String,
    pub message: String,
    pub reason: String,
}
