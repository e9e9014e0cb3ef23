use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("expected kind {expected:?}, found {found:?}")]
    KindMismatch {
        expected: &'static str,
        found: String,
    },

    #[error("unsupported api version {0:?}")]
    UnsupportedVersion(String),

    #[error("unknown kind {0:?}")]
    UnknownKind(String),

    #[error("failed to encode object: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode object: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to encode yaml: {0}")]
    EncodeYaml(#[source] serde_yaml::Error),

    #[error("failed to decode yaml: {0}")]
    DecodeYaml(#[source] serde_yaml::Error),
}
