use serde::de::DeserializeOwned;
use serde::Serialize;

use super::CodecError;

/// The wire encodings the REST surface negotiates via `Accept`/`Content-Type`.
/// Both share the one `serde`-derived representation produced by [`super::encode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    pub fn content_type(self) -> &'static str {
        match self {
            Format::Json => "application/json",
            Format::Yaml => "application/yaml",
        }
    }

    /// Picks a format from an `Accept` header value, defaulting to JSON. Any mention of
    /// `yaml` anywhere in the header is enough — this is a content-negotiation
    /// convenience, not a strict media-type parser.
    pub fn from_accept(accept: Option<&str>) -> Self {
        match accept {
            Some(value) if value.to_ascii_lowercase().contains("yaml") => Format::Yaml,
            _ => Format::Json,
        }
    }

    pub fn encode<T: Serialize>(self, value: &T) -> Result<Vec<u8>, CodecError> {
        match self {
            Format::Json => serde_json::to_vec(value).map_err(CodecError::Encode),
            Format::Yaml => serde_yaml::to_string(value)
                .map(String::into_bytes)
                .map_err(CodecError::EncodeYaml),
        }
    }

    pub fn decode<T: DeserializeOwned>(self, bytes: &[u8]) -> Result<T, CodecError> {
        match self {
            Format::Json => serde_json::from_slice(bytes).map_err(CodecError::Decode),
            Format::Yaml => serde_yaml::from_slice(bytes).map_err(CodecError::DecodeYaml),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_json() {
        assert_eq!(Format::from_accept(None), Format::Json);
        assert_eq!(Format::from_accept(Some("application/json")), Format::Json);
    }

    #[test]
    fn recognizes_yaml() {
        assert_eq!(Format::from_accept(Some("application/yaml")), Format::Yaml);
        assert_eq!(Format::from_accept(Some("text/x-yaml; q=0.9")), Format::Yaml);
    }
}
