//! Query parameters shared by `List`/`Watch` across the registry and the REST surface.
use crate::labels::{ParseSelectorError, Selector};
use crate::meta::Resource;

/// Exposes `status.host` for kinds that have one, so the registry can evaluate a
/// `FieldSelector` generically. Only [`crate::types::Pod`] overrides this; every other
/// kind keeps the default `None`, which a `StatusHost` term never matches.
pub trait FieldIndexable: Resource {
    fn status_host(&self) -> Option<&str> {
        None
    }
}

/// A field selector over the small whitelisted set of fields the registry understands:
/// `status.host` and `metadata.name`. Unlike label selectors this is not a general
/// expression language — it is parsed into this closed enum directly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldSelector {
    Any,
    StatusHost(String),
    MetadataName(String),
}

impl FieldSelector {
    pub fn parse(raw: &str) -> Result<Self, ParseSelectorError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(Self::Any);
        }
        let (field, value) = raw
            .split_once('=')
            .ok_or_else(|| ParseSelectorError(raw.to_string()))?;
        match field.trim() {
            "status.host" => Ok(Self::StatusHost(value.trim().to_string())),
            "metadata.name" => Ok(Self::MetadataName(value.trim().to_string())),
            other => Err(ParseSelectorError(other.to_string())),
        }
    }

    /// `host` is `None` for kinds that have no `status.host` field at all (anything but
    /// `Pod`); a `StatusHost` term never matches those, the way a label term never
    /// matches an object missing that key.
    pub fn matches(&self, name: &str, host: Option<&str>) -> bool {
        match self {
            Self::Any => true,
            Self::MetadataName(expected) => expected == name,
            Self::StatusHost(expected) => host == Some(expected.as_str()),
        }
    }
}

/// Common query parameters for `List` and `Watch` calls on a collection.
#[derive(Clone, Debug, Default)]
pub struct ListParams {
    pub label_selector: Selector,
    pub field_selector: Option<FieldSelector>,
}

impl ListParams {
    pub fn labels(mut self, raw: &str) -> Result<Self, ParseSelectorError> {
        self.label_selector = Selector::parse(raw)?;
        Ok(self)
    }

    pub fn fields(mut self, raw: &str) -> Result<Self, ParseSelectorError> {
        self.field_selector = Some(FieldSelector::parse(raw)?);
        Ok(self)
    }
}

/// Parameters unique to `Watch`: everything `ListParams` has, plus the index to resume
/// after. `since_version: None` means "start from now".
#[derive(Clone, Debug, Default)]
pub struct WatchParams {
    pub list: ListParams,
    pub since_version: Option<u64>,
}
