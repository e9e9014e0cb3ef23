use super::{CodecError, API_VERSION};

/// One `(apiVersion, kind)` binding the codec knows about. The REST surface resolves the
/// `<kind>` path segment (plural, lowercase — e.g. `pods`) to one of these before
/// dispatching to the typed registry operation for that kind; there is deliberately no
/// fully-erased `dyn Resource` path, since the set of kinds is fixed at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownKind {
    Pod,
    ReplicationController,
    Service,
    Endpoints,
    Minion,
}

impl KnownKind {
    pub const fn kind(self) -> &'static str {
        match self {
            KnownKind::Pod => "Pod",
            KnownKind::ReplicationController => "ReplicationController",
            KnownKind::Service => "Service",
            KnownKind::Endpoints => "Endpoints",
            KnownKind::Minion => "Minion",
        }
    }

    pub const fn plural(self) -> &'static str {
        match self {
            KnownKind::Pod => "pods",
            KnownKind::ReplicationController => "replicationcontrollers",
            KnownKind::Service => "services",
            KnownKind::Endpoints => "endpoints",
            KnownKind::Minion => "minions",
        }
    }

    pub const fn api_version(self) -> &'static str {
        API_VERSION
    }

    /// Resolve a URL path segment (e.g. the `<kind>` in `/api/v1/<kind>`) to a known
    /// kind. Unknown segments are the caller's 404, not a panic.
    pub fn from_plural(plural: &str) -> Result<Self, CodecError> {
        KNOWN_KINDS
            .iter()
            .copied()
            .find(|k| k.plural() == plural)
            .ok_or_else(|| CodecError::UnknownKind(plural.to_string()))
    }
}

pub const KNOWN_KINDS: &[KnownKind] = &[
    KnownKind::Pod,
    KnownKind::ReplicationController,
    KnownKind::Service,
    KnownKind::Endpoints,
    KnownKind::Minion,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_plurals() {
        assert_eq!(KnownKind::from_plural("pods").unwrap(), KnownKind::Pod);
        assert_eq!(
            KnownKind::from_plural("replicationcontrollers").unwrap(),
            KnownKind::ReplicationController
        );
    }

    #[test]
    fn rejects_unknown_plural() {
        assert!(KnownKind::from_plural("widgets").is_err());
    }
}
