use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The two message qualifiers the core understands on the wire.
///
/// Mirrors `io.servicefabric.cluster/membership/sync` and
/// `.../syncAck` from spec.md §6; rendered to/from the `qualifier` header
/// only at the transport boundary (a tagged-variant discriminator replaces
/// the source material's class-identity check, per spec.md §9).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Qualifier {
    Sync,
    SyncAck,
}

impl Qualifier {
    const SYNC: &'static str = "io.servicefabric.cluster/membership/sync";
    const SYNC_ACK: &'static str = "io.servicefabric.cluster/membership/syncAck";

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sync => Self::SYNC,
            Self::SyncAck => Self::SYNC_ACK,
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            Self::SYNC => Some(Self::Sync),
            Self::SYNC_ACK => Some(Self::SyncAck),
            _ => None,
        }
    }
}

/// Headers required by the core, plus whatever else the transport attaches.
///
/// `correlation_id` is a monotonic 64-bit counter at the producer, rendered
/// to a string only here at the wire boundary (spec.md §9).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Headers {
    pub qualifier: String,
    pub correlation_id: String,
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl Headers {
    #[must_use]
    pub fn new(qualifier: Qualifier, correlation_id: u64) -> Self {
        Self {
            qualifier: qualifier.as_str().to_owned(),
            correlation_id: correlation_id.to_string(),
            extra: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn qualifier(&self) -> Option<Qualifier> {
        Qualifier::parse(&self.qualifier)
    }
}
