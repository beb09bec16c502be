use core::cmp::Ordering;
use core::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A stable identifier for a cluster peer.
///
/// Equality and hashing are keyed on `id` alone — two endpoints with the same
/// `id` but a different `host`/`port` are the same member, and the merge rule
/// lets the newer address win (see [`crate::Member`]).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Endpoint {
    pub id: String,
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    #[must_use]
    pub fn new(id: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            id: id.into(),
            host: host.into(),
            port,
        }
    }
}

impl PartialEq for Endpoint {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Endpoint {}

impl Hash for Endpoint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for Endpoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Endpoint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}
