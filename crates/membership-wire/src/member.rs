use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::endpoint::Endpoint;

/// Liveness state of a [`Member`].
///
/// Ordering here is declaration order only and must not be used for the
/// merge rule's conflict resolution — see `MembershipTable::merge` in
/// `membership-core`, which implements the non-total-order transition table
/// from spec.md §4.1 explicitly rather than via `Ord`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum MemberStatus {
    Trusted,
    Suspected,
    Shutdown,
    Removed,
}

impl MemberStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Removed)
    }
}

/// A known cluster peer: its address, its liveness state, and opaque
/// application metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Member {
    pub endpoint: Endpoint,
    pub status: MemberStatus,
    pub metadata: BTreeMap<String, String>,
}

impl Member {
    #[must_use]
    pub fn new(endpoint: Endpoint, status: MemberStatus) -> Self {
        Self {
            endpoint,
            status,
            metadata: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }
}
