use serde::{Deserialize, Serialize};

use crate::member::Member;

/// The wire-visible snapshot exchanged in SYNC, SYNC-ACK, and gossip.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[non_exhaustive]
pub struct MembershipPayload {
    pub members: Vec<Member>,
    pub sync_group: String,
}

impl MembershipPayload {
    #[must_use]
    pub const fn new(members: Vec<Member>, sync_group: String) -> Self {
        Self {
            members,
            sync_group,
        }
    }
}
