use std::collections::{BTreeMap, HashSet};

use membership_wire::{Endpoint, Member, MemberStatus};
use tracing::trace;

/// The per-node replicated membership state and its merge rule.
///
/// Ownership (spec.md §3): this struct owns every [`Member`] record. Only
/// the Event Dispatcher (`crate::dispatcher`) holds a `&mut` reference;
/// everything else reads an owned snapshot via [`MembershipTable::as_list`].
#[derive(Debug)]
pub struct MembershipTable {
    local_id: String,
    members: BTreeMap<String, Member>,
}

/// A single change produced by a merge.
///
/// `refuted` distinguishes a self-refutation (spec.md §4.1 rule 2: "we
/// refute by emitting a synthetic delta for ourselves as TRUSTED") from an
/// ordinary accepted transition — see SPEC_FULL.md §15. It is internal
/// bookkeeping only: the wire `Member` is unaffected, but it lets the Event
/// Dispatcher re-gossip a refutation even when the triggering merge came
/// from a gossip receipt (spec.md §8 scenario S5), which the ordinary
/// gossip-suppression rule would otherwise swallow.
#[derive(Clone, Debug, PartialEq)]
pub struct Delta {
    pub member: Member,
    pub refuted: bool,
}

impl Delta {
    pub(crate) const fn accepted(member: Member) -> Self {
        Self {
            member,
            refuted: false,
        }
    }

    const fn refutation(member: Member) -> Self {
        Self {
            member,
            refuted: true,
        }
    }
}

/// Whether an incoming record about ourselves should be silently absorbed
/// or turned into a self-refutation delta.
enum SelfMerge {
    NoChange,
    Refute(Member),
}

impl MembershipTable {
    #[must_use]
    pub fn new(local: Member) -> Self {
        let local_id = local.endpoint.id.clone();
        let mut members = BTreeMap::new();
        let _ = members.insert(local_id.clone(), local);
        Self { local_id, members }
    }

    /// Stable, unordered list of current members — REMOVED entries are
    /// never returned (spec.md §4.1).
    #[must_use]
    pub fn as_list(&self) -> Vec<Member> {
        self.members
            .values()
            .filter(|m| !m.status.is_terminal())
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Member> {
        self.members.get(id)
    }

    #[must_use]
    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    #[must_use]
    pub fn is_local(&self, endpoint: &Endpoint) -> bool {
        endpoint.id == self.local_id
    }

    /// Authoritatively set the local member's own status, bypassing the
    /// merge rule entirely. Used only by the local lifecycle's `leave()`
    /// (spec.md §4.2: "the local record transitions directly to SHUTDOWN;
    /// it is never the product of a merge").
    pub fn set_local_status(&mut self, status: MemberStatus) -> Member {
        let local = self
            .members
            .get_mut(&self.local_id)
            .expect("local member is always present");
        local.status = status;
        local.clone()
    }

    /// Endpoints in TRUSTED or SUSPECTED state — the peer set pushed to the
    /// failure detector and gossip broadcaster (spec.md §4.1, §4.3 step 1).
    #[must_use]
    pub fn trusted_or_suspected_endpoints(&self) -> HashSet<Endpoint> {
        self.members
            .values()
            .filter(|m| matches!(m.status, MemberStatus::Trusted | MemberStatus::Suspected))
            .map(|m| m.endpoint.clone())
            .collect()
    }

    /// Merge every member of an incoming payload, in order. Returns only the
    /// entries that actually changed or were newly inserted, in the order
    /// they were discovered (spec.md §4.1).
    pub fn merge_members(&mut self, incoming: impl IntoIterator<Item = Member>) -> Vec<Delta> {
        incoming
            .into_iter()
            .filter_map(|member| self.merge_one(member))
            .collect()
    }

    /// Merge a single incoming record (used for failure-detector verdicts
    /// and single-member gossip deltas, as well as payload merge).
    pub fn merge_one(&mut self, incoming: Member) -> Option<Delta> {
        if incoming.endpoint.id == self.local_id {
            return match self.merge_self(&incoming) {
                SelfMerge::NoChange => None,
                SelfMerge::Refute(member) => Some(Delta::refutation(member)),
            };
        }

        match self.members.get(&incoming.endpoint.id).cloned() {
            None => {
                if incoming.status.is_terminal() {
                    return None;
                }
                let id = incoming.endpoint.id.clone();
                let _ = self.members.insert(id, incoming.clone());
                Some(Delta::accepted(incoming))
            }
            Some(current) => self.apply_transition(current, incoming).map(Delta::accepted),
        }
    }

    /// Remove a member outright (decay-timer expiry). Per spec.md §4.3, this
    /// never produces a delta that re-enters the observer/gossip pipeline —
    /// only the trusted/suspected peer-set recompute observes it. A no-op on
    /// an endpoint that is already absent (spec.md §7: "Timer firing on an
    /// already-removed member: No-op").
    pub fn remove(&mut self, id: &str) -> Option<Member> {
        let removed = self.members.remove(id);
        if removed.is_none() {
            trace!(%id, "decay timer fired for an already-removed member");
        }
        removed
    }

    fn merge_self(&self, incoming: &Member) -> SelfMerge {
        let Some(local) = self.members.get(&self.local_id) else {
            return SelfMerge::NoChange;
        };
        let refuted = matches!(local.status, MemberStatus::Trusted)
            && matches!(
                incoming.status,
                MemberStatus::Suspected | MemberStatus::Shutdown
            );
        if refuted {
            SelfMerge::Refute(local.clone())
        } else {
            SelfMerge::NoChange
        }
    }

    /// Status transition table from spec.md §4.1. Returns the delta iff the
    /// merge actually changed status or metadata.
    fn apply_transition(&mut self, current: Member, incoming: Member) -> Option<Member> {
        use MemberStatus::{Removed, Shutdown, Suspected, Trusted};

        let accept = match (current.status, incoming.status) {
            (Trusted, Trusted) => false,
            (Trusted, Suspected | Shutdown | Removed) => true,
            (Suspected, Trusted) => true,
            (Suspected, Suspected) => false,
            (Suspected, Shutdown | Removed) => true,
            (Shutdown, Removed) => true,
            (Shutdown, Trusted | Suspected | Shutdown) => false,
            (Removed, _) => false,
        };

        if accept {
            let id = current.endpoint.id.clone();
            let updated = Member {
                endpoint: incoming.endpoint,
                status: incoming.status,
                metadata: incoming.metadata,
            };
            let _ = self.members.insert(id, updated.clone());
            return Some(updated);
        }

        // TRUSTED -> TRUSTED: metadata and/or address update only. Endpoint
        // equality is keyed on `id` alone (endpoint.rs), so a pure address
        // change (same id, same metadata, different host/port) would never
        // trip the metadata comparison on its own — spec.md §3 requires it
        // to still count as a change ("address update wins by last-write").
        let address_changed = current.endpoint.host != incoming.endpoint.host
            || current.endpoint.port != incoming.endpoint.port;
        if current.status == Trusted
            && incoming.status == Trusted
            && (current.metadata != incoming.metadata || address_changed)
        {
            let id = current.endpoint.id.clone();
            let updated = Member {
                endpoint: incoming.endpoint,
                status: Trusted,
                metadata: incoming.metadata,
            };
            let _ = self.members.insert(id, updated.clone());
            return Some(updated);
        }

        None
    }
}
