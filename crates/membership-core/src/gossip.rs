use std::collections::HashSet;

use async_trait::async_trait;
use membership_wire::{Endpoint, MembershipPayload};
use tokio::sync::broadcast;

/// The pluggable infection-style dissemination channel. Like
/// [`crate::failure_detector::FailureDetector`], spec.md §6 treats this as a
/// pre-existing external component: this crate only feeds it deltas to
/// spread and consumes deltas it received from peers.
///
/// Carries [`MembershipPayload`], the same wire-visible snapshot type used by
/// SYNC/SYNC-ACK (membership-wire's own doc comment: "exchanged in SYNC,
/// SYNC-ACK, and gossip"), so every gossip message is tagged with its
/// sender's `sync_group` — without it, the Event Dispatcher would have no
/// way to drop gossip from a foreign sync group the way it already does for
/// SYNC/SYNC-ACK (spec.md §3: "messages from a different group are silently
/// dropped").
#[async_trait]
pub trait GossipBroadcaster: Send + Sync + 'static {
    /// Replace the set of endpoints this broadcaster gossips with. Called by
    /// the Event Dispatcher alongside `FailureDetector::set_cluster_endpoints`
    /// whenever `trustedOrSuspectedEndpoints()` changes.
    async fn set_cluster_endpoints(&self, endpoints: HashSet<Endpoint>);

    /// Spread a single member delta, wrapped in a one-member
    /// [`MembershipPayload`] carrying the local `sync_group`, to the cluster.
    /// The Event Dispatcher calls this for every merge-sourced delta except
    /// ones that arrived via gossip in the first place (spec.md §4.3:
    /// gossip-suppression, bounding re-broadcast storms).
    async fn spread(&self, payload: MembershipPayload);

    /// Subscribe to payloads received from peers via gossip. The Event
    /// Dispatcher drops any whose `sync_group` doesn't match its own, then
    /// merges the rest into the table with provenance marked as
    /// gossip-sourced.
    fn listen(&self) -> broadcast::Receiver<MembershipPayload>;
}
