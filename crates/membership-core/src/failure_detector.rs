use std::collections::HashSet;

use async_trait::async_trait;
use membership_wire::Endpoint;
use tokio::sync::broadcast;

/// A verdict produced by the failure detector about one peer.
///
/// These are merged into the [`crate::table::MembershipTable`] exactly like
/// a SYNC-ACK delta: a `Suspect` verdict produces a `Member` with status
/// SUSPECTED, a `Trust` verdict one with status TRUSTED (spec.md §4.2).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FailureDetectorVerdict {
    Suspect(Endpoint),
    Trust(Endpoint),
}

/// The pluggable liveness oracle. This crate does not implement ping/ack
/// probing itself — spec.md §6 scopes that out as a pre-existing external
/// component this service drives and listens to.
#[async_trait]
pub trait FailureDetector: Send + Sync + 'static {
    /// Replace the set of endpoints under observation. Called by the Event
    /// Dispatcher every time `trustedOrSuspectedEndpoints()` changes
    /// (spec.md §4.3 step 1).
    async fn set_cluster_endpoints(&self, endpoints: HashSet<Endpoint>);

    /// Tell the detector to stop counting failures against `endpoint`.
    /// Used on self-refutation, where the local node already knows it is
    /// alive regardless of what the detector has observed.
    async fn trust(&self, endpoint: Endpoint);

    /// Force the detector to treat `endpoint` as suspect. Exposed for
    /// completeness and test harnesses; normal operation never needs it —
    /// the detector raises suspicion on its own via `listen_status`.
    async fn suspect(&self, endpoint: Endpoint);

    /// Subscribe to the verdict stream. Multiple subscribers are permitted;
    /// a slow subscriber misses verdicts emitted before it attaches but
    /// never blocks the detector (see `tokio::sync::broadcast`).
    fn listen_status(&self) -> broadcast::Receiver<FailureDetectorVerdict>;
}
