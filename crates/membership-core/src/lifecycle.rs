use std::collections::HashSet;
use std::sync::Arc;

use actix::{Actor, Addr};
use membership_wire::{Endpoint, Member};
use tokio::sync::broadcast;
use tracing::info;

use crate::config::MembershipConfig;
use crate::dispatcher::{EventDispatcher, IsLocalMember, Leave, PeerEndpoints, Snapshot, Subscribe};
use crate::error::Result;
use crate::failure_detector::FailureDetector;
use crate::gossip::GossipBroadcaster;
use crate::sync::SyncEngine;
use crate::transport::Transport;

/// The public entry point: wires the Membership Table, Event Dispatcher,
/// Sync Engine, and the three external collaborators together, and exposes
/// spec.md §4.5's `start`/`leave`/`isLocalMember` plus the query/subscribe
/// surface of §4.1/§4.4.
///
/// Mirrors the teacher's `NetworkClient`: a thin, cloneable handle over an
/// `Addr<EventDispatcher>` actor mailbox. Nothing outside this crate ever
/// gets `&mut` access to the table — every operation here is a message
/// send.
#[derive(Clone)]
pub struct Membership {
    dispatcher: Addr<EventDispatcher>,
}

/// Owns the background tasks started by [`Membership::start`]. Dropping
/// leaves the Sync Engine's tasks running; call [`MembershipHandle::stop`]
/// to halt them before tearing down transport, per spec.md §5.
pub struct MembershipHandle {
    sync: SyncEngine,
}

impl MembershipHandle {
    /// Cancels the periodic SYNC tick and the inbound SYNC handler. Already
    /// in-flight merges on the dispatcher drain on their own; no new merges
    /// are initiated by the Sync Engine after this returns (spec.md §5).
    pub fn stop(&mut self) {
        self.sync.stop();
    }
}

impl Membership {
    /// Seeds the table with `{local, TRUSTED, localMetadata}`, starts the
    /// Event Dispatcher actor, then blocks on the Sync Engine's initial
    /// sync phase before returning (spec.md §4.5, §5: "only the initial
    /// sync blocks a caller").
    pub async fn start(
        config: MembershipConfig,
        transport: Arc<dyn Transport>,
        failure_detector: Arc<dyn FailureDetector>,
        gossip: Arc<dyn GossipBroadcaster>,
    ) -> eyre::Result<(Self, MembershipHandle)> {
        info!(
            endpoint = %config.local_endpoint.id,
            seeds = config.seed_members.len(),
            "starting membership service"
        );

        let dispatcher = EventDispatcher::new(config.clone(), failure_detector, gossip).start();

        let mut sync = SyncEngine::new(config, transport, dispatcher.clone());
        sync.start().await?;

        Ok((Self { dispatcher }, MembershipHandle { sync }))
    }

    /// Stable, unordered snapshot of current members (no REMOVED entries) —
    /// spec.md §4.1's `asList()`.
    pub async fn members(&self) -> Result<Vec<Member>> {
        Ok(self.dispatcher.send(Snapshot).await?)
    }

    /// Endpoints currently TRUSTED or SUSPECTED — the peer set driving the
    /// failure detector and gossip broadcaster (spec.md §4.1).
    pub async fn peer_endpoints(&self) -> Result<HashSet<Endpoint>> {
        Ok(self.dispatcher.send(PeerEndpoints).await?)
    }

    /// Subscribe to the Observer Hub's delta stream. Independent of other
    /// subscribers; a subscriber attached after a delta was produced never
    /// sees that delta (spec.md §4.4).
    pub async fn subscribe(&self) -> Result<broadcast::Receiver<Member>> {
        Ok(self.dispatcher.send(Subscribe).await?)
    }

    /// `isLocalMember(m)` from spec.md §4.5: endpoint-equality against the
    /// local record, nothing to do with `m`'s reported status.
    pub async fn is_local_member(&self, endpoint: &Endpoint) -> Result<bool> {
        Ok(self
            .dispatcher
            .send(IsLocalMember {
                endpoint: endpoint.clone(),
            })
            .await?)
    }

    /// Broadcasts a single gossip payload announcing `{local, SHUTDOWN,
    /// localMetadata}` and returns without waiting for the decay timer —
    /// peers are responsible for eventually removing the entry (spec.md
    /// §4.5).
    pub async fn leave(&self) -> Result<()> {
        self.dispatcher.send(Leave).await?;
        Ok(())
    }
}
