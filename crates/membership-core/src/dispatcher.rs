use std::collections::HashMap;
use std::sync::Arc;

use actix::{Actor, AsyncContext, Context, Handler, SpawnHandle, StreamHandler};
use futures_util::StreamExt as _;
use membership_wire::{Endpoint, Member, MemberStatus, MembershipPayload};
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, trace};

use crate::config::MembershipConfig;
use crate::error::{MembershipError, Result};
use crate::failure_detector::{FailureDetector, FailureDetectorVerdict};
use crate::gossip::GossipBroadcaster;
use crate::observer::ObserverHub;
use crate::table::{Delta, MembershipTable};

/// Where a set of deltas came from, deciding whether they are re-spread by
/// gossip (spec.md §4.3: a gossip-sourced delta is never re-broadcast — that
/// rule alone is what keeps dissemination traffic bounded).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeltaSource {
    Sync,
    Gossip,
    FailureDetector,
    Local,
}

/// The single-writer core of the membership service.
///
/// Every table mutation funnels through this actor: SYNC/SYNC-ACK payloads
/// (from the Sync Engine), failure-detector verdicts, gossip receipts, and
/// the local lifecycle's `leave()`. No other type ever holds a `&mut
/// MembershipTable` (spec.md §3). Modeled on the teacher's `NetworkManager`
/// actor: commands arrive as typed [`actix::Message`]s, long-lived external
/// feeds are wired in with `ctx.add_stream` in `started()`, and outbound
/// calls to collaborators run as spawned actor futures rather than blocking
/// the mailbox.
pub struct EventDispatcher {
    config: MembershipConfig,
    table: MembershipTable,
    failure_detector: Arc<dyn FailureDetector>,
    gossip: Arc<dyn GossipBroadcaster>,
    observer: ObserverHub,
    decay_timers: HashMap<String, SpawnHandle>,
}

impl EventDispatcher {
    #[must_use]
    pub fn new(
        config: MembershipConfig,
        failure_detector: Arc<dyn FailureDetector>,
        gossip: Arc<dyn GossipBroadcaster>,
    ) -> Self {
        let local = Member::new(config.local_endpoint.clone(), MemberStatus::Trusted)
            .with_metadata(config.local_metadata.clone());
        let observer = ObserverHub::new(config.observer_capacity);
        Self {
            table: MembershipTable::new(local),
            config,
            failure_detector,
            gossip,
            observer,
            decay_timers: HashMap::new(),
        }
    }

    fn push_peer_sets(&self, ctx: &mut Context<Self>) {
        let peers = self.table.trusted_or_suspected_endpoints();
        let fd = Arc::clone(&self.failure_detector);
        let gossip = Arc::clone(&self.gossip);
        let peers_for_gossip = peers.clone();
        ctx.spawn(actix::fut::wrap_future(async move {
            fd.set_cluster_endpoints(peers).await;
            gossip.set_cluster_endpoints(peers_for_gossip).await;
        }));
    }

    /// Drives spec.md §4.3's four-step pipeline for a non-empty delta set.
    ///
    /// A self-refutation (`delta.refuted`) is always re-gossiped even when
    /// `source == Gossip` — spec.md §8 scenario S5 requires A to re-announce
    /// itself TRUSTED in the very turn that processed the gossip claiming it
    /// was SUSPECTED, which the ordinary gossip-suppression rule would
    /// otherwise swallow (SPEC_FULL.md §15).
    fn apply_deltas(&mut self, ctx: &mut Context<Self>, deltas: Vec<Delta>, source: DeltaSource) {
        if deltas.is_empty() {
            return;
        }
        self.push_peer_sets(ctx);

        for delta in deltas {
            let member = delta.member;
            debug!(id = %member.endpoint.id, status = ?member.status, refuted = delta.refuted, ?source, "membership delta");

            if source != DeltaSource::Gossip || delta.refuted {
                let gossip = Arc::clone(&self.gossip);
                let payload = MembershipPayload::new(vec![member.clone()], self.config.sync_group.clone());
                ctx.spawn(actix::fut::wrap_future(async move {
                    gossip.spread(payload).await;
                }));
            }

            self.observer.publish(member.clone());
            self.drive_liveness_and_timer(ctx, &member);
        }
    }

    /// Spec.md §4.3's timer/FD-call rules for a single delta. Whether the
    /// member was previously SUSPECTED is inferred from whether a decay
    /// timer is currently armed for it — SHUTDOWN can never transition back
    /// to TRUSTED (table.rs's transition table), so an armed timer at this
    /// point always means "was SUSPECTED".
    ///
    /// The local member never gets a decay timer, regardless of status: a
    /// decay timer fires `DecayFire`, which calls `table.remove`, which would
    /// delete the local row outright — violating spec.md §3's "the local
    /// member is always present" invariant once `leave()` drives it to
    /// SHUTDOWN. Peers decay the local node's entry on their own tables;
    /// spec.md §4.5 says `leave()` "does not wait for the decay timer" for
    /// exactly this reason.
    fn drive_liveness_and_timer(&mut self, ctx: &mut Context<Self>, member: &Member) {
        let id = member.endpoint.id.clone();
        if id == self.table.local_id() {
            self.cancel_decay(ctx, &id);
            return;
        }

        let was_suspected = self.decay_timers.contains_key(&id);
        self.cancel_decay(ctx, &id);

        match member.status {
            MemberStatus::Suspected => {
                self.call_failure_detector(ctx, member.endpoint.clone(), true);
                let handle = ctx.notify_later(DecayFire { id: id.clone() }, self.config.max_suspect_time);
                let _ = self.decay_timers.insert(id, handle);
            }
            MemberStatus::Trusted => {
                if was_suspected {
                    self.call_failure_detector(ctx, member.endpoint.clone(), false);
                }
            }
            MemberStatus::Shutdown => {
                let handle = ctx.notify_later(DecayFire { id: id.clone() }, self.config.max_shutdown_time);
                let _ = self.decay_timers.insert(id, handle);
            }
            MemberStatus::Removed => {}
        }
    }

    /// `suspect` when `suspected` is true, `trust` otherwise (spec.md §4.3).
    fn call_failure_detector(&self, ctx: &mut Context<Self>, endpoint: Endpoint, suspected: bool) {
        let fd = Arc::clone(&self.failure_detector);
        ctx.spawn(actix::fut::wrap_future(async move {
            if suspected {
                fd.suspect(endpoint).await;
            } else {
                fd.trust(endpoint).await;
            }
        }));
    }

    fn cancel_decay(&mut self, ctx: &mut Context<Self>, id: &str) {
        if let Some(handle) = self.decay_timers.remove(id) {
            let _ = ctx.cancel_future(handle);
        }
    }
}

impl Actor for EventDispatcher {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!(endpoint = ?self.config.local_endpoint, sync_group = %self.config.sync_group, "event dispatcher started");

        let fd_verdicts = BroadcastStream::new(self.failure_detector.listen_status())
            .filter_map(|item| futures_util::future::ready(item.ok()));
        Self::add_stream(fd_verdicts, ctx);

        let gossip_payloads = BroadcastStream::new(self.gossip.listen())
            .filter_map(|item| futures_util::future::ready(item.ok()));
        Self::add_stream(gossip_payloads, ctx);
    }
}

impl StreamHandler<FailureDetectorVerdict> for EventDispatcher {
    fn handle(&mut self, verdict: FailureDetectorVerdict, ctx: &mut Context<Self>) {
        let member = match verdict {
            FailureDetectorVerdict::Suspect(endpoint) => {
                Member::new(endpoint, MemberStatus::Suspected)
            }
            FailureDetectorVerdict::Trust(endpoint) => Member::new(endpoint, MemberStatus::Trusted),
        };
        let deltas = self.table.merge_one(member).into_iter().collect::<Vec<_>>();
        self.apply_deltas(ctx, deltas, DeltaSource::FailureDetector);
    }
}

impl StreamHandler<MembershipPayload> for EventDispatcher {
    fn handle(&mut self, payload: MembershipPayload, ctx: &mut Context<Self>) {
        if payload.sync_group != self.config.sync_group {
            trace!(
                expected = %self.config.sync_group,
                actual = %payload.sync_group,
                "dropping gossip payload for foreign sync group"
            );
            return;
        }
        let deltas = self.table.merge_members(payload.members);
        self.apply_deltas(ctx, deltas, DeltaSource::Gossip);
    }
}

/// Fired by `Context::notify_later` when a SUSPECTED or SHUTDOWN decay
/// window elapses. Deliberately bypasses `apply_deltas`: removal on decay
/// emits no observer event and is never re-gossiped (spec.md §4.3, §8
/// scenarios S3/S4).
#[derive(actix::Message)]
#[rtype(result = "()")]
struct DecayFire {
    id: String,
}

impl Handler<DecayFire> for EventDispatcher {
    type Result = ();

    fn handle(&mut self, msg: DecayFire, ctx: &mut Context<Self>) {
        let _ = self.decay_timers.remove(&msg.id);
        if self.table.remove(&msg.id).is_some() {
            self.push_peer_sets(ctx);
        }
    }
}

/// Merge an incoming SYNC or SYNC-ACK payload into the table.
#[derive(actix::Message)]
#[rtype(result = "Result<Vec<Member>>")]
pub struct ApplyPayload {
    pub payload: MembershipPayload,
    pub source: DeltaSource,
}

impl Handler<ApplyPayload> for EventDispatcher {
    type Result = Result<Vec<Member>>;

    fn handle(&mut self, msg: ApplyPayload, ctx: &mut Context<Self>) -> Self::Result {
        if msg.payload.sync_group != self.config.sync_group {
            trace!(
                expected = %self.config.sync_group,
                actual = %msg.payload.sync_group,
                "dropping payload for foreign sync group"
            );
            return Err(MembershipError::SyncGroupMismatch {
                expected: self.config.sync_group.clone(),
                actual: msg.payload.sync_group,
            });
        }
        let deltas = self.table.merge_members(msg.payload.members);
        let members = deltas.iter().map(|d| d.member.clone()).collect();
        self.apply_deltas(ctx, deltas, msg.source);
        Ok(members)
    }
}

/// A consistent snapshot of the table, for the Sync Engine's periodic
/// SYNC-ACK payloads and for `Membership::members()`.
#[derive(actix::Message)]
#[rtype(result = "Vec<Member>")]
pub struct Snapshot;

impl Handler<Snapshot> for EventDispatcher {
    type Result = Vec<Member>;

    fn handle(&mut self, _msg: Snapshot, _ctx: &mut Context<Self>) -> Self::Result {
        self.table.as_list()
    }
}

/// Endpoints currently eligible as sync/gossip/FD peers.
#[derive(actix::Message)]
#[rtype(result = "std::collections::HashSet<Endpoint>")]
pub struct PeerEndpoints;

impl Handler<PeerEndpoints> for EventDispatcher {
    type Result = std::collections::HashSet<Endpoint>;

    fn handle(&mut self, _msg: PeerEndpoints, _ctx: &mut Context<Self>) -> Self::Result {
        self.table.trusted_or_suspected_endpoints()
    }
}

/// Leave the cluster: the local record moves to SHUTDOWN directly (never
/// through the merge rule — spec.md §4.2) and is gossiped once.
#[derive(actix::Message)]
#[rtype(result = "()")]
pub struct Leave;

impl Handler<Leave> for EventDispatcher {
    type Result = ();

    fn handle(&mut self, _msg: Leave, ctx: &mut Context<Self>) {
        let local_id = self.table.local_id().to_owned();
        let already_left = self
            .table
            .get(&local_id)
            .is_some_and(|m| !matches!(m.status, MemberStatus::Trusted));
        if already_left {
            return;
        }
        let shutdown = self.table.set_local_status(MemberStatus::Shutdown);
        self.apply_deltas(ctx, vec![Delta::accepted(shutdown)], DeltaSource::Local);
    }
}

/// `isLocalMember(m)`: endpoint-equality against the local record (spec.md
/// §4.5) — nothing to do with `m`'s reported status, just identity.
#[derive(actix::Message)]
#[rtype(result = "bool")]
pub struct IsLocalMember {
    pub endpoint: Endpoint,
}

impl Handler<IsLocalMember> for EventDispatcher {
    type Result = bool;

    fn handle(&mut self, msg: IsLocalMember, _ctx: &mut Context<Self>) -> Self::Result {
        self.table.is_local(&msg.endpoint)
    }
}

/// Attach a new Observer Hub subscriber (spec.md §4.4). Deltas produced
/// before this message is handled are never delivered to the returned
/// receiver.
#[derive(actix::Message)]
#[rtype(result = "tokio::sync::broadcast::Receiver<Member>")]
pub struct Subscribe;

impl Handler<Subscribe> for EventDispatcher {
    type Result = tokio::sync::broadcast::Receiver<Member>;

    fn handle(&mut self, _msg: Subscribe, _ctx: &mut Context<Self>) -> Self::Result {
        self.observer.subscribe()
    }
}
