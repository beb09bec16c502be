//! In-memory stand-ins for the three external collaborators, wired through
//! shared hubs so several `Membership` instances in one process can sync,
//! gossip, and report failure-detector verdicts to each other.

use core::time::Duration;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use membership_core::{Endpoint, FailureDetector, FailureDetectorVerdict, GossipBroadcaster, InboundRequest, Transport};
use membership_wire::{Headers, MembershipPayload};
use tokio::sync::{broadcast, mpsc, oneshot};

/// Routing table from node id to its inbound SYNC channel. Shared by every
/// [`MockTransport`] in a test so `request()` can reach any registered peer.
#[derive(Default)]
pub struct InMemoryNetwork {
    routes: Mutex<HashMap<String, mpsc::Sender<InboundRequest>>>,
}

impl InMemoryNetwork {
    pub fn new() -> Arc<Self> {
        Arc::default()
    }

    /// Deliver a raw `InboundRequest` to `to`'s inbound channel, bypassing
    /// `MockTransport::request`'s usual SYNC-shaped headers — lets a test
    /// construct a wrong-qualifier request directly.
    pub async fn deliver(&self, to: &str, request: InboundRequest) -> Result<(), InboundRequest> {
        let sender = self.routes.lock().unwrap().get(to).cloned();
        match sender {
            Some(sender) => sender.send(request).await.map_err(|e| e.0),
            None => Err(request),
        }
    }
}

/// A [`Transport`] that routes SYNC requests through an [`InMemoryNetwork`]
/// instead of a socket. Registers itself on construction so other nodes on
/// the same network can address it by endpoint id.
pub struct MockTransport {
    local: Endpoint,
    network: Arc<InMemoryNetwork>,
    inbound_rx: Mutex<Option<mpsc::Receiver<InboundRequest>>>,
}

impl MockTransport {
    pub fn new(local: Endpoint, network: Arc<InMemoryNetwork>) -> Arc<Self> {
        let (tx, rx) = mpsc::channel(64);
        let _ = network.routes.lock().unwrap().insert(local.id.clone(), tx);
        Arc::new(Self {
            local,
            network,
            inbound_rx: Mutex::new(Some(rx)),
        })
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn request(
        &self,
        to: &Endpoint,
        headers: Headers,
        payload: MembershipPayload,
        timeout: Duration,
    ) -> eyre::Result<MembershipPayload> {
        let sender = self.network.routes.lock().unwrap().get(&to.id).cloned();
        let Some(sender) = sender else {
            return Err(eyre::eyre!("no route to {}", to.id));
        };

        let (respond, reply) = oneshot::channel();
        sender
            .send(InboundRequest {
                from: self.local.clone(),
                headers,
                payload,
                respond,
            })
            .await
            .map_err(|_| eyre::eyre!("peer {} is gone", to.id))?;

        tokio::time::timeout(timeout, reply)
            .await
            .map_err(|_| eyre::eyre!("SYNC to {} timed out", to.id))?
            .map_err(|_| eyre::eyre!("peer {} dropped the SYNC-ACK sender", to.id))
    }

    async fn listen(&self) -> eyre::Result<mpsc::Receiver<InboundRequest>> {
        self.inbound_rx
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| eyre::eyre!("listen() called more than once"))
    }
}

/// A [`FailureDetector`] whose verdicts are injected directly by test code
/// via [`ManualFailureDetector::emit`], rather than by probing anything.
/// Records every `suspect`/`trust` call the dispatcher makes back.
pub struct ManualFailureDetector {
    verdicts: broadcast::Sender<FailureDetectorVerdict>,
    calls: Mutex<Vec<(Endpoint, bool)>>,
}

impl ManualFailureDetector {
    pub fn new() -> Arc<Self> {
        let (verdicts, _) = broadcast::channel(64);
        Arc::new(Self {
            verdicts,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn emit(&self, verdict: FailureDetectorVerdict) {
        let _ = self.verdicts.send(verdict);
    }

    pub fn calls(&self) -> Vec<(Endpoint, bool)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FailureDetector for ManualFailureDetector {
    async fn set_cluster_endpoints(&self, _endpoints: HashSet<Endpoint>) {}

    async fn trust(&self, endpoint: Endpoint) {
        self.calls.lock().unwrap().push((endpoint, false));
    }

    async fn suspect(&self, endpoint: Endpoint) {
        self.calls.lock().unwrap().push((endpoint, true));
    }

    fn listen_status(&self) -> broadcast::Receiver<FailureDetectorVerdict> {
        self.verdicts.subscribe()
    }
}

/// Shared dissemination bus: every registered node's inbound gossip channel,
/// keyed by node id. [`HubGossip::spread`] fans a payload out to every other
/// registered node, simulating a fully-connected mesh. The hub itself does
/// no sync-group filtering — every registered node sits on the same bus,
/// same as real infection-style gossip reaching every peer regardless of
/// group; it's `EventDispatcher`'s `StreamHandler<MembershipPayload>` that is
/// responsible for dropping payloads tagged with a foreign `sync_group`.
#[derive(Default)]
pub struct GossipHub {
    channels: Mutex<HashMap<String, broadcast::Sender<MembershipPayload>>>,
}

impl GossipHub {
    pub fn new() -> Arc<Self> {
        Arc::default()
    }
}

pub struct HubGossip {
    local_id: String,
    hub: Arc<GossipHub>,
    inbound: broadcast::Sender<MembershipPayload>,
    spread_calls: Mutex<Vec<MembershipPayload>>,
}

impl HubGossip {
    pub fn new(local_id: impl Into<String>, hub: Arc<GossipHub>) -> Arc<Self> {
        let local_id = local_id.into();
        let (inbound, _) = broadcast::channel(64);
        let _ = hub
            .channels
            .lock()
            .unwrap()
            .insert(local_id.clone(), inbound.clone());
        Arc::new(Self {
            local_id,
            hub,
            inbound,
            spread_calls: Mutex::new(Vec::new()),
        })
    }

    pub fn spread_calls(&self) -> Vec<MembershipPayload> {
        self.spread_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GossipBroadcaster for HubGossip {
    async fn set_cluster_endpoints(&self, _endpoints: HashSet<Endpoint>) {}

    async fn spread(&self, payload: MembershipPayload) {
        self.spread_calls.lock().unwrap().push(payload.clone());
        let channels = self.hub.channels.lock().unwrap();
        for (id, sender) in channels.iter() {
            if *id != self.local_id {
                let _ = sender.send(payload.clone());
            }
        }
    }

    fn listen(&self) -> broadcast::Receiver<MembershipPayload> {
        self.inbound.subscribe()
    }
}

pub fn ep(id: &str, port: u16) -> Endpoint {
    Endpoint::new(id, "127.0.0.1", port)
}

pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(30)).await;
}
