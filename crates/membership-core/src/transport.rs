use core::time::Duration;

use async_trait::async_trait;
use membership_wire::{Endpoint, Headers, MembershipPayload};
use tokio::sync::{mpsc, oneshot};

/// A SYNC request received from a peer, awaiting a SYNC-ACK reply.
///
/// Produced by a [`Transport`] implementation's inbound channel and consumed
/// by the Sync Engine, which answers with the local table snapshot via
/// `respond` (spec.md §5: "every SYNC is answered with a SYNC-ACK carrying
/// the receiver's own membership view").
#[derive(Debug)]
pub struct InboundRequest {
    pub from: Endpoint,
    pub headers: Headers,
    pub payload: MembershipPayload,
    pub respond: oneshot::Sender<MembershipPayload>,
}

/// The only network-facing collaborator this crate depends on. Transport is
/// deliberately request/response shaped rather than raw send/receive: SYNC
/// and SYNC-ACK are always paired by `correlation_id` (spec.md §5), so the
/// pairing is pushed down into the trait instead of re-implemented by every
/// caller.
///
/// Implementations own the wire encoding, retries below the transport layer,
/// and connection lifecycle; this crate only ever sees [`MembershipPayload`]
/// and [`Headers`].
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Send a SYNC to `to` and wait up to `timeout` for its SYNC-ACK.
    async fn request(
        &self,
        to: &Endpoint,
        headers: Headers,
        payload: MembershipPayload,
        timeout: Duration,
    ) -> eyre::Result<MembershipPayload>;

    /// Subscribe to inbound SYNC requests from peers. Called once at
    /// startup by the Sync Engine; the returned receiver is drained for the
    /// lifetime of the membership service.
    async fn listen(&self) -> eyre::Result<mpsc::Receiver<InboundRequest>>;
}
