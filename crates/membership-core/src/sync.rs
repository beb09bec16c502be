use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use actix::Addr;
use membership_wire::{Headers, MembershipPayload, Qualifier};
use rand::seq::SliceRandom;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::MembershipConfig;
use crate::dispatcher::{ApplyPayload, DeltaSource, EventDispatcher, Snapshot};
use crate::transport::Transport;

/// Monotonic per-process correlation id counter (spec.md §4.2, §9: "a
/// process-global counter... represented as a monotonic 64-bit integer
/// rendered to string only at the wire boundary").
#[derive(Debug, Default)]
struct CorrelationIds(AtomicU64);

impl CorrelationIds {
    fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

/// Initial + periodic SYNC/SYNC-ACK anti-entropy with seed members
/// (spec.md §4.2).
///
/// Owns two background tasks once started: one draining inbound SYNC
/// requests and replying with SYNC-ACK, one ticking every `sync_period` to
/// push the local table to a randomly chosen seed. Both feed merges back
/// into the [`EventDispatcher`] mailbox, never touching the table directly
/// (spec.md §3: "the Event Dispatcher has exclusive mutate rights").
pub struct SyncEngine {
    config: MembershipConfig,
    transport: Arc<dyn Transport>,
    dispatcher: Addr<EventDispatcher>,
    correlation_ids: Arc<CorrelationIds>,
    inbound_task: Option<JoinHandle<()>>,
    tick_task: Option<JoinHandle<()>>,
}

impl SyncEngine {
    #[must_use]
    pub fn new(
        config: MembershipConfig,
        transport: Arc<dyn Transport>,
        dispatcher: Addr<EventDispatcher>,
    ) -> Self {
        Self {
            config,
            transport,
            dispatcher,
            correlation_ids: Arc::new(CorrelationIds::default()),
            inbound_task: None,
            tick_task: None,
        }
    }

    /// Subscribes to inbound SYNC requests, runs the initial sync against
    /// every seed in parallel (bounded by `sync_timeout`, best-effort), then
    /// starts the periodic tick loop. Only the initial sync blocks the
    /// caller (spec.md §5).
    pub async fn start(&mut self) -> eyre::Result<()> {
        self.inbound_task = Some(self.spawn_inbound_handler().await?);

        if !self.config.seed_members.is_empty() {
            self.run_initial_sync().await;
        }

        self.tick_task = Some(self.spawn_tick_loop());
        Ok(())
    }

    /// Halts the periodic tick and the inbound SYNC handler. In-flight
    /// requests are abandoned; the dispatcher itself drains any merges
    /// already enqueued before this returns (spec.md §5).
    pub fn stop(&mut self) {
        if let Some(task) = self.tick_task.take() {
            task.abort();
        }
        if let Some(task) = self.inbound_task.take() {
            task.abort();
        }
    }

    /// Drains inbound SYNC requests for the life of the service, merging
    /// each and always replying with the merged local snapshot — even when
    /// the merge produced no deltas (spec.md §4.2's SYNC handler). A
    /// foreign sync group is merged-and-rejected by the dispatcher, which we
    /// take as "don't reply" (spec.md §7: wrong group is dropped silently). A
    /// request whose `qualifier` header isn't SYNC is a wrong-class payload
    /// and is logged at `warn!` and dropped (spec.md §7).
    async fn spawn_inbound_handler(&self) -> eyre::Result<JoinHandle<()>> {
        let mut inbound = self.transport.listen().await?;
        let dispatcher = self.dispatcher.clone();
        let sync_group = self.config.sync_group.clone();

        Ok(tokio::spawn(async move {
            while let Some(request) = inbound.recv().await {
                debug!(from = %request.from.id, "received SYNC");

                if request.headers.qualifier() != Some(Qualifier::Sync) {
                    warn!(
                        from = %request.from.id,
                        qualifier = %request.headers.qualifier,
                        "dropping inbound request with wrong message class"
                    );
                    continue;
                }

                let merged = match dispatcher
                    .send(ApplyPayload {
                        payload: request.payload,
                        source: DeltaSource::Sync,
                    })
                    .await
                {
                    Ok(Ok(_deltas)) => true,
                    Ok(Err(_sync_group_mismatch)) => false,
                    Err(mailbox) => {
                        warn!(%mailbox, "dispatcher mailbox closed while handling SYNC");
                        false
                    }
                };
                if !merged {
                    continue;
                }

                let Ok(members) = dispatcher.send(Snapshot).await else {
                    continue;
                };
                let ack = MembershipPayload::new(members, sync_group.clone());
                let _ = request.respond.send(ack);
            }
        }))
    }

    async fn run_initial_sync(&self) {
        let members = self.dispatcher.send(Snapshot).await.unwrap_or_default();
        let payload = MembershipPayload::new(members, self.config.sync_group.clone());

        let attempts = self.config.seed_members.iter().map(|seed| {
            let transport = Arc::clone(&self.transport);
            let headers = Headers::new(Qualifier::Sync, self.correlation_ids.next());
            let payload = payload.clone();
            let timeout = self.config.sync_timeout;
            let seed = seed.clone();
            async move { transport.request(&seed, headers, payload, timeout).await }
        });

        let results = futures_util::future::join_all(attempts).await;
        for result in results {
            match result {
                Ok(reply) => {
                    self.merge_reply(reply).await;
                    return;
                }
                Err(error) => debug!(%error, "seed unreachable during initial sync"),
            }
        }
        info!("initial sync completed without a response from any seed");
    }

    /// Every `sync_period`, pushes the local table to one seed chosen
    /// uniformly at random (spec.md §4.2's running phase; §9 records the
    /// open question of seed-only vs. full-peer-set fan-out and resolves it
    /// in favor of the literal seed-only behavior for spec fidelity).
    fn spawn_tick_loop(&self) -> JoinHandle<()> {
        let transport = Arc::clone(&self.transport);
        let dispatcher = self.dispatcher.clone();
        let correlation_ids = Arc::clone(&self.correlation_ids);
        let seeds = self.config.seed_members.clone();
        let sync_group = self.config.sync_group.clone();
        let sync_period = self.config.sync_period;
        let sync_timeout = self.config.sync_timeout;

        tokio::spawn(async move {
            if seeds.is_empty() {
                return;
            }
            let mut interval = tokio::time::interval(sync_period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                let _ = interval.tick().await;

                let Some(seed) = seeds.choose(&mut rand::thread_rng()).cloned() else {
                    continue;
                };
                let headers = Headers::new(Qualifier::Sync, correlation_ids.next());
                let members = match dispatcher.send(Snapshot).await {
                    Ok(members) => members,
                    Err(_) => continue,
                };
                let payload = MembershipPayload::new(members, sync_group.clone());

                match transport.request(&seed, headers, payload, sync_timeout).await {
                    Ok(reply) => {
                        let _ = dispatcher
                            .send(ApplyPayload {
                                payload: reply,
                                source: DeltaSource::Sync,
                            })
                            .await;
                    }
                    Err(error) => debug!(seed_id = %seed.id, %error, "SYNC tick got no reply in time"),
                }
            }
        })
    }

    async fn merge_reply(&self, payload: MembershipPayload) {
        if let Err(error) = self
            .dispatcher
            .send(ApplyPayload {
                payload,
                source: DeltaSource::Sync,
            })
            .await
        {
            warn!(%error, "dispatcher mailbox closed while merging initial sync reply");
        }
    }
}
