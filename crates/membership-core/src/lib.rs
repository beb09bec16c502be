//! SWIM-family cluster membership core.
//!
//! This crate is the stateful half of the split described in
//! `membership-wire`'s crate doc: the membership table and its merge rule,
//! the timer-driven decay of SUSPECTED/SHUTDOWN members, the SYNC/SYNC-ACK
//! anti-entropy engine, the single-writer event dispatcher that fuses SYNC,
//! failure-detector, and gossip inputs, the observer fan-out, and the local
//! lifecycle (`start`/`leave`). It depends on `membership-wire` for the
//! wire-visible types and defines three traits — [`Transport`],
//! [`FailureDetector`], [`GossipBroadcaster`] — as the interface-only
//! external collaborators spec.md §1 scopes out of this crate.
//!
//! The entry point is [`Membership::start`]; everything else here is either
//! an implementation detail reachable through it or one of the three traits
//! an embedder implements.

mod config;
mod dispatcher;
mod error;
mod failure_detector;
mod gossip;
mod lifecycle;
mod observer;
mod sync;
mod table;
mod transport;

pub use config::{MembershipConfig, MembershipConfigBuilder};
pub use dispatcher::DeltaSource;
pub use error::{MembershipError, Result};
pub use failure_detector::{FailureDetector, FailureDetectorVerdict};
pub use gossip::GossipBroadcaster;
pub use lifecycle::{Membership, MembershipHandle};
pub use transport::{InboundRequest, Transport};

pub use membership_wire::{Endpoint, Member, MemberStatus, MembershipPayload};
