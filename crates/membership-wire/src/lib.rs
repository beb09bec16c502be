//! Wire-visible types for the SWIM-family cluster membership core.
//!
//! This crate has no opinion about transport, runtime, or concurrency — it
//! only defines the data that crosses a process boundary: [`Endpoint`],
//! [`Member`]/[`MemberStatus`], [`MembershipPayload`], and the header
//! contract ([`Headers`]/[`Qualifier`]) used to correlate SYNC and SYNC-ACK
//! messages. `membership-core` depends on this crate and owns all behavior.

mod endpoint;
mod headers;
mod member;
mod payload;

pub use endpoint::Endpoint;
pub use headers::{Headers, Qualifier};
pub use member::{Member, MemberStatus};
pub use payload::MembershipPayload;
