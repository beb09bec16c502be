use thiserror::Error;

/// Errors raised directly by this crate's own logic.
///
/// Failures that originate in an external collaborator (transport send,
/// failure detector, gossip broadcaster) are wrapped in `eyre::Report` at
/// the call site instead — see spec.md §7: no failure here is fatal to the
/// service, so these are always logged-and-continued, never propagated out
/// of the dispatcher's event loop.
#[derive(Debug, Error)]
pub enum MembershipError {
    #[error("membership config invalid: {0}")]
    InvalidConfig(&'static str),

    #[error("sync group mismatch: expected {expected:?}, got {actual:?}")]
    SyncGroupMismatch { expected: String, actual: String },

    #[error("event dispatcher mailbox error: {0}")]
    Mailbox(#[from] actix::MailboxError),
}

pub type Result<T> = core::result::Result<T, MembershipError>;
