use membership_wire::Member;
use tokio::sync::broadcast;

/// Multi-subscriber fan-out of membership deltas to application code.
///
/// Not part of spec.md's enumerated API surface, which only specifies that
/// observers "are notified of every delta" without naming a transport; this
/// uses [`tokio::sync::broadcast`] so any number of subscribers can attach
/// and detach independently, matching the fan-out shape the teacher gives
/// its own event stream (`NetworkEventDispatcher`) without tying subscribers
/// to the dispatcher's actor mailbox. A lagging subscriber misses the oldest
/// buffered deltas rather than stalling the Event Dispatcher — see
/// SPEC_FULL.md §15.
#[derive(Debug)]
pub struct ObserverHub {
    sender: broadcast::Sender<Member>,
}

impl ObserverHub {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Member> {
        self.sender.subscribe()
    }

    /// Publish a delta. Silently dropped if there are no subscribers — the
    /// Event Dispatcher never blocks waiting on an observer.
    pub fn publish(&self, delta: Member) {
        let _ = self.sender.send(delta);
    }
}

#[cfg(test)]
mod tests {
    use membership_wire::{Endpoint, MemberStatus};

    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_deltas() {
        let hub = ObserverHub::new(16);
        let mut rx = hub.subscribe();

        let member = Member::new(Endpoint::new("a", "127.0.0.1", 7946), MemberStatus::Trusted);
        hub.publish(member.clone());

        let received = rx.recv().await.unwrap();
        assert_eq!(received.endpoint.id, member.endpoint.id);
    }

    #[tokio::test]
    async fn publishing_with_no_subscribers_does_not_panic() {
        let hub = ObserverHub::new(16);
        hub.publish(Member::new(
            Endpoint::new("a", "127.0.0.1", 7946),
            MemberStatus::Trusted,
        ));
    }
}
