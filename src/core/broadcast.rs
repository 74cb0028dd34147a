//! In-process publish/subscribe with replay of the latest event.
//!
//! A [`BroadcastHub`] keeps the most recently published event and one unbounded
//! queue per attached subscriber. Publishing never waits for consumers: each
//! event is pushed onto every live queue while the hub lock is held, which is
//! what keeps per-subscriber order identical to publish order.

use futures::Stream;
use serde::Serialize;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};
use tokio::sync::mpsc;

pub type SubscriberId = u64;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BroadcastEvent<T> {
    pub sequence: u64,
    pub payload: T,
}

struct HubState<T> {
    latest: Option<BroadcastEvent<T>>,
    subscribers: HashMap<SubscriberId, mpsc::UnboundedSender<BroadcastEvent<T>>>,
    next_sequence: u64,
    next_subscriber: SubscriberId,
    closed: bool,
}

/// Cloning a hub yields another handle onto the same subscriber set.
pub struct BroadcastHub<T> {
    name: Arc<str>,
    state: Arc<Mutex<HubState<T>>>,
}

impl<T> Clone for BroadcastHub<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            state: self.state.clone(),
        }
    }
}

impl<T> std::fmt::Debug for BroadcastHub<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastHub")
            .field("name", &self.name)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

fn lock<T>(state: &Mutex<HubState<T>>) -> MutexGuard<'_, HubState<T>> {
    // Nothing inside the critical sections can panic half-way through an update.
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T: Clone> BroadcastHub<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Arc::from(name.into()),
            state: Arc::new(Mutex::new(HubState {
                latest: None,
                subscribers: HashMap::new(),
                next_sequence: 1,
                next_subscriber: 1,
                closed: false,
            })),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Makes `payload` the latest event and queues it for every subscriber.
    /// Returns the event's sequence number.
    pub fn publish(&self, payload: T) -> u64 {
        let mut state = lock(&self.state);
        let sequence = state.next_sequence;
        state.next_sequence += 1;

        let event = BroadcastEvent { sequence, payload };
        state
            .subscribers
            .retain(|_, sender| sender.send(event.clone()).is_ok());

        tracing::debug!(
            "{}: published event #{} to {} subscribers",
            self.name,
            sequence,
            state.subscribers.len()
        );
        state.latest = Some(event);
        sequence
    }

    /// Registers a subscriber. The latest event, if any, is already queued on
    /// the returned subscription.
    pub fn attach(&self) -> Subscription<T> {
        let mut state = lock(&self.state);
        let id = state.next_subscriber;
        state.next_subscriber += 1;

        let (sender, receiver) = mpsc::unbounded_channel();
        if !state.closed {
            if let Some(latest) = &state.latest {
                let _ = sender.send(latest.clone());
            }
            state.subscribers.insert(id, sender);
        }

        tracing::debug!("{}: subscriber {} attached", self.name, id);
        Subscription {
            id,
            receiver,
            hub: Arc::downgrade(&self.state),
            hub_name: self.name.clone(),
        }
    }

    /// Stops delivery to `id`. Returns `false` if it was already detached.
    pub fn detach(&self, id: SubscriberId) -> bool {
        detach_from(&self.state, &self.name, id)
    }

    pub fn latest(&self) -> Option<BroadcastEvent<T>> {
        lock(&self.state).latest.clone()
    }
}

impl<T> BroadcastHub<T> {
    pub fn subscriber_count(&self) -> usize {
        lock(&self.state).subscribers.len()
    }

    /// Drops every subscriber queue so open subscriptions end once drained.
    /// Later `attach` calls return subscriptions that end immediately.
    pub fn close(&self) {
        let mut state = lock(&self.state);
        state.closed = true;
        let dropped = state.subscribers.len();
        state.subscribers.clear();
        tracing::info!("{}: hub closed, {} subscribers released", self.name, dropped);
    }
}

fn detach_from<T>(state: &Mutex<HubState<T>>, name: &str, id: SubscriberId) -> bool {
    let removed = lock(state).subscribers.remove(&id).is_some();
    if removed {
        tracing::debug!("{}: subscriber {} detached", name, id);
    }
    removed
}

/// A live attachment to a [`BroadcastHub`]. Dropping it detaches.
pub struct Subscription<T> {
    id: SubscriberId,
    receiver: mpsc::UnboundedReceiver<BroadcastEvent<T>>,
    hub: Weak<Mutex<HubState<T>>>,
    hub_name: Arc<str>,
}

impl<T> Unpin for Subscription<T> {}

impl<T> Subscription<T> {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Waits for the next event. `None` once the subscription is detached or
    /// the hub is closed and the queue drained.
    pub async fn recv(&mut self) -> Option<BroadcastEvent<T>> {
        self.receiver.recv().await
    }

    pub fn detach(&mut self) {
        if let Some(state) = self.hub.upgrade() {
            detach_from(&state, &self.hub_name, self.id);
        }
        self.receiver.close();
    }
}

impl<T> Stream for Subscription<T> {
    type Item = BroadcastEvent<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(state) = self.hub.upgrade() {
            detach_from(&state, &self.hub_name, self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tokio_test::{assert_pending, assert_ready_eq, task};

    fn drain<T>(subscription: &mut Subscription<T>) -> Vec<T> {
        let mut received = Vec::new();
        while let Ok(event) = subscription.receiver.try_recv() {
            received.push(event.payload);
        }
        received
    }

    #[test]
    fn test_late_subscriber_sees_only_latest_then_live_events() {
        let hub = BroadcastHub::new("test");
        for i in 1..=5 {
            hub.publish(i);
        }

        let mut subscription = hub.attach();
        hub.publish(6);
        hub.publish(7);

        assert_eq!(drain(&mut subscription), vec![5, 6, 7]);
    }

    #[test]
    fn test_subscriber_on_empty_hub_gets_nothing_until_publish() {
        let hub = BroadcastHub::<&str>::new("test");
        let subscription = hub.attach();

        let mut next = task::spawn(subscription);
        assert_pending!(next.poll_next());

        hub.publish("created");
        assert!(next.is_woken());
        assert_ready_eq!(
            next.poll_next(),
            Some(BroadcastEvent {
                sequence: 1,
                payload: "created"
            })
        );
    }

    #[test]
    fn test_every_subscriber_receives_in_publish_order() {
        let hub = BroadcastHub::new("test");
        let mut first = hub.attach();
        let mut second = hub.attach();

        for i in 0..100 {
            hub.publish(i);
        }

        let expected: Vec<i32> = (0..100).collect();
        assert_eq!(drain(&mut first), expected);
        assert_eq!(drain(&mut second), expected);
    }

    #[test]
    fn test_sequences_increase_monotonically() {
        let hub = BroadcastHub::new("test");
        let first = hub.publish('a');
        let second = hub.publish('b');
        assert!(second > first);
        assert_eq!(hub.latest().map(|e| e.payload), Some('b'));
    }

    #[test]
    fn test_detach_is_idempotent() {
        let hub = BroadcastHub::new("test");
        let mut subscription = hub.attach();
        let id = subscription.id();
        assert_eq!(hub.subscriber_count(), 1);

        assert!(hub.detach(id));
        assert!(!hub.detach(id));
        assert_eq!(hub.subscriber_count(), 0);

        hub.publish(1);
        assert!(drain(&mut subscription).is_empty());

        subscription.detach();
        subscription.detach();
    }

    #[test]
    fn test_drop_detaches() {
        let hub = BroadcastHub::<u8>::new("test");
        let subscription = hub.attach();
        let _other = hub.attach();
        assert_eq!(hub.subscriber_count(), 2);

        drop(subscription);
        assert_eq!(hub.subscriber_count(), 1);
    }

    #[test]
    fn test_publish_without_subscribers_keeps_only_latest() {
        let hub = BroadcastHub::new("test");
        for i in 0..10_000 {
            hub.publish(i);
        }
        assert_eq!(hub.subscriber_count(), 0);
        assert_eq!(hub.latest().map(|e| e.payload), Some(9_999));
    }

    #[tokio::test]
    async fn test_close_ends_open_subscriptions() {
        let hub = BroadcastHub::new("test");
        let mut subscription = hub.attach();
        hub.publish("last");
        hub.close();

        assert_eq!(subscription.next().await.map(|e| e.payload), Some("last"));
        assert_eq!(subscription.next().await, None);

        let mut late = hub.attach();
        assert_eq!(late.recv().await, None);
    }

    #[tokio::test]
    async fn test_concurrent_publishers_deliver_each_event_once() {
        let hub = BroadcastHub::new("test");
        let mut subscription = hub.attach();

        let mut handles = Vec::new();
        for publisher in 0..8u32 {
            let hub = hub.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..50u32 {
                    hub.publish(publisher * 1000 + i);
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let mut sequences = Vec::new();
        let mut payloads = std::collections::HashSet::new();
        while let Ok(event) = subscription.receiver.try_recv() {
            sequences.push(event.sequence);
            assert!(payloads.insert(event.payload));
        }

        assert_eq!(sequences.len(), 400);
        assert!(sequences.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_ready_macro_on_replayed_event() {
        let hub = BroadcastHub::new("test");
        hub.publish(42u32);
        let mut next = task::spawn(hub.attach().map(|event| event.payload));
        assert_ready_eq!(next.poll_next(), Some(42));
    }
}
