//! Replay Subjects
//!
//! Publish/subscribe channels that keep their latest value and replay it
//! to every new subscriber.

use futures::Stream;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};
use tokio::sync::mpsc;

struct Inner<T> {
    latest: Option<T>,
    subscribers: Vec<mpsc::UnboundedSender<T>>,
    completed: bool,
}

/// Multi-subscriber channel with replay-of-one semantics.
///
/// Every subscriber receives every value emitted after it subscribed, in
/// emission order, plus the latest value at the moment it subscribed.
pub struct ReplaySubject<T> {
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T> Clone for ReplaySubject<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> ReplaySubject<T> {
    /// Create a subject with no value yet.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                latest: None,
                subscribers: Vec::new(),
                completed: false,
            })),
        }
    }

    /// Create a subject holding `value`.
    pub fn with_value(value: T) -> Self {
        let subject = Self::new();
        subject.lock().latest = Some(value);
        subject
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Emit a value to all subscribers and keep it as the latest.
    ///
    /// Ignored once the subject has completed.
    pub fn next(&self, value: T) {
        let mut inner = self.lock();
        if inner.completed {
            return;
        }
        inner
            .subscribers
            .retain(|subscriber| subscriber.send(value.clone()).is_ok());
        inner.latest = Some(value);
    }

    /// The latest value, if any.
    pub fn value(&self) -> Option<T> {
        self.lock().latest.clone()
    }

    /// Subscribe, receiving the latest value first if there is one.
    ///
    /// Each subscription buffers every value it has not read yet, without
    /// bound. Drop subscriptions that are no longer polled.
    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        if let Some(latest) = &inner.latest {
            // Receiver is alive, cannot fail.
            let _ = tx.send(latest.clone());
        }
        if !inner.completed {
            inner.subscribers.push(tx);
        }
        Subscription { receiver: rx }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        let mut inner = self.lock();
        inner.subscribers.retain(|subscriber| !subscriber.is_closed());
        inner.subscribers.len()
    }

    /// End the subject. Current subscribers drain and end; later
    /// subscribers only receive the latest value.
    pub fn complete(&self) {
        let mut inner = self.lock();
        inner.completed = true;
        inner.subscribers.clear();
    }

    /// Whether the subject has completed.
    pub fn is_completed(&self) -> bool {
        self.lock().completed
    }
}

impl<T: Clone + PartialEq + Send + 'static> ReplaySubject<T> {
    /// Emit only if `value` differs from the latest value.
    ///
    /// Returns whether the value was emitted.
    pub fn next_distinct(&self, value: T) -> bool {
        let mut inner = self.lock();
        if inner.completed || inner.latest.as_ref() == Some(&value) {
            return false;
        }
        inner
            .subscribers
            .retain(|subscriber| subscriber.send(value.clone()).is_ok());
        inner.latest = Some(value);
        true
    }
}

impl<T: Clone + Send + 'static> Default for ReplaySubject<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A subscription to a [`ReplaySubject`].
pub struct Subscription<T> {
    receiver: mpsc::UnboundedReceiver<T>,
}

impl<T> Subscription<T> {
    /// Wait for the next value. `None` once the subject completed.
    pub async fn recv(&mut self) -> Option<T> {
        self.receiver.recv().await
    }

    /// Take the next value if one is already queued.
    pub fn try_recv(&mut self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    /// Drain every value queued so far.
    pub fn drain(&mut self) -> Vec<T> {
        let mut values = Vec::new();
        while let Some(value) = self.try_recv() {
            values.push(value);
        }
        values
    }
}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.receiver.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn test_replays_latest_to_late_subscriber() {
        let subject = ReplaySubject::new();
        subject.next(1);
        subject.next(2);

        let mut late = subject.subscribe();
        assert_eq!(late.drain(), vec![2]);

        subject.next(3);
        assert_eq!(late.drain(), vec![3]);
    }

    #[test]
    fn test_with_value() {
        let subject = ReplaySubject::with_value(true);
        let mut sub = subject.subscribe();

        assert_eq!(sub.drain(), vec![true]);
        assert_eq!(subject.value(), Some(true));
    }

    #[test]
    fn test_empty_subject_replays_nothing() {
        let subject: ReplaySubject<u8> = ReplaySubject::new();
        let mut sub = subject.subscribe();

        assert!(sub.try_recv().is_none());
        assert!(subject.value().is_none());
    }

    #[test]
    fn test_next_distinct_suppresses_repeats() {
        let subject = ReplaySubject::new();
        let mut sub = subject.subscribe();

        assert!(subject.next_distinct(false));
        assert!(!subject.next_distinct(false));
        assert!(subject.next_distinct(true));
        assert!(subject.next_distinct(false));

        assert_eq!(sub.drain(), vec![false, true, false]);
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let subject = ReplaySubject::new();
        let first = subject.subscribe();
        let _second = subject.subscribe();
        assert_eq!(subject.subscriber_count(), 2);

        drop(first);
        subject.next("a");
        assert_eq!(subject.subscriber_count(), 1);
    }

    #[test]
    fn test_unread_values_buffer_until_dropped() {
        let subject = ReplaySubject::new();
        let mut idle = subject.subscribe();

        for value in 0..3 {
            subject.next(value);
        }
        assert_eq!(idle.drain(), vec![0, 1, 2]);

        subject.next(3);
        drop(idle);
        subject.next(4);
        assert_eq!(subject.subscriber_count(), 0);
        assert_eq!(subject.value(), Some(4));
    }

    #[tokio::test]
    async fn test_stream_ends_on_complete() {
        let subject = ReplaySubject::with_value(1);
        let sub = subject.subscribe();
        subject.next(2);
        subject.complete();

        let values: Vec<i32> = sub.collect().await;
        assert_eq!(values, vec![1, 2]);

        subject.next(3);
        let late: Vec<i32> = subject.subscribe().collect().await;
        assert_eq!(late, vec![2]);
        assert!(subject.is_completed());
    }
}
