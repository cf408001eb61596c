//! Latched publish/subscribe topic.
//!
//! A topic keeps the last published value. Subscribers that join after a
//! publish receive that value immediately, followed by every later publish.
//!
//! ```text
//! publish(a) ──▶ [last = a] ──▶ existing subscribers
//!                     │
//! subscribe() ────────┴──▶ new subscription pre-loaded with `a`
//! ```
//!
//! Each subscription is a bounded lock-free queue. A subscriber that stops
//! draining loses its oldest values first, so the newest value is always
//! queued.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_queue::ArrayQueue;
use parking_lot::Mutex;

/// Queue depth per subscriber (~5 seconds of relative poses at 50Hz)
pub const SUBSCRIBER_CAPACITY: usize = 256;

/// Poll interval for [`Subscription::recv_timeout`]
const POLL_INTERVAL: Duration = Duration::from_millis(1);

struct TopicState<T> {
    last: Option<T>,
    subscribers: Vec<Arc<ArrayQueue<T>>>,
}

/// A named topic that retains its most recent value.
pub struct LatchedTopic<T> {
    name: &'static str,
    state: Mutex<TopicState<T>>,
}

impl<T: Clone> LatchedTopic<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Mutex::new(TopicState {
                last: None,
                subscribers: Vec::new(),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Store `value` as the latched value and fan it out.
    ///
    /// Dropped subscriptions are pruned; full ones discard their oldest value.
    pub fn publish(&self, value: T) {
        let mut state = self.state.lock();
        let before = state.subscribers.len();
        // Only the topic holds a reference once the subscription is dropped
        state.subscribers.retain(|queue| Arc::strong_count(queue) > 1);
        let pruned = before - state.subscribers.len();
        if pruned > 0 {
            log::debug!("Topic {}: dropped {} closed subscribers", self.name, pruned);
        }

        for queue in &state.subscribers {
            if queue.force_push(value.clone()).is_some() {
                log::trace!("Topic {}: slow subscriber, oldest value discarded", self.name);
            }
        }
        state.last = Some(value);
    }

    /// Subscribe; the latched value (if any) is already queued.
    pub fn subscribe(&self) -> Subscription<T> {
        let queue = Arc::new(ArrayQueue::new(SUBSCRIBER_CAPACITY));
        let mut state = self.state.lock();
        if let Some(last) = &state.last {
            let _ = queue.push(last.clone());
        }
        state.subscribers.push(Arc::clone(&queue));
        Subscription { queue }
    }

    /// Most recently published value.
    pub fn latest(&self) -> Option<T> {
        self.state.lock().last.clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.lock().subscribers.len()
    }
}

/// Receiving end of a [`LatchedTopic`] subscription.
pub struct Subscription<T> {
    queue: Arc<ArrayQueue<T>>,
}

impl<T> Subscription<T> {
    /// Oldest queued value, if any.
    pub fn try_recv(&self) -> Option<T> {
        self.queue.pop()
    }

    /// Wait up to `timeout` for a value.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(value) = self.queue.pop() {
                return Some(value);
            }
            if Instant::now() >= deadline {
                return None;
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Number of queued values.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
