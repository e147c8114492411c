//! Handoff queue between the listener and the action worker.
//!
//! The listener pushes accepted events; the worker pops at most one per
//! pacing interval. The queue is unbounded: a push never blocks and never
//! drops, so a burst of matches simply waits its turn in memory.
//!
//! # Ordering
//!
//! The discipline is fixed for the lifetime of a queue:
//!
//! - [`QueueOrder::Lifo`] (default): the freshest match is boosted first. A
//!   backlog drains at one item per interval, so under sustained load old
//!   matches may wait a long time, but the bot keeps reacting to what people
//!   are saying right now.
//! - [`QueueOrder::Fifo`]: matches are boosted in arrival order. Nothing
//!   starves, at the cost of reacting late during bursts.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::types::InboundEvent;

/// The order in which queued events are handed to the worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueueOrder {
    /// First in, first out.
    Fifo,

    /// Last in, first out.
    #[default]
    Lifo,
}

impl fmt::Display for QueueOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueOrder::Fifo => write!(f, "fifo"),
            QueueOrder::Lifo => write!(f, "lifo"),
        }
    }
}

/// Error returned when a queue order name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown queue order {0:?} (expected \"fifo\" or \"lifo\")")]
pub struct ParseQueueOrderError(String);

impl FromStr for QueueOrder {
    type Err = ParseQueueOrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fifo" => Ok(QueueOrder::Fifo),
            "lifo" => Ok(QueueOrder::Lifo),
            _ => Err(ParseQueueOrderError(s.to_string())),
        }
    }
}

/// A multi-producer, single-consumer queue of events awaiting a reaction.
///
/// Cloning yields another handle to the same queue.
#[derive(Clone)]
pub struct ActionQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    items: Mutex<VecDeque<InboundEvent>>,
    notify: Notify,
    order: QueueOrder,
}

impl ActionQueue {
    /// Creates an empty queue with the given discipline.
    pub fn new(order: QueueOrder) -> Self {
        ActionQueue {
            inner: Arc::new(QueueInner {
                items: Mutex::new(VecDeque::new()),
                notify: Notify::new(),
                order,
            }),
        }
    }

    /// Returns the queue discipline.
    pub fn order(&self) -> QueueOrder {
        self.inner.order
    }

    /// Returns the number of events waiting.
    pub fn len(&self) -> usize {
        self.items().len()
    }

    /// Returns true if no events are waiting.
    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    /// Adds an event. Never blocks and never fails.
    pub fn push(&self, event: InboundEvent) {
        self.items().push_back(event);
        self.inner.notify.notify_one();
    }

    /// Removes the next event according to the queue discipline, if any.
    pub fn try_pop(&self) -> Option<InboundEvent> {
        let mut items = self.items();
        match self.inner.order {
            QueueOrder::Fifo => items.pop_front(),
            QueueOrder::Lifo => items.pop_back(),
        }
    }

    /// Waits up to `timeout` for an event.
    ///
    /// Returns `None` once the timeout elapses with the queue still empty.
    pub async fn pop_timeout(&self, timeout: Duration) -> Option<InboundEvent> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(event) = self.try_pop() {
                return Some(event);
            }
            if tokio::time::timeout_at(deadline, self.inner.notify.notified())
                .await
                .is_err()
            {
                return self.try_pop();
            }
        }
    }

    // A panic while holding the lock cannot leave the deque half-updated,
    // so a poisoned lock is still safe to use.
    fn items(&self) -> MutexGuard<'_, VecDeque<InboundEvent>> {
        self.inner
            .items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ActionQueue {
    fn default() -> Self {
        Self::new(QueueOrder::default())
    }
}

impl fmt::Debug for ActionQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionQueue")
            .field("order", &self.inner.order)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn event(id: u64) -> InboundEvent {
        InboundEvent::new(id, format!("need new music {}", id))
    }

    fn drain(queue: &ActionQueue) -> Vec<String> {
        std::iter::from_fn(|| queue.try_pop())
            .map(|e| e.id.0)
            .collect()
    }

    // ─── Basic queue operations ───

    #[test]
    fn new_queue_is_empty() {
        let queue = ActionQueue::new(QueueOrder::Fifo);
        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
        assert!(queue.try_pop().is_none());
    }

    #[test]
    fn default_order_is_lifo() {
        assert_eq!(ActionQueue::default().order(), QueueOrder::Lifo);
    }

    #[test]
    fn fifo_pops_in_arrival_order() {
        let queue = ActionQueue::new(QueueOrder::Fifo);
        for id in 1..=3 {
            queue.push(event(id));
        }
        assert_eq!(drain(&queue), vec!["1", "2", "3"]);
    }

    #[test]
    fn lifo_pops_freshest_first() {
        let queue = ActionQueue::new(QueueOrder::Lifo);
        for id in 1..=3 {
            queue.push(event(id));
        }
        assert_eq!(drain(&queue), vec!["3", "2", "1"]);
    }

    #[test]
    fn clones_share_the_same_buffer() {
        let producer = ActionQueue::new(QueueOrder::Fifo);
        let consumer = producer.clone();
        producer.push(event(9));
        assert_eq!(consumer.len(), 1);
        assert_eq!(consumer.try_pop().unwrap().id.as_str(), "9");
        assert!(producer.is_empty());
    }

    #[test]
    fn queue_order_parses_case_insensitively() {
        assert_eq!("FIFO".parse::<QueueOrder>(), Ok(QueueOrder::Fifo));
        assert_eq!(" lifo ".parse::<QueueOrder>(), Ok(QueueOrder::Lifo));
        assert!("random".parse::<QueueOrder>().is_err());
    }

    // ─── Waiting pops ───

    #[tokio::test(start_paused = true)]
    async fn pop_timeout_returns_none_when_empty() {
        let queue = ActionQueue::new(QueueOrder::Fifo);
        let start = Instant::now();
        assert!(queue.pop_timeout(Duration::from_secs(5)).await.is_none());
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn pop_timeout_returns_immediately_when_item_waiting() {
        let queue = ActionQueue::new(QueueOrder::Fifo);
        queue.push(event(1));
        let start = Instant::now();
        let popped = queue.pop_timeout(Duration::from_secs(5)).await;
        assert_eq!(popped.unwrap().id.as_str(), "1");
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn pop_timeout_wakes_on_push_from_another_task() {
        let queue = ActionQueue::new(QueueOrder::Fifo);
        let producer = queue.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            producer.push(event(42));
        });

        let start = Instant::now();
        let popped = queue.pop_timeout(Duration::from_secs(60)).await;
        assert_eq!(popped.unwrap().id.as_str(), "42");
        assert!(start.elapsed() < Duration::from_secs(60));
    }

    // ─── Property tests ───

    proptest! {
        /// Length is exact after any mix of pushes and pops.
        #[test]
        fn prop_length_accurate(push_count in 0usize..50, pop_count in 0usize..50) {
            let queue = ActionQueue::new(QueueOrder::Lifo);
            for i in 0..push_count {
                queue.push(event(i as u64));
            }
            for _ in 0..pop_count {
                queue.try_pop();
            }
            prop_assert_eq!(queue.len(), push_count.saturating_sub(pop_count));
        }

        /// Every pushed event comes out exactly once, whichever the order.
        #[test]
        fn prop_no_event_lost_or_duplicated(count in 0u64..40, fifo in any::<bool>()) {
            let order = if fifo { QueueOrder::Fifo } else { QueueOrder::Lifo };
            let queue = ActionQueue::new(order);
            for i in 0..count {
                queue.push(event(i));
            }
            let mut popped: Vec<u64> = drain(&queue)
                .iter()
                .map(|id| id.parse().unwrap())
                .collect();
            popped.sort_unstable();
            prop_assert_eq!(popped, (0..count).collect::<Vec<_>>());
        }
    }
}
