//! Message Queue Module
//!
//! This module provides the transport shared by every agent in a process.
//! Agents and external senders `put` messages; supervisors and consumer loops
//! `get` them with a timeout.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐                          ┌─────────────┐
//! │   Agent A   │──put──┐          ┌──get──│ Supervisor  │
//! └─────────────┘       ▼          │       └─────────────┘
//!                ┌──────────────────┐
//!                │  MessageQueue    │
//!                │ (InMemoryQueue)  │
//!                └──────────────────┘
//! ┌─────────────┐       ▲          │       ┌─────────────┐
//! │   Agent B   │──put──┘          └──get──│  Consumer   │
//! └─────────────┘                          └─────────────┘
//! ```
//!
//! The queue is the only shared mutable state in the runtime, so all locking
//! lives here. Agents never lock around it.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use roleplex::bus::{InMemoryQueue, Message, MessageQueue};
//!
//! #[tokio::main]
//! async fn main() {
//!     let queue = InMemoryQueue::new();
//!     queue.put(Message::new("ping", "agent-1")).unwrap();
//!
//!     if let Some(received) = queue.get(Duration::from_millis(10)).await {
//!         println!("Received: {}", received.message_type());
//!     }
//! }
//! ```

pub mod message;

pub use message::{Message, Priority, HEARTBEAT, SYSTEM_SENDER};

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::error::{Result, RuntimeError};

/// Shared handle to a queue; many agents may hold the same one.
pub type SharedQueue = Arc<dyn MessageQueue>;

/// Transport contract between agents.
///
/// Implementations must tolerate many concurrent producers and at least one
/// concurrent consumer. A networked broker can sit behind the same contract.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Enqueues a message without waiting for a consumer.
    ///
    /// # Errors
    /// Returns `QueueClosed` after the queue was closed, or `QueueFull` when a
    /// bounded queue is at capacity.
    fn put(&self, message: Message) -> Result<()>;

    /// Waits up to `timeout` for the next message.
    ///
    /// Returns `None` on timeout; never errors, so callers can poll in a loop.
    async fn get(&self, timeout: Duration) -> Option<Message>;

    /// Snapshot: `true` if no message is pending.
    fn is_empty(&self) -> bool;

    /// Snapshot of the number of pending messages.
    fn len(&self) -> usize;
}

/// Default in-process queue: a mutex-guarded FIFO plus a wakeup signal.
///
/// Unbounded by default; [`InMemoryQueue::bounded`] rejects `put` once full
/// rather than blocking the producer.
pub struct InMemoryQueue {
    messages: Mutex<VecDeque<Message>>,
    available: Notify,
    capacity: Option<usize>,
    closed: AtomicBool,
}

impl InMemoryQueue {
    /// Creates an unbounded queue.
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(VecDeque::new()),
            available: Notify::new(),
            capacity: None,
            closed: AtomicBool::new(false),
        }
    }

    /// Creates a queue holding at most `capacity` pending messages.
    ///
    /// # Example
    /// ```
    /// use roleplex::bus::{InMemoryQueue, Message, MessageQueue};
    ///
    /// let queue = InMemoryQueue::bounded(1);
    /// assert!(queue.put(Message::new("a", "x")).is_ok());
    /// assert!(queue.put(Message::new("b", "x")).is_err());
    /// ```
    pub fn bounded(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::new()
        }
    }

    /// Creates an unbounded queue already wrapped for sharing.
    pub fn shared() -> SharedQueue {
        Arc::new(Self::new())
    }

    /// Maximum number of pending messages, if bounded.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Removes and returns every pending message in FIFO order.
    pub fn drain(&self) -> Vec<Message> {
        self.lock().drain(..).collect()
    }

    /// Stops accepting new messages. Pending messages can still be consumed.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.available.notify_waiters();
    }

    /// Returns whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Message>> {
        // A panic while holding this lock cannot leave the deque half-updated.
        self.messages.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn pop(&self) -> Option<Message> {
        self.lock().pop_front()
    }
}

#[async_trait]
impl MessageQueue for InMemoryQueue {
    fn put(&self, message: Message) -> Result<()> {
        if self.is_closed() {
            return Err(RuntimeError::QueueClosed);
        }
        {
            let mut messages = self.lock();
            if let Some(capacity) = self.capacity {
                if messages.len() >= capacity {
                    return Err(RuntimeError::QueueFull(capacity));
                }
            }
            messages.push_back(message);
        }
        self.available.notify_one();
        Ok(())
    }

    async fn get(&self, timeout: Duration) -> Option<Message> {
        // No representable deadline (e.g. `Duration::MAX`) means wait forever.
        let deadline = Instant::now().checked_add(timeout);
        loop {
            if let Some(message) = self.pop() {
                return Some(message);
            }
            if self.is_closed() {
                return None;
            }
            // notify_one stores a permit when nobody waits, so a put landing
            // between pop() and here still wakes us.
            match deadline {
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, self.available.notified())
                        .await
                        .is_err()
                    {
                        return self.pop();
                    }
                }
                None => self.available.notified().await,
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_creation() {
        let queue = InMemoryQueue::new();
        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
        assert!(queue.capacity().is_none());
        assert!(!queue.is_closed());
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let queue = InMemoryQueue::new();
        queue.put(Message::new("ping", "agent-1")).unwrap();
        assert_eq!(queue.len(), 1);

        let received = queue.get(Duration::from_millis(10)).await.unwrap();
        assert_eq!(received.message_type(), "ping");
        assert_eq!(received.sender_id(), "agent-1");
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = InMemoryQueue::new();
        for i in 0..5 {
            queue.put(Message::new(format!("msg-{}", i), "a")).unwrap();
        }
        for i in 0..5 {
            let received = queue.get(Duration::from_millis(10)).await.unwrap();
            assert_eq!(received.message_type(), format!("msg-{}", i));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_times_out_with_none() {
        let queue = InMemoryQueue::new();
        let started = Instant::now();
        let result = queue.get(Duration::from_secs(5)).await;
        assert!(result.is_none());
        assert!(started.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_get_wakes_on_put() {
        let queue = Arc::new(InMemoryQueue::new());
        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.get(Duration::from_secs(5)).await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.put(Message::new("late", "producer")).unwrap();

        let received = consumer.await.unwrap().unwrap();
        assert_eq!(received.message_type(), "late");
    }

    #[tokio::test]
    async fn test_get_without_deadline_waits_for_put() {
        let queue = Arc::new(InMemoryQueue::new());
        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.get(Duration::MAX).await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!consumer.is_finished());
        queue.put(Message::new("late", "producer")).unwrap();

        let received = consumer.await.unwrap().unwrap();
        assert_eq!(received.message_type(), "late");
    }

    #[tokio::test]
    async fn test_get_without_deadline_returns_none_on_close() {
        let queue = Arc::new(InMemoryQueue::new());
        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.get(Duration::MAX).await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.close();
        assert!(consumer.await.unwrap().is_none());
    }

    #[test]
    fn test_bounded_queue_rejects_when_full() {
        let queue = InMemoryQueue::bounded(2);
        queue.put(Message::new("1", "a")).unwrap();
        queue.put(Message::new("2", "a")).unwrap();

        let result = queue.put(Message::new("3", "a"));
        assert!(matches!(result, Err(RuntimeError::QueueFull(2))));
        assert_eq!(queue.len(), 2);
    }

    #[tokio::test]
    async fn test_closed_queue_rejects_put_but_drains() {
        let queue = InMemoryQueue::new();
        queue.put(Message::new("before", "a")).unwrap();
        queue.close();

        assert!(matches!(
            queue.put(Message::new("after", "a")),
            Err(RuntimeError::QueueClosed)
        ));
        let received = queue.get(Duration::from_millis(10)).await.unwrap();
        assert_eq!(received.message_type(), "before");
        assert!(queue.get(Duration::from_millis(10)).await.is_none());
    }

    #[test]
    fn test_drain() {
        let queue = InMemoryQueue::new();
        queue.put(Message::new("a", "x")).unwrap();
        queue.put(Message::new("b", "x")).unwrap();

        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].message_type(), "a");
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_producers() {
        let queue = Arc::new(InMemoryQueue::new());
        let mut handles = vec![];

        for producer in ["alpha", "beta", "gamma"] {
            let queue = Arc::clone(&queue);
            handles.push(tokio::spawn(async move {
                for i in 0..10 {
                    queue
                        .put(Message::new(format!("{}-{}", producer, i), producer))
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(queue.len(), 30);
        let mut count = 0;
        while queue.get(Duration::from_millis(1)).await.is_some() {
            count += 1;
        }
        assert_eq!(count, 30);
    }

    #[tokio::test]
    async fn test_shared_handle() {
        let queue: SharedQueue = InMemoryQueue::shared();
        let clone = Arc::clone(&queue);
        clone.put(Message::new("shared", "a")).unwrap();
        assert_eq!(queue.len(), 1);
    }
}
