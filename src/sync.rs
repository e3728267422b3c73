//! Bounded blocking SPSC queue for in-process (inter-thread) communication.
//!
//! The render pipeline wants backpressure, not throughput: the control loop
//! must stall when a panel's queue is full, and a worker must sleep while
//! its queue is empty. So this queue blocks on a condvar rather than
//! spinning.
//!
//! - [`Producer`] - write end (control loop)
//! - [`Consumer`] - read end (one panel worker)
//! - Dropping either end disconnects the channel; the survivor is told.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// Timeout specification for blocking operations.
#[derive(Debug, Clone, Copy)]
pub enum Timeout {
    /// Wait indefinitely.
    Infinite,
    /// Wait for at most the specified duration.
    Duration(Duration),
}

impl From<Duration> for Timeout {
    fn from(d: Duration) -> Self {
        Self::Duration(d)
    }
}

/// Why a push did not land. The item is handed back for retry.
#[derive(Debug, PartialEq, Eq)]
pub enum PushError<T> {
    /// Queue stayed full for the whole timeout.
    Full(T),
    /// Consumer is gone; no push will ever succeed again.
    Disconnected(T),
}

struct Shared<T> {
    queue: Mutex<State<T>>,
    not_full: Condvar,
    not_empty: Condvar,
    capacity: usize,
}

struct State<T> {
    items: VecDeque<T>,
    producer_alive: bool,
    consumer_alive: bool,
}

/// Creates a bounded channel with the given capacity.
///
/// # Panics
/// Panics if `capacity` is zero.
#[must_use]
pub fn channel<T: Send>(capacity: usize) -> (Producer<T>, Consumer<T>) {
    assert!(capacity > 0, "queue capacity must be greater than 0");
    let shared = Arc::new(Shared {
        queue: Mutex::new(State {
            items: VecDeque::with_capacity(capacity),
            producer_alive: true,
            consumer_alive: true,
        }),
        not_full: Condvar::new(),
        not_empty: Condvar::new(),
        capacity,
    });
    (
        Producer {
            shared: Arc::clone(&shared),
        },
        Consumer { shared },
    )
}

/// Write end of the queue. Single producer.
pub struct Producer<T: Send> {
    shared: Arc<Shared<T>>,
}

/// Read end of the queue. Single consumer.
pub struct Consumer<T: Send> {
    shared: Arc<Shared<T>>,
}

impl<T: Send> Producer<T> {
    /// Attempts to push without blocking.
    ///
    /// # Errors
    /// Returns the item back if the queue is full or disconnected.
    pub fn push(&self, item: T) -> Result<(), PushError<T>> {
        let mut state = lock(&self.shared.queue);
        if !state.consumer_alive {
            return Err(PushError::Disconnected(item));
        }
        if state.items.len() >= self.shared.capacity {
            return Err(PushError::Full(item));
        }
        state.items.push_back(item);
        self.shared.not_empty.notify_one();
        Ok(())
    }

    /// Blocks until space frees, then pushes.
    ///
    /// # Errors
    /// Returns `Full` on timeout or `Disconnected` if the consumer is gone.
    pub fn push_blocking(&self, item: T, timeout: Timeout) -> Result<(), PushError<T>> {
        let deadline = match timeout {
            Timeout::Infinite => None,
            Timeout::Duration(d) => Some(std::time::Instant::now() + d),
        };
        let mut state = lock(&self.shared.queue);
        loop {
            if !state.consumer_alive {
                return Err(PushError::Disconnected(item));
            }
            if state.items.len() < self.shared.capacity {
                state.items.push_back(item);
                self.shared.not_empty.notify_one();
                return Ok(());
            }
            state = match deadline {
                None => match self.shared.not_full.wait(state) {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                },
                Some(dl) => {
                    let now = std::time::Instant::now();
                    if now >= dl {
                        return Err(PushError::Full(item));
                    }
                    match self.shared.not_full.wait_timeout(state, dl - now) {
                        Ok((guard, _)) => guard,
                        Err(poisoned) => poisoned.into_inner().0,
                    }
                }
            };
        }
    }
}

impl<T: Send> Consumer<T> {
    /// Attempts to pop without blocking. `None` if the queue is empty.
    #[must_use]
    pub fn pop(&self) -> Option<T> {
        let mut state = lock(&self.shared.queue);
        let item = state.items.pop_front();
        if item.is_some() {
            self.shared.not_full.notify_one();
        }
        item
    }

    /// Blocks until an item arrives. `None` on timeout, or immediately once
    /// the producer is gone and the queue has drained.
    #[must_use]
    pub fn pop_blocking(&self, timeout: Timeout) -> Option<T> {
        let deadline = match timeout {
            Timeout::Infinite => None,
            Timeout::Duration(d) => Some(std::time::Instant::now() + d),
        };
        let mut state = lock(&self.shared.queue);
        loop {
            if let Some(item) = state.items.pop_front() {
                self.shared.not_full.notify_one();
                return Some(item);
            }
            if !state.producer_alive {
                return None;
            }
            state = match deadline {
                None => match self.shared.not_empty.wait(state) {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                },
                Some(dl) => {
                    let now = std::time::Instant::now();
                    if now >= dl {
                        return None;
                    }
                    match self.shared.not_empty.wait_timeout(state, dl - now) {
                        Ok((guard, _)) => guard,
                        Err(poisoned) => poisoned.into_inner().0,
                    }
                }
            };
        }
    }

    /// Whether the producer end has been dropped.
    #[must_use]
    pub fn is_disconnected(&self) -> bool {
        !lock(&self.shared.queue).producer_alive
    }
}

impl<T: Send> Drop for Producer<T> {
    fn drop(&mut self) {
        lock(&self.shared.queue).producer_alive = false;
        self.shared.not_empty.notify_one();
    }
}

impl<T: Send> Drop for Consumer<T> {
    fn drop(&mut self) {
        lock(&self.shared.queue).consumer_alive = false;
        self.shared.not_full.notify_one();
    }
}

fn lock<T>(mutex: &Mutex<State<T>>) -> std::sync::MutexGuard<'_, State<T>> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_push_pop() {
        let (producer, consumer) = channel::<u64>(8);
        producer.push(42).unwrap();
        assert_eq!(consumer.pop(), Some(42));
        assert_eq!(consumer.pop(), None);
    }

    #[test]
    fn fifo_order() {
        let (producer, consumer) = channel::<u64>(8);
        for i in 0..5 {
            producer.push(i).unwrap();
        }
        for i in 0..5 {
            assert_eq!(consumer.pop(), Some(i));
        }
    }

    #[test]
    fn full_queue_rejects_push() {
        let (producer, consumer) = channel::<u64>(2);
        producer.push(0).unwrap();
        producer.push(1).unwrap();
        assert_eq!(producer.push(2), Err(PushError::Full(2)));
        assert_eq!(consumer.pop(), Some(0));
        producer.push(2).unwrap();
    }

    #[test]
    fn push_blocking_times_out_when_full() {
        let (producer, _consumer) = channel::<u64>(1);
        producer.push(0).unwrap();
        let result = producer.push_blocking(1, Timeout::Duration(Duration::from_millis(20)));
        assert_eq!(result, Err(PushError::Full(1)));
    }

    #[test]
    fn push_blocking_wakes_on_pop() {
        let (producer, consumer) = channel::<u64>(1);
        producer.push(0).unwrap();
        // The consumer stays alive past the wake-up: it drains the first
        // item and then blocks for the one the producer is waiting to push.
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            let first = consumer.pop();
            let second = consumer.pop_blocking(Timeout::Infinite);
            (first, second)
        });
        producer.push_blocking(1, Timeout::Infinite).unwrap();
        assert_eq!(handle.join().unwrap(), (Some(0), Some(1)));
    }

    #[test]
    fn pop_blocking_times_out_when_empty() {
        let (_producer, consumer) = channel::<u64>(1);
        assert_eq!(
            consumer.pop_blocking(Timeout::Duration(Duration::from_millis(20))),
            None
        );
    }

    #[test]
    fn pop_blocking_wakes_on_push() {
        let (producer, consumer) = channel::<u64>(1);
        let handle = std::thread::spawn(move || consumer.pop_blocking(Timeout::Infinite));
        std::thread::sleep(Duration::from_millis(20));
        producer.push(7).unwrap();
        assert_eq!(handle.join().unwrap(), Some(7));
    }

    #[test]
    fn dropped_consumer_disconnects_producer() {
        let (producer, consumer) = channel::<u64>(1);
        drop(consumer);
        assert_eq!(producer.push(1), Err(PushError::Disconnected(1)));
        assert_eq!(
            producer.push_blocking(2, Timeout::Infinite),
            Err(PushError::Disconnected(2))
        );
    }

    #[test]
    fn dropped_producer_drains_then_disconnects() {
        let (producer, consumer) = channel::<u64>(2);
        producer.push(1).unwrap();
        drop(producer);
        assert_eq!(consumer.pop_blocking(Timeout::Infinite), Some(1));
        assert_eq!(consumer.pop_blocking(Timeout::Infinite), None);
        assert!(consumer.is_disconnected());
    }

    #[test]
    fn send_to_thread() {
        let (producer, consumer) = channel::<String>(4);
        let handle = std::thread::spawn(move || {
            for i in 0..10 {
                producer
                    .push_blocking(format!("msg-{i}"), Timeout::Infinite)
                    .unwrap();
            }
        });
        let mut received = Vec::new();
        while received.len() < 10 {
            if let Some(item) = consumer.pop_blocking(Timeout::Infinite) {
                received.push(item);
            }
        }
        handle.join().unwrap();
        assert_eq!(received[0], "msg-0");
        assert_eq!(received[9], "msg-9");
    }
}
