use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use crate::{QueueTransport, TransportError, Wait};

#[derive(Default)]
struct Shared {
    queues: Mutex<HashMap<String, VecDeque<Vec<u8>>>>,
    arrived: Condvar,
}

/// In-process FIFO queues standing in for the broker.
///
/// Clones share the same queues, so a test can hand one clone to the server
/// and keep another to play the client.
#[derive(Clone, Default)]
pub struct MemoryQueue {
    shared: Arc<Shared>,
}

impl MemoryQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes without going through the trait, for seeding queues in tests.
    /// Accepts arbitrary bytes, including ones that are not UTF-8.
    pub fn push(&self, queue: &str, message: impl Into<Vec<u8>>) {
        let mut queues = self.shared.queues.lock();
        queues
            .entry(queue.to_string())
            .or_default()
            .push_back(message.into());
        self.shared.arrived.notify_all();
    }

    /// Removes and returns everything currently on `queue`, oldest first.
    #[must_use]
    pub fn drain(&self, queue: &str) -> Vec<Vec<u8>> {
        let mut queues = self.shared.queues.lock();
        queues
            .get_mut(queue)
            .map(|q| q.drain(..).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn len(&self, queue: &str) -> usize {
        self.shared.queues.lock().get(queue).map_or(0, VecDeque::len)
    }

    #[must_use]
    pub fn is_empty(&self, queue: &str) -> bool {
        self.len(queue) == 0
    }
}

impl QueueTransport for MemoryQueue {
    fn receive(&mut self, queue: &str, wait: Wait) -> Result<Option<Vec<u8>>, TransportError> {
        let deadline = match wait {
            Wait::Forever => None,
            Wait::Timeout(timeout) => Some(Instant::now() + timeout),
        };
        let mut queues = self.shared.queues.lock();
        loop {
            if let Some(message) = queues.get_mut(queue).and_then(VecDeque::pop_front) {
                return Ok(Some(message));
            }
            match deadline {
                None => self.shared.arrived.wait(&mut queues),
                Some(deadline) => {
                    if self.shared.arrived.wait_until(&mut queues, deadline).timed_out() {
                        return Ok(queues.get_mut(queue).and_then(VecDeque::pop_front));
                    }
                }
            }
        }
    }

    fn send(&mut self, queue: &str, message: &str) -> Result<(), TransportError> {
        self.push(queue, message);
        Ok(())
    }
}
