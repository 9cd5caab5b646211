//! Serialization of GATT operations.
//!
//! Most native stacks silently drop a GATT request issued while another is
//! outstanding. The queue hands out turns in FIFO order so at most one
//! operation is in flight at a time.

use std::sync::Mutex;

use futures_channel::oneshot;

/// A FIFO turn queue. [`acquire`](OperationQueue::acquire) resolves once all
/// previously acquired turns have been dropped.
#[derive(Default)]
pub struct OperationQueue {
    tail: Mutex<Option<oneshot::Receiver<()>>>,
}

impl OperationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for the previous turn to finish, then grants this one. The
    /// returned [`Turn`] releases the queue when dropped, whether the
    /// operation completed, failed or was cancelled.
    pub async fn acquire(&self) -> Turn {
        let (sender, receiver) = oneshot::channel();
        let previous = {
            let mut tail = self.tail.lock().unwrap();
            tail.replace(receiver)
        };
        if let Some(previous) = previous {
            // Err(Canceled) just means the previous turn was dropped.
            let _ = previous.await;
        }
        Turn { _release: sender }
    }
}

/// Exclusive permission to run one GATT operation. Dropping it passes the
/// turn to the next waiter.
pub struct Turn {
    _release: oneshot::Sender<()>,
}
