use async_broadcast::{InactiveReceiver, Receiver, RecvError, Sender, TrySendError};

/// Wrapper around [`async_broadcast::Sender`] that keeps an inactive receiver
/// so the channel stays open while no subscriber is listening.
#[derive(Clone)]
pub struct BroadcastSender<T> {
    sender: Sender<T>,
    _receiver: InactiveReceiver<T>,
}

impl<T: Clone> BroadcastSender<T> {
    pub fn send(&self, msg: T) {
        match self.sender.try_broadcast(msg) {
            Ok(_) | Err(TrySendError::Inactive(_)) => {}
            Err(TrySendError::Full(_)) => unreachable!("broadcast channel overflows"),
            Err(TrySendError::Closed(_)) => unreachable!("broadcast channel kept open"),
        }
    }

    pub fn subscribe(&self) -> BroadcastReceiver<T> {
        BroadcastReceiver {
            receiver: self.sender.new_receiver(),
        }
    }
}

/// Receiving side of [`broadcast`]. Slow subscribers lose the oldest
/// messages rather than stalling the sender.
pub struct BroadcastReceiver<T> {
    receiver: Receiver<T>,
}

impl<T: Clone> BroadcastReceiver<T> {
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            match self.receiver.recv().await {
                Ok(msg) => return Some(msg),
                Err(RecvError::Overflowed(n)) => {
                    tracing::debug!("broadcast receiver lagging, skipped {n} messages");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

/// Creates a broadcast channel with the given capacity that drops the oldest
/// message on overflow and stays open with zero active receivers.
pub fn broadcast<T: Clone>(capacity: usize) -> BroadcastSender<T> {
    let (mut sender, receiver) = async_broadcast::broadcast(capacity);
    sender.set_overflow(true);
    BroadcastSender {
        sender,
        _receiver: receiver.deactivate(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_survives_without_subscribers() {
        let sender = broadcast::<u32>(4);
        sender.send(1);

        let mut rx = sender.subscribe();
        sender.send(2);
        assert_eq!(rx.recv().await, Some(2));
    }

    #[tokio::test]
    async fn slow_subscriber_loses_oldest() {
        let sender = broadcast::<u32>(2);
        let mut rx = sender.subscribe();
        sender.send(1);
        sender.send(2);
        sender.send(3);
        assert_eq!(rx.recv().await, Some(2));
        assert_eq!(rx.recv().await, Some(3));
    }
}
