//! Correlation between backend callbacks and pending requests.
//!
//! The radio stack reports every completion through one callback surface
//! with no request token, so the router matches events back to waiters by
//! identity: peripheral, optional service and characteristic UUIDs, and the
//! operation kind. Each pending request is settled exactly once; whichever
//! of completion, disconnect cleanup or caller drop removes the entry first
//! wins.

use std::sync::Mutex;

use blegatt::{PeripheralId, ServiceInfo};
use futures_channel::oneshot;
use uuid::Uuid;

use crate::error::{Error, ErrorKind, Result};

/// Which operation a pending request is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Connect,
    DiscoverServices,
    Read,
    Write,
    ConfigureNotify,
    RequestMtu,
}

/// Identity an incoming event must match to settle a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationKey {
    pub peripheral: PeripheralId,
    pub service: Option<Uuid>,
    pub characteristic: Option<Uuid>,
    pub kind: OperationKind,
}

impl CorrelationKey {
    pub fn peripheral(peripheral: PeripheralId, kind: OperationKind) -> Self {
        Self {
            peripheral,
            service: None,
            characteristic: None,
            kind,
        }
    }

    pub fn characteristic(
        peripheral: PeripheralId,
        service: Uuid,
        characteristic: Uuid,
        kind: OperationKind,
    ) -> Self {
        Self {
            peripheral,
            service: Some(service),
            characteristic: Some(characteristic),
            kind,
        }
    }
}

/// Successful result payload of a settled request.
#[derive(Debug, Clone)]
pub enum Outcome {
    Connected,
    Services(Vec<ServiceInfo>),
    Value(Vec<u8>),
    Written,
    NotifyConfigured,
    Mtu(u16),
}

struct PendingRequest {
    token: u64,
    key: CorrelationKey,
    sender: oneshot::Sender<Result<Outcome>>,
}

/// Registry of in-flight requests awaiting a backend event.
#[derive(Default)]
pub struct CallbackRouter {
    pending: Mutex<Pending>,
}

#[derive(Default)]
struct Pending {
    requests: Vec<PendingRequest>,
    next_token: u64,
}

impl CallbackRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a waiter for the given identity. Dropping the returned
    /// [`Registration`] without awaiting it withdraws the entry, so an event
    /// arriving after the caller gave up is treated as unmatched.
    pub fn register(&self, key: CorrelationKey) -> Registration<'_> {
        let (sender, receiver) = oneshot::channel();
        let token = {
            let mut pending = self.pending.lock().unwrap();
            let token = pending.next_token;
            pending.next_token += 1;
            pending.requests.push(PendingRequest {
                token,
                key,
                sender,
            });
            token
        };
        Registration {
            router: self,
            token,
            receiver,
        }
    }

    /// Settles the oldest request matching `key`. Returns whether a waiter
    /// was found; unmatched events are the caller's to log and drop.
    pub fn settle(&self, key: &CorrelationKey, result: Result<Outcome>) -> bool {
        let request = {
            let mut pending = self.pending.lock().unwrap();
            match pending.requests.iter().position(|r| r.key == *key) {
                Some(idx) => pending.requests.remove(idx),
                None => return false,
            }
        };
        // The waiter may have been dropped between removal and send.
        let _ = request.sender.send(result);
        true
    }

    /// Fails every request pending against `peripheral` with
    /// [`ErrorKind::PeripheralDisconnected`].
    pub fn cancel_peripheral(&self, peripheral: &PeripheralId) {
        let cancelled: Vec<_> = {
            let mut pending = self.pending.lock().unwrap();
            let mut cancelled = Vec::new();
            let mut i = 0;
            while i < pending.requests.len() {
                if pending.requests[i].key.peripheral == *peripheral {
                    cancelled.push(pending.requests.remove(i));
                } else {
                    i += 1;
                }
            }
            cancelled
        };
        for request in cancelled {
            let _ = request
                .sender
                .send(Err(ErrorKind::PeripheralDisconnected.into()));
        }
    }

    fn unregister(&self, token: u64) {
        let mut pending = self.pending.lock().unwrap();
        pending.requests.retain(|r| r.token != token);
    }
}

/// A registered waiter. Await [`wait`](Registration::wait) for the outcome.
pub struct Registration<'a> {
    router: &'a CallbackRouter,
    token: u64,
    receiver: oneshot::Receiver<Result<Outcome>>,
}

impl Registration<'_> {
    pub async fn wait(mut self) -> Result<Outcome> {
        let result = (&mut self.receiver).await;
        match result {
            Ok(outcome) => outcome,
            Err(canceled) => Err(Error::from(canceled)),
        }
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.router.unregister(self.token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blegatt::GattStatus;

    fn read_key(id: &str) -> CorrelationKey {
        CorrelationKey::characteristic(
            PeripheralId::from(id),
            Uuid::from_u128(0x180d),
            Uuid::from_u128(0x2a37),
            OperationKind::Read,
        )
    }

    #[tokio::test]
    async fn event_settles_matching_request() {
        let router = CallbackRouter::new();
        let registration = router.register(read_key("aa"));

        assert!(router.settle(&read_key("aa"), Ok(Outcome::Value(vec![1, 2]))));
        match registration.wait().await.unwrap() {
            Outcome::Value(v) => assert_eq!(v, vec![1, 2]),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn mismatched_identity_is_not_settled() {
        let router = CallbackRouter::new();
        let _registration = router.register(read_key("aa"));

        assert!(!router.settle(&read_key("bb"), Ok(Outcome::Written)));
        let mut other = read_key("aa");
        other.kind = OperationKind::Write;
        assert!(!router.settle(&other, Ok(Outcome::Written)));
    }

    #[tokio::test]
    async fn settles_exactly_once() {
        let router = CallbackRouter::new();
        let registration = router.register(read_key("aa"));

        assert!(router.settle(&read_key("aa"), Ok(Outcome::Value(vec![1]))));
        assert!(!router.settle(
            &read_key("aa"),
            Err(ErrorKind::OperationFailed(GattStatus::FAILURE).into())
        ));
        assert!(matches!(
            registration.wait().await,
            Ok(Outcome::Value(v)) if v == vec![1]
        ));
    }

    #[tokio::test]
    async fn duplicate_keys_settle_oldest_first() {
        let router = CallbackRouter::new();
        let first = router.register(read_key("aa"));
        let second = router.register(read_key("aa"));

        assert!(router.settle(&read_key("aa"), Ok(Outcome::Value(vec![1]))));
        assert!(router.settle(&read_key("aa"), Ok(Outcome::Value(vec![2]))));

        assert!(matches!(first.wait().await, Ok(Outcome::Value(v)) if v == vec![1]));
        assert!(matches!(second.wait().await, Ok(Outcome::Value(v)) if v == vec![2]));
    }

    #[tokio::test]
    async fn cancel_peripheral_fails_all_its_requests() {
        let router = CallbackRouter::new();
        let ours = router.register(read_key("aa"));
        let theirs = router.register(read_key("bb"));

        router.cancel_peripheral(&PeripheralId::from("aa"));

        assert_eq!(
            ours.wait().await.unwrap_err().kind(),
            ErrorKind::PeripheralDisconnected
        );
        assert!(router.settle(&read_key("bb"), Ok(Outcome::Written)));
        assert!(theirs.wait().await.is_ok());
    }

    #[test]
    fn dropped_registration_is_withdrawn() {
        let router = CallbackRouter::new();
        drop(router.register(read_key("aa")));
        assert!(!router.settle(&read_key("aa"), Ok(Outcome::Written)));
    }
}
