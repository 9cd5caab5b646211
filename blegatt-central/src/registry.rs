//! Per-peripheral connection bookkeeping.

use std::collections::HashMap;
use std::sync::Arc;

use blegatt::{AdvertisementData, ConnectionHandle, PeripheralId, ServiceInfo};
use uuid::Uuid;

use crate::event::{ConnectionInfo, Notification};

/// Lifecycle of a tracked peripheral.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Seen while scanning, no link.
    #[default]
    Discovered,
    /// A connect attempt is in flight (including auto-discovery).
    Connecting,
    /// The link is up and, if requested, services are discovered.
    Connected,
    /// A disconnect was requested and its confirmation is pending.
    Disconnecting,
}

pub type NotifyHandler = Arc<dyn Fn(Notification) + Send + Sync>;
pub type ConnectedHandler = Arc<dyn Fn(ConnectionInfo) + Send + Sync>;
pub type DisconnectedHandler = Arc<dyn Fn(PeripheralId) + Send + Sync>;

/// Everything tracked about one peripheral. Created at first sight (scan
/// result or connect request) and kept for the life of the process so a
/// later connect can reuse the cached advertisement.
#[derive(Default)]
pub struct ConnectionEntry {
    pub state: ConnectionState,
    pub name: Option<String>,
    pub rssi: Option<i16>,
    pub advertisement: Option<AdvertisementData>,
    pub services: Vec<ServiceInfo>,
    /// Present from connect initiation until teardown. Taking it is the
    /// exactly-once gate for releasing the backend connection object.
    pub handle: Option<ConnectionHandle>,
    pub notify_handlers: HashMap<(Uuid, Uuid), NotifyHandler>,
    pub on_connected: Option<ConnectedHandler>,
    pub on_disconnected: Option<DisconnectedHandler>,
}

impl ConnectionEntry {
    /// Finds a discovered service by UUID.
    pub fn service(&self, uuid: Uuid) -> Option<&ServiceInfo> {
        self.services.iter().find(|s| s.uuid == uuid)
    }

    /// Resets the entry to its disconnected shape, keeping the identity
    /// fields (name, rssi, advertisement) for future sightings. Returns the
    /// handle, if this call was the one to release it, and the disconnect
    /// handler to fire.
    pub fn teardown(&mut self) -> (Option<ConnectionHandle>, Option<DisconnectedHandler>) {
        self.state = ConnectionState::Discovered;
        self.services.clear();
        self.notify_handlers.clear();
        self.on_connected = None;
        (self.handle.take(), self.on_disconnected.take())
    }
}

/// All tracked peripherals, keyed by identifier.
#[derive(Default)]
pub struct ConnectionRegistry {
    entries: HashMap<PeripheralId, ConnectionEntry>,
}

impl ConnectionRegistry {
    pub fn get(&self, id: &PeripheralId) -> Option<&ConnectionEntry> {
        self.entries.get(id)
    }

    pub fn get_mut(&mut self, id: &PeripheralId) -> Option<&mut ConnectionEntry> {
        self.entries.get_mut(id)
    }

    pub fn entry(&mut self, id: &PeripheralId) -> &mut ConnectionEntry {
        self.entries.entry(id.clone()).or_default()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&PeripheralId, &mut ConnectionEntry)> {
        self.entries.iter_mut()
    }
}
