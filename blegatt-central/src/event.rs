//! Events published on the central's broadcast bus.

use blegatt::{AdvertisementData, PeripheralId, ServiceInfo};
use uuid::Uuid;

/// An event observed by the central, delivered to every subscriber of
/// [`events`](crate::BleCentral::events).
#[derive(Debug, Clone)]
pub enum Event {
    /// An advertisement was received during a scan. Emitted for every
    /// sighting, including repeats of a known peripheral.
    DeviceDiscovered(Discovery),
    /// A connect attempt finished, including auto-discovery if requested.
    DeviceConnected(ConnectionInfo),
    /// The link to a peripheral went down, whether requested or not.
    DeviceDisconnected {
        peripheral: PeripheralId,
        name: Option<String>,
    },
    /// The adapter was switched on or off.
    RadioStateChanged { enabled: bool },
    /// The peer negotiated a new ATT MTU.
    MtuChanged { peripheral: PeripheralId, mtu: u16 },
}

/// A single advertisement sighting.
#[derive(Debug, Clone)]
pub struct Discovery {
    pub peripheral: PeripheralId,
    /// Name reported by the backend, usually from the device cache.
    pub name: Option<String>,
    /// Name carried in the advertisement itself.
    pub local_name: Option<String>,
    pub rssi: i16,
    pub manufacturer_id: Option<u16>,
    pub advertisement: AdvertisementData,
}

/// Snapshot of a peripheral at the moment its connection completed.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub peripheral: PeripheralId,
    pub name: Option<String>,
    /// Discovered services; empty when auto-discovery was disabled.
    pub services: Vec<ServiceInfo>,
    pub advertisement: Option<AdvertisementData>,
}

/// A notification or indication value pushed by a peripheral.
#[derive(Debug, Clone)]
pub struct Notification {
    pub peripheral: PeripheralId,
    pub service: Uuid,
    pub characteristic: Uuid,
    pub value: Vec<u8>,
}
