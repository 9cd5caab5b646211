//! The radio backend contract.
//!
//! The native BLE stack is an external collaborator: a [`RadioBackend`]
//! initiates operations (returning only whether the native call was
//! accepted) and reports every completion asynchronously through a single
//! callback surface, modeled as [`RadioEvent`] values delivered to the
//! coordination layer.

use std::fmt::Display;

use uuid::Uuid;

use crate::gatt::{NotifyMode, ServiceInfo, WriteType};

/// A stable identifier naming a physical peripheral for the life of the
/// process: a MAC-like address or a platform-assigned UUID string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeripheralId(String);

impl PeripheralId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for PeripheralId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for PeripheralId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Display for PeripheralId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An opaque reference to the backend's connection object. The coordination
/// layer owns it exclusively and releases it exactly once via
/// [`RadioBackend::close`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionHandle(pub u64);

/// A raw status code reported by the backend for a GATT operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GattStatus(pub i32);

impl GattStatus {
    pub const SUCCESS: Self = Self(0);
    /// Generic failure, used when an initiation is refused without a
    /// status from the peer (Android's `GATT_FAILURE`).
    pub const FAILURE: Self = Self(0x101);

    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }
}

impl Display for GattStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Match criteria for a scan session, evaluated by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanFilter {
    pub service_uuid: Option<Uuid>,
    pub device_name: Option<String>,
    pub device_address: Option<PeripheralId>,
    /// 2-byte little-endian company identifier followed by a data prefix.
    pub manufacturer_data: Option<Vec<u8>>,
}

/// Physical link state reported by the connection state callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkState {
    Connected,
    Disconnected,
}

/// Completion and unsolicited events from the radio stack.
///
/// Every event carries the identity of the peripheral (and, where
/// applicable, service and characteristic UUIDs) so the coordination layer
/// can correlate it to the request that triggered it.
#[derive(Debug, Clone)]
pub enum RadioEvent {
    /// The adapter was switched on or off.
    RadioStateChanged { enabled: bool },
    /// An advertisement was received during an active scan.
    Discovered {
        id: PeripheralId,
        name: Option<String>,
        rssi: i16,
        advertisement: Vec<u8>,
    },
    /// The link to a peripheral went up or down.
    ConnectionStateChanged {
        id: PeripheralId,
        handle: ConnectionHandle,
        status: GattStatus,
        state: LinkState,
    },
    /// Service discovery finished; on success `services` holds the full
    /// topology known to the backend.
    ServicesDiscovered {
        id: PeripheralId,
        status: GattStatus,
        services: Vec<ServiceInfo>,
    },
    CharacteristicRead {
        id: PeripheralId,
        service: Uuid,
        characteristic: Uuid,
        status: GattStatus,
        value: Vec<u8>,
    },
    CharacteristicWritten {
        id: PeripheralId,
        service: Uuid,
        characteristic: Uuid,
        status: GattStatus,
    },
    /// The notification configuration write (CCCD) completed. `mode` echoes
    /// the requested configuration so a late unsubscribe confirmation can be
    /// told apart from a subscribe one.
    NotifyConfigChanged {
        id: PeripheralId,
        service: Uuid,
        characteristic: Uuid,
        status: GattStatus,
        mode: NotifyMode,
    },
    /// An unsolicited notification or indication value.
    CharacteristicChanged {
        id: PeripheralId,
        service: Uuid,
        characteristic: Uuid,
        value: Vec<u8>,
    },
    MtuChanged {
        id: PeripheralId,
        status: GattStatus,
        mtu: u16,
    },
}

/// Capabilities of the native BLE stack consumed by the coordination layer.
///
/// Methods that start an asynchronous operation return `true` when the
/// native call was accepted; the result then arrives as a [`RadioEvent`].
/// Implementations must be cheap to call and must never block.
pub trait RadioBackend: Send + Sync {
    fn is_supported(&self) -> bool {
        true
    }

    fn is_enabled(&self) -> bool;

    fn has_scan_permission(&self) -> bool {
        true
    }

    /// Prompts for the scan permission; returns whether it was granted.
    fn request_scan_permission(&self) -> bool {
        true
    }

    /// Prompts the user to enable the radio; returns whether it is now on.
    fn request_enable_radio(&self) -> bool {
        false
    }

    fn start_scan(&self, filters: &[ScanFilter]) -> bool;

    fn stop_scan(&self);

    /// Initiates a connection; `None` when the backend cannot resolve the
    /// identifier to a device.
    fn connect(&self, id: &PeripheralId) -> Option<ConnectionHandle>;

    /// Requests a graceful teardown. Completion is reported through
    /// [`RadioEvent::ConnectionStateChanged`].
    fn disconnect(&self, handle: ConnectionHandle);

    /// Releases the backend's connection object. Called exactly once per
    /// connect/disconnect cycle.
    fn close(&self, handle: ConnectionHandle);

    fn discover_services(&self, handle: ConnectionHandle) -> bool;

    fn read_characteristic(
        &self,
        handle: ConnectionHandle,
        service: Uuid,
        characteristic: Uuid,
    ) -> bool;

    fn write_characteristic(
        &self,
        handle: ConnectionHandle,
        service: Uuid,
        characteristic: Uuid,
        value: &[u8],
        write_type: WriteType,
    ) -> bool;

    fn configure_notifications(
        &self,
        handle: ConnectionHandle,
        service: Uuid,
        characteristic: Uuid,
        mode: NotifyMode,
    ) -> bool;

    fn request_mtu(&self, handle: ConnectionHandle, mtu: u16) -> bool;
}
