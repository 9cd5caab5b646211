//! The BLE central coordination layer.
//!
//! [`BleCentral`] sits between callers and a [`RadioBackend`]: it tracks
//! connection lifecycles, serializes GATT operations, correlates the
//! backend's callback events back to the requests that triggered them, and
//! publishes observed events on a broadcast bus.

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use async_io::Timer;
use blegatt::{
    AdvertisementData, CharacteristicProperties, ConnectionHandle, GattStatus, LinkState,
    NotifyMode, PeripheralId, RadioBackend, RadioEvent, ScanFilter, ServiceInfo, WriteType,
};
use futures_lite::future;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ErrorKind, Result};
use crate::event::{ConnectionInfo, Discovery, Event, Notification};
use crate::queue::OperationQueue;
use crate::registry::{
    ConnectedHandler, ConnectionRegistry, ConnectionState, DisconnectedHandler, NotifyHandler,
};
use crate::router::{CallbackRouter, CorrelationKey, OperationKind, Outcome};
use crate::scanner::{ScanOptions, ScanSessions};
use crate::util::{BroadcastReceiver, BroadcastSender, broadcast};

const EVENT_BUS_CAPACITY: usize = 64;

/// Options for [`connect`](BleCentral::connect).
#[derive(Clone, Default)]
pub struct ConnectOptions {
    /// Skip automatic service discovery after the link comes up. With
    /// discovery skipped the connection completes as soon as the link is
    /// established and no GATT operations are possible until
    /// [`discover_services`](BleCentral::discover_services) is called.
    pub skip_discovery: bool,
    /// Give up if the link is not established within this long.
    pub timeout: Option<Duration>,
    /// Called once when the connection (including discovery) completes.
    pub on_connected: Option<ConnectedHandler>,
    /// Called once when the link goes down, whether requested or not.
    pub on_disconnected: Option<DisconnectedHandler>,
}

/// A BLE central. Cheaply cloneable; all clones share one state.
#[derive(Clone)]
pub struct BleCentral {
    inner: Arc<Inner>,
}

/// Entry point for backend callbacks. Holds only a weak reference so a
/// backend thread outliving the central delivers into the void instead of
/// keeping the state alive.
#[derive(Clone)]
pub struct RadioEventSink {
    inner: Weak<Inner>,
}

impl RadioEventSink {
    pub fn deliver(&self, event: RadioEvent) {
        if let Some(inner) = self.inner.upgrade() {
            inner.handle_event(event);
        }
    }
}

struct Inner {
    backend: Arc<dyn RadioBackend>,
    state: Mutex<CentralState>,
    router: CallbackRouter,
    queue: OperationQueue,
    events: BroadcastSender<Event>,
}

#[derive(Default)]
struct CentralState {
    registry: ConnectionRegistry,
    scans: ScanSessions,
}

impl BleCentral {
    pub fn new(backend: Arc<dyn RadioBackend>) -> Self {
        BleCentral {
            inner: Arc::new(Inner {
                backend,
                state: Mutex::new(CentralState::default()),
                router: CallbackRouter::new(),
                queue: OperationQueue::new(),
                events: broadcast(EVENT_BUS_CAPACITY),
            }),
        }
    }

    /// The sink the backend delivers its callback events into.
    pub fn event_sink(&self) -> RadioEventSink {
        RadioEventSink {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Subscribes to the event bus. Subscribers that fall behind lose the
    /// oldest events.
    pub fn events(&self) -> BroadcastReceiver<Event> {
        self.inner.events.subscribe()
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.backend.is_enabled()
    }

    pub fn is_scanning(&self) -> bool {
        self.inner.state.lock().unwrap().scans.is_active()
    }

    /// Current lifecycle state of a peripheral, or `None` if it has never
    /// been seen.
    pub fn connection_state(&self, id: &PeripheralId) -> Option<ConnectionState> {
        let state = self.inner.state.lock().unwrap();
        state.registry.get(id).map(|entry| entry.state)
    }

    /// Prompts the user to enable the radio; returns whether it is now on.
    pub fn request_enable(&self) -> bool {
        self.inner.backend.request_enable_radio()
    }

    /// Starts a scan session, displacing any session already running. With
    /// a duration set the call returns after the scan stopped; otherwise it
    /// returns once the scan started.
    pub async fn start_scanning(
        &self,
        filters: Vec<ScanFilter>,
        options: ScanOptions,
    ) -> Result<()> {
        let inner = &self.inner;
        if !inner.backend.is_supported() {
            return Err(ErrorKind::RadioNotSupported.into());
        }
        if !inner.backend.is_enabled() {
            return Err(ErrorKind::RadioDisabled.into());
        }
        if !options.skip_permission_check
            && !inner.backend.has_scan_permission()
            && !inner.backend.request_scan_permission()
        {
            return Err(ErrorKind::PermissionDenied.into());
        }

        let (generation, displaced) = {
            let mut state = inner.state.lock().unwrap();
            state.scans.begin()
        };
        if displaced {
            debug!("displacing previous scan session");
            inner.backend.stop_scan();
        }
        if !inner.backend.start_scan(&filters) {
            let mut state = inner.state.lock().unwrap();
            state.scans.end_if_current(generation);
            return Err(ErrorKind::OperationFailed(GattStatus::FAILURE).into());
        }
        info!(filters = filters.len(), "scan started");

        if let Some(duration) = options.duration {
            Timer::after(duration).await;
            let expired = {
                let mut state = inner.state.lock().unwrap();
                state.scans.end_if_current(generation)
            };
            // A restart or explicit stop in the meantime owns the radio now.
            if expired {
                inner.backend.stop_scan();
                info!("scan stopped after {duration:?}");
            }
        }
        Ok(())
    }

    /// Stops the active scan session. A no-op when none is running.
    pub fn stop_scanning(&self) {
        let was_active = {
            let mut state = self.inner.state.lock().unwrap();
            state.scans.end()
        };
        if was_active {
            self.inner.backend.stop_scan();
            info!("scan stopped");
        }
    }

    /// Connects to a peripheral and, unless skipped, discovers its services.
    /// The returned snapshot is also delivered to `on_connected` and the
    /// event bus.
    pub async fn connect(
        &self,
        id: &PeripheralId,
        options: ConnectOptions,
    ) -> Result<ConnectionInfo> {
        let inner = &self.inner;
        if id.is_empty() {
            return Err(ErrorKind::MissingParameter("peripheral").into());
        }
        if !inner.backend.is_supported() {
            return Err(ErrorKind::RadioNotSupported.into());
        }
        if !inner.backend.is_enabled() {
            return Err(ErrorKind::RadioDisabled.into());
        }

        {
            let mut state = inner.state.lock().unwrap();
            let entry = state.registry.entry(id);
            match entry.state {
                ConnectionState::Connecting => return Err(ErrorKind::AlreadyConnecting.into()),
                ConnectionState::Connected | ConnectionState::Disconnecting => {
                    return Err(ErrorKind::AlreadyConnected.into());
                }
                ConnectionState::Discovered => {}
            }
            entry.state = ConnectionState::Connecting;
            entry.on_connected = options.on_connected.clone();
            entry.on_disconnected = options.on_disconnected.clone();
        }
        info!(peripheral = %id, "connecting");

        let registration = inner
            .router
            .register(CorrelationKey::peripheral(id.clone(), OperationKind::Connect));
        let Some(handle) = inner.backend.connect(id) else {
            inner.abort_connect(id);
            return Err(ErrorKind::PeripheralNotFound.into());
        };
        {
            let mut state = inner.state.lock().unwrap();
            state.registry.entry(id).handle = Some(handle);
        }

        let linked = match options.timeout {
            Some(timeout) => {
                future::or(registration.wait(), async {
                    Timer::after(timeout).await;
                    Err(ErrorKind::Timeout.into())
                })
                .await
            }
            None => registration.wait().await,
        };
        if let Err(err) = linked {
            warn!(peripheral = %id, %err, "connect failed");
            inner.abort_connect(id);
            return Err(err);
        }

        let services = if options.skip_discovery {
            Vec::new()
        } else {
            match self.discover_services(id).await {
                Ok(services) => services,
                Err(err) => {
                    warn!(peripheral = %id, %err, "discovery after connect failed");
                    inner.abort_connect(id);
                    return Err(err);
                }
            }
        };

        let (info, on_connected) = {
            let mut state = inner.state.lock().unwrap();
            let entry = state.registry.entry(id);
            // The link may have dropped between the link-up settlement and
            // this point; teardown has already released the handle and reset
            // the entry, and marking it connected now would wedge it.
            if entry.handle.is_none() {
                return Err(ErrorKind::PeripheralDisconnected.into());
            }
            entry.state = ConnectionState::Connected;
            let info = ConnectionInfo {
                peripheral: id.clone(),
                name: entry.name.clone(),
                services,
                advertisement: entry.advertisement.clone(),
            };
            (info, entry.on_connected.take())
        };
        info!(peripheral = %id, services = info.services.len(), "connected");
        if let Some(handler) = on_connected {
            handler(info.clone());
        }
        inner.events.send(Event::DeviceConnected(info.clone()));
        Ok(info)
    }

    /// Requests a graceful disconnect. Returns once the request is issued;
    /// teardown completes when the backend confirms the link is down.
    pub fn disconnect(&self, id: &PeripheralId) -> Result<()> {
        let handle = {
            let mut state = self.inner.state.lock().unwrap();
            let entry = state
                .registry
                .get_mut(id)
                .ok_or(ErrorKind::PeripheralNotConnected)?;
            let handle = entry.handle.ok_or(ErrorKind::PeripheralNotConnected)?;
            entry.state = ConnectionState::Disconnecting;
            handle
        };
        info!(peripheral = %id, "disconnecting");
        self.inner.backend.disconnect(handle);
        Ok(())
    }

    /// Discovers the peripheral's services and caches the topology for
    /// subsequent characteristic lookups.
    pub async fn discover_services(&self, id: &PeripheralId) -> Result<Vec<ServiceInfo>> {
        let inner = &self.inner;
        let _turn = inner.queue.acquire().await;
        let handle = inner.connection_handle(id)?;
        let registration = inner.router.register(CorrelationKey::peripheral(
            id.clone(),
            OperationKind::DiscoverServices,
        ));
        if !inner.backend.discover_services(handle) {
            return Err(ErrorKind::OperationFailed(GattStatus::FAILURE).into());
        }
        match registration.wait().await? {
            Outcome::Services(services) => Ok(services),
            outcome => unreachable!("discovery settled with {outcome:?}"),
        }
    }

    /// Reads a characteristic value.
    pub async fn read(
        &self,
        id: &PeripheralId,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<Vec<u8>> {
        let inner = &self.inner;
        let _turn = inner.queue.acquire().await;
        let (handle, target) = inner.characteristic_target(
            id,
            service,
            characteristic,
            CharacteristicProperties::READ,
        )?;
        let registration = inner.router.register(CorrelationKey::characteristic(
            id.clone(),
            service,
            target,
            OperationKind::Read,
        ));
        if !inner.backend.read_characteristic(handle, service, target) {
            return Err(ErrorKind::OperationFailed(GattStatus::FAILURE).into());
        }
        match registration.wait().await? {
            Outcome::Value(value) => Ok(value),
            outcome => unreachable!("read settled with {outcome:?}"),
        }
    }

    /// Writes a characteristic value and waits for the peer's response.
    pub async fn write(
        &self,
        id: &PeripheralId,
        service: Uuid,
        characteristic: Uuid,
        value: &[u8],
    ) -> Result<()> {
        let inner = &self.inner;
        let _turn = inner.queue.acquire().await;
        let (handle, target) = inner.characteristic_target(
            id,
            service,
            characteristic,
            CharacteristicProperties::WRITE,
        )?;
        let registration = inner.router.register(CorrelationKey::characteristic(
            id.clone(),
            service,
            target,
            OperationKind::Write,
        ));
        if !inner.backend.write_characteristic(
            handle,
            service,
            target,
            value,
            WriteType::WithResponse,
        ) {
            return Err(ErrorKind::OperationFailed(GattStatus::FAILURE).into());
        }
        match registration.wait().await? {
            Outcome::Written => Ok(()),
            outcome => unreachable!("write settled with {outcome:?}"),
        }
    }

    /// Writes a characteristic value without waiting for a response.
    /// Resolves as soon as the backend accepts the write.
    pub async fn write_without_response(
        &self,
        id: &PeripheralId,
        service: Uuid,
        characteristic: Uuid,
        value: &[u8],
    ) -> Result<()> {
        let inner = &self.inner;
        let _turn = inner.queue.acquire().await;
        let (handle, target) = inner.characteristic_target(
            id,
            service,
            characteristic,
            CharacteristicProperties::WRITE_WITHOUT_RESPONSE,
        )?;
        if !inner.backend.write_characteristic(
            handle,
            service,
            target,
            value,
            WriteType::WithoutResponse,
        ) {
            return Err(ErrorKind::OperationFailed(GattStatus::FAILURE).into());
        }
        Ok(())
    }

    /// Subscribes to a characteristic's notifications. The handler runs on
    /// the backend's delivery thread for every pushed value until
    /// [`stop_notifying`](BleCentral::stop_notifying) or disconnect.
    pub async fn start_notifying(
        &self,
        id: &PeripheralId,
        service: Uuid,
        characteristic: Uuid,
        handler: NotifyHandler,
    ) -> Result<()> {
        let inner = &self.inner;
        let _turn = inner.queue.acquire().await;
        let (handle, target, mode) = {
            let state = inner.state.lock().unwrap();
            let entry = state
                .registry
                .get(id)
                .ok_or(ErrorKind::PeripheralNotConnected)?;
            let handle = entry.handle.ok_or(ErrorKind::PeripheralNotConnected)?;
            let svc = entry.service(service).ok_or(ErrorKind::ServiceNotFound)?;
            if svc.characteristic(characteristic).is_none() {
                return Err(ErrorKind::CharacteristicNotFound.into());
            }
            let (c, mode) = svc
                .notify_characteristic(characteristic)
                .ok_or(ErrorKind::CharacteristicNotNotifiable)?;
            (handle, c.uuid, mode)
        };
        let registration = inner.router.register(CorrelationKey::characteristic(
            id.clone(),
            service,
            target,
            OperationKind::ConfigureNotify,
        ));
        if !inner
            .backend
            .configure_notifications(handle, service, target, mode)
        {
            return Err(ErrorKind::OperationFailed(GattStatus::FAILURE).into());
        }
        match registration.wait().await? {
            Outcome::NotifyConfigured => {}
            outcome => unreachable!("notify configuration settled with {outcome:?}"),
        }
        let mut state = inner.state.lock().unwrap();
        let entry = state
            .registry
            .get_mut(id)
            .ok_or(ErrorKind::PeripheralDisconnected)?;
        if entry.handle.is_none() {
            // Disconnected between configuration and handler installation.
            return Err(ErrorKind::PeripheralDisconnected.into());
        }
        entry.notify_handlers.insert((service, target), handler);
        Ok(())
    }

    /// Unsubscribes from a characteristic's notifications. The handler is
    /// removed immediately; the call resolves once the backend accepts the
    /// configuration change.
    pub async fn stop_notifying(
        &self,
        id: &PeripheralId,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<()> {
        let inner = &self.inner;
        let _turn = inner.queue.acquire().await;
        let (handle, target) = {
            let mut state = inner.state.lock().unwrap();
            let entry = state
                .registry
                .get_mut(id)
                .ok_or(ErrorKind::PeripheralNotConnected)?;
            let handle = entry.handle.ok_or(ErrorKind::PeripheralNotConnected)?;
            let svc = entry.service(service).ok_or(ErrorKind::ServiceNotFound)?;
            let c = svc
                .characteristic(characteristic)
                .ok_or(ErrorKind::CharacteristicNotFound)?;
            let target = c.uuid;
            entry.notify_handlers.remove(&(service, target));
            (handle, target)
        };
        if !inner
            .backend
            .configure_notifications(handle, service, target, NotifyMode::Off)
        {
            return Err(ErrorKind::OperationFailed(GattStatus::FAILURE).into());
        }
        Ok(())
    }

    /// Requests a larger ATT MTU. Returns the value granted by the peer,
    /// which may be smaller than requested.
    pub async fn request_mtu(&self, id: &PeripheralId, mtu: u16) -> Result<u16> {
        let inner = &self.inner;
        if mtu == 0 {
            return Err(ErrorKind::MissingParameter("value").into());
        }
        let _turn = inner.queue.acquire().await;
        let handle = inner.connection_handle(id)?;
        let registration = inner.router.register(CorrelationKey::peripheral(
            id.clone(),
            OperationKind::RequestMtu,
        ));
        if !inner.backend.request_mtu(handle, mtu) {
            return Err(ErrorKind::OperationFailed(GattStatus::FAILURE).into());
        }
        match registration.wait().await? {
            Outcome::Mtu(granted) => Ok(granted),
            outcome => unreachable!("mtu request settled with {outcome:?}"),
        }
    }
}

impl Inner {
    /// Resolves the connection handle for a GATT operation. Run after
    /// acquiring the queue turn, so an operation queued behind a disconnect
    /// fails here instead of reaching the backend.
    fn connection_handle(&self, id: &PeripheralId) -> Result<ConnectionHandle> {
        let state = self.state.lock().unwrap();
        let entry = state
            .registry
            .get(id)
            .ok_or(ErrorKind::PeripheralNotConnected)?;
        entry
            .handle
            .ok_or_else(|| ErrorKind::PeripheralNotConnected.into())
    }

    /// Resolves handle and characteristic for an operation, requiring the
    /// characteristic to carry all `required` property bits. The check runs
    /// before the native call so an unsupported operation fails cleanly
    /// instead of stalling the queue.
    fn characteristic_target(
        &self,
        id: &PeripheralId,
        service: Uuid,
        characteristic: Uuid,
        required: CharacteristicProperties,
    ) -> Result<(ConnectionHandle, Uuid)> {
        let state = self.state.lock().unwrap();
        let entry = state
            .registry
            .get(id)
            .ok_or(ErrorKind::PeripheralNotConnected)?;
        let handle = entry.handle.ok_or(ErrorKind::PeripheralNotConnected)?;
        let svc = entry.service(service).ok_or(ErrorKind::ServiceNotFound)?;
        let c = svc
            .characteristic_with(characteristic, required)
            .ok_or(ErrorKind::CharacteristicNotFound)?;
        Ok((handle, c.uuid))
    }

    /// Failed or abandoned connect: release the backend object without
    /// announcing a disconnect that callers never saw as a connection.
    fn abort_connect(&self, id: &PeripheralId) {
        let handle = {
            let mut state = self.state.lock().unwrap();
            match state.registry.get_mut(id) {
                Some(entry) => entry.teardown().0,
                None => None,
            }
        };
        if let Some(handle) = handle {
            self.backend.disconnect(handle);
            self.backend.close(handle);
        }
        self.router.cancel_peripheral(id);
    }

    /// Link-down teardown: close the backend object exactly once, fail
    /// in-flight requests, then announce the disconnect.
    fn teardown_peripheral(&self, id: &PeripheralId) {
        let (handle, on_disconnected, name) = {
            let mut state = self.state.lock().unwrap();
            match state.registry.get_mut(id) {
                Some(entry) => {
                    let (handle, on_disconnected) = entry.teardown();
                    (handle, on_disconnected, entry.name.clone())
                }
                None => return,
            }
        };
        self.router.cancel_peripheral(id);
        // A handle means this call won the race to release the connection;
        // repeats of the same link-down are silent no-ops.
        if let Some(handle) = handle {
            self.backend.close(handle);
            info!(peripheral = %id, "disconnected");
            if let Some(handler) = on_disconnected {
                handler(id.clone());
            }
            self.events.send(Event::DeviceDisconnected {
                peripheral: id.clone(),
                name,
            });
        }
    }

    fn handle_event(&self, event: RadioEvent) {
        match event {
            RadioEvent::RadioStateChanged { enabled } => {
                info!(enabled, "radio state changed");
                if !enabled {
                    let connected: Vec<_> = {
                        let mut state = self.state.lock().unwrap();
                        state.scans.end();
                        state
                            .registry
                            .iter_mut()
                            .filter(|(_, entry)| entry.handle.is_some())
                            .map(|(id, _)| id.clone())
                            .collect()
                    };
                    for id in connected {
                        self.teardown_peripheral(&id);
                    }
                }
                self.events.send(Event::RadioStateChanged { enabled });
            }
            RadioEvent::Discovered {
                id,
                name,
                rssi,
                advertisement,
            } => {
                let advertisement = AdvertisementData::parse(&advertisement);
                let discovery = {
                    let mut state = self.state.lock().unwrap();
                    let entry = state.registry.entry(&id);
                    if name.is_some() {
                        entry.name = name;
                    }
                    entry.rssi = Some(rssi);
                    entry.advertisement = Some(advertisement.clone());
                    Discovery {
                        peripheral: id,
                        name: entry.name.clone(),
                        local_name: advertisement.local_name.clone(),
                        rssi,
                        manufacturer_id: advertisement
                            .manufacturer_data
                            .as_ref()
                            .map(|m| m.company_id),
                        advertisement,
                    }
                };
                self.events.send(Event::DeviceDiscovered(discovery));
            }
            RadioEvent::ConnectionStateChanged {
                id,
                handle,
                status,
                state: LinkState::Connected,
            } if status.is_success() => {
                let known = {
                    let mut state = self.state.lock().unwrap();
                    match state.registry.get_mut(&id) {
                        Some(entry) if entry.handle == Some(handle) => true,
                        // The backend may report the link before the
                        // initiating call returned the handle to store.
                        Some(entry)
                            if entry.state == ConnectionState::Connecting
                                && entry.handle.is_none() =>
                        {
                            entry.handle = Some(handle);
                            true
                        }
                        _ => false,
                    }
                };
                if !known {
                    // Nothing asked for this link; tear it down.
                    warn!(peripheral = %id, "stray connection, disconnecting");
                    self.backend.disconnect(handle);
                    self.backend.close(handle);
                    return;
                }
                let key = CorrelationKey::peripheral(id.clone(), OperationKind::Connect);
                if !self.router.settle(&key, Ok(Outcome::Connected)) {
                    debug!(peripheral = %id, "link up with no pending connect");
                }
            }
            RadioEvent::ConnectionStateChanged {
                id,
                handle,
                status,
                state,
            } => {
                // Link down, or link up with an error status. Either way a
                // pending connect fails and the connection is released.
                let current = self
                    .state
                    .lock()
                    .unwrap()
                    .registry
                    .get(&id)
                    .and_then(|entry| entry.handle);
                // A confirmation for a handle the entry no longer holds is
                // left over from a superseded connection.
                if current.is_some_and(|current| current != handle) {
                    debug!(peripheral = %id, "ignoring link event for superseded connection");
                    return;
                }
                if !status.is_success() {
                    warn!(peripheral = %id, %status, ?state, "connection state error");
                    let key = CorrelationKey::peripheral(id.clone(), OperationKind::Connect);
                    self.router
                        .settle(&key, Err(ErrorKind::OperationFailed(status).into()));
                }
                self.teardown_peripheral(&id);
            }
            RadioEvent::ServicesDiscovered {
                id,
                status,
                services,
            } => {
                let result = if status.is_success() {
                    let mut state = self.state.lock().unwrap();
                    if let Some(entry) = state.registry.get_mut(&id) {
                        entry.services = services.clone();
                    }
                    Ok(Outcome::Services(services))
                } else {
                    Err(ErrorKind::OperationFailed(status).into())
                };
                let key = CorrelationKey::peripheral(id.clone(), OperationKind::DiscoverServices);
                if !self.router.settle(&key, result) {
                    debug!(peripheral = %id, "unmatched service discovery result");
                }
            }
            RadioEvent::CharacteristicRead {
                id,
                service,
                characteristic,
                status,
                value,
            } => {
                let result = if status.is_success() {
                    Ok(Outcome::Value(value))
                } else {
                    Err(ErrorKind::OperationFailed(status).into())
                };
                let key = CorrelationKey::characteristic(
                    id.clone(),
                    service,
                    characteristic,
                    OperationKind::Read,
                );
                if !self.router.settle(&key, result) {
                    debug!(peripheral = %id, %characteristic, "unmatched read result");
                }
            }
            RadioEvent::CharacteristicWritten {
                id,
                service,
                characteristic,
                status,
            } => {
                let result = if status.is_success() {
                    Ok(Outcome::Written)
                } else {
                    Err(ErrorKind::OperationFailed(status).into())
                };
                let key = CorrelationKey::characteristic(
                    id.clone(),
                    service,
                    characteristic,
                    OperationKind::Write,
                );
                if !self.router.settle(&key, result) {
                    debug!(peripheral = %id, %characteristic, "unmatched write result");
                }
            }
            RadioEvent::NotifyConfigChanged {
                id,
                service,
                characteristic,
                status,
                mode,
            } => {
                // Unsubscribes resolve on initiation and register no waiter,
                // so their confirmations must never settle a later
                // subscribe's matcher.
                if mode == NotifyMode::Off {
                    debug!(peripheral = %id, %characteristic, "notifications disabled");
                    return;
                }
                let result = if status.is_success() {
                    Ok(Outcome::NotifyConfigured)
                } else {
                    Err(ErrorKind::OperationFailed(status).into())
                };
                let key = CorrelationKey::characteristic(
                    id.clone(),
                    service,
                    characteristic,
                    OperationKind::ConfigureNotify,
                );
                if !self.router.settle(&key, result) {
                    debug!(peripheral = %id, %characteristic, "unmatched notify configuration");
                }
            }
            RadioEvent::CharacteristicChanged {
                id,
                service,
                characteristic,
                value,
            } => {
                let handler = {
                    let state = self.state.lock().unwrap();
                    state
                        .registry
                        .get(&id)
                        .and_then(|entry| entry.notify_handlers.get(&(service, characteristic)))
                        .cloned()
                };
                match handler {
                    Some(handler) => handler(Notification {
                        peripheral: id,
                        service,
                        characteristic,
                        value,
                    }),
                    None => {
                        debug!(peripheral = %id, %characteristic, "notification without handler")
                    }
                }
            }
            RadioEvent::MtuChanged { id, status, mtu } => {
                let result = if status.is_success() {
                    Ok(Outcome::Mtu(mtu))
                } else {
                    Err(ErrorKind::OperationFailed(status).into())
                };
                let key = CorrelationKey::peripheral(id.clone(), OperationKind::RequestMtu);
                if !self.router.settle(&key, result) {
                    debug!(peripheral = %id, mtu, "unsolicited mtu change");
                }
                if status.is_success() {
                    self.events.send(Event::MtuChanged {
                        peripheral: id,
                        mtu,
                    });
                }
            }
        }
    }
}
