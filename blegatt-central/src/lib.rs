//! Coordination layer for a Bluetooth Low Energy central.
//!
//! [`BleCentral`] wraps a [`blegatt::RadioBackend`] and turns its
//! initiate-and-callback surface into async operations: it tracks each
//! peripheral's connection lifecycle, serializes GATT requests so only one
//! is in flight at a time, correlates callback events back to their
//! requests, manages scan sessions, and publishes everything it observes on
//! a broadcast [`Event`] bus.
//!
//! # Example
//!
//! ```no_run
//! # async fn example(backend: std::sync::Arc<dyn blegatt::RadioBackend>) -> blegatt_central::Result<()> {
//! use blegatt::{BluetoothUuidExt, PeripheralId};
//! use blegatt_central::{BleCentral, ConnectOptions};
//! use uuid::Uuid;
//!
//! let central = BleCentral::new(backend);
//! let id = PeripheralId::from("00:11:22:33:44:55");
//! let connection = central.connect(&id, ConnectOptions::default()).await?;
//!
//! let value = central
//!     .read(&id, Uuid::from_u16(0x180d), Uuid::from_u16(0x2a37))
//!     .await?;
//! println!("heart rate measurement: {value:?}");
//!
//! central.disconnect(&id)?;
//! # let _ = connection;
//! # Ok(())
//! # }
//! ```

mod central;
mod error;
mod event;
mod queue;
mod registry;
mod router;
mod scanner;
mod util;
pub mod value;

pub use central::{BleCentral, ConnectOptions, RadioEventSink};
pub use error::{Error, ErrorKind, Result};
pub use event::{ConnectionInfo, Discovery, Event, Notification};
pub use registry::{ConnectedHandler, ConnectionState, DisconnectedHandler, NotifyHandler};
pub use scanner::ScanOptions;
pub use util::BroadcastReceiver;
