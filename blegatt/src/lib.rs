//! Core types for a Bluetooth Low Energy central.
//!
//! This crate holds the pieces of a BLE central that do not depend on any
//! async machinery: Bluetooth UUID expansion, the advertisement-payload
//! parser, the GATT topology model, and the contract a native radio stack
//! has to fulfil ([`RadioBackend`] plus the [`RadioEvent`] callback
//! surface). The asynchronous coordination layer lives in the
//! `blegatt-central` crate.

pub mod advertisement;
mod backend;
pub mod btuuid;
mod gatt;

pub use advertisement::{AdvertisementData, ManufacturerData};
pub use backend::*;
pub use btuuid::BluetoothUuidExt;
pub use gatt::*;
