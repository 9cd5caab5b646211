//! Advertisement payload parsing.
//!
//! A BLE advertisement is a sequence of length-prefixed, type-tagged fields
//! (AD structures). The parser is best effort: a malformed or truncated
//! buffer yields an empty record that still carries the raw payload, so a
//! single bad advertisement never disturbs an active scan session.

use std::collections::HashMap;

use uuid::Uuid;

use crate::btuuid::BluetoothUuidExt;

const DATA_TYPE_FLAGS: u8 = 0x01;
const DATA_TYPE_SERVICE_UUIDS_16_BIT_PARTIAL: u8 = 0x02;
const DATA_TYPE_SERVICE_UUIDS_16_BIT_COMPLETE: u8 = 0x03;
const DATA_TYPE_SERVICE_UUIDS_32_BIT_PARTIAL: u8 = 0x04;
const DATA_TYPE_SERVICE_UUIDS_32_BIT_COMPLETE: u8 = 0x05;
const DATA_TYPE_SERVICE_UUIDS_128_BIT_PARTIAL: u8 = 0x06;
const DATA_TYPE_SERVICE_UUIDS_128_BIT_COMPLETE: u8 = 0x07;
const DATA_TYPE_LOCAL_NAME_SHORT: u8 = 0x08;
const DATA_TYPE_LOCAL_NAME_COMPLETE: u8 = 0x09;
const DATA_TYPE_TX_POWER_LEVEL: u8 = 0x0a;
const DATA_TYPE_SERVICE_DATA_16_BIT: u8 = 0x16;
const DATA_TYPE_SERVICE_DATA_32_BIT: u8 = 0x20;
const DATA_TYPE_SERVICE_DATA_128_BIT: u8 = 0x21;
const DATA_TYPE_MANUFACTURER_SPECIFIC_DATA: u8 = 0xff;

/// Data included in a Bluetooth advertisement or scan response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvertisementData {
    /// Advertising flags (CSS §A.1.3).
    pub flags: Option<u8>,
    /// The (possibly shortened) local name of the device (CSS §A.1.2).
    pub local_name: Option<String>,
    /// Manufacturer specific data (CSS §A.1.4).
    pub manufacturer_data: Option<ManufacturerData>,
    /// Advertised GATT service UUIDs, expanded to 128-bit form (CSS §A.1.1).
    pub service_uuids: Vec<Uuid>,
    /// Service associated data keyed by expanded service UUID (CSS §A.1.11).
    pub service_data: HashMap<Uuid, Vec<u8>>,
    /// Transmitted power level in dBm (CSS §A.1.5).
    pub tx_power_level: Option<i8>,
    /// The raw advertisement payload the record was parsed from.
    pub raw: Vec<u8>,
}

/// Manufacturer specific data: a 16-bit little-endian company identifier
/// followed by an opaque payload.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ManufacturerData {
    pub company_id: u16,
    pub data: Vec<u8>,
}

impl AdvertisementData {
    /// Parses a raw advertisement payload.
    ///
    /// Never fails: if the record is structurally invalid all parsed fields
    /// are discarded and an empty record wrapping the raw bytes is returned.
    pub fn parse(raw: &[u8]) -> Self {
        match Self::parse_fields(raw) {
            Ok(data) => data,
            Err(()) => {
                tracing::warn!(len = raw.len(), "malformed advertisement record, keeping raw bytes only");
                AdvertisementData {
                    raw: raw.to_vec(),
                    ..Default::default()
                }
            }
        }
    }

    fn parse_fields(raw: &[u8]) -> Result<Self, ()> {
        let mut data = AdvertisementData {
            raw: raw.to_vec(),
            ..Default::default()
        };

        let mut pos = 0;
        while pos < raw.len() {
            let length = raw[pos] as usize;
            pos += 1;
            if length == 0 {
                break;
            }
            // The declared length covers the type tag byte.
            if pos + length > raw.len() {
                return Err(());
            }
            let field_type = raw[pos];
            let payload = &raw[pos + 1..pos + length];
            pos += length;

            match field_type {
                DATA_TYPE_FLAGS => {
                    data.flags = Some(*payload.first().ok_or(())?);
                }
                DATA_TYPE_SERVICE_UUIDS_16_BIT_PARTIAL | DATA_TYPE_SERVICE_UUIDS_16_BIT_COMPLETE => {
                    parse_service_uuids(payload, 2, &mut data.service_uuids)?;
                }
                DATA_TYPE_SERVICE_UUIDS_32_BIT_PARTIAL | DATA_TYPE_SERVICE_UUIDS_32_BIT_COMPLETE => {
                    parse_service_uuids(payload, 4, &mut data.service_uuids)?;
                }
                DATA_TYPE_SERVICE_UUIDS_128_BIT_PARTIAL
                | DATA_TYPE_SERVICE_UUIDS_128_BIT_COMPLETE => {
                    parse_service_uuids(payload, 16, &mut data.service_uuids)?;
                }
                DATA_TYPE_LOCAL_NAME_SHORT | DATA_TYPE_LOCAL_NAME_COMPLETE => {
                    data.local_name = Some(String::from_utf8_lossy(payload).into_owned());
                }
                DATA_TYPE_TX_POWER_LEVEL => {
                    data.tx_power_level = Some(*payload.first().ok_or(())? as i8);
                }
                DATA_TYPE_SERVICE_DATA_16_BIT => parse_service_data(payload, 2, &mut data)?,
                DATA_TYPE_SERVICE_DATA_32_BIT => parse_service_data(payload, 4, &mut data)?,
                DATA_TYPE_SERVICE_DATA_128_BIT => parse_service_data(payload, 16, &mut data)?,
                DATA_TYPE_MANUFACTURER_SPECIFIC_DATA => {
                    if payload.len() < 2 {
                        return Err(());
                    }
                    data.manufacturer_data = Some(ManufacturerData {
                        company_id: u16::from_le_bytes([payload[0], payload[1]]),
                        data: payload[2..].to_vec(),
                    });
                }
                // Unrecognized tags are skipped using the declared length.
                _ => {}
            }
        }

        Ok(data)
    }
}

fn parse_service_uuids(payload: &[u8], width: usize, out: &mut Vec<Uuid>) -> Result<(), ()> {
    if payload.len() % width != 0 {
        return Err(());
    }
    for entry in payload.chunks_exact(width) {
        out.push(Uuid::from_bluetooth_le_slice(entry).ok_or(())?);
    }
    Ok(())
}

fn parse_service_data(payload: &[u8], width: usize, data: &mut AdvertisementData) -> Result<(), ()> {
    if payload.len() < width {
        return Err(());
    }
    let uuid = Uuid::from_bluetooth_le_slice(&payload[..width]).ok_or(())?;
    data.service_data.insert(uuid, payload[width..].to_vec());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_complete_record() {
        let raw = [
            0x02, 0x01, 0x06, // flags
            0x03, 0x03, 0x0d, 0x18, // 16-bit service UUIDs: 0x180D
            0x05, 0x09, b'H', b'R', b'M', b'1', // complete local name
            0x02, 0x0a, 0xf4, // tx power: -12 dBm
            0x05, 0xff, 0x4c, 0x00, 0xaa, 0xbb, // manufacturer data, Apple
            0x05, 0x16, 0x0d, 0x18, 0x40, 0x2a, // 16-bit service data
        ];
        let data = AdvertisementData::parse(&raw);

        assert_eq!(data.flags, Some(0x06));
        assert_eq!(
            data.service_uuids,
            vec![Uuid::from_u16(0x180d)]
        );
        assert_eq!(
            data.service_uuids[0].to_string(),
            "0000180d-0000-1000-8000-00805f9b34fb"
        );
        assert_eq!(data.local_name.as_deref(), Some("HRM1"));
        assert_eq!(data.tx_power_level, Some(-12));
        let m = data.manufacturer_data.unwrap();
        assert_eq!(m.company_id, 0x004c);
        assert_eq!(m.data, vec![0xaa, 0xbb]);
        assert_eq!(
            data.service_data.get(&Uuid::from_u16(0x180d)).unwrap(),
            &vec![0x40, 0x2a]
        );
        assert_eq!(data.raw, raw);
    }

    #[test]
    fn parses_128_bit_service_uuid() {
        let canonical = Uuid::parse_str("6e400001-b5a3-f393-e0a9-e50e24dcca9e").unwrap();
        let mut raw = vec![0x11, 0x07];
        let mut le = *canonical.as_bytes();
        le.reverse();
        raw.extend_from_slice(&le);

        let data = AdvertisementData::parse(&raw);
        assert_eq!(data.service_uuids, vec![canonical]);
    }

    #[test]
    fn zero_length_terminates_parsing() {
        let raw = [0x02, 0x01, 0x06, 0x00, 0x03, 0x03, 0x0d, 0x18];
        let data = AdvertisementData::parse(&raw);
        assert_eq!(data.flags, Some(0x06));
        assert!(data.service_uuids.is_empty());
    }

    #[test]
    fn skips_unrecognized_tags() {
        let raw = [
            0x03, 0x19, 0x41, 0x03, // appearance, not handled
            0x03, 0x03, 0x0d, 0x18,
        ];
        let data = AdvertisementData::parse(&raw);
        assert_eq!(data.service_uuids, vec![Uuid::from_u16(0x180d)]);
    }

    #[test]
    fn truncated_record_degrades_to_raw_only() {
        // Declared length runs past the end of the buffer.
        let raw = [0x02, 0x01, 0x06, 0x10, 0x09, b'X'];
        let data = AdvertisementData::parse(&raw);
        assert_eq!(data.flags, None);
        assert_eq!(data.local_name, None);
        assert_eq!(data.raw, raw);
    }

    #[test]
    fn ragged_uuid_list_degrades_to_raw_only() {
        let raw = [0x04, 0x03, 0x0d, 0x18, 0x2a];
        let data = AdvertisementData::parse(&raw);
        assert!(data.service_uuids.is_empty());
        assert_eq!(data.raw, raw);
    }

    #[test]
    fn empty_payload_parses_to_empty_record() {
        let data = AdvertisementData::parse(&[]);
        assert_eq!(data, AdvertisementData::default());
    }
}
