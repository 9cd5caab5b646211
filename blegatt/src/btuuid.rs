//! Bluetooth UUID helpers.
//!
//! GATT identifies services and characteristics by 128-bit UUIDs, but the
//! SIG-assigned ones are transmitted in 16- or 32-bit short form and expand
//! over the Bluetooth base UUID `0000xxxx-0000-1000-8000-00805F9B34FB`.

use uuid::Uuid;

/// The Bluetooth base UUID with a zeroed short part.
pub const BLUETOOTH_BASE_UUID: u128 = 0x00000000_0000_1000_8000_00805f9b34fb;

/// Extension methods on [`Uuid`] for Bluetooth short-form expansion.
pub trait BluetoothUuidExt: Sized {
    /// Expands a 16-bit SIG-assigned UUID to canonical 128-bit form.
    fn from_u16(value: u16) -> Self;

    /// Expands a 32-bit SIG-assigned UUID to canonical 128-bit form.
    fn from_u32(value: u32) -> Self;

    /// Decodes a UUID from a little-endian advertisement entry of 2, 4 or
    /// 16 bytes. Returns `None` for any other length.
    fn from_bluetooth_le_slice(slice: &[u8]) -> Option<Self>;

    /// Returns the 16-bit short form if this UUID lies in the SIG range of
    /// the base UUID.
    fn try_to_u16(&self) -> Option<u16>;

    /// Returns the 32-bit short form if this UUID is an expansion of the
    /// base UUID.
    fn try_to_u32(&self) -> Option<u32>;
}

impl BluetoothUuidExt for Uuid {
    fn from_u16(value: u16) -> Self {
        Self::from_u32(value as u32)
    }

    fn from_u32(value: u32) -> Self {
        // 128_bit_value = short_uuid * 2^96 + base_uuid
        Uuid::from_u128(((value as u128) << 96) | BLUETOOTH_BASE_UUID)
    }

    fn from_bluetooth_le_slice(slice: &[u8]) -> Option<Self> {
        match slice.len() {
            2 => Some(Self::from_u16(u16::from_le_bytes([slice[0], slice[1]]))),
            4 => Some(Self::from_u32(u32::from_le_bytes([
                slice[0], slice[1], slice[2], slice[3],
            ]))),
            16 => {
                let mut bytes = [0u8; 16];
                for (dst, src) in bytes.iter_mut().zip(slice.iter().rev()) {
                    *dst = *src;
                }
                Some(Uuid::from_bytes(bytes))
            }
            _ => None,
        }
    }

    fn try_to_u16(&self) -> Option<u16> {
        self.try_to_u32().and_then(|v| u16::try_from(v).ok())
    }

    fn try_to_u32(&self) -> Option<u32> {
        let value = self.as_u128();
        if value & !(0xffff_ffff_u128 << 96) == BLUETOOTH_BASE_UUID {
            Some((value >> 96) as u32)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_16_bit_heart_rate_uuid() {
        let uuid = Uuid::from_u16(0x180d);
        assert_eq!(
            uuid.to_string(),
            "0000180d-0000-1000-8000-00805f9b34fb"
        );
    }

    #[test]
    fn expands_32_bit_uuid() {
        let uuid = Uuid::from_u32(0x1234_5678);
        assert_eq!(
            uuid.to_string(),
            "12345678-0000-1000-8000-00805f9b34fb"
        );
    }

    #[test]
    fn short_forms_round_trip() {
        assert_eq!(Uuid::from_u16(0x2902).try_to_u16(), Some(0x2902));
        assert_eq!(Uuid::from_u32(0xdead_beef).try_to_u32(), Some(0xdead_beef));
        assert_eq!(Uuid::from_u32(0xdead_beef).try_to_u16(), None);
    }

    #[test]
    fn non_sig_uuid_has_no_short_form() {
        let uuid = Uuid::parse_str("6e400001-b5a3-f393-e0a9-e50e24dcca9e").unwrap();
        assert_eq!(uuid.try_to_u16(), None);
        assert_eq!(uuid.try_to_u32(), None);
    }

    #[test]
    fn decodes_little_endian_slices() {
        assert_eq!(
            Uuid::from_bluetooth_le_slice(&[0x0d, 0x18]),
            Some(Uuid::from_u16(0x180d))
        );

        // 128-bit entries are little-endian on the air and reverse into
        // big-endian canonical form.
        let canonical = Uuid::parse_str("6e400001-b5a3-f393-e0a9-e50e24dcca9e").unwrap();
        let mut le = *canonical.as_bytes();
        le.reverse();
        assert_eq!(Uuid::from_bluetooth_le_slice(&le), Some(canonical));

        assert_eq!(Uuid::from_bluetooth_le_slice(&[0x01, 0x02, 0x03]), None);
    }
}
