//! GATT topology model: services containing characteristics containing
//! descriptors, as reported by the radio backend after discovery.

use uuid::Uuid;

/// Property bits of a GATT characteristic (Core Spec Vol 3, Part G §3.3.1.1).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CharacteristicProperties(pub u8);

impl CharacteristicProperties {
    pub const BROADCAST: Self = Self(0x01);
    pub const READ: Self = Self(0x02);
    pub const WRITE_WITHOUT_RESPONSE: Self = Self(0x04);
    pub const WRITE: Self = Self(0x08);
    pub const NOTIFY: Self = Self(0x10);
    pub const INDICATE: Self = Self(0x20);
    pub const AUTHENTICATED_SIGNED_WRITES: Self = Self(0x40);
    pub const EXTENDED_PROPERTIES: Self = Self(0x80);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn can_read(self) -> bool {
        self.contains(Self::READ)
    }

    pub fn can_write(self) -> bool {
        self.contains(Self::WRITE)
    }

    pub fn can_write_without_response(self) -> bool {
        self.contains(Self::WRITE_WITHOUT_RESPONSE)
    }

    pub fn can_notify(self) -> bool {
        self.contains(Self::NOTIFY)
    }

    pub fn can_indicate(self) -> bool {
        self.contains(Self::INDICATE)
    }
}

impl std::ops::BitOr for CharacteristicProperties {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// How a characteristic write is acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteType {
    WithResponse,
    WithoutResponse,
}

/// Notification configuration for a characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotifyMode {
    Notifications,
    Indications,
    Off,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorInfo {
    pub uuid: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacteristicInfo {
    pub uuid: Uuid,
    pub properties: CharacteristicProperties,
    pub descriptors: Vec<DescriptorInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    pub uuid: Uuid,
    pub primary: bool,
    pub characteristics: Vec<CharacteristicInfo>,
}

impl ServiceInfo {
    /// Finds a characteristic by UUID that carries all `required` property
    /// bits. Peripherals may reuse a UUID across characteristics with
    /// different properties, so the lookup filters on both.
    pub fn characteristic_with(
        &self,
        uuid: Uuid,
        required: CharacteristicProperties,
    ) -> Option<&CharacteristicInfo> {
        self.characteristics
            .iter()
            .find(|c| c.uuid == uuid && c.properties.contains(required))
    }

    /// Finds a characteristic by UUID regardless of its properties.
    pub fn characteristic(&self, uuid: Uuid) -> Option<&CharacteristicInfo> {
        self.characteristics.iter().find(|c| c.uuid == uuid)
    }

    /// Finds a characteristic usable for notifications, preferring notify
    /// over indicate, and reports the mode to configure.
    pub fn notify_characteristic(&self, uuid: Uuid) -> Option<(&CharacteristicInfo, NotifyMode)> {
        if let Some(c) = self.characteristic_with(uuid, CharacteristicProperties::NOTIFY) {
            return Some((c, NotifyMode::Notifications));
        }
        if let Some(c) = self.characteristic_with(uuid, CharacteristicProperties::INDICATE) {
            return Some((c, NotifyMode::Indications));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::btuuid::BluetoothUuidExt;

    fn service() -> ServiceInfo {
        let uuid = Uuid::from_u16(0x2a37);
        ServiceInfo {
            uuid: Uuid::from_u16(0x180d),
            primary: true,
            characteristics: vec![
                CharacteristicInfo {
                    uuid,
                    properties: CharacteristicProperties::READ,
                    descriptors: vec![],
                },
                CharacteristicInfo {
                    uuid,
                    properties: CharacteristicProperties::INDICATE,
                    descriptors: vec![],
                },
            ],
        }
    }

    #[test]
    fn lookup_filters_on_properties() {
        let service = service();
        let uuid = Uuid::from_u16(0x2a37);

        let read = service
            .characteristic_with(uuid, CharacteristicProperties::READ)
            .unwrap();
        assert!(read.properties.can_read());

        assert!(service
            .characteristic_with(uuid, CharacteristicProperties::WRITE)
            .is_none());
    }

    #[test]
    fn notify_lookup_falls_back_to_indicate() {
        let service = service();
        let uuid = Uuid::from_u16(0x2a37);

        let (c, mode) = service.notify_characteristic(uuid).unwrap();
        assert_eq!(mode, NotifyMode::Indications);
        assert!(c.properties.can_indicate());
    }
}
