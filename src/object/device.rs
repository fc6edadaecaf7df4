//! Device object record.
//!
//! The simulator hosts exactly one device. Its record is created at startup
//! from configuration and changed afterwards only through sparse
//! [`DevicePatch`]es and the online switch.

use serde::{Deserialize, Serialize};

use super::{DeviceStatus, ObjectIdentifier, ObjectType};

pub const DEFAULT_DEVICE_INSTANCE: u32 = 1001;
pub const DEFAULT_VENDOR_ID: u16 = 999;

/// Vendor name reported for the vendor-name property
pub const VENDOR_NAME: &str = "BACnet Simulator";

/// Largest APDU accepted, the BACnet/IP maximum
pub const MAX_APDU_LENGTH_ACCEPTED: u32 = 1476;
pub const PROTOCOL_VERSION: u32 = 1;
pub const PROTOCOL_REVISION: u32 = 14;

/// The device object of the simulator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Device {
    /// Device instance number
    pub id: u32,
    pub name: String,
    pub description: String,
    pub vendor_id: u16,
    pub model_name: String,
    pub firmware_revision: String,
    pub application_software_version: String,
    pub location: String,
    /// Offline devices stay silent on the network
    pub is_online: bool,
}

impl Default for Device {
    fn default() -> Self {
        Self {
            id: DEFAULT_DEVICE_INSTANCE,
            name: "BACnet Simulator Device".to_string(),
            description: "Virtual BACnet Device for Testing".to_string(),
            vendor_id: DEFAULT_VENDOR_ID,
            model_name: "Simulator v1.0".to_string(),
            firmware_revision: "1.0.0".to_string(),
            application_software_version: "1.0.0".to_string(),
            location: "Virtual Environment".to_string(),
            is_online: true,
        }
    }
}

impl Device {
    pub fn identifier(&self) -> ObjectIdentifier {
        ObjectIdentifier::new(ObjectType::Device, self.id)
    }

    pub fn system_status(&self) -> DeviceStatus {
        if self.is_online {
            DeviceStatus::Operational
        } else {
            DeviceStatus::OperationalReadOnly
        }
    }

    /// Merge the fields present in `patch`; no cross-field validation
    pub fn apply(&mut self, patch: DevicePatch) {
        if let Some(id) = patch.id {
            self.id = id;
        }
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(vendor_id) = patch.vendor_id {
            self.vendor_id = vendor_id;
        }
        if let Some(model_name) = patch.model_name {
            self.model_name = model_name;
        }
        if let Some(firmware_revision) = patch.firmware_revision {
            self.firmware_revision = firmware_revision;
        }
        if let Some(version) = patch.application_software_version {
            self.application_software_version = version;
        }
        if let Some(location) = patch.location {
            self.location = location;
        }
        if let Some(is_online) = patch.is_online {
            self.is_online = is_online;
        }
    }
}

/// Sparse device configuration update
///
/// Fields are merged as given. An `id` above 4194302 is stored too, but such
/// a device cannot be addressed or announced on the network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevicePatch {
    pub id: Option<u32>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub vendor_id: Option<u16>,
    pub model_name: Option<String>,
    pub firmware_revision: Option<String>,
    pub application_software_version: Option<String>,
    pub location: Option<String>,
    pub is_online: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_device() {
        let device = Device::default();
        assert_eq!(device.id, 1001);
        assert_eq!(device.name, "BACnet Simulator Device");
        assert_eq!(device.vendor_id, 999);
        assert!(device.is_online);
        assert_eq!(device.system_status(), DeviceStatus::Operational);
    }

    #[test]
    fn test_patch_only_touches_given_fields() {
        let mut device = Device::default();
        device.apply(DevicePatch {
            name: Some("AHU-3 Controller".to_string()),
            location: Some("Roof".to_string()),
            ..Default::default()
        });

        assert_eq!(device.name, "AHU-3 Controller");
        assert_eq!(device.location, "Roof");
        assert_eq!(device.model_name, "Simulator v1.0");
        assert_eq!(device.id, 1001);
    }

    #[test]
    fn test_camel_case_json() {
        let patch: DevicePatch =
            serde_json::from_str(r#"{"vendorId": 42, "isOnline": false}"#).unwrap();
        assert_eq!(patch.vendor_id, Some(42));
        assert_eq!(patch.is_online, Some(false));

        let json = serde_json::to_value(Device::default()).unwrap();
        assert_eq!(json["applicationSoftwareVersion"], "1.0.0");
        assert_eq!(json["isOnline"], true);
    }
}
