//! BACnet object model of the simulated device.
//!
//! The device exposes exactly three kinds of objects: the Device object itself,
//! Analog Inputs and Binary Inputs. Records are plain data owned by the
//! [`PointStore`](store::PointStore); the
//! [`PropertyDispatcher`](dispatch::PropertyDispatcher) turns them into BACnet
//! property values.
//!
//! # Example
//!
//! ```rust
//! use bacnet_sim::object::{ObjectIdentifier, ObjectType};
//!
//! let temp_sensor = ObjectIdentifier::new(ObjectType::AnalogInput, 1);
//! assert_eq!(u32::from(temp_sensor), 1);
//!
//! let device = ObjectIdentifier::from(0x0200_03E9u32);
//! assert_eq!(device.object_type, ObjectType::Device);
//! assert_eq!(device.instance, 1001);
//! ```

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Analog input records
pub mod analog;
/// Binary input records
pub mod binary;
/// Device object record
pub mod device;
/// ReadProperty / WriteProperty resolution against the store
pub mod dispatch;
pub mod engineering_units;
pub mod object_type;
pub mod property_identifier;
/// Authoritative in-memory registry
pub mod store;

pub use analog::{AnalogInput, AnalogInputPatch, NewAnalogInput};
pub use binary::{BinaryInput, BinaryInputPatch, BinaryPV, NewBinaryInput, Polarity};
pub use device::{Device, DevicePatch};
pub use dispatch::{DispatchError, PropertyDispatcher, WriteAck, WritePolicy};
pub use engineering_units::EngineeringUnits;
pub use object_type::ObjectType;
pub use property_identifier::PropertyIdentifier;
pub use store::{PointStore, StoreError};

/// Opaque handle the control surface uses to address a point
pub type PointId = String;

/// Object identifier (type + instance number)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectIdentifier {
    pub object_type: ObjectType,
    pub instance: u32,
}

impl ObjectIdentifier {
    pub fn new(object_type: ObjectType, instance: u32) -> Self {
        Self {
            object_type,
            instance,
        }
    }

    /// Check if instance number is valid (0-4194302)
    pub fn is_valid(&self) -> bool {
        crate::util::is_valid_instance_number(self.instance)
    }
}

impl From<u32> for ObjectIdentifier {
    /// Convert from the 32-bit wire form (clause 20.2.14)
    fn from(value: u32) -> Self {
        let (object_type, instance) = crate::encoding::object_id_from_u32(value);
        Self::new(object_type.into(), instance)
    }
}

impl From<ObjectIdentifier> for u32 {
    /// Convert to the 32-bit wire form (clause 20.2.14)
    fn from(value: ObjectIdentifier) -> Self {
        let object_type: u16 = value.object_type.into();
        ((object_type as u32 & 0x3FF) << 22) | (value.instance & 0x3F_FFFF)
    }
}

impl fmt::Display for ObjectIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.object_type, self.instance)
    }
}

/// Reliability of a point's present value
///
/// Points are always simulated as healthy, the other states exist so a
/// configured record can be reported faithfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u32)]
pub enum Reliability {
    #[default]
    NoFaultDetected = 0,
    NoSensor = 1,
    OverRange = 2,
    UnderRange = 3,
    OpenLoop = 4,
    ShortedLoop = 5,
    UnreliableOther = 7,
}

/// Event state of an object, always `Normal` without intrinsic reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum EventState {
    #[default]
    Normal = 0,
    Fault = 1,
    OffNormal = 2,
    HighLimit = 3,
    LowLimit = 4,
}

bitflags! {
    /// BACnetStatusFlags, bit 0 is the first bit on the wire
    #[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
    pub struct StatusFlags: u8 {
        const IN_ALARM = 1 << 0;
        const FAULT = 1 << 1;
        const OVERRIDDEN = 1 << 2;
        const OUT_OF_SERVICE = 1 << 3;
    }
}

impl StatusFlags {
    pub fn from_point(out_of_service: bool, reliability: Reliability) -> Self {
        let mut flags = StatusFlags::empty();
        flags.set(StatusFlags::OUT_OF_SERVICE, out_of_service);
        flags.set(StatusFlags::FAULT, reliability != Reliability::NoFaultDetected);
        flags
    }

    /// Bits in wire order: in-alarm, fault, overridden, out-of-service
    pub fn to_bits(self) -> Vec<bool> {
        (0..4).map(|bit| self.bits() & (1 << bit) != 0).collect()
    }
}

/// Device system status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum DeviceStatus {
    Operational = 0,
    OperationalReadOnly = 1,
    DownloadRequired = 2,
    DownloadInProgress = 3,
    NonOperational = 4,
    BackupInProgress = 5,
}

/// Segmentation support enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Segmentation {
    Both = 0,
    Transmit = 1,
    Receive = 2,
    NoSegmentation = 3,
}

impl fmt::Display for Segmentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Both => write!(f, "Both"),
            Self::Transmit => write!(f, "Transmit"),
            Self::Receive => write!(f, "Receive"),
            Self::NoSegmentation => write!(f, "None"),
        }
    }
}
