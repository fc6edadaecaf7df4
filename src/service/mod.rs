//! BACnet application services handled by the simulated device.
//!
//! A responding device needs a small slice of the service catalogue:
//!
//! - **Who-Is / I-Am** for discovery (unconfirmed)
//! - **ReadProperty** and its complex acknowledgement
//! - **WriteProperty**
//!
//! Every other confirmed service is rejected with `unrecognized-service`.
//! The request types here only deal with service parameters; APDU framing
//! lives in [`crate::app`].

use bitflags::bitflags;
use thiserror::Error;

use crate::bacnet_enum;
use crate::encoding::context::{
    decode_context_enumerated, decode_context_object_id, decode_context_unsigned,
    encode_closing_tag, encode_context_enumerated, encode_context_object_id,
    encode_context_unsigned, encode_opening_tag, is_closing_tag, is_opening_tag,
    peek_context_tag,
};
use crate::encoding::{
    decode_enumerated, decode_object_identifier, decode_unsigned, encode_enumerated,
    encode_object_identifier, encode_unsigned, EncodingError,
};
use crate::object::{ObjectIdentifier, ObjectType, PropertyIdentifier, Segmentation};
use crate::property::TaggedValue;

/// Result type for service operations
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Errors raised while decoding or encoding service parameters
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceError {
    #[error("unsupported service choice: {0}")]
    UnsupportedServiceChoice(u8),
    #[error("missing required parameter: {0}")]
    MissingRequiredParameter(&'static str),
    #[error("parameter out of range: {0}")]
    ParameterOutOfRange(&'static str),
    #[error("unexpected data after the last parameter")]
    TooManyArguments,
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),
}

impl ServiceError {
    /// Reject reason reported to the requester for this decoding failure
    pub fn reject_reason(&self) -> RejectReason {
        match self {
            ServiceError::UnsupportedServiceChoice(_) => RejectReason::UnrecognizedService,
            ServiceError::MissingRequiredParameter(_) => RejectReason::MissingRequiredParameter,
            ServiceError::ParameterOutOfRange(_) => RejectReason::ParameterOutOfRange,
            ServiceError::TooManyArguments => RejectReason::TooManyArguments,
            ServiceError::Encoding(_) => RejectReason::InvalidTag,
        }
    }
}

/// Confirmed service choices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConfirmedServiceChoice {
    AcknowledgeAlarm = 0,
    ConfirmedCOVNotification = 1,
    ConfirmedEventNotification = 2,
    GetAlarmSummary = 3,
    GetEnrollmentSummary = 4,
    SubscribeCOV = 5,
    AtomicReadFile = 6,
    AtomicWriteFile = 7,
    AddListElement = 8,
    RemoveListElement = 9,
    CreateObject = 10,
    DeleteObject = 11,
    ReadProperty = 12,
    ReadPropertyMultiple = 14,
    WriteProperty = 15,
    WritePropertyMultiple = 16,
    DeviceCommunicationControl = 17,
    ConfirmedPrivateTransfer = 18,
    ReinitializeDevice = 20,
    ReadRange = 26,
    SubscribeCOVProperty = 28,
    GetEventInformation = 29,
}

impl TryFrom<u8> for ConfirmedServiceChoice {
    type Error = ServiceError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::AcknowledgeAlarm),
            1 => Ok(Self::ConfirmedCOVNotification),
            2 => Ok(Self::ConfirmedEventNotification),
            3 => Ok(Self::GetAlarmSummary),
            4 => Ok(Self::GetEnrollmentSummary),
            5 => Ok(Self::SubscribeCOV),
            6 => Ok(Self::AtomicReadFile),
            7 => Ok(Self::AtomicWriteFile),
            8 => Ok(Self::AddListElement),
            9 => Ok(Self::RemoveListElement),
            10 => Ok(Self::CreateObject),
            11 => Ok(Self::DeleteObject),
            12 => Ok(Self::ReadProperty),
            14 => Ok(Self::ReadPropertyMultiple),
            15 => Ok(Self::WriteProperty),
            16 => Ok(Self::WritePropertyMultiple),
            17 => Ok(Self::DeviceCommunicationControl),
            18 => Ok(Self::ConfirmedPrivateTransfer),
            20 => Ok(Self::ReinitializeDevice),
            26 => Ok(Self::ReadRange),
            28 => Ok(Self::SubscribeCOVProperty),
            29 => Ok(Self::GetEventInformation),
            _ => Err(ServiceError::UnsupportedServiceChoice(value)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum UnconfirmedServiceChoice {
    IAm = 0,
    IHave = 1,
    UnconfirmedCOVNotification = 2,
    UnconfirmedEventNotification = 3,
    UnconfirmedPrivateTransfer = 4,
    UnconfirmedTextMessage = 5,
    TimeSynchronization = 6,
    WhoHas = 7,
    WhoIs = 8,
    UtcTimeSynchronization = 9,
    WriteGroup = 10,
}

impl TryFrom<u8> for UnconfirmedServiceChoice {
    type Error = ServiceError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::IAm),
            1 => Ok(Self::IHave),
            2 => Ok(Self::UnconfirmedCOVNotification),
            3 => Ok(Self::UnconfirmedEventNotification),
            4 => Ok(Self::UnconfirmedPrivateTransfer),
            5 => Ok(Self::UnconfirmedTextMessage),
            6 => Ok(Self::TimeSynchronization),
            7 => Ok(Self::WhoHas),
            8 => Ok(Self::WhoIs),
            9 => Ok(Self::UtcTimeSynchronization),
            10 => Ok(Self::WriteGroup),
            _ => Err(ServiceError::UnsupportedServiceChoice(value)),
        }
    }
}

/// Reject reason codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RejectReason {
    Other = 0,
    BufferOverflow = 1,
    InconsistentParameters = 2,
    InvalidParameterDataType = 3,
    InvalidTag = 4,
    MissingRequiredParameter = 5,
    ParameterOutOfRange = 6,
    TooManyArguments = 7,
    UndefinedEnumeration = 8,
    UnrecognizedService = 9,
}

impl From<u8> for RejectReason {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::BufferOverflow,
            2 => Self::InconsistentParameters,
            3 => Self::InvalidParameterDataType,
            4 => Self::InvalidTag,
            5 => Self::MissingRequiredParameter,
            6 => Self::ParameterOutOfRange,
            7 => Self::TooManyArguments,
            8 => Self::UndefinedEnumeration,
            9 => Self::UnrecognizedService,
            _ => Self::Other,
        }
    }
}

/// Abort reason codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AbortReason {
    Other = 0,
    BufferOverflow = 1,
    InvalidApduInThisState = 2,
    PreemptedByHigherPriorityTask = 3,
    SegmentationNotSupported = 4,
}

impl From<u8> for AbortReason {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::BufferOverflow,
            2 => Self::InvalidApduInThisState,
            3 => Self::PreemptedByHigherPriorityTask,
            4 => Self::SegmentationNotSupported,
            _ => Self::Other,
        }
    }
}

bacnet_enum! {
    /// Error classes carried in an Error PDU
    ErrorClass {
        Device = 0 => "device",
        Object = 1 => "object",
        Property = 2 => "property",
        Resources = 3 => "resources",
        Security = 4 => "security",
        Services = 5 => "services",
        Vt = 6 => "vt",
        Communication = 7 => "communication",
    },
    u16,
    64..=65535
}

bacnet_enum! {
    /// Error codes carried in an Error PDU
    ErrorCode {
        Other = 0 => "other",
        InvalidDataType = 9 => "invalid-data-type",
        ServiceRequestDenied = 29 => "service-request-denied",
        UnknownObject = 31 => "unknown-object",
        UnknownProperty = 32 => "unknown-property",
        ValueOutOfRange = 37 => "value-out-of-range",
        WriteAccessDenied = 40 => "write-access-denied",
        InvalidArrayIndex = 42 => "invalid-array-index",
        PropertyIsNotAnArray = 50 => "property-is-not-an-array",
    },
    u16,
    256..=65535
}

bitflags! {
    /// BACnetServicesSupported bits the device answers
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ServicesSupported: u64 {
        const READ_PROPERTY = 1 << 12;
        const WRITE_PROPERTY = 1 << 15;
        const I_AM = 1 << 26;
        const WHO_IS = 1 << 34;
    }
}

impl ServicesSupported {
    /// Width of the bit string on the wire
    pub const BIT_LENGTH: usize = 40;

    /// Services implemented by the simulator
    pub fn simulator() -> Self {
        Self::READ_PROPERTY | Self::WRITE_PROPERTY | Self::I_AM | Self::WHO_IS
    }

    pub fn to_bits(self) -> Vec<bool> {
        (0..Self::BIT_LENGTH)
            .map(|bit| self.bits() & (1 << bit) != 0)
            .collect()
    }
}

/// Array index value meaning "the whole array"
pub const BACNET_ARRAY_ALL: u32 = 0xFFFF_FFFF;

/// Slice of the remaining input, or the named required parameter is missing
fn required<'a>(data: &'a [u8], pos: usize, name: &'static str) -> Result<&'a [u8]> {
    match data.get(pos..) {
        Some(rest) if !rest.is_empty() => Ok(rest),
        _ => Err(ServiceError::MissingRequiredParameter(name)),
    }
}

fn optional_array_index(data: &[u8], pos: &mut usize) -> Result<Option<u32>> {
    if !peek_context_tag(&data[*pos..], 2) {
        return Ok(None);
    }
    let (index, consumed) = decode_context_unsigned(&data[*pos..], 2)?;
    *pos += consumed;
    Ok((index != BACNET_ARRAY_ALL).then_some(index))
}

/// Decode the application values enclosed by opening/closing tag 3
fn decode_property_value(data: &[u8], pos: &mut usize) -> Result<TaggedValue> {
    let rest = required(data, *pos, "property-value")?;
    if !is_opening_tag(rest, 3) {
        return Err(EncodingError::InvalidTag.into());
    }
    *pos += 1;

    let (mut values, consumed) = TaggedValue::decode_all(required(data, *pos, "property-value")?)?;
    *pos += consumed;

    if !is_closing_tag(required(data, *pos, "property-value")?, 3) {
        return Err(EncodingError::InvalidTag.into());
    }
    *pos += 1;

    Ok(if values.len() == 1 {
        values.remove(0)
    } else {
        TaggedValue::Array(values)
    })
}

/// Who-Is request (unconfirmed service)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WhoIsRequest {
    pub device_instance_range_low_limit: Option<u32>,
    pub device_instance_range_high_limit: Option<u32>,
}

impl WhoIsRequest {
    /// Who-Is for all devices
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_device(device_instance: u32) -> Self {
        Self::for_range(device_instance, device_instance)
    }

    pub fn for_range(low: u32, high: u32) -> Self {
        Self {
            device_instance_range_low_limit: Some(low),
            device_instance_range_high_limit: Some(high),
        }
    }

    pub fn encode(&self, buffer: &mut Vec<u8>) -> Result<()> {
        // limits travel as a pair or not at all
        if let (Some(low), Some(high)) = (
            self.device_instance_range_low_limit,
            self.device_instance_range_high_limit,
        ) {
            encode_context_unsigned(buffer, 0, low)?;
            encode_context_unsigned(buffer, 1, high)?;
        }
        Ok(())
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Ok(Self::new());
        }

        let (low, consumed) = decode_context_unsigned(data, 0)?;
        let rest = required(data, consumed, "device-instance-range-high-limit")?;
        let (high, high_len) = decode_context_unsigned(rest, 1)?;
        if consumed + high_len != data.len() {
            return Err(ServiceError::TooManyArguments);
        }

        Ok(Self::for_range(low, high))
    }

    /// Check if this request addresses `device_instance`
    pub fn matches(&self, device_instance: u32) -> bool {
        match (
            self.device_instance_range_low_limit,
            self.device_instance_range_high_limit,
        ) {
            (None, None) => true,
            (Some(low), Some(high)) => device_instance >= low && device_instance <= high,
            (Some(low), None) => device_instance >= low,
            (None, Some(high)) => device_instance <= high,
        }
    }
}

/// I-Am announcement (unconfirmed service)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IAmRequest {
    pub device_identifier: ObjectIdentifier,
    pub max_apdu_length_accepted: u32,
    pub segmentation_supported: Segmentation,
    pub vendor_identifier: u16,
}

impl IAmRequest {
    pub fn new(
        device_instance: u32,
        max_apdu_length_accepted: u32,
        segmentation_supported: Segmentation,
        vendor_identifier: u16,
    ) -> Self {
        Self {
            device_identifier: ObjectIdentifier::new(ObjectType::Device, device_instance),
            max_apdu_length_accepted,
            segmentation_supported,
            vendor_identifier,
        }
    }

    pub fn encode(&self, buffer: &mut Vec<u8>) -> Result<()> {
        encode_object_identifier(
            buffer,
            self.device_identifier.object_type.into(),
            self.device_identifier.instance,
        )?;
        encode_unsigned(buffer, self.max_apdu_length_accepted)?;
        encode_enumerated(buffer, self.segmentation_supported as u32)?;
        encode_unsigned(buffer, self.vendor_identifier as u32)?;
        Ok(())
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let ((object_type, instance), mut pos) = decode_object_identifier(data)?;
        let device_identifier = ObjectIdentifier::new(object_type.into(), instance);

        let (max_apdu_length_accepted, consumed) =
            decode_unsigned(required(data, pos, "max-apdu-length-accepted")?)?;
        pos += consumed;

        let (segmentation, consumed) =
            decode_enumerated(required(data, pos, "segmentation-supported")?)?;
        pos += consumed;
        let segmentation_supported = match segmentation {
            0 => Segmentation::Both,
            1 => Segmentation::Transmit,
            2 => Segmentation::Receive,
            3 => Segmentation::NoSegmentation,
            _ => return Err(ServiceError::ParameterOutOfRange("segmentation-supported")),
        };

        let (vendor_identifier, _) = decode_unsigned(required(data, pos, "vendor-id")?)?;
        let vendor_identifier = u16::try_from(vendor_identifier)
            .map_err(|_| ServiceError::ParameterOutOfRange("vendor-id"))?;

        Ok(Self {
            device_identifier,
            max_apdu_length_accepted,
            segmentation_supported,
            vendor_identifier,
        })
    }
}

/// Read Property request (confirmed service)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadPropertyRequest {
    pub object_identifier: ObjectIdentifier,
    pub property_identifier: PropertyIdentifier,
    pub property_array_index: Option<u32>,
}

impl ReadPropertyRequest {
    pub fn new(object_identifier: ObjectIdentifier, property_identifier: PropertyIdentifier) -> Self {
        Self {
            object_identifier,
            property_identifier,
            property_array_index: None,
        }
    }

    pub fn with_array_index(mut self, array_index: u32) -> Self {
        self.property_array_index = Some(array_index);
        self
    }

    pub fn encode(&self, buffer: &mut Vec<u8>) -> Result<()> {
        encode_context_object_id(
            buffer,
            0,
            self.object_identifier.object_type.into(),
            self.object_identifier.instance,
        )?;
        encode_context_enumerated(buffer, 1, self.property_identifier.into())?;
        if let Some(array_index) = self.property_array_index {
            encode_context_unsigned(buffer, 2, array_index)?;
        }
        Ok(())
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let ((object_type, instance), mut pos) =
            decode_context_object_id(required(data, 0, "object-identifier")?, 0)?;
        let (property, consumed) =
            decode_context_enumerated(required(data, pos, "property-identifier")?, 1)?;
        pos += consumed;
        let property_array_index = optional_array_index(data, &mut pos)?;

        if pos != data.len() {
            return Err(ServiceError::TooManyArguments);
        }

        Ok(Self {
            object_identifier: ObjectIdentifier::new(object_type.into(), instance),
            property_identifier: property.into(),
            property_array_index,
        })
    }
}

/// ReadProperty complex acknowledgement
#[derive(Debug, Clone, PartialEq)]
pub struct ReadPropertyAck {
    pub object_identifier: ObjectIdentifier,
    pub property_identifier: PropertyIdentifier,
    pub property_array_index: Option<u32>,
    pub property_value: TaggedValue,
}

impl ReadPropertyAck {
    pub fn new(request: &ReadPropertyRequest, property_value: TaggedValue) -> Self {
        Self {
            object_identifier: request.object_identifier,
            property_identifier: request.property_identifier,
            property_array_index: request.property_array_index,
            property_value,
        }
    }

    pub fn encode(&self, buffer: &mut Vec<u8>) -> Result<()> {
        encode_context_object_id(
            buffer,
            0,
            self.object_identifier.object_type.into(),
            self.object_identifier.instance,
        )?;
        encode_context_enumerated(buffer, 1, self.property_identifier.into())?;
        if let Some(array_index) = self.property_array_index {
            encode_context_unsigned(buffer, 2, array_index)?;
        }
        encode_opening_tag(buffer, 3)?;
        self.property_value.encode(buffer)?;
        encode_closing_tag(buffer, 3)?;
        Ok(())
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let ((object_type, instance), mut pos) =
            decode_context_object_id(required(data, 0, "object-identifier")?, 0)?;
        let (property, consumed) =
            decode_context_enumerated(required(data, pos, "property-identifier")?, 1)?;
        pos += consumed;
        let property_array_index = optional_array_index(data, &mut pos)?;
        let property_value = decode_property_value(data, &mut pos)?;

        Ok(Self {
            object_identifier: ObjectIdentifier::new(object_type.into(), instance),
            property_identifier: property.into(),
            property_array_index,
            property_value,
        })
    }
}

/// Write Property request (confirmed service)
#[derive(Debug, Clone, PartialEq)]
pub struct WritePropertyRequest {
    pub object_identifier: ObjectIdentifier,
    pub property_identifier: PropertyIdentifier,
    pub property_array_index: Option<u32>,
    pub property_value: TaggedValue,
    /// Write priority 1-16
    pub priority: Option<u8>,
}

impl WritePropertyRequest {
    pub fn new(
        object_identifier: ObjectIdentifier,
        property_identifier: PropertyIdentifier,
        property_value: TaggedValue,
    ) -> Self {
        Self {
            object_identifier,
            property_identifier,
            property_array_index: None,
            property_value,
            priority: None,
        }
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_array_index(mut self, array_index: u32) -> Self {
        self.property_array_index = Some(array_index);
        self
    }

    pub fn encode(&self, buffer: &mut Vec<u8>) -> Result<()> {
        encode_context_object_id(
            buffer,
            0,
            self.object_identifier.object_type.into(),
            self.object_identifier.instance,
        )?;
        encode_context_enumerated(buffer, 1, self.property_identifier.into())?;
        if let Some(array_index) = self.property_array_index {
            encode_context_unsigned(buffer, 2, array_index)?;
        }
        encode_opening_tag(buffer, 3)?;
        self.property_value.encode(buffer)?;
        encode_closing_tag(buffer, 3)?;
        if let Some(priority) = self.priority {
            encode_context_unsigned(buffer, 4, priority as u32)?;
        }
        Ok(())
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let ((object_type, instance), mut pos) =
            decode_context_object_id(required(data, 0, "object-identifier")?, 0)?;
        let (property, consumed) =
            decode_context_enumerated(required(data, pos, "property-identifier")?, 1)?;
        pos += consumed;
        let property_array_index = optional_array_index(data, &mut pos)?;
        let property_value = decode_property_value(data, &mut pos)?;

        let priority = if pos < data.len() {
            let (priority, consumed) = decode_context_unsigned(&data[pos..], 4)?;
            pos += consumed;
            match u8::try_from(priority) {
                Ok(p) if (1..=16).contains(&p) => Some(p),
                _ => return Err(ServiceError::ParameterOutOfRange("priority")),
            }
        } else {
            None
        };

        if pos != data.len() {
            return Err(ServiceError::TooManyArguments);
        }

        Ok(Self {
            object_identifier: ObjectIdentifier::new(object_type.into(), instance),
            property_identifier: property.into(),
            property_array_index,
            property_value,
            priority,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whois_request() {
        let whois_all = WhoIsRequest::new();
        assert!(whois_all.matches(123));
        assert!(whois_all.matches(4_194_302));

        let whois_specific = WhoIsRequest::for_device(1001);
        assert!(whois_specific.matches(1001));
        assert!(!whois_specific.matches(1002));

        let whois_range = WhoIsRequest::for_range(100, 200);
        assert!(whois_range.matches(150));
        assert!(!whois_range.matches(50));
        assert!(!whois_range.matches(250));
    }

    #[test]
    fn test_whois_encoding() {
        let mut buffer = Vec::new();
        WhoIsRequest::new().encode(&mut buffer).unwrap();
        assert!(buffer.is_empty());
        assert_eq!(WhoIsRequest::decode(&buffer).unwrap(), WhoIsRequest::new());

        WhoIsRequest::for_range(1000, 2000).encode(&mut buffer).unwrap();
        assert_eq!(buffer, vec![0x0A, 0x03, 0xE8, 0x1A, 0x07, 0xD0]);
        assert_eq!(
            WhoIsRequest::decode(&buffer).unwrap(),
            WhoIsRequest::for_range(1000, 2000)
        );
    }

    #[test]
    fn test_whois_low_limit_alone_is_missing_parameter() {
        assert_eq!(
            WhoIsRequest::decode(&[0x09, 0x05]),
            Err(ServiceError::MissingRequiredParameter(
                "device-instance-range-high-limit"
            ))
        );
    }

    #[test]
    fn test_iam_wire_format() {
        let iam = IAmRequest::new(1001, 1476, Segmentation::NoSegmentation, 999);
        let mut buffer = Vec::new();
        iam.encode(&mut buffer).unwrap();

        assert_eq!(
            buffer,
            vec![0xC4, 0x02, 0x00, 0x03, 0xE9, 0x22, 0x05, 0xC4, 0x91, 0x03, 0x22, 0x03, 0xE7]
        );
        assert_eq!(IAmRequest::decode(&buffer).unwrap(), iam);
    }

    #[test]
    fn test_read_property_request() {
        let request = ReadPropertyRequest::new(
            ObjectIdentifier::new(ObjectType::AnalogInput, 1),
            PropertyIdentifier::PresentValue,
        );
        let mut buffer = Vec::new();
        request.encode(&mut buffer).unwrap();
        assert_eq!(buffer, vec![0x0C, 0x00, 0x00, 0x00, 0x01, 0x19, 0x55]);
        assert_eq!(ReadPropertyRequest::decode(&buffer).unwrap(), request);

        let indexed = ReadPropertyRequest::new(
            ObjectIdentifier::new(ObjectType::Device, 1001),
            PropertyIdentifier::ObjectList,
        )
        .with_array_index(0);
        buffer.clear();
        indexed.encode(&mut buffer).unwrap();
        assert_eq!(ReadPropertyRequest::decode(&buffer).unwrap(), indexed);
    }

    #[test]
    fn test_read_property_missing_property() {
        let data = [0x0C, 0x00, 0x00, 0x00, 0x01];
        let err = ReadPropertyRequest::decode(&data).unwrap_err();
        assert_eq!(err.reject_reason(), RejectReason::MissingRequiredParameter);

        let err = ReadPropertyRequest::decode(&[0x44, 0x00]).unwrap_err();
        assert_eq!(err.reject_reason(), RejectReason::InvalidTag);
    }

    #[test]
    fn test_read_property_ack() {
        let request = ReadPropertyRequest::new(
            ObjectIdentifier::new(ObjectType::AnalogInput, 1),
            PropertyIdentifier::PresentValue,
        );
        let ack = ReadPropertyAck::new(&request, TaggedValue::Real(21.5));
        let mut buffer = Vec::new();
        ack.encode(&mut buffer).unwrap();

        assert_eq!(&buffer[7..], &[0x3E, 0x44, 0x41, 0xAC, 0x00, 0x00, 0x3F]);
        assert_eq!(ReadPropertyAck::decode(&buffer).unwrap(), ack);
    }

    #[test]
    fn test_write_property_request() {
        let request = WritePropertyRequest::new(
            ObjectIdentifier::new(ObjectType::BinaryInput, 2),
            PropertyIdentifier::PresentValue,
            TaggedValue::Enumerated(1),
        )
        .with_priority(8);

        let mut buffer = Vec::new();
        request.encode(&mut buffer).unwrap();
        assert_eq!(
            buffer,
            vec![0x0C, 0x00, 0xC0, 0x00, 0x02, 0x19, 0x55, 0x3E, 0x91, 0x01, 0x3F, 0x49, 0x08]
        );
        assert_eq!(WritePropertyRequest::decode(&buffer).unwrap(), request);
    }

    #[test]
    fn test_write_property_bad_priority() {
        let request = WritePropertyRequest::new(
            ObjectIdentifier::new(ObjectType::AnalogInput, 1),
            PropertyIdentifier::PresentValue,
            TaggedValue::Real(1.0),
        )
        .with_priority(17);

        let mut buffer = Vec::new();
        request.encode(&mut buffer).unwrap();
        assert_eq!(
            WritePropertyRequest::decode(&buffer),
            Err(ServiceError::ParameterOutOfRange("priority"))
        );
    }

    #[test]
    fn test_write_property_unterminated_value() {
        let data = [0x0C, 0x00, 0x00, 0x00, 0x01, 0x19, 0x55, 0x3E, 0x44, 0x43, 0x16, 0x00, 0x00];
        assert_eq!(
            WritePropertyRequest::decode(&data),
            Err(ServiceError::MissingRequiredParameter("property-value"))
        );
    }

    #[test]
    fn test_error_enums() {
        assert_eq!(u16::from(ErrorCode::UnknownObject), 31);
        assert_eq!(u16::from(ErrorCode::WriteAccessDenied), 40);
        assert_eq!(u16::from(ErrorClass::Property), 2);
        assert_eq!(ErrorCode::from(50u16), ErrorCode::PropertyIsNotAnArray);
    }

    #[test]
    fn test_services_supported_bits() {
        let bits = ServicesSupported::simulator().to_bits();
        assert_eq!(bits.len(), 40);
        assert!(bits[12] && bits[15] && bits[26] && bits[34]);
        assert_eq!(bits.iter().filter(|b| **b).count(), 4);
    }

    #[test]
    fn test_service_choice_lookup() {
        assert_eq!(
            ConfirmedServiceChoice::try_from(12).unwrap(),
            ConfirmedServiceChoice::ReadProperty
        );
        assert_eq!(
            ConfirmedServiceChoice::try_from(99),
            Err(ServiceError::UnsupportedServiceChoice(99))
        );
        assert_eq!(
            UnconfirmedServiceChoice::try_from(8).unwrap(),
            UnconfirmedServiceChoice::WhoIs
        );
    }
}
