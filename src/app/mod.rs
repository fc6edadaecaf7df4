//! BACnet Application Layer Module
//!
//! Forms and parses Application Protocol Data Units (APDUs). The simulator is a
//! server only, so the layer is stateless: every confirmed request is answered
//! by exactly one SimpleACK, ComplexACK, Error, Reject or Abort.
//!
//! # APDU Types
//!
//! - Confirmed Request PDU
//! - Unconfirmed Request PDU
//! - SimpleACK PDU
//! - ComplexACK PDU
//! - SegmentACK PDU
//! - Error PDU
//! - Reject PDU
//! - Abort PDU
//!
//! Segmentation is not supported. A segmented confirmed request decodes so
//! that it can be answered with an Abort.
//!
//! # Example
//!
//! ```
//! use bacnet_sim::app::Apdu;
//! use bacnet_sim::service::UnconfirmedServiceChoice;
//!
//! let apdu = Apdu::UnconfirmedRequest {
//!     service_choice: UnconfirmedServiceChoice::WhoIs,
//!     service_data: vec![],
//! };
//! assert_eq!(apdu.encode().unwrap(), vec![0x10, 0x08]);
//! ```

use thiserror::Error;

use crate::encoding::{decode_enumerated, encode_enumerated, EncodingError};
use crate::service::{
    AbortReason, ConfirmedServiceChoice, ErrorClass, ErrorCode, RejectReason,
    UnconfirmedServiceChoice,
};

pub type Result<T> = std::result::Result<T, ApplicationError>;

/// Errors that can occur in application layer operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApplicationError {
    #[error("invalid APDU: {0}")]
    InvalidApdu(String),
    #[error("unsupported APDU type {0}")]
    UnsupportedApduType(u8),
    /// Confirmed request for a service this stack does not know; the invoke
    /// id is kept so the request can still be rejected
    #[error("unrecognized confirmed service {service_choice} (invoke id {invoke_id})")]
    UnrecognizedService { invoke_id: u8, service_choice: u8 },
    #[error("unrecognized unconfirmed service {0}")]
    UnrecognizedUnconfirmedService(u8),
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),
}

/// APDU types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ApduType {
    ConfirmedRequest = 0,
    UnconfirmedRequest = 1,
    SimpleAck = 2,
    ComplexAck = 3,
    SegmentAck = 4,
    Error = 5,
    Reject = 6,
    Abort = 7,
}

impl TryFrom<u8> for ApduType {
    type Error = ApplicationError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(ApduType::ConfirmedRequest),
            1 => Ok(ApduType::UnconfirmedRequest),
            2 => Ok(ApduType::SimpleAck),
            3 => Ok(ApduType::ComplexAck),
            4 => Ok(ApduType::SegmentAck),
            5 => Ok(ApduType::Error),
            6 => Ok(ApduType::Reject),
            7 => Ok(ApduType::Abort),
            other => Err(ApplicationError::UnsupportedApduType(other)),
        }
    }
}

/// Application Protocol Data Unit
#[derive(Debug, Clone, PartialEq)]
pub enum Apdu {
    /// Confirmed service request
    ConfirmedRequest {
        segmented: bool,
        more_follows: bool,
        segmented_response_accepted: bool,
        max_segments: MaxSegments,
        max_response_size: MaxApduSize,
        invoke_id: u8,
        sequence_number: Option<u8>,
        proposed_window_size: Option<u8>,
        service_choice: ConfirmedServiceChoice,
        service_data: Vec<u8>,
    },

    /// Unconfirmed service request
    UnconfirmedRequest {
        service_choice: UnconfirmedServiceChoice,
        service_data: Vec<u8>,
    },

    SimpleAck {
        invoke_id: u8,
        service_choice: ConfirmedServiceChoice,
    },

    /// Unsegmented complex acknowledgment
    ComplexAck {
        invoke_id: u8,
        service_choice: ConfirmedServiceChoice,
        service_data: Vec<u8>,
    },

    SegmentAck {
        negative: bool,
        server: bool,
        invoke_id: u8,
        sequence_number: u8,
        window_size: u8,
    },

    /// Error PDU, class and code travel as enumerated application tags
    Error {
        invoke_id: u8,
        service_choice: ConfirmedServiceChoice,
        error_class: ErrorClass,
        error_code: ErrorCode,
    },

    Reject {
        invoke_id: u8,
        reject_reason: RejectReason,
    },

    Abort {
        server: bool,
        invoke_id: u8,
        abort_reason: AbortReason,
    },
}

/// Maximum segments that can be accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxSegments {
    Unspecified = 0,
    Two = 1,
    Four = 2,
    Eight = 3,
    Sixteen = 4,
    ThirtyTwo = 5,
    SixtyFour = 6,
    GreaterThan64 = 7,
}

impl From<u8> for MaxSegments {
    fn from(value: u8) -> Self {
        match value & 0x07 {
            1 => MaxSegments::Two,
            2 => MaxSegments::Four,
            3 => MaxSegments::Eight,
            4 => MaxSegments::Sixteen,
            5 => MaxSegments::ThirtyTwo,
            6 => MaxSegments::SixtyFour,
            7 => MaxSegments::GreaterThan64,
            _ => MaxSegments::Unspecified,
        }
    }
}

/// Maximum APDU size that can be accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxApduSize {
    Up50 = 0,
    Up128 = 1,
    Up206 = 2,
    Up480 = 3,
    Up1024 = 4,
    Up1476 = 5,
}

impl MaxApduSize {
    /// Get the actual size in bytes
    pub fn size(&self) -> usize {
        match self {
            MaxApduSize::Up50 => 50,
            MaxApduSize::Up128 => 128,
            MaxApduSize::Up206 => 206,
            MaxApduSize::Up480 => 480,
            MaxApduSize::Up1024 => 1024,
            MaxApduSize::Up1476 => 1476,
        }
    }
}

impl From<u8> for MaxApduSize {
    fn from(value: u8) -> Self {
        match value & 0x0F {
            1 => MaxApduSize::Up128,
            2 => MaxApduSize::Up206,
            3 => MaxApduSize::Up480,
            4 => MaxApduSize::Up1024,
            5 => MaxApduSize::Up1476,
            _ => MaxApduSize::Up50,
        }
    }
}

fn too_short(what: &str) -> ApplicationError {
    ApplicationError::InvalidApdu(format!("{} too short", what))
}

impl Apdu {
    /// Error PDU answering `service_choice`
    pub fn error(
        invoke_id: u8,
        service_choice: ConfirmedServiceChoice,
        error_class: ErrorClass,
        error_code: ErrorCode,
    ) -> Self {
        Apdu::Error {
            invoke_id,
            service_choice,
            error_class,
            error_code,
        }
    }

    /// Reject PDU with the given reason
    pub fn reject(invoke_id: u8, reject_reason: RejectReason) -> Self {
        Apdu::Reject {
            invoke_id,
            reject_reason,
        }
    }

    /// Server side abort
    pub fn abort(invoke_id: u8, abort_reason: AbortReason) -> Self {
        Apdu::Abort {
            server: true,
            invoke_id,
            abort_reason,
        }
    }

    /// PDU type of this APDU
    pub fn apdu_type(&self) -> ApduType {
        match self {
            Apdu::ConfirmedRequest { .. } => ApduType::ConfirmedRequest,
            Apdu::UnconfirmedRequest { .. } => ApduType::UnconfirmedRequest,
            Apdu::SimpleAck { .. } => ApduType::SimpleAck,
            Apdu::ComplexAck { .. } => ApduType::ComplexAck,
            Apdu::SegmentAck { .. } => ApduType::SegmentAck,
            Apdu::Error { .. } => ApduType::Error,
            Apdu::Reject { .. } => ApduType::Reject,
            Apdu::Abort { .. } => ApduType::Abort,
        }
    }

    /// Encode APDU to bytes
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let pdu_type = (self.apdu_type() as u8) << 4;

        match self {
            Apdu::ConfirmedRequest {
                segmented,
                more_follows,
                segmented_response_accepted,
                max_segments,
                max_response_size,
                invoke_id,
                sequence_number,
                proposed_window_size,
                service_choice,
                service_data,
            } => {
                let mut header = pdu_type;
                if *segmented {
                    header |= 0x08;
                }
                if *more_follows {
                    header |= 0x04;
                }
                if *segmented_response_accepted {
                    header |= 0x02;
                }
                buffer.push(header);
                buffer.push(((*max_segments as u8) << 4) | (*max_response_size as u8));
                buffer.push(*invoke_id);

                if *segmented {
                    buffer.push(sequence_number.unwrap_or(0));
                    buffer.push(proposed_window_size.unwrap_or(1));
                }

                buffer.push(*service_choice as u8);
                buffer.extend_from_slice(service_data);
            }

            Apdu::UnconfirmedRequest {
                service_choice,
                service_data,
            } => {
                buffer.push(pdu_type);
                buffer.push(*service_choice as u8);
                buffer.extend_from_slice(service_data);
            }

            Apdu::SimpleAck {
                invoke_id,
                service_choice,
            } => {
                buffer.extend_from_slice(&[pdu_type, *invoke_id, *service_choice as u8]);
            }

            Apdu::ComplexAck {
                invoke_id,
                service_choice,
                service_data,
            } => {
                buffer.extend_from_slice(&[pdu_type, *invoke_id, *service_choice as u8]);
                buffer.extend_from_slice(service_data);
            }

            Apdu::SegmentAck {
                negative,
                server,
                invoke_id,
                sequence_number,
                window_size,
            } => {
                let mut header = pdu_type;
                if *negative {
                    header |= 0x02;
                }
                if *server {
                    header |= 0x01;
                }
                buffer.extend_from_slice(&[header, *invoke_id, *sequence_number, *window_size]);
            }

            Apdu::Error {
                invoke_id,
                service_choice,
                error_class,
                error_code,
            } => {
                buffer.extend_from_slice(&[pdu_type, *invoke_id, *service_choice as u8]);
                encode_enumerated(&mut buffer, u16::from(*error_class).into())?;
                encode_enumerated(&mut buffer, u16::from(*error_code).into())?;
            }

            Apdu::Reject {
                invoke_id,
                reject_reason,
            } => {
                buffer.extend_from_slice(&[pdu_type, *invoke_id, *reject_reason as u8]);
            }

            Apdu::Abort {
                server,
                invoke_id,
                abort_reason,
            } => {
                let header = if *server { pdu_type | 0x01 } else { pdu_type };
                buffer.extend_from_slice(&[header, *invoke_id, *abort_reason as u8]);
            }
        }

        Ok(buffer)
    }

    /// Decode APDU from bytes
    pub fn decode(data: &[u8]) -> Result<Self> {
        let Some(&header) = data.first() else {
            return Err(ApplicationError::InvalidApdu("empty APDU".to_string()));
        };

        match ApduType::try_from(header >> 4)? {
            ApduType::ConfirmedRequest => {
                if data.len() < 4 {
                    return Err(too_short("confirmed request"));
                }

                let segmented = (header & 0x08) != 0;
                let invoke_id = data[2];
                let mut pos = 3;

                let (sequence_number, proposed_window_size) = if segmented {
                    let window = data.get(pos..pos + 2).ok_or_else(|| too_short("segmented request"))?;
                    pos += 2;
                    (Some(window[0]), Some(window[1]))
                } else {
                    (None, None)
                };

                let raw_choice = *data.get(pos).ok_or_else(|| {
                    ApplicationError::InvalidApdu("missing service choice".to_string())
                })?;
                let service_choice = ConfirmedServiceChoice::try_from(raw_choice).map_err(|_| {
                    ApplicationError::UnrecognizedService {
                        invoke_id,
                        service_choice: raw_choice,
                    }
                })?;

                Ok(Apdu::ConfirmedRequest {
                    segmented,
                    more_follows: (header & 0x04) != 0,
                    segmented_response_accepted: (header & 0x02) != 0,
                    max_segments: MaxSegments::from(data[1] >> 4),
                    max_response_size: MaxApduSize::from(data[1]),
                    invoke_id,
                    sequence_number,
                    proposed_window_size,
                    service_choice,
                    service_data: data[pos + 1..].to_vec(),
                })
            }

            ApduType::UnconfirmedRequest => {
                if data.len() < 2 {
                    return Err(too_short("unconfirmed request"));
                }
                let service_choice = UnconfirmedServiceChoice::try_from(data[1])
                    .map_err(|_| ApplicationError::UnrecognizedUnconfirmedService(data[1]))?;

                Ok(Apdu::UnconfirmedRequest {
                    service_choice,
                    service_data: data[2..].to_vec(),
                })
            }

            ApduType::SimpleAck => {
                if data.len() < 3 {
                    return Err(too_short("SimpleAck"));
                }
                Ok(Apdu::SimpleAck {
                    invoke_id: data[1],
                    service_choice: confirmed_choice(data[1], data[2])?,
                })
            }

            ApduType::ComplexAck => {
                if data.len() < 3 {
                    return Err(too_short("ComplexAck"));
                }
                if (header & 0x08) != 0 {
                    return Err(ApplicationError::InvalidApdu(
                        "segmented ComplexAck".to_string(),
                    ));
                }
                Ok(Apdu::ComplexAck {
                    invoke_id: data[1],
                    service_choice: confirmed_choice(data[1], data[2])?,
                    service_data: data[3..].to_vec(),
                })
            }

            ApduType::SegmentAck => {
                if data.len() < 4 {
                    return Err(too_short("SegmentAck"));
                }
                Ok(Apdu::SegmentAck {
                    negative: (header & 0x02) != 0,
                    server: (header & 0x01) != 0,
                    invoke_id: data[1],
                    sequence_number: data[2],
                    window_size: data[3],
                })
            }

            ApduType::Error => {
                if data.len() < 5 {
                    return Err(too_short("Error PDU"));
                }
                let (error_class, consumed) = decode_enumerated(&data[3..])?;
                let (error_code, _) = decode_enumerated(&data[3 + consumed..])?;
                let narrow = |value: u32| {
                    u16::try_from(value).map_err(|_| EncodingError::ValueOutOfRange)
                };

                Ok(Apdu::Error {
                    invoke_id: data[1],
                    service_choice: confirmed_choice(data[1], data[2])?,
                    error_class: narrow(error_class)?.into(),
                    error_code: narrow(error_code)?.into(),
                })
            }

            ApduType::Reject => {
                if data.len() < 3 {
                    return Err(too_short("Reject PDU"));
                }
                Ok(Apdu::Reject {
                    invoke_id: data[1],
                    reject_reason: data[2].into(),
                })
            }

            ApduType::Abort => {
                if data.len() < 3 {
                    return Err(too_short("Abort PDU"));
                }
                Ok(Apdu::Abort {
                    server: (header & 0x01) != 0,
                    invoke_id: data[1],
                    abort_reason: data[2].into(),
                })
            }
        }
    }
}

fn confirmed_choice(invoke_id: u8, raw: u8) -> Result<ConfirmedServiceChoice> {
    ConfirmedServiceChoice::try_from(raw).map_err(|_| ApplicationError::UnrecognizedService {
        invoke_id,
        service_choice: raw,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconfirmed_request_encode_decode() {
        let apdu = Apdu::UnconfirmedRequest {
            service_choice: UnconfirmedServiceChoice::WhoIs,
            service_data: vec![0x09, 0x7B, 0x19, 0x7B], // Range 123-123
        };

        let encoded = apdu.encode().unwrap();
        assert_eq!(encoded[..2], [0x10, 0x08]);
        assert_eq!(Apdu::decode(&encoded).unwrap(), apdu);
    }

    #[test]
    fn test_simple_ack_encode() {
        let apdu = Apdu::SimpleAck {
            invoke_id: 42,
            service_choice: ConfirmedServiceChoice::WriteProperty,
        };
        assert_eq!(apdu.encode().unwrap(), vec![0x20, 42, 15]);
    }

    #[test]
    fn test_confirmed_request_encode_decode() {
        let apdu = Apdu::ConfirmedRequest {
            segmented: false,
            more_follows: false,
            segmented_response_accepted: true,
            max_segments: MaxSegments::Unspecified,
            max_response_size: MaxApduSize::Up1476,
            invoke_id: 123,
            sequence_number: None,
            proposed_window_size: None,
            service_choice: ConfirmedServiceChoice::ReadProperty,
            service_data: vec![0x0C, 0x02, 0x00, 0x00, 0x08, 0x19, 0x55],
        };

        let encoded = apdu.encode().unwrap();
        assert_eq!(encoded[..4], [0x02, 0x05, 123, 12]);
        assert_eq!(Apdu::decode(&encoded).unwrap(), apdu);
    }

    #[test]
    fn test_segmented_request_keeps_window() {
        let data = [0x08, 0x05, 7, 0, 4, 12, 0x0C];
        match Apdu::decode(&data).unwrap() {
            Apdu::ConfirmedRequest {
                segmented,
                invoke_id,
                sequence_number,
                proposed_window_size,
                ..
            } => {
                assert!(segmented);
                assert_eq!(invoke_id, 7);
                assert_eq!(sequence_number, Some(0));
                assert_eq!(proposed_window_size, Some(4));
            }
            other => panic!("Expected ConfirmedRequest, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_confirmed_service_keeps_invoke_id() {
        let data = [0x00, 0x05, 9, 99];
        assert_eq!(
            Apdu::decode(&data),
            Err(ApplicationError::UnrecognizedService {
                invoke_id: 9,
                service_choice: 99
            })
        );
    }

    #[test]
    fn test_error_pdu_uses_application_tags() {
        let apdu = Apdu::error(
            5,
            ConfirmedServiceChoice::ReadProperty,
            ErrorClass::Object,
            ErrorCode::UnknownObject,
        );
        let encoded = apdu.encode().unwrap();
        assert_eq!(encoded, vec![0x50, 5, 12, 0x91, 1, 0x91, 31]);
        assert_eq!(Apdu::decode(&encoded).unwrap(), apdu);
    }

    #[test]
    fn test_reject_and_abort() {
        let reject = Apdu::reject(3, RejectReason::UnrecognizedService);
        assert_eq!(reject.encode().unwrap(), vec![0x60, 3, 9]);

        let abort = Apdu::abort(4, AbortReason::SegmentationNotSupported);
        let encoded = abort.encode().unwrap();
        assert_eq!(encoded, vec![0x71, 4, 4]);
        assert_eq!(Apdu::decode(&encoded).unwrap(), abort);
    }

    #[test]
    fn test_invalid_apdus() {
        assert!(matches!(Apdu::decode(&[]), Err(ApplicationError::InvalidApdu(_))));
        assert_eq!(
            Apdu::decode(&[0x90]),
            Err(ApplicationError::UnsupportedApduType(9))
        );
        assert!(Apdu::decode(&[0x00, 0x05]).is_err());
    }

    #[test]
    fn test_max_apdu_size() {
        assert_eq!(MaxApduSize::Up50.size(), 50);
        assert_eq!(MaxApduSize::from(0x05), MaxApduSize::Up1476);
        assert_eq!(MaxApduSize::Up1476.size(), 1476);
    }
}
