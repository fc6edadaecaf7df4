//! BACnet/IP Data Link Implementation
//!
//! BACnet/IP carries NPDUs in UDP datagrams on port 47808 (0xBAC0), each
//! prefixed by a BVLC (BACnet Virtual Link Control) header:
//!
//! ```text
//! +------+----------+--------+------------------------+-------+
//! | 0x81 | function | length | [originating address]  | NPDU  |
//! +------+----------+--------+------------------------+-------+
//!   1        1         2       6 (Forwarded-NPDU only)
//! ```
//!
//! Broadcast distribution and foreign device registration are a BBMD's job
//! and are decoded only to be ignored.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use bytes::{BufMut, Bytes, BytesMut};

use super::{DataLinkError, Result};

/// BACnet/IP well-known port number (0xBAC0)
pub const BACNET_IP_PORT: u16 = 47808;

/// BVLC type octet for BACnet/IP
pub const BVLC_TYPE_BACNET_IP: u8 = 0x81;

pub const BVLC_HEADER_LEN: usize = 4;

/// BVLC (BACnet Virtual Link Control) message types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BvlcFunction {
    BvlcResult = 0x00,
    WriteBroadcastDistributionTable = 0x01,
    ReadBroadcastDistributionTable = 0x02,
    ReadBroadcastDistributionTableAck = 0x03,
    /// Forwarded-NPDU, carries the originator's B/IP address
    ForwardedNpdu = 0x04,
    RegisterForeignDevice = 0x05,
    ReadForeignDeviceTable = 0x06,
    ReadForeignDeviceTableAck = 0x07,
    DeleteForeignDeviceTableEntry = 0x08,
    DistributeBroadcastToNetwork = 0x09,
    OriginalUnicastNpdu = 0x0A,
    OriginalBroadcastNpdu = 0x0B,
    SecureBvll = 0x0C,
}

impl TryFrom<u8> for BvlcFunction {
    type Error = DataLinkError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x00 => Ok(Self::BvlcResult),
            0x01 => Ok(Self::WriteBroadcastDistributionTable),
            0x02 => Ok(Self::ReadBroadcastDistributionTable),
            0x03 => Ok(Self::ReadBroadcastDistributionTableAck),
            0x04 => Ok(Self::ForwardedNpdu),
            0x05 => Ok(Self::RegisterForeignDevice),
            0x06 => Ok(Self::ReadForeignDeviceTable),
            0x07 => Ok(Self::ReadForeignDeviceTableAck),
            0x08 => Ok(Self::DeleteForeignDeviceTableEntry),
            0x09 => Ok(Self::DistributeBroadcastToNetwork),
            0x0A => Ok(Self::OriginalUnicastNpdu),
            0x0B => Ok(Self::OriginalBroadcastNpdu),
            0x0C => Ok(Self::SecureBvll),
            other => Err(DataLinkError::UnsupportedFunction(other)),
        }
    }
}

impl BvlcFunction {
    /// Whether frames of this function carry an NPDU for a device
    pub fn carries_npdu(self) -> bool {
        matches!(
            self,
            Self::OriginalUnicastNpdu
                | Self::OriginalBroadcastNpdu
                | Self::ForwardedNpdu
                | Self::DistributeBroadcastToNetwork
        )
    }
}

/// BVLC header structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BvlcHeader {
    /// BVLC type (always 0x81 for BACnet/IP)
    pub bvlc_type: u8,
    pub function: BvlcFunction,
    /// Total message length including BVLC header
    pub length: u16,
}

impl BvlcHeader {
    pub fn new(function: BvlcFunction, length: u16) -> Self {
        Self {
            bvlc_type: BVLC_TYPE_BACNET_IP,
            function,
            length,
        }
    }

    pub fn encode(&self, buffer: &mut BytesMut) {
        buffer.put_u8(self.bvlc_type);
        buffer.put_u8(self.function as u8);
        buffer.put_u16(self.length);
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < BVLC_HEADER_LEN {
            return Err(DataLinkError::InvalidFrame("BVLC header too short".to_string()));
        }
        if data[0] != BVLC_TYPE_BACNET_IP {
            return Err(DataLinkError::InvalidFrame(format!(
                "BVLC type 0x{:02X} is not BACnet/IP",
                data[0]
            )));
        }

        Ok(BvlcHeader {
            bvlc_type: data[0],
            function: BvlcFunction::try_from(data[1])?,
            length: u16::from_be_bytes([data[2], data[3]]),
        })
    }
}

/// One BACnet/IP datagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BvlcFrame {
    pub function: BvlcFunction,
    /// Original sender of a Forwarded-NPDU
    pub originating_address: Option<SocketAddrV4>,
    /// Payload after the BVLL, the NPDU for NPDU-carrying functions
    pub payload: Bytes,
}

impl BvlcFrame {
    pub fn unicast(npdu: impl Into<Bytes>) -> Self {
        Self {
            function: BvlcFunction::OriginalUnicastNpdu,
            originating_address: None,
            payload: npdu.into(),
        }
    }

    pub fn broadcast(npdu: impl Into<Bytes>) -> Self {
        Self {
            function: BvlcFunction::OriginalBroadcastNpdu,
            originating_address: None,
            payload: npdu.into(),
        }
    }

    /// Encode to a datagram
    pub fn encode(&self) -> Result<Bytes> {
        let address_len = if self.originating_address.is_some() { 6 } else { 0 };
        let total = BVLC_HEADER_LEN + address_len + self.payload.len();
        let length = u16::try_from(total).map_err(|_| DataLinkError::FrameTooLarge(total))?;

        let mut buffer = BytesMut::with_capacity(total);
        BvlcHeader::new(self.function, length).encode(&mut buffer);
        if let Some(address) = self.originating_address {
            buffer.put_slice(&address.ip().octets());
            buffer.put_u16(address.port());
        }
        buffer.put_slice(&self.payload);
        Ok(buffer.freeze())
    }

    /// Decode a received datagram
    pub fn decode(data: &[u8]) -> Result<Self> {
        let header = BvlcHeader::decode(data)?;
        let declared = header.length as usize;
        if declared != data.len() {
            return Err(DataLinkError::LengthMismatch {
                declared,
                actual: data.len(),
            });
        }

        let (originating_address, payload_start) = if header.function == BvlcFunction::ForwardedNpdu {
            let address = data
                .get(BVLC_HEADER_LEN..BVLC_HEADER_LEN + 6)
                .ok_or_else(|| DataLinkError::InvalidFrame("truncated Forwarded-NPDU".to_string()))?;
            let ip = Ipv4Addr::new(address[0], address[1], address[2], address[3]);
            let port = u16::from_be_bytes([address[4], address[5]]);
            (Some(SocketAddrV4::new(ip, port)), BVLC_HEADER_LEN + 6)
        } else {
            (None, BVLC_HEADER_LEN)
        };

        Ok(Self {
            function: header.function,
            originating_address,
            payload: Bytes::copy_from_slice(&data[payload_start..]),
        })
    }

    /// Where a reply to this frame goes: the originator of a forwarded
    /// frame, otherwise the datagram's sender
    pub fn reply_address(&self, sender: SocketAddr) -> SocketAddr {
        self.originating_address
            .map(SocketAddr::V4)
            .unwrap_or(sender)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bvlc_header() {
        let mut buffer = BytesMut::new();
        BvlcHeader::new(BvlcFunction::OriginalBroadcastNpdu, 12).encode(&mut buffer);
        assert_eq!(&buffer[..], &[0x81, 0x0B, 0x00, 0x0C]);

        let decoded = BvlcHeader::decode(&buffer).unwrap();
        assert_eq!(decoded.function, BvlcFunction::OriginalBroadcastNpdu);
        assert_eq!(decoded.length, 12);
    }

    #[test]
    fn test_unicast_frame() {
        let frame = BvlcFrame::unicast(vec![0x01, 0x00, 0x30, 0x01, 0x0C]);
        let encoded = frame.encode().unwrap();
        assert_eq!(&encoded[..4], &[0x81, 0x0A, 0x00, 0x09]);
        assert_eq!(BvlcFrame::decode(&encoded).unwrap(), frame);
    }

    #[test]
    fn test_forwarded_npdu_reply_address() {
        let data = [
            0x81, 0x04, 0x00, 0x0C, 192, 168, 1, 20, 0xBA, 0xC0, 0x01, 0x00,
        ];
        let frame = BvlcFrame::decode(&data).unwrap();
        let originator = SocketAddrV4::new(Ipv4Addr::new(192, 168, 1, 20), 47808);
        assert_eq!(frame.originating_address, Some(originator));
        assert_eq!(&frame.payload[..], &[0x01, 0x00]);

        let bbmd: SocketAddr = "10.0.0.1:47808".parse().unwrap();
        assert_eq!(frame.reply_address(bbmd), SocketAddr::V4(originator));
        assert_eq!(BvlcFrame::unicast(vec![]).reply_address(bbmd), bbmd);
    }

    #[test]
    fn test_invalid_frames() {
        assert!(matches!(
            BvlcFrame::decode(&[0x82, 0x0A, 0x00, 0x04]),
            Err(DataLinkError::InvalidFrame(_))
        ));
        assert!(matches!(
            BvlcFrame::decode(&[0x81, 0x0A, 0x00, 0x10, 0x01]),
            Err(DataLinkError::LengthMismatch { declared: 16, actual: 5 })
        ));
        assert!(matches!(
            BvlcFrame::decode(&[0x81, 0x0F, 0x00, 0x04]),
            Err(DataLinkError::UnsupportedFunction(0x0F))
        ));
        assert!(matches!(
            BvlcFrame::decode(&[0x81, 0x04, 0x00, 0x06, 1, 2]),
            Err(DataLinkError::InvalidFrame(_))
        ));
    }

    #[test]
    fn test_npdu_carrying_functions() {
        assert!(BvlcFunction::OriginalUnicastNpdu.carries_npdu());
        assert!(BvlcFunction::ForwardedNpdu.carries_npdu());
        assert!(!BvlcFunction::RegisterForeignDevice.carries_npdu());
    }
}
