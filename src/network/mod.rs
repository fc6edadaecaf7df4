//! BACnet Network Layer Module
//!
//! The simulator is a plain device behind no router, so the network layer only
//! frames NPDUs. It still honours routed requests: when a request carries a
//! source specifier (SNET/SADR) the reply is addressed back to it through the
//! router that delivered it.
//!
//! # Network Layer Protocol Data Unit (NPDU)
//!
//! The NPDU contains:
//! - Protocol version
//! - Control information (priority, data expecting reply, etc.)
//! - Destination network address (DNET, DADR)
//! - Source network address (SNET, SADR)
//! - Hop count for routing
//!
//! # Example
//!
//! ```
//! use bacnet_sim::network::Npdu;
//!
//! let npdu = Npdu::global_broadcast();
//! assert_eq!(npdu.encode(), vec![0x01, 0x20, 0xFF, 0xFF, 0x00, 0xFF]);
//! ```

use thiserror::Error;

pub type Result<T> = std::result::Result<T, NetworkError>;

/// Errors that can occur in network operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("invalid NPDU: {0}")]
    InvalidNpdu(String),
    #[error("unsupported NPDU version {0}")]
    UnsupportedVersion(u8),
}

/// NPDU control flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NpduControl {
    /// Network layer message
    pub network_message: bool,
    /// Destination specifier present
    pub destination_present: bool,
    /// Source specifier present
    pub source_present: bool,
    /// Data expecting reply
    pub expecting_reply: bool,
    /// Network priority (0-3)
    pub priority: u8,
}

impl NpduControl {
    /// Create control byte from flags
    pub fn to_byte(&self) -> u8 {
        let mut byte = 0u8;
        if self.network_message {
            byte |= 0x80;
        }
        if self.destination_present {
            byte |= 0x20;
        }
        if self.source_present {
            byte |= 0x08;
        }
        if self.expecting_reply {
            byte |= 0x04;
        }
        byte |= self.priority & 0x03;
        byte
    }

    /// Parse control byte into flags
    pub fn from_byte(byte: u8) -> Self {
        Self {
            network_message: (byte & 0x80) != 0,
            destination_present: (byte & 0x20) != 0,
            source_present: (byte & 0x08) != 0,
            expecting_reply: (byte & 0x04) != 0,
            priority: byte & 0x03,
        }
    }
}

/// Network address (network number + MAC address)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkAddress {
    /// Network number (0 = local network, 65535 = broadcast)
    pub network: u16,
    /// MAC address on that network, empty for a broadcast
    pub address: Vec<u8>,
}

impl NetworkAddress {
    /// Create a network address
    pub fn new(network: u16, address: Vec<u8>) -> Self {
        Self { network, address }
    }

    /// Check if this is a broadcast address
    pub fn is_broadcast(&self) -> bool {
        self.network == 0xFFFF
    }
}

/// Network Protocol Data Unit (NPDU)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Npdu {
    /// Protocol version (always 1)
    pub version: u8,
    pub control: NpduControl,
    pub destination: Option<NetworkAddress>,
    pub source: Option<NetworkAddress>,
    /// Hop count (only present if destination is present)
    pub hop_count: Option<u8>,
}

impl Default for Npdu {
    fn default() -> Self {
        Self::new()
    }
}

impl Npdu {
    /// Local, non-routed NPDU
    pub fn new() -> Self {
        Self {
            version: 1,
            control: NpduControl::default(),
            destination: None,
            source: None,
            hop_count: None,
        }
    }

    /// NPDU addressed to every network
    pub fn global_broadcast() -> Self {
        Self {
            version: 1,
            control: NpduControl {
                destination_present: true,
                ..Default::default()
            },
            destination: Some(NetworkAddress::new(0xFFFF, Vec::new())),
            source: None,
            hop_count: Some(255),
        }
    }

    /// NPDU for a reply to `request`
    ///
    /// A request that came through a router carries its originator in the
    /// source specifier; the reply names it as destination so the router can
    /// forward it.
    pub fn reply_to(request: &Npdu) -> Self {
        match &request.source {
            Some(source) => Self {
                version: 1,
                control: NpduControl {
                    destination_present: true,
                    priority: request.control.priority,
                    ..Default::default()
                },
                destination: Some(source.clone()),
                source: None,
                hop_count: Some(255),
            },
            None => Self {
                control: NpduControl {
                    priority: request.control.priority,
                    ..Default::default()
                },
                ..Self::new()
            },
        }
    }

    /// Check if this is a network layer message
    pub fn is_network_message(&self) -> bool {
        self.control.network_message
    }

    /// Whether a device on the local network should process this NPDU
    pub fn is_for_local_device(&self) -> bool {
        self.destination
            .as_ref()
            .map_or(true, NetworkAddress::is_broadcast)
    }

    /// Encode NPDU to bytes
    pub fn encode(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(8);
        buffer.push(self.version);

        // presence flags follow the specifiers actually set
        let control = NpduControl {
            destination_present: self.destination.is_some(),
            source_present: self.source.is_some(),
            ..self.control
        };
        buffer.push(control.to_byte());

        for address in [&self.destination, &self.source].into_iter().flatten() {
            buffer.extend_from_slice(&address.network.to_be_bytes());
            buffer.push(address.address.len() as u8);
            buffer.extend_from_slice(&address.address);
        }

        if self.destination.is_some() {
            buffer.push(self.hop_count.unwrap_or(255));
        }

        buffer
    }

    /// Decode NPDU from bytes, returning it and the header length
    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        if data.len() < 2 {
            return Err(NetworkError::InvalidNpdu("NPDU too short".to_string()));
        }

        let version = data[0];
        if version != 1 {
            return Err(NetworkError::UnsupportedVersion(version));
        }

        let control = NpduControl::from_byte(data[1]);
        let mut pos = 2;

        let destination = if control.destination_present {
            Some(decode_address(data, &mut pos, "destination")?)
        } else {
            None
        };

        let source = if control.source_present {
            Some(decode_address(data, &mut pos, "source")?)
        } else {
            None
        };

        let hop_count = if destination.is_some() {
            let hop_count = *data
                .get(pos)
                .ok_or_else(|| NetworkError::InvalidNpdu("missing hop count".to_string()))?;
            pos += 1;
            Some(hop_count)
        } else {
            None
        };

        Ok((
            Npdu {
                version,
                control,
                destination,
                source,
                hop_count,
            },
            pos,
        ))
    }
}

fn decode_address(data: &[u8], pos: &mut usize, which: &str) -> Result<NetworkAddress> {
    let header = data
        .get(*pos..*pos + 3)
        .ok_or_else(|| NetworkError::InvalidNpdu(format!("invalid {} address", which)))?;
    let network = u16::from_be_bytes([header[0], header[1]]);
    let length = header[2] as usize;
    *pos += 3;

    let address = data
        .get(*pos..*pos + length)
        .ok_or_else(|| NetworkError::InvalidNpdu(format!("invalid {} address length", which)))?
        .to_vec();
    *pos += length;

    Ok(NetworkAddress::new(network, address))
}
