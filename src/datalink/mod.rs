//! BACnet Data Link Layer
//!
//! The simulator speaks BACnet/IP only (ASHRAE 135 Annex J). This module holds
//! the layer's error type; framing lives in [`bip`].

use thiserror::Error;

pub mod bip;

pub use bip::{BvlcFrame, BvlcFunction, BvlcHeader, BACNET_IP_PORT};

pub type Result<T> = std::result::Result<T, DataLinkError>;

/// Errors raised while framing or moving datagrams
#[derive(Debug, Error)]
pub enum DataLinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Frame does not follow the BVLL layout
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
    #[error("unsupported BVLC function 0x{0:02X}")]
    UnsupportedFunction(u8),
    #[error("BVLC length {declared} does not match datagram length {actual}")]
    LengthMismatch { declared: usize, actual: usize },
    #[error("frame of {0} bytes exceeds the BVLC length field")]
    FrameTooLarge(usize),
}
