//! BACnet/IP Transport
//!
//! A tokio UDP socket carrying BVLC frames. The socket is created through
//! `socket2` so that `SO_REUSEADDR` and `SO_BROADCAST` are set before binding,
//! which lets the simulator share port 47808 with other BACnet tools on the
//! same host.
//!
//! # Example
//!
//! ```no_run
//! use bacnet_sim::transport::{BacnetIpConfig, UdpTransport};
//!
//! # async fn run() -> bacnet_sim::transport::Result<()> {
//! let transport = UdpTransport::bind(&BacnetIpConfig::default())?;
//! println!("listening on {}", transport.local_addr()?);
//! # Ok(())
//! # }
//! ```

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, trace};
use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tokio::net::UdpSocket;

use crate::datalink::{BvlcFrame, DataLinkError, BACNET_IP_PORT};
use crate::util::frame_trace;

pub type Result<T> = std::result::Result<T, TransportError>;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("datalink error: {0}")]
    DataLink(#[from] DataLinkError),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// BACnet/IP transport configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BacnetIpConfig {
    /// Local bind address
    pub bind_address: SocketAddr,
    /// Where broadcasts go, detected from the interfaces when `None`
    pub broadcast_address: Option<SocketAddr>,
    /// Receive buffer size
    pub buffer_size: usize,
}

impl Default for BacnetIpConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), BACNET_IP_PORT),
            broadcast_address: None,
            buffer_size: 1500,
        }
    }
}

/// Directed broadcast address of the first non-loopback IPv4 interface,
/// falling back to the limited broadcast address
pub fn detect_broadcast_address(port: u16) -> SocketAddr {
    let detected = if_addrs::get_if_addrs()
        .unwrap_or_default()
        .into_iter()
        .filter(|iface| !iface.is_loopback())
        .find_map(|iface| match iface.addr {
            if_addrs::IfAddr::V4(v4) => v4.broadcast,
            _ => None,
        });

    let ip = detected.unwrap_or(Ipv4Addr::BROADCAST);
    SocketAddr::new(IpAddr::V4(ip), port)
}

/// UDP socket speaking BVLC
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    broadcast_address: SocketAddr,
    buffer_size: usize,
}

impl UdpTransport {
    /// Bind the socket; must run inside a tokio runtime
    pub fn bind(config: &BacnetIpConfig) -> Result<Self> {
        if config.buffer_size == 0 {
            return Err(TransportError::InvalidConfiguration(
                "receive buffer size must be positive".to_string(),
            ));
        }

        let socket = Socket::new(
            Domain::for_address(config.bind_address),
            Type::DGRAM,
            Some(Protocol::UDP),
        )?;
        socket.set_reuse_address(true)?;
        socket.set_broadcast(true)?;
        socket.set_nonblocking(true)?;
        socket.bind(&config.bind_address.into())?;

        let socket = UdpSocket::from_std(socket.into())?;
        let broadcast_address = config
            .broadcast_address
            .unwrap_or_else(|| detect_broadcast_address(config.bind_address.port()));
        debug!(
            "BACnet/IP socket bound to {}, broadcasting to {}",
            socket.local_addr()?,
            broadcast_address
        );

        Ok(Self {
            socket,
            broadcast_address,
            buffer_size: config.buffer_size,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub fn broadcast_address(&self) -> SocketAddr {
        self.broadcast_address
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Wait for the next datagram
    pub async fn recv_from(&self, buffer: &mut [u8]) -> Result<(usize, SocketAddr)> {
        let (len, source) = self.socket.recv_from(buffer).await?;
        trace!("<- {} {}", source, frame_trace(&buffer[..len]));
        Ok((len, source))
    }

    pub async fn send_frame(&self, frame: &BvlcFrame, destination: SocketAddr) -> Result<()> {
        let data = frame.encode()?;
        trace!("-> {} {}", destination, frame_trace(&data));
        self.socket.send_to(&data, destination).await?;
        Ok(())
    }

    /// Send an NPDU as Original-Broadcast-NPDU
    pub async fn broadcast(&self, npdu: impl Into<Bytes>) -> Result<()> {
        self.send_frame(&BvlcFrame::broadcast(npdu), self.broadcast_address)
            .await
    }
}

/// Something that can put an I-Am on the wire
#[async_trait]
pub trait Announcer: Send + Sync {
    async fn announce(&self) -> crate::Result<()>;
}
