//! BACnet/IP responder.
//!
//! [`Responder`] turns one received datagram into at most one reply and holds
//! no state of its own besides the dispatcher; the store lock is only taken
//! inside the dispatcher calls. [`BacnetServer`] drives it from a UDP socket
//! and sends the periodic I-Am announcement.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, info, warn};
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::app::{Apdu, ApplicationError, MaxApduSize};
use crate::datalink::BvlcFrame;
use crate::network::Npdu;
use crate::object::device::MAX_APDU_LENGTH_ACCEPTED;
use crate::object::{PointStore, PropertyDispatcher, Segmentation, WriteAck};
use crate::service::{
    AbortReason, ConfirmedServiceChoice, IAmRequest, ReadPropertyAck, ReadPropertyRequest,
    RejectReason, UnconfirmedServiceChoice, WhoIsRequest, WritePropertyRequest,
};
use crate::transport::{Announcer, UdpTransport};
use crate::Result;

/// Delay before the first announcement after start-up
pub const ANNOUNCE_INITIAL_DELAY: Duration = Duration::from_secs(2);

pub const DEFAULT_ANNOUNCE_INTERVAL: Duration = Duration::from_secs(30);

/// What to send in response to a datagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Unicast {
        frame: BvlcFrame,
        destination: SocketAddr,
    },
    /// NPDU to send as Original-Broadcast-NPDU
    Broadcast(Bytes),
}

/// Answers Who-Is, ReadProperty and WriteProperty for the simulated device
#[derive(Debug, Clone)]
pub struct Responder {
    dispatcher: PropertyDispatcher,
}

impl Responder {
    pub fn new(dispatcher: PropertyDispatcher) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &PropertyDispatcher {
        &self.dispatcher
    }

    pub fn store(&self) -> &Arc<PointStore> {
        self.dispatcher.store()
    }

    /// Global broadcast I-Am NPDU for the current device record
    pub fn i_am_npdu(&self) -> Result<Bytes> {
        let device = self.store().get_device();
        let i_am = IAmRequest::new(
            device.id,
            MAX_APDU_LENGTH_ACCEPTED,
            Segmentation::NoSegmentation,
            device.vendor_id,
        );
        let mut service_data = Vec::new();
        i_am.encode(&mut service_data)?;

        let apdu = Apdu::UnconfirmedRequest {
            service_choice: UnconfirmedServiceChoice::IAm,
            service_data,
        };
        let mut npdu = Npdu::global_broadcast().encode();
        npdu.extend_from_slice(&apdu.encode()?);
        Ok(Bytes::from(npdu))
    }

    /// Process one received datagram
    ///
    /// `Ok(None)` means the datagram needs no answer: it was not for this
    /// device, it was a network layer message, or the device is offline.
    pub fn handle_datagram(&self, data: &[u8], source: SocketAddr) -> Result<Option<Reply>> {
        let frame = BvlcFrame::decode(data)?;
        if !frame.function.carries_npdu() {
            debug!("Ignoring {:?} from {}", frame.function, source);
            return Ok(None);
        }

        let (npdu, header_len) = Npdu::decode(&frame.payload)?;
        if npdu.is_network_message() || !npdu.is_for_local_device() {
            return Ok(None);
        }

        if !self.store().get_device().is_online {
            return Ok(None);
        }

        let apdu = match Apdu::decode(&frame.payload[header_len..]) {
            Ok(apdu) => apdu,
            Err(ApplicationError::UnrecognizedService {
                invoke_id,
                service_choice,
            }) => {
                debug!("Rejecting unknown service {} from {}", service_choice, source);
                return self
                    .unicast(&npdu, &frame, source, Apdu::reject(invoke_id, RejectReason::UnrecognizedService))
                    .map(Some);
            }
            Err(err) => return Err(err.into()),
        };

        match apdu {
            Apdu::UnconfirmedRequest {
                service_choice: UnconfirmedServiceChoice::WhoIs,
                service_data,
            } => self.handle_who_is(&service_data, source),
            Apdu::ConfirmedRequest {
                segmented: true,
                invoke_id,
                ..
            } => self
                .unicast(&npdu, &frame, source, Apdu::abort(invoke_id, AbortReason::SegmentationNotSupported))
                .map(Some),
            Apdu::ConfirmedRequest {
                invoke_id,
                service_choice,
                max_response_size,
                service_data,
                ..
            } => {
                let reply = self.handle_confirmed(invoke_id, service_choice, max_response_size, &service_data)?;
                self.unicast(&npdu, &frame, source, reply).map(Some)
            }
            _ => Ok(None),
        }
    }

    fn handle_who_is(&self, service_data: &[u8], source: SocketAddr) -> Result<Option<Reply>> {
        let request = match WhoIsRequest::decode(service_data) {
            Ok(request) => request,
            Err(err) => {
                debug!("Malformed Who-Is from {}: {}", source, err);
                return Ok(None);
            }
        };

        let device_id = self.store().get_device().id;
        if !request.matches(device_id) {
            return Ok(None);
        }
        debug!("Who-Is from {}, answering with I-Am for device {}", source, device_id);
        Ok(Some(Reply::Broadcast(self.i_am_npdu()?)))
    }

    fn handle_confirmed(
        &self,
        invoke_id: u8,
        service_choice: ConfirmedServiceChoice,
        max_response_size: MaxApduSize,
        service_data: &[u8],
    ) -> Result<Apdu> {
        let reply = match service_choice {
            ConfirmedServiceChoice::ReadProperty => self.read_property(invoke_id, service_data)?,
            ConfirmedServiceChoice::WriteProperty => self.write_property(invoke_id, service_data),
            other => {
                debug!("Rejecting unsupported service {:?}", other);
                Apdu::reject(invoke_id, RejectReason::UnrecognizedService)
            }
        };

        // an answer that needs segmenting cannot be sent
        if reply.encode()?.len() > max_response_size.size() {
            return Ok(Apdu::abort(invoke_id, AbortReason::SegmentationNotSupported));
        }
        Ok(reply)
    }

    fn read_property(&self, invoke_id: u8, service_data: &[u8]) -> Result<Apdu> {
        let request = match ReadPropertyRequest::decode(service_data) {
            Ok(request) => request,
            Err(err) => {
                debug!("Malformed ReadProperty: {}", err);
                return Ok(Apdu::reject(invoke_id, err.reject_reason()));
            }
        };

        let resolved = self.dispatcher.resolve_read_indexed(
            request.object_identifier,
            request.property_identifier,
            request.property_array_index,
        );

        match resolved {
            Ok(value) => {
                debug!(
                    "ReadProperty {} {} = {}",
                    request.object_identifier, request.property_identifier, value
                );
                let mut service_data = Vec::new();
                ReadPropertyAck::new(&request, value).encode(&mut service_data)?;
                Ok(Apdu::ComplexAck {
                    invoke_id,
                    service_choice: ConfirmedServiceChoice::ReadProperty,
                    service_data,
                })
            }
            Err(err) => {
                debug!("ReadProperty failed: {}", err);
                Ok(Apdu::error(
                    invoke_id,
                    ConfirmedServiceChoice::ReadProperty,
                    err.error_class(),
                    err.error_code(),
                ))
            }
        }
    }

    fn write_property(&self, invoke_id: u8, service_data: &[u8]) -> Apdu {
        let request = match WritePropertyRequest::decode(service_data) {
            Ok(request) => request,
            Err(err) => {
                debug!("Malformed WriteProperty: {}", err);
                return Apdu::reject(invoke_id, err.reject_reason());
            }
        };

        let result = self.dispatcher.resolve_write(
            request.object_identifier,
            request.property_identifier,
            &request.property_value,
        );

        match result {
            Ok(ack) => {
                if let WriteAck::Clamped { requested, stored } = ack {
                    info!(
                        "WriteProperty {} clamped {} to {}",
                        request.object_identifier, requested, stored
                    );
                }
                Apdu::SimpleAck {
                    invoke_id,
                    service_choice: ConfirmedServiceChoice::WriteProperty,
                }
            }
            Err(err) => {
                debug!("WriteProperty failed: {}", err);
                Apdu::error(
                    invoke_id,
                    ConfirmedServiceChoice::WriteProperty,
                    err.error_class(),
                    err.error_code(),
                )
            }
        }
    }

    fn unicast(
        &self,
        request: &Npdu,
        frame: &BvlcFrame,
        source: SocketAddr,
        apdu: Apdu,
    ) -> Result<Reply> {
        let mut payload = Npdu::reply_to(request).encode();
        payload.extend_from_slice(&apdu.encode()?);
        Ok(Reply::Unicast {
            frame: BvlcFrame::unicast(payload),
            destination: frame.reply_address(source),
        })
    }
}

/// Socket loop and announcer around a [`Responder`]
#[derive(Debug)]
pub struct BacnetServer {
    responder: Responder,
    transport: Arc<UdpTransport>,
}

impl BacnetServer {
    pub fn new(responder: Responder, transport: Arc<UdpTransport>) -> Self {
        Self {
            responder,
            transport,
        }
    }

    pub fn responder(&self) -> &Responder {
        &self.responder
    }

    pub fn transport(&self) -> &Arc<UdpTransport> {
        &self.transport
    }

    /// Receive and answer datagrams until `shutdown` flips or closes
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let mut buffer = vec![0u8; self.transport.buffer_size()];
        info!("BACnet/IP responder listening on {}", self.transport.local_addr()?);

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                received = self.transport.recv_from(&mut buffer) => {
                    match received {
                        Ok((len, source)) => self.answer(&buffer[..len], source).await,
                        Err(err) => warn!("Receive failed: {}", err),
                    }
                }
            }
        }

        info!("BACnet/IP responder stopped");
        Ok(())
    }

    async fn answer(&self, data: &[u8], source: SocketAddr) {
        let reply = match self.responder.handle_datagram(data, source) {
            Ok(Some(reply)) => reply,
            Ok(None) => return,
            Err(err) => {
                debug!("Dropped datagram from {}: {}", source, err);
                return;
            }
        };

        let sent = match reply {
            Reply::Unicast { frame, destination } => {
                self.transport.send_frame(&frame, destination).await
            }
            Reply::Broadcast(npdu) => self.transport.broadcast(npdu).await,
        };
        if let Err(err) = sent {
            warn!("Reply to {} failed: {}", source, err);
        }
    }

    /// Announce after `initial_delay`, then every `interval`, until shutdown
    pub async fn announce_loop(
        &self,
        initial_delay: Duration,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ticker = interval_at(Instant::now() + initial_delay, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {
                    if let Err(err) = self.announce().await {
                        warn!("I-Am announcement failed: {}", err);
                    }
                }
            }
        }
    }
}

#[async_trait]
impl Announcer for BacnetServer {
    /// Broadcast an I-Am when the device is online
    async fn announce(&self) -> Result<()> {
        let device = self.responder.store().get_device();
        if !device.is_online {
            return Ok(());
        }
        info!("Announcing BACnet device {}: {}", device.id, device.name);
        let npdu = self.responder.i_am_npdu()?;
        self.transport.broadcast(npdu).await?;
        Ok(())
    }
}
