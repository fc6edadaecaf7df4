#![doc = include_str!("../README.md")]

pub mod app;
pub mod config;
pub mod control;
pub mod datalink;
pub mod encoding;
pub mod http;
pub mod network;
pub mod object;
pub mod property;
pub mod server;
pub mod service;
pub mod simulation;
pub mod transport;
pub mod util;

use thiserror::Error;

pub use config::{ConfigError, SimulatorConfig};
pub use control::ControlApi;
pub use object::{ObjectIdentifier, ObjectType, PointStore, PropertyDispatcher, PropertyIdentifier};
pub use property::TaggedValue;
pub use server::{BacnetServer, Responder};
pub use simulation::{SimulationDriver, SimulationSettings};

pub const BACNET_PROTOCOL_VERSION: u8 = 1;
pub const BACNET_MAX_APDU: usize = 1476;

/// Crate level error, one variant per layer
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Encoding(#[from] encoding::EncodingError),
    #[error(transparent)]
    Service(#[from] service::ServiceError),
    #[error(transparent)]
    Application(#[from] app::ApplicationError),
    #[error(transparent)]
    Network(#[from] network::NetworkError),
    #[error(transparent)]
    DataLink(#[from] datalink::DataLinkError),
    #[error(transparent)]
    Transport(#[from] transport::TransportError),
    #[error(transparent)]
    Store(#[from] object::StoreError),
    #[error(transparent)]
    Dispatch(#[from] object::DispatchError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
