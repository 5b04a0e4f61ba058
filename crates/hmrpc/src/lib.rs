//! RPC layer for Homematic CCU and Homegear gateways.
//!
//! This crate talks to a gateway's interface processes (RF, wired, HmIP,
//! CUxD, groups) over BIN-RPC or XML-RPC, whichever the detected gateway
//! expects for each interface.
//!
//! # Architecture
//!
//! - [`codec`]: BIN-RPC frame codec and XML-RPC documents
//! - [`protocol`]: Requests, responses and faults shared by both codecs
//! - [`transport`]: Socket-pooled BIN-RPC and HTTP XML-RPC transports with retry
//! - [`client`]: Typed gateway operations over a single transport
//! - [`parsers`]: Conversion of raw results into devices, channels and datapoints
//! - [`gateway`]: Detection and per-interface routing
//! - [`config`]: Gateway connection settings
//! - [`error`]: Error classification and result alias
//!
//! # Example
//!
//! ```no_run
//! use hmrpc::{Gateway, GatewayConfig};
//!
//! # async fn example() -> hmrpc::Result<()> {
//! let gateway = Gateway::connect("ccu", GatewayConfig::new("192.168.1.10")).await?;
//!
//! for device in gateway.load_all_device_metadata().await? {
//!     println!("{} {}", device.address, device.device_type);
//! }
//!
//! gateway.dispose().await;
//! # Ok(())
//! # }
//! ```

pub mod charset;
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod gateway;
pub mod parsers;
pub mod pool;
pub mod protocol;
pub mod transport;

#[cfg(test)]
mod tests;

pub use charset::Charset;
pub use client::{RpcClient, RxMode};
pub use codec::{BinRpcCodec, BinRpcMessage, CodecError};
pub use config::{ConfigError, GatewayConfig, GatewayType};
pub use error::{Error, Result};
pub use gateway::{DeleteFlags, Gateway};
pub use pool::SocketPool;
pub use protocol::{Fault, Request, Response};
pub use transport::{BinRpcTransport, Transport, XmlRpcTransport};

// Re-export the data model
pub use hmrpc_types::{
    Channel, Datapoint, Device, GatewayId, GatewayInfo, Interface, ParamsetType, RssiInfo,
    TransferMode, Value, ValueType,
};
