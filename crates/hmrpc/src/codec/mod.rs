//! Wire codecs for the two RPC encodings.
//!
//! - [`binrpc`]: length-prefixed binary frames for raw TCP sockets
//! - [`xmlrpc`]: method-call / method-response documents for HTTP

pub mod binrpc;
pub mod xmlrpc;

pub use binrpc::{BinRpcCodec, BinRpcMessage};

use std::io;

/// Maximum frame or document size accepted from the gateway (16 MB)
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Deepest array/struct nesting accepted when decoding
pub const MAX_NESTING_DEPTH: usize = 64;

/// Errors that can occur while encoding or decoding RPC messages
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("Message too large: {0} bytes (max: {MAX_MESSAGE_SIZE})")]
    MessageTooLarge(usize),

    #[error("Invalid frame header: {0:02x?}")]
    InvalidHeader([u8; 3]),

    #[error("Unsupported message type: 0x{0:02x}")]
    UnsupportedMessageType(u8),

    #[error("Unknown value type: 0x{0:x}")]
    UnknownValueType(u32),

    #[error("Values nested deeper than {0} levels")]
    NestingTooDeep(usize),

    #[error("Truncated message: {0}")]
    Truncated(&'static str),

    #[error("Cannot encode non-finite double {0}")]
    NonFiniteDouble(f64),

    #[error("Fault message without faultCode")]
    InvalidFault,

    #[error("Unexpected {0} where a response was expected")]
    UnexpectedMessage(&'static str),

    #[error("XML error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("Invalid XML-RPC document: {0}")]
    InvalidDocument(String),
}
