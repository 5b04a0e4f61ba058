//! Error types for the hmrpc crate.
//!
//! The taxonomy separates transport failures (retryable once), gateway
//! faults (never retried) and result parse failures (reported like I/O
//! errors, never retried).

use hmrpc_types::{Interface, ParamsetType};

use crate::codec::CodecError;
use crate::config::ConfigError;
use crate::parsers::ParseError;
use crate::protocol::{Fault, UNKNOWN_FAILURE, UNKNOWN_PARAMSET};

/// Unified error type for RPC operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Request timeout")]
    Timeout,

    #[error("Connection closed")]
    Disconnected,

    #[error("Unknown RPC failure ({fault}) sending '{method}'")]
    UnknownFailure { method: String, fault: Fault },

    #[error("Unknown parameter set ({fault}) sending '{method}'")]
    UnknownParamset { method: String, fault: Fault },

    #[error("RPC fault ({fault}) sending '{method}'")]
    Fault { method: String, fault: Fault },

    #[error("Invalid result for '{method}': {source}")]
    Parse {
        method: String,
        #[source]
        source: ParseError,
    },

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("No RPC client available for interface {0}")]
    InterfaceUnavailable(Interface),

    #[error("Unknown datapoint {paramset_type}/{name} on channel {channel}")]
    UnknownDatapoint {
        channel: String,
        paramset_type: ParamsetType,
        name: String,
    },
}

impl Error {
    /// Classifies a gateway fault by its code.
    #[must_use]
    pub fn from_fault(method: impl Into<String>, fault: Fault) -> Self {
        let method = method.into();
        match fault.code {
            UNKNOWN_FAILURE => Self::UnknownFailure { method, fault },
            UNKNOWN_PARAMSET => Self::UnknownParamset { method, fault },
            _ => Self::Fault { method, fault },
        }
    }

    pub fn parse(method: impl Into<String>, source: ParseError) -> Self {
        Self::Parse {
            method: method.into(),
            source,
        }
    }

    /// Whether a transport may evict its connection and send the request again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Io(_)
                | Self::Codec(_)
                | Self::Http(_)
                | Self::HttpStatus { .. }
                | Self::Timeout
                | Self::Disconnected
        )
    }

    /// Whether the error means the gateway is unreachable or talking nonsense.
    ///
    /// Callers map these onto their "device offline" signal. Parse failures
    /// count as I/O errors.
    #[must_use]
    pub fn is_io(&self) -> bool {
        self.is_retryable() || matches!(self, Self::Parse { .. })
    }

    /// The gateway fault behind this error, if any.
    #[must_use]
    pub fn fault(&self) -> Option<&Fault> {
        match self {
            Self::UnknownFailure { fault, .. }
            | Self::UnknownParamset { fault, .. }
            | Self::Fault { fault, .. } => Some(fault),
            _ => None,
        }
    }

    /// Faults that make the VALUES bulk read switch to per-datapoint reads.
    #[must_use]
    pub fn triggers_value_fallback(&self) -> bool {
        matches!(
            self,
            Self::UnknownFailure { .. } | Self::UnknownParamset { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
