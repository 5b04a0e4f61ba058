//! Per-port cache of BIN-RPC sockets.
//!
//! At most one socket is kept per destination port. Sockets never expire by
//! age; the owning transport evicts a socket whenever an exchange on it
//! fails, and the next `get` for that port reconnects. The pool has no
//! locking of its own: the transport's send lock serializes all access.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::time::{Duration, Instant};

use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::debug;

use crate::charset::Charset;
use crate::codec::BinRpcCodec;
use crate::error::{Error, Result};

/// A connected socket framed with the BIN-RPC codec.
#[derive(Debug)]
pub struct PooledSocket {
    pub(crate) framed: Framed<TcpStream, BinRpcCodec>,
    port: u16,
    created_at: Instant,
}

impl PooledSocket {
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// When the connection was opened. Diagnostics only.
    #[must_use]
    pub fn created_at(&self) -> Instant {
        self.created_at
    }
}

#[derive(Debug)]
pub struct SocketPool {
    host: String,
    timeout: Duration,
    charset: Charset,
    sockets: HashMap<u16, PooledSocket>,
}

impl SocketPool {
    #[must_use]
    pub fn new(host: impl Into<String>, timeout: Duration, charset: Charset) -> Self {
        Self {
            host: host.into(),
            timeout,
            charset,
            sockets: HashMap::new(),
        }
    }

    /// Returns the socket for `port`, connecting first if there is none.
    ///
    /// # Errors
    ///
    /// Returns `Error::Timeout` if the connect does not finish in time, or
    /// `Error::Io` if it is refused.
    pub async fn get(&mut self, port: u16) -> Result<&mut PooledSocket> {
        match self.sockets.entry(port) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let stream = tokio::time::timeout(
                    self.timeout,
                    TcpStream::connect((self.host.as_str(), port)),
                )
                .await
                .map_err(|_| Error::Timeout)??;
                stream.set_nodelay(true)?;
                debug!(host = %self.host, port, "Opened BIN-RPC socket");

                Ok(entry.insert(PooledSocket {
                    framed: Framed::new(stream, BinRpcCodec::new(self.charset)),
                    port,
                    created_at: Instant::now(),
                }))
            }
        }
    }

    /// Closes and evicts the socket for `port`. Returns whether one existed.
    pub fn remove(&mut self, port: u16) -> bool {
        match self.sockets.remove(&port) {
            Some(socket) => {
                debug!(
                    port,
                    age_ms = socket.created_at.elapsed().as_millis(),
                    "Evicted BIN-RPC socket"
                );
                true
            }
            None => false,
        }
    }

    /// Closes and evicts every socket.
    pub fn flush(&mut self) {
        if !self.sockets.is_empty() {
            debug!(count = self.sockets.len(), "Closing all BIN-RPC sockets");
        }
        self.sockets.clear();
    }

    #[must_use]
    pub fn contains(&self, port: u16) -> bool {
        self.sockets.contains_key(&port)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sockets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sockets.is_empty()
    }
}
