//! BIN-RPC over pooled TCP sockets.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use hmrpc_types::{Interface, TransferMode, Value};
use tokio::sync::Mutex;
use tracing::{debug, trace};

use super::{Transport, retry_budget};
use crate::codec::BinRpcMessage;
use crate::config::GatewayConfig;
use crate::error::{Error, Result};
use crate::pool::{PooledSocket, SocketPool};
use crate::protocol::{Request, Response};

pub struct BinRpcTransport {
    config: Arc<GatewayConfig>,
    pool: Mutex<SocketPool>,
}

impl BinRpcTransport {
    #[must_use]
    pub fn new(config: Arc<GatewayConfig>) -> Self {
        let pool = SocketPool::new(
            config.gateway_address.clone(),
            config.timeout(),
            config.encoding,
        );
        Self {
            config,
            pool: Mutex::new(pool),
        }
    }

    /// Whether a socket to `port` is currently pooled.
    pub async fn has_socket(&self, port: u16) -> bool {
        self.pool.lock().await.contains(port)
    }
}

/// Writes one request and reads the matching frame from the same socket.
async fn exchange(socket: &mut PooledSocket, request: &Request, timeout: Duration) -> Result<Response> {
    tokio::time::timeout(timeout, socket.framed.send(BinRpcMessage::Request(request.clone())))
        .await
        .map_err(|_| Error::Timeout)??;

    let frame = tokio::time::timeout(timeout, socket.framed.next())
        .await
        .map_err(|_| Error::Timeout)?;
    let message = frame.ok_or(Error::Disconnected)??;
    Ok(message.into_response()?)
}

impl Transport for BinRpcTransport {
    fn transfer_mode(&self) -> TransferMode {
        TransferMode::BinRpc
    }

    fn callback_url(&self) -> String {
        format!(
            "binary://{}:{}",
            self.config.callback_host, self.config.bin_callback_port
        )
    }

    async fn send_request(&self, interface: Interface, request: &Request) -> Result<Vec<Value>> {
        let port = self.config.port(interface);
        let timeout = self.config.timeout();
        let budget = retry_budget(request);

        let mut pool = self.pool.lock().await;
        if request.is_init() {
            // Callback registration always starts on a new connection
            pool.remove(port);
        }

        let mut attempt = 0;
        loop {
            trace!(%interface, port, attempt, "BIN-RPC request: {request}");
            let result = match pool.get(port).await {
                Ok(socket) => exchange(socket, request, timeout).await,
                Err(err) => Err(err),
            };

            match result {
                Ok(response) => return response.into_result(request),
                Err(err) => {
                    pool.remove(port);
                    if attempt >= budget || !err.is_retryable() {
                        return Err(err);
                    }
                    attempt += 1;
                    debug!(
                        %interface,
                        method = request.method(),
                        "BIN-RPC send failed, retrying: {err}"
                    );
                }
            }
        }
    }

    async fn dispose(&self) {
        self.pool.lock().await.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_url() {
        let mut config = GatewayConfig::new("ccu");
        config.callback_host = "10.0.0.5".to_string();
        let transport = BinRpcTransport::new(Arc::new(config));

        assert_eq!(transport.callback_url(), "binary://10.0.0.5:9126");
        assert_eq!(transport.transfer_mode(), TransferMode::BinRpc);
    }
}
