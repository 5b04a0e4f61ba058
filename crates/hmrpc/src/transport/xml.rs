//! XML-RPC over HTTP POST.

use std::sync::Arc;

use hmrpc_types::{Interface, TransferMode, Value};
use reqwest::header::CONTENT_TYPE;
use tokio::sync::Mutex;
use tracing::{debug, trace};

use super::{Transport, retry_budget};
use crate::codec::xmlrpc;
use crate::config::GatewayConfig;
use crate::error::{Error, Result};
use crate::protocol::Request;

pub struct XmlRpcTransport {
    config: Arc<GatewayConfig>,
    client: reqwest::Client,
    send_lock: Mutex<()>,
}

impl XmlRpcTransport {
    /// # Errors
    ///
    /// Returns `Error::Http` if the HTTP client cannot be built.
    pub fn new(config: Arc<GatewayConfig>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.timeout())
            .build()?;
        Ok(Self {
            config,
            client,
            send_lock: Mutex::new(()),
        })
    }

    /// Endpoint of an interface. Groups live under `/groups`.
    #[must_use]
    pub fn url(&self, interface: Interface) -> String {
        let path = if interface == Interface::Group { "groups" } else { "" };
        format!(
            "http://{}:{}/{path}",
            self.config.gateway_address,
            self.config.port(interface)
        )
    }

    async fn post(&self, url: &str, body: Vec<u8>, request: &Request) -> Result<Vec<Value>> {
        let charset = self.config.encoding;
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, format!("text/xml;charset={}", charset.name()))
            .body(body)
            .send()
            .await
            .map_err(http_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = response.bytes().await.map_err(http_error)?;
        xmlrpc::decode_response(&bytes, charset)?.into_result(request)
    }
}

fn http_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout
    } else {
        Error::Http(err)
    }
}

impl Transport for XmlRpcTransport {
    fn transfer_mode(&self) -> TransferMode {
        TransferMode::XmlRpc
    }

    fn callback_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.callback_host, self.config.xml_callback_port
        )
    }

    async fn send_request(&self, interface: Interface, request: &Request) -> Result<Vec<Value>> {
        let url = self.url(interface);
        let body = xmlrpc::encode_request(request, self.config.encoding)?;
        let budget = retry_budget(request);

        let _guard = self.send_lock.lock().await;
        let mut attempt = 0;
        loop {
            trace!(%interface, %url, attempt, "XML-RPC request: {request}");
            match self.post(&url, body.clone(), request).await {
                Ok(values) => return Ok(values),
                Err(err) => {
                    if attempt >= budget || !err.is_retryable() {
                        return Err(err);
                    }
                    attempt += 1;
                    debug!(
                        %interface,
                        method = request.method(),
                        "XML-RPC send failed, retrying: {err}"
                    );
                }
            }
        }
    }

    async fn dispose(&self) {}
}
