//! Transport clients.
//!
//! A transport sends one request to one interface and returns the decoded
//! result array. Both implementations apply the same policy: sends are
//! serialized per transport, transport failures are retried once on a fresh
//! connection, `init` is sent exactly once, and gateway faults are returned
//! immediately.

use std::future::Future;

use hmrpc_types::{Interface, TransferMode, Value};

use crate::error::Result;
use crate::protocol::Request;

pub mod bin;
pub mod xml;

pub use bin::BinRpcTransport;
pub use xml::XmlRpcTransport;

/// Extra attempts after a failed send.
pub const MAX_RPC_RETRY: u32 = 1;

/// Number of retries allowed for a request.
pub(crate) fn retry_budget(request: &Request) -> u32 {
    if request.is_init() { 0 } else { MAX_RPC_RETRY }
}

pub trait Transport: Send + Sync {
    fn transfer_mode(&self) -> TransferMode;

    fn build_request(&self, method: &str) -> Request {
        Request::new(method)
    }

    /// URL the gateway should deliver events to, first argument of `init`.
    fn callback_url(&self) -> String;

    /// Sends a request to the port of `interface` and returns the result array.
    fn send_request(
        &self,
        interface: Interface,
        request: &Request,
    ) -> impl Future<Output = Result<Vec<Value>>> + Send;

    /// Releases connections. The transport stays usable and reconnects lazily.
    fn dispose(&self) -> impl Future<Output = ()> + Send;
}
