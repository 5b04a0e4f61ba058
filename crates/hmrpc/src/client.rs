//! RPC orchestrator: one method per gateway capability.
//!
//! Every operation builds a request, sends it through the transport to the
//! port of one interface and runs the matching parser on the result. The
//! client keeps no state between calls.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use hmrpc_types::{
    Channel, Datapoint, Device, GatewayId, GatewayInfo, Interface, ParamsetType, RssiInfo, Value,
};
use tracing::{debug, info};

use crate::config::GatewayConfig;
use crate::error::{Error, Result};
use crate::parsers::{self, BidcosInterface, DeviceDescription, GROUP_PREFIX, GROUP_RPC_PREFIX, ParseError};
use crate::protocol::Request;
use crate::transport::Transport;

/// Flag Homegear expects as third `init` argument
const HOMEGEAR_INIT_FLAGS: i32 = 0x22;
/// Third `setInstallMode` argument: normal pairing
const INSTALL_MODE_NORMAL: i32 = 1;
/// Callback URL used when probing whether an interface answers
const VALIDATION_URL: &str = "http://hmrpc.validation:1000";
/// Device address of the gateway's own RF module
const GATEWAY_RF_DEVICE: &str = "BidCoS-RF";

/// Receive mode for writes to battery devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxMode {
    Burst,
    Wakeup,
}

impl RxMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RxMode::Burst => "BURST",
            RxMode::Wakeup => "WAKEUP",
        }
    }
}

impl fmt::Display for RxMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RxMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BURST" => Ok(RxMode::Burst),
            "WAKEUP" => Ok(RxMode::Wakeup),
            _ => Err(format!("unknown rx mode: {s}")),
        }
    }
}

/// Rewrites group addresses to the form the gateway expects on the wire.
#[must_use]
pub fn rpc_address(address: &str) -> String {
    match address.strip_prefix(GROUP_PREFIX) {
        Some(rest) => format!("{GROUP_RPC_PREFIX}{rest}"),
        None => address.to_string(),
    }
}

/// Wire address of a channel; the configuration channel is the device itself.
#[must_use]
pub fn channel_rpc_address(channel: &Channel) -> String {
    let device = rpc_address(&channel.device_address);
    if channel.is_configuration_channel() {
        device
    } else {
        format!("{device}:{}", channel.number)
    }
}

fn parsed<V>(method: &str, result: std::result::Result<V, ParseError>) -> Result<V> {
    result.map_err(|err| Error::parse(method, err))
}

/// Integer datapoints receiving a double get the truncated value.
#[allow(clippy::cast_possible_truncation)]
fn coerce_value(datapoint: &Datapoint, value: Value) -> Value {
    match value {
        Value::Double(d) if datapoint.is_integer_type() => Value::Integer(d as i64),
        other => other,
    }
}

pub struct RpcClient<T> {
    transport: T,
    config: Arc<GatewayConfig>,
}

impl<T: Transport> RpcClient<T> {
    pub fn new(transport: T, config: Arc<GatewayConfig>) -> Self {
        Self { transport, config }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    fn request(&self, method: &str) -> Request {
        self.transport.build_request(method)
    }

    async fn send(&self, interface: Interface, request: &Request) -> Result<Vec<Value>> {
        self.transport.send_request(interface, request).await
    }

    /// Registers the callback URL for `interface` under `client_id`.
    ///
    /// # Errors
    ///
    /// Returns the transport or fault error; `init` is never retried.
    pub async fn init(&self, interface: Interface, client_id: &str, gateway: GatewayId) -> Result<()> {
        let mut request = self
            .request("init")
            .arg(self.transport.callback_url())
            .arg(client_id);
        if gateway == GatewayId::Homegear {
            request = request.arg(HOMEGEAR_INIT_FLAGS);
        }
        debug!(%interface, client_id, "Registering callback");
        self.send(interface, &request).await?;
        Ok(())
    }

    /// Deregisters the callback URL for `interface`.
    ///
    /// # Errors
    ///
    /// Returns the transport or fault error.
    pub async fn release(&self, interface: Interface) -> Result<()> {
        let request = self.request("init").arg(self.transport.callback_url());
        debug!(%interface, "Releasing callback");
        self.send(interface, &request).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the transport error, or a parse error for malformed entries.
    pub async fn list_devices(&self, interface: Interface) -> Result<Vec<Device>> {
        let request = self.request("listDevices");
        let result = self.send(interface, &request).await?;
        parsed(request.method(), parsers::list_devices(&result, interface))
    }

    /// Loads the datapoint descriptions of one paramset into `channel`.
    ///
    /// The configuration channel only has a MASTER paramset; asking for its
    /// VALUES is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the transport, fault or parse error.
    pub async fn add_channel_datapoints(
        &self,
        channel: &mut Channel,
        paramset_type: ParamsetType,
    ) -> Result<()> {
        if channel.is_configuration_channel() && paramset_type != ParamsetType::Master {
            return Ok(());
        }
        let request = self
            .request("getParamsetDescription")
            .arg(channel_rpc_address(channel))
            .arg(paramset_type.as_str());
        let result = self.send(channel.interface, &request).await?;
        let datapoints = parsed(
            request.method(),
            parsers::paramset_description(&result, paramset_type),
        )?;
        for datapoint in datapoints {
            channel.add_datapoint(datapoint);
        }
        Ok(())
    }

    /// Reads the current values of one paramset into the channel's datapoints.
    ///
    /// VALUES are read with a single `getParamset`. When the gateway answers
    /// with an unknown-failure or unknown-paramset fault, and always for CUxD,
    /// they are read one datapoint at a time instead.
    ///
    /// # Errors
    ///
    /// Returns the transport or parse error, and faults other than the two
    /// fallback faults. MASTER faults are never handled.
    pub async fn set_channel_datapoint_values(
        &self,
        channel: &mut Channel,
        paramset_type: ParamsetType,
    ) -> Result<()> {
        if channel.is_configuration_channel() && paramset_type != ParamsetType::Master {
            return Ok(());
        }
        if channel.interface == Interface::Cuxd && paramset_type == ParamsetType::Values {
            return self.read_datapoint_values_individually(channel).await;
        }

        let request = self
            .request("getParamset")
            .arg(channel_rpc_address(channel))
            .arg(paramset_type.as_str());
        match self.send(channel.interface, &request).await {
            Ok(result) => parsed(
                request.method(),
                parsers::paramset_values(&result, channel, paramset_type),
            ),
            Err(err) if paramset_type == ParamsetType::Values && err.triggers_value_fallback() => {
                debug!(
                    channel = %channel.address(),
                    "{err}, reading values one by one"
                );
                self.read_datapoint_values_individually(channel).await
            }
            Err(err) => Err(err),
        }
    }

    /// Issues one `getValue` per readable, non-virtual VALUES datapoint.
    async fn read_datapoint_values_individually(&self, channel: &mut Channel) -> Result<()> {
        let address = channel_rpc_address(channel);
        let names: Vec<String> = channel
            .datapoints
            .iter()
            .filter(|dp| dp.paramset_type == ParamsetType::Values && dp.readable && !dp.is_virtual)
            .map(|dp| dp.name.clone())
            .collect();

        for name in names {
            let request = self.request("getValue").arg(address.as_str()).arg(name.as_str());
            let result = self.send(channel.interface, &request).await?;
            if let Some(datapoint) = channel.datapoint_mut(ParamsetType::Values, &name) {
                let value = parsed(request.method(), parsers::datapoint_value(&result, datapoint))?;
                datapoint.value = Some(value);
            }
        }
        Ok(())
    }

    /// Reads a single VALUES datapoint and stores the value on it.
    ///
    /// # Errors
    ///
    /// Returns the transport, fault or parse error.
    pub async fn get_datapoint_value(&self, channel: &mut Channel, name: &str) -> Result<Value> {
        let request = self
            .request("getValue")
            .arg(channel_rpc_address(channel))
            .arg(name);
        let result = self.send(channel.interface, &request).await?;

        match channel.datapoint_mut(ParamsetType::Values, name) {
            Some(datapoint) => {
                let value = parsed(request.method(), parsers::datapoint_value(&result, datapoint))?;
                datapoint.value = Some(value.clone());
                Ok(value)
            }
            // Unknown datapoint: hand back the raw value
            None => parsed(request.method(), result.first().cloned().ok_or(ParseError::Empty)),
        }
    }

    /// Writes one datapoint: VALUES via `setValue`, MASTER via `putParamset`.
    ///
    /// # Errors
    ///
    /// Returns the transport or fault error.
    pub async fn set_datapoint_value(
        &self,
        channel: &Channel,
        datapoint: &Datapoint,
        value: Value,
        rx_mode: Option<RxMode>,
    ) -> Result<()> {
        let value = coerce_value(datapoint, value);
        let address = channel_rpc_address(channel);

        let mut request = match datapoint.paramset_type {
            ParamsetType::Values => self
                .request("setValue")
                .arg(address)
                .arg(datapoint.name.as_str())
                .arg(value),
            ParamsetType::Master => {
                let mut paramset = BTreeMap::new();
                paramset.insert(datapoint.name.clone(), value);
                self.request("putParamset")
                    .arg(address)
                    .arg(ParamsetType::Master.as_str())
                    .arg(paramset)
            }
        };
        if let Some(mode) = rx_mode {
            request = request.arg(mode.as_str());
        }

        self.send(channel.interface, &request).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the transport or fault error.
    pub async fn set_install_mode(&self, interface: Interface, enable: bool, seconds: u32) -> Result<()> {
        let request = self
            .request("setInstallMode")
            .arg(enable)
            .arg(seconds)
            .arg(INSTALL_MODE_NORMAL);
        self.send(interface, &request).await?;
        Ok(())
    }

    /// Remaining install mode time in seconds, 0 when off.
    ///
    /// # Errors
    ///
    /// Returns the transport error, or an I/O-class parse error if the
    /// gateway does not answer with an integer.
    pub async fn get_install_mode(&self, interface: Interface) -> Result<i64> {
        let request = self.request("getInstallMode");
        let result = self.send(interface, &request).await?;
        parsed(request.method(), parsers::install_mode(&result))
    }

    /// # Errors
    ///
    /// Returns the transport, fault or parse error.
    pub async fn get_device_description(&self, interface: Interface) -> Result<DeviceDescription> {
        let request = self.request("getDeviceDescription").arg(GATEWAY_RF_DEVICE);
        let result = self.send(interface, &request).await?;
        parsed(request.method(), parsers::device_description(&result))
    }

    /// # Errors
    ///
    /// Returns the transport, fault or parse error.
    pub async fn list_bidcos_interfaces(&self, interface: Interface) -> Result<BidcosInterface> {
        let request = self.request("listBidcosInterfaces");
        let result = self.send(interface, &request).await?;
        parsed(request.method(), parsers::bidcos_interfaces(&result))
    }

    /// Detects the gateway family, firmware and reachable interfaces.
    ///
    /// Failures while reading descriptions degrade to empty descriptions; a
    /// failed interface probe only disables that interface.
    ///
    /// # Errors
    ///
    /// Does not fail at present: description and probe failures are
    /// absorbed into the returned info.
    pub async fn get_gateway_info(&self, id: &str) -> Result<GatewayInfo> {
        let description = match self.get_device_description(Interface::Rf).await {
            Ok(description) => description,
            Err(err) => {
                debug!("Unable to read RF device description: {err}");
                DeviceDescription::default()
            }
        };
        let is_homegear = description
            .device_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case("Homegear"));

        let bidcos = match self.list_bidcos_interfaces(Interface::Rf).await {
            Ok(bidcos) => bidcos,
            Err(err) => {
                debug!("Unable to list BidCos interfaces via RF, trying HMIP: {err}");
                self.list_bidcos_interfaces(Interface::Hmip)
                    .await
                    .unwrap_or_default()
            }
        };

        let starts_with = |value: &Option<String>, prefix: &str| {
            value
                .as_deref()
                .is_some_and(|v| v.to_ascii_uppercase().starts_with(prefix))
        };
        let looks_like_ccu = starts_with(&bidcos.interface_type, "CCU")
            || starts_with(&bidcos.interface_type, "HMIP_CCU")
            || starts_with(&description.device_type, "HM-RCV-50")
            || self.config.is_ccu_type();

        let (id_kind, gateway_type, firmware) = if is_homegear {
            (GatewayId::Homegear, description.device_type, description.firmware)
        } else if looks_like_ccu && !self.config.is_no_ccu_type() {
            (
                GatewayId::Ccu,
                Some(bidcos.interface_type.unwrap_or_else(|| "CCU".to_string())),
                description.firmware.or(bidcos.firmware),
            )
        } else {
            (GatewayId::Default, bidcos.interface_type, bidcos.firmware)
        };

        let mut info = GatewayInfo::new(id_kind);
        info.gateway_type = gateway_type;
        info.firmware = firmware;
        info.address = bidcos.address;

        for interface in Interface::ALL {
            if (info.is_ccu() || self.config.has_port(interface))
                && self.has_interface(interface, id).await
            {
                info.interfaces.insert(interface);
            }
        }

        Ok(info)
    }

    /// Probes an interface with a throwaway callback registration.
    async fn has_interface(&self, interface: Interface, id: &str) -> bool {
        let request = self.request("init").arg(VALIDATION_URL).arg(id);
        match self.send(interface, &request).await {
            Ok(_) => {
                info!(%interface, "Interface available");
                true
            }
            Err(err) => {
                info!(%interface, "Interface not available: {err}");
                false
            }
        }
    }

    /// Deletes a device. `flags` is passed to the gateway unchanged.
    ///
    /// # Errors
    ///
    /// Returns the transport or fault error.
    pub async fn delete_device(&self, device: &Device, flags: i32) -> Result<()> {
        let request = self
            .request("deleteDevice")
            .arg(rpc_address(&device.address))
            .arg(flags);
        self.send(device.interface, &request).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the transport, fault or parse error.
    pub async fn load_rssi_info(&self, interface: Interface) -> Result<Vec<RssiInfo>> {
        let request = self.request("rssiInfo");
        let result = self.send(interface, &request).await?;
        parsed(request.method(), parsers::rssi_info(&result))
    }

    /// Asks the gateway to send a `PONG` event to the callback `callback_id`.
    ///
    /// # Errors
    ///
    /// Returns the transport or fault error.
    pub async fn ping(&self, interface: Interface, callback_id: &str) -> Result<()> {
        let request = self.request("ping").arg(callback_id);
        self.send(interface, &request).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the transport, fault or parse error.
    pub async fn get_all_system_variables(
        &self,
        interface: Interface,
    ) -> Result<BTreeMap<String, Value>> {
        let request = self.request("getAllSystemVariables");
        let result = self.send(interface, &request).await?;
        parsed(request.method(), parsers::system_variables(&result))
    }

    /// # Errors
    ///
    /// Returns the transport or fault error.
    pub async fn set_system_variable(&self, interface: Interface, name: &str, value: Value) -> Result<()> {
        let request = self.request("setSystemVariable").arg(name).arg(value);
        self.send(interface, &request).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the transport, fault or parse error.
    pub async fn get_all_scripts(&self, interface: Interface) -> Result<Vec<String>> {
        let request = self.request("getAllScripts");
        let result = self.send(interface, &request).await?;
        parsed(request.method(), parsers::scripts(&result))
    }

    /// Runs a gateway script and returns its raw result.
    ///
    /// # Errors
    ///
    /// Returns the transport or fault error.
    pub async fn run_script(&self, interface: Interface, name: &str) -> Result<Vec<Value>> {
        let request = self.request("runScript").arg(name);
        self.send(interface, &request).await
    }

    /// Closes the transport's connections.
    pub async fn dispose(&self) {
        self.transport.dispose().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Fault;
    use hmrpc_types::{TransferMode, ValueType};
    use std::sync::Mutex;

    type Handler = Box<dyn Fn(Interface, &Request) -> Result<Vec<Value>> + Send + Sync>;

    /// Records every request and answers through a handler.
    struct MockTransport {
        handler: Handler,
        sent: Mutex<Vec<(Interface, Request)>>,
    }

    impl MockTransport {
        fn new(handler: impl Fn(Interface, &Request) -> Result<Vec<Value>> + Send + Sync + 'static) -> Self {
            Self {
                handler: Box::new(handler),
                sent: Mutex::new(Vec::new()),
            }
        }

        fn sent(&self) -> Vec<(Interface, Request)> {
            self.sent.lock().unwrap().clone()
        }

        fn methods(&self) -> Vec<String> {
            self.sent()
                .iter()
                .map(|(_, r)| r.method().to_string())
                .collect()
        }
    }

    impl Transport for MockTransport {
        fn transfer_mode(&self) -> TransferMode {
            TransferMode::BinRpc
        }

        fn callback_url(&self) -> String {
            "binary://127.0.0.1:9126".to_string()
        }

        async fn send_request(&self, interface: Interface, request: &Request) -> Result<Vec<Value>> {
            self.sent.lock().unwrap().push((interface, request.clone()));
            (self.handler)(interface, request)
        }

        async fn dispose(&self) {}
    }

    fn client(handler: impl Fn(Interface, &Request) -> Result<Vec<Value>> + Send + Sync + 'static) -> RpcClient<MockTransport> {
        client_with(GatewayConfig::new("ccu"), handler)
    }

    fn client_with(
        config: GatewayConfig,
        handler: impl Fn(Interface, &Request) -> Result<Vec<Value>> + Send + Sync + 'static,
    ) -> RpcClient<MockTransport> {
        RpcClient::new(MockTransport::new(handler), Arc::new(config))
    }

    fn ok() -> Result<Vec<Value>> {
        Ok(vec![Value::from("")])
    }

    fn fault(request: &Request, code: i32) -> Result<Vec<Value>> {
        Err(Error::from_fault(request.method(), Fault::new(code, "fault")))
    }

    fn values_channel() -> Channel {
        let mut channel = Channel::new("LEQ0123456", Interface::Rf, 1, "SWITCH");
        channel.add_datapoint(Datapoint::new("STATE", ParamsetType::Values, ValueType::Bool));
        channel.add_datapoint(Datapoint::new("LEVEL", ParamsetType::Values, ValueType::Float));

        let mut write_only = Datapoint::new("PRESS", ParamsetType::Values, ValueType::Action);
        write_only.readable = false;
        channel.add_datapoint(write_only);

        let mut synthetic = Datapoint::new("DISPLAY", ParamsetType::Values, ValueType::String);
        synthetic.is_virtual = true;
        channel.add_datapoint(synthetic);

        channel.add_datapoint(Datapoint::new("AES_ACTIVE", ParamsetType::Master, ValueType::Bool));
        channel
    }

    fn string_struct(fields: &[(&str, &str)]) -> Value {
        Value::Struct(
            fields
                .iter()
                .map(|(k, v)| ((*k).to_string(), Value::from(*v)))
                .collect(),
        )
    }

    #[test]
    fn test_rpc_address_rewrites_group_prefix_only() {
        assert_eq!(rpc_address("T-0001234"), "INT0000001234");
        assert_eq!(rpc_address("LEQ0123456"), "LEQ0123456");
        assert_eq!(rpc_address("AT-123"), "AT-123");
    }

    #[test]
    fn test_rx_mode_parse() {
        assert_eq!("burst".parse::<RxMode>().unwrap(), RxMode::Burst);
        assert_eq!(RxMode::Wakeup.to_string(), "WAKEUP");
        assert!("LAZY".parse::<RxMode>().is_err());
    }

    #[tokio::test]
    async fn test_init_and_release_arguments() {
        let client = client(|_, _| ok());
        client.init(Interface::Rf, "RF-hm", GatewayId::Ccu).await.unwrap();
        client.init(Interface::Rf, "RF-hm", GatewayId::Homegear).await.unwrap();
        client.release(Interface::Hmip).await.unwrap();

        let sent = client.transport().sent();
        assert_eq!(
            sent[0].1.params(),
            &[Value::from("binary://127.0.0.1:9126"), Value::from("RF-hm")]
        );
        assert_eq!(sent[1].1.params()[2], Value::from(0x22));
        assert_eq!(sent[2].0, Interface::Hmip);
        assert_eq!(sent[2].1.method(), "init");
        assert_eq!(sent[2].1.params(), &[Value::from("binary://127.0.0.1:9126")]);
    }

    #[tokio::test]
    async fn test_set_value_routing() {
        let client = client(|_, _| ok());
        let channel = values_channel();
        let state = channel.datapoint(ParamsetType::Values, "STATE").unwrap();

        client
            .set_datapoint_value(&channel, state, Value::from(true), None)
            .await
            .unwrap();

        let (interface, request) = &client.transport().sent()[0];
        assert_eq!(*interface, Interface::Rf);
        assert_eq!(request.method(), "setValue");
        assert_eq!(
            request.params(),
            &[Value::from("LEQ0123456:1"), Value::from("STATE"), Value::from(true)]
        );
    }

    #[tokio::test]
    async fn test_put_paramset_routing_with_rx_mode() {
        let client = client(|_, _| ok());
        let channel = values_channel();
        let aes = channel.datapoint(ParamsetType::Master, "AES_ACTIVE").unwrap();

        client
            .set_datapoint_value(&channel, aes, Value::from(false), Some(RxMode::Burst))
            .await
            .unwrap();

        let mut paramset = BTreeMap::new();
        paramset.insert("AES_ACTIVE".to_string(), Value::from(false));
        let (_, request) = &client.transport().sent()[0];
        assert_eq!(request.method(), "putParamset");
        assert_eq!(
            request.params(),
            &[
                Value::from("LEQ0123456:1"),
                Value::from("MASTER"),
                Value::Struct(paramset),
                Value::from("BURST"),
            ]
        );
    }

    #[tokio::test]
    async fn test_integer_datapoint_coerces_double() {
        let client = client(|_, _| ok());
        let mut channel = Channel::new("T-0000123", Interface::Group, 1, "VIRTUAL");
        channel.add_datapoint(Datapoint::new("MODE", ParamsetType::Values, ValueType::Enum));
        let mode = channel.datapoint(ParamsetType::Values, "MODE").unwrap().clone();

        client
            .set_datapoint_value(&channel, &mode, Value::from(2.7), None)
            .await
            .unwrap();

        let (_, request) = &client.transport().sent()[0];
        assert_eq!(request.params()[0], Value::from("INT0000000123:1"));
        assert_eq!(request.params()[2], Value::from(2));
    }

    #[tokio::test]
    async fn test_configuration_channel_uses_device_address() {
        let client = client(|_, _| ok());
        let mut channel = Channel::new("LEQ0123456", Interface::Rf, -1, "");
        channel.add_datapoint(Datapoint::new("BURST_RX", ParamsetType::Master, ValueType::Bool));
        let burst = channel.datapoint(ParamsetType::Master, "BURST_RX").unwrap().clone();

        client
            .set_datapoint_value(&channel, &burst, Value::from(true), None)
            .await
            .unwrap();
        client
            .set_channel_datapoint_values(&mut channel, ParamsetType::Values)
            .await
            .unwrap();
        client
            .add_channel_datapoints(&mut channel, ParamsetType::Values)
            .await
            .unwrap();

        let sent = client.transport().sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1.params()[0], Value::from("LEQ0123456"));
    }

    #[tokio::test]
    async fn test_values_fallback_on_unknown_paramset() {
        let client = client(|_, request| match request.method() {
            "getParamset" => fault(request, -3),
            "getValue" => Ok(vec![Value::from(1)]),
            other => panic!("unexpected {other}"),
        });
        let mut channel = values_channel();

        client
            .set_channel_datapoint_values(&mut channel, ParamsetType::Values)
            .await
            .unwrap();

        let sent = client.transport().sent();
        let reads: Vec<&Value> = sent
            .iter()
            .filter(|(_, r)| r.method() == "getValue")
            .map(|(_, r)| &r.params()[1])
            .collect();
        assert_eq!(reads, vec![&Value::from("STATE"), &Value::from("LEVEL")]);
        assert_eq!(
            channel.datapoint(ParamsetType::Values, "STATE").unwrap().value,
            Some(Value::from(true))
        );
        assert_eq!(
            channel.datapoint(ParamsetType::Values, "LEVEL").unwrap().value,
            Some(Value::from(1.0))
        );
        assert!(channel.datapoint(ParamsetType::Values, "PRESS").unwrap().value.is_none());
    }

    #[tokio::test]
    async fn test_values_fallback_on_unknown_failure() {
        let client = client(|_, request| match request.method() {
            "getParamset" => fault(request, -1),
            _ => Ok(vec![Value::from(0)]),
        });
        let mut channel = values_channel();

        client
            .set_channel_datapoint_values(&mut channel, ParamsetType::Values)
            .await
            .unwrap();
        assert_eq!(client.transport().methods(), vec!["getParamset", "getValue", "getValue"]);
    }

    #[tokio::test]
    async fn test_master_fault_is_not_handled() {
        let client = client(|_, request| fault(request, -3));
        let mut channel = values_channel();

        let err = client
            .set_channel_datapoint_values(&mut channel, ParamsetType::Master)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownParamset { .. }));
        assert_eq!(client.transport().methods(), vec!["getParamset"]);
    }

    #[tokio::test]
    async fn test_other_fault_has_no_fallback() {
        let client = client(|_, request| fault(request, -2));
        let mut channel = values_channel();

        let err = client
            .set_channel_datapoint_values(&mut channel, ParamsetType::Values)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Fault { .. }));
        assert_eq!(client.transport().sent().len(), 1);
    }

    #[tokio::test]
    async fn test_bulk_values_read() {
        let client = client(|_, _| {
            Ok(vec![Value::Struct(
                [
                    ("STATE".to_string(), Value::from(true)),
                    ("LEVEL".to_string(), Value::from(0.5)),
                ]
                .into_iter()
                .collect(),
            )])
        });
        let mut channel = values_channel();

        client
            .set_channel_datapoint_values(&mut channel, ParamsetType::Values)
            .await
            .unwrap();

        let (_, request) = &client.transport().sent()[0];
        assert_eq!(
            request.params(),
            &[Value::from("LEQ0123456:1"), Value::from("VALUES")]
        );
        assert_eq!(
            channel.datapoint(ParamsetType::Values, "LEVEL").unwrap().value,
            Some(Value::from(0.5))
        );
    }

    #[tokio::test]
    async fn test_cuxd_reads_values_individually() {
        let client = client(|_, _| Ok(vec![Value::from(false)]));
        let mut channel = values_channel();
        channel.interface = Interface::Cuxd;

        client
            .set_channel_datapoint_values(&mut channel, ParamsetType::Values)
            .await
            .unwrap();
        assert_eq!(client.transport().methods(), vec!["getValue", "getValue"]);
        assert!(client.transport().sent().iter().all(|(i, _)| *i == Interface::Cuxd));
    }

    #[tokio::test]
    async fn test_add_channel_datapoints() {
        let client = client(|_, _| {
            Ok(vec![Value::Struct(
                [(
                    "LEVEL".to_string(),
                    string_struct(&[("TYPE", "FLOAT")]),
                )]
                .into_iter()
                .collect(),
            )])
        });
        let mut channel = Channel::new("LEQ0123456", Interface::Hmip, 3, "DIMMER");

        client
            .add_channel_datapoints(&mut channel, ParamsetType::Values)
            .await
            .unwrap();
        assert_eq!(channel.datapoints.len(), 1);
        assert_eq!(channel.datapoints[0].value_type, ValueType::Float);

        let (interface, request) = &client.transport().sent()[0];
        assert_eq!(*interface, Interface::Hmip);
        assert_eq!(request.method(), "getParamsetDescription");
    }

    #[tokio::test]
    async fn test_get_datapoint_value_updates_datapoint() {
        let client = client(|_, _| Ok(vec![Value::from(1)]));
        let mut channel = values_channel();

        let value = client.get_datapoint_value(&mut channel, "STATE").await.unwrap();
        assert_eq!(value, Value::from(true));
        assert_eq!(
            channel.datapoint(ParamsetType::Values, "STATE").unwrap().value,
            Some(Value::from(true))
        );

        let raw = client.get_datapoint_value(&mut channel, "OTHER").await.unwrap();
        assert_eq!(raw, Value::from(1));
    }

    #[tokio::test]
    async fn test_install_mode() {
        let client = client(|_, request| match request.method() {
            "getInstallMode" => Ok(vec![Value::from("soon")]),
            _ => ok(),
        });

        client.set_install_mode(Interface::Rf, true, 60).await.unwrap();
        let (_, request) = &client.transport().sent()[0];
        assert_eq!(
            request.params(),
            &[Value::from(true), Value::from(60), Value::from(1)]
        );

        let err = client.get_install_mode(Interface::Rf).await.unwrap_err();
        assert!(err.is_io());
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[tokio::test]
    async fn test_delete_device_passes_flags() {
        let client = client(|_, _| ok());
        let device = Device::new("T-0000042", Interface::Group, "GROUP");

        client.delete_device(&device, 0b101).await.unwrap();
        let (interface, request) = &client.transport().sent()[0];
        assert_eq!(*interface, Interface::Group);
        assert_eq!(
            request.params(),
            &[Value::from("INT0000000042"), Value::from(0b101)]
        );
    }

    fn detection_client(
        config: GatewayConfig,
        device_type: &'static str,
        bidcos_type: Option<&'static str>,
        reachable: &'static [Interface],
    ) -> RpcClient<MockTransport> {
        client_with(config, move |interface, request| match request.method() {
            "getDeviceDescription" => Ok(vec![string_struct(&[
                ("TYPE", device_type),
                ("FIRMWARE", "3.61.7"),
            ])]),
            "listBidcosInterfaces" => match bidcos_type {
                Some(t) => Ok(vec![Value::Array(vec![string_struct(&[
                    ("TYPE", t),
                    ("ADDRESS", "KEQ0000001"),
                    ("FIRMWARE_VERSION", "2.8.5"),
                ])])]),
                None => Err(Error::Timeout),
            },
            "init" if reachable.contains(&interface) => ok(),
            "init" => Err(Error::Disconnected),
            other => panic!("unexpected {other}"),
        })
    }

    #[tokio::test]
    async fn test_gateway_info_homegear() {
        let mut config = GatewayConfig::new("homegear");
        config.rf_port = Some(2001);
        let client = detection_client(config, "Homegear", Some("CCU2"), &[Interface::Rf]);

        let info = client.get_gateway_info("hm").await.unwrap();
        assert!(info.is_homegear());
        assert_eq!(info.gateway_type.as_deref(), Some("Homegear"));
        assert_eq!(info.firmware.as_deref(), Some("3.61.7"));
        assert_eq!(info.interfaces.iter().copied().collect::<Vec<_>>(), vec![Interface::Rf]);
    }

    #[tokio::test]
    async fn test_gateway_info_homegear_ignores_case() {
        for device_type in ["HOMEGEAR", "homegear"] {
            let client = detection_client(GatewayConfig::new("homegear"), device_type, None, &[Interface::Rf]);

            let info = client.get_gateway_info("hm").await.unwrap();
            assert!(info.is_homegear(), "{device_type} not detected as Homegear");
            assert_eq!(info.gateway_type.as_deref(), Some(device_type));
        }
    }

    #[tokio::test]
    async fn test_gateway_info_ccu_probes_all_interfaces() {
        let client = detection_client(
            GatewayConfig::new("ccu"),
            "HM-RCV-50",
            Some("CCU3"),
            &[Interface::Rf, Interface::Hmip, Interface::Group],
        );

        let info = client.get_gateway_info("hm").await.unwrap();
        assert!(info.is_ccu());
        assert_eq!(info.gateway_type.as_deref(), Some("CCU3"));
        assert_eq!(info.firmware.as_deref(), Some("3.61.7"));
        assert_eq!(info.address.as_deref(), Some("KEQ0000001"));
        assert!(info.has_interface(Interface::Hmip));
        assert!(info.has_interface(Interface::Group));
        assert!(!info.has_interface(Interface::Wired));
        assert!(!info.has_interface(Interface::Cuxd));

        let probes: Vec<_> = client
            .transport()
            .sent()
            .into_iter()
            .filter(|(_, r)| r.is_init())
            .collect();
        assert_eq!(probes.len(), 5);
        assert_eq!(
            probes[0].1.params(),
            &[Value::from("http://hmrpc.validation:1000"), Value::from("hm")]
        );
    }

    #[tokio::test]
    async fn test_gateway_info_ccu_from_rf_device_type() {
        let client = detection_client(GatewayConfig::new("ccu"), "HM-RCV-50", None, &[]);
        let info = client.get_gateway_info("hm").await.unwrap();
        assert!(info.is_ccu());
        assert_eq!(info.gateway_type.as_deref(), Some("CCU"));
        assert!(info.interfaces.is_empty());

        // RF listing failed, so HMIP was asked as well
        let listings = client
            .transport()
            .sent()
            .into_iter()
            .filter(|(_, r)| r.method() == "listBidcosInterfaces")
            .map(|(i, _)| i)
            .collect::<Vec<_>>();
        assert_eq!(listings, vec![Interface::Rf, Interface::Hmip]);
    }

    #[tokio::test]
    async fn test_gateway_info_type_overrides() {
        let mut config = GatewayConfig::new("ccu");
        config.gateway_type = crate::config::GatewayType::Ccu;
        let client = detection_client(config, "RPI-RF-MOD", Some("LGW"), &[]);
        assert!(client.get_gateway_info("hm").await.unwrap().is_ccu());

        let mut config = GatewayConfig::new("ccu");
        config.gateway_type = crate::config::GatewayType::NoCcu;
        let client = detection_client(config, "HM-RCV-50", Some("CCU3"), &[]);
        let info = client.get_gateway_info("hm").await.unwrap();
        assert_eq!(info.id, GatewayId::Default);
        assert_eq!(info.gateway_type.as_deref(), Some("CCU3"));
        assert_eq!(info.firmware.as_deref(), Some("2.8.5"));
    }

    #[tokio::test]
    async fn test_gateway_info_default_probes_configured_ports_only() {
        let mut config = GatewayConfig::new("raspberrymatic");
        config.hmip_port = Some(2010);
        let client = detection_client(config, "RPI-RF-MOD", Some("LGW"), &[Interface::Hmip]);

        let info = client.get_gateway_info("hm").await.unwrap();
        assert_eq!(info.id, GatewayId::Default);
        assert_eq!(info.interfaces.iter().copied().collect::<Vec<_>>(), vec![Interface::Hmip]);

        let probes: Vec<_> = client
            .transport()
            .sent()
            .into_iter()
            .filter(|(_, r)| r.is_init())
            .map(|(i, _)| i)
            .collect();
        assert_eq!(probes, vec![Interface::Hmip]);
    }

    #[tokio::test]
    async fn test_rssi_and_scripts() {
        let client = client(|_, request| match request.method() {
            "rssiInfo" => Ok(vec![Value::Struct(BTreeMap::new())]),
            "getAllScripts" => Ok(vec![Value::Array(vec![Value::from("wake")])]),
            "runScript" => Ok(vec![Value::from(0)]),
            _ => ok(),
        });

        assert!(client.load_rssi_info(Interface::Rf).await.unwrap().is_empty());
        assert_eq!(client.get_all_scripts(Interface::Rf).await.unwrap(), vec!["wake"]);
        assert_eq!(client.run_script(Interface::Rf, "wake").await.unwrap(), vec![Value::from(0)]);
        client.ping(Interface::Rf, "RF-hm").await.unwrap();
        client
            .set_system_variable(Interface::Rf, "Presence", Value::from(true))
            .await
            .unwrap();

        let sent = client.transport().sent();
        assert_eq!(sent[3].1.params(), &[Value::from("RF-hm")]);
        assert_eq!(sent[4].1.params(), &[Value::from("Presence"), Value::from(true)]);
    }
}
