//! Gateway facade.
//!
//! Detects the gateway once, then routes every interface to the RPC client
//! speaking its transfer mode. Interfaces the gateway does not offer are
//! rejected with [`Error::InterfaceUnavailable`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use hmrpc_types::{
    Channel, Datapoint, Device, GatewayInfo, Interface, ParamsetType, RssiInfo, TransferMode, Value,
    ValueType,
};
use tracing::{debug, info, warn};

use crate::client::{RpcClient, RxMode};
use crate::config::GatewayConfig;
use crate::error::{Error, Result};
use crate::transport::{BinRpcTransport, XmlRpcTransport};

/// Interface used for gateway-wide calls
pub const DEFAULT_INTERFACE: Interface = Interface::Rf;

/// MASTER datapoint of channels whose datapoint set depends on their mode
const CHANNEL_FUNCTION: &str = "CHANNEL_FUNCTION";

/// Runs `$call` with the client serving `$interface`.
macro_rules! dispatch {
    ($gateway:expr, $interface:expr, |$client:ident| $call:expr) => {{
        let interface = $interface;
        match $gateway.mode(interface)? {
            TransferMode::BinRpc => {
                let $client = $gateway
                    .bin
                    .as_ref()
                    .ok_or(Error::InterfaceUnavailable(interface))?;
                $call.await
            }
            TransferMode::XmlRpc => {
                let $client = $gateway
                    .xml
                    .as_ref()
                    .ok_or(Error::InterfaceUnavailable(interface))?;
                $call.await
            }
        }
    }};
}

/// Options of `deleteDevice`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteFlags {
    /// Reset the device to factory defaults
    pub reset: bool,
    /// Delete even if the device is unreachable
    pub force: bool,
    /// Delete once the device is reachable again
    pub defer: bool,
}

impl DeleteFlags {
    #[must_use]
    pub fn bits(self) -> i32 {
        i32::from(self.reset) | (i32::from(self.force) << 1) | (i32::from(self.defer) << 2)
    }
}

pub struct Gateway {
    id: String,
    info: GatewayInfo,
    modes: BTreeMap<Interface, TransferMode>,
    bin: Option<RpcClient<BinRpcTransport>>,
    xml: Option<RpcClient<XmlRpcTransport>>,
}

impl Gateway {
    /// Detects the gateway over XML-RPC and sets up the clients it needs.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for an invalid configuration or `Error::Http`
    /// if the HTTP client cannot be built.
    pub async fn connect(id: impl Into<String>, config: GatewayConfig) -> Result<Self> {
        config.validate()?;
        let id = id.into();
        let config = Arc::new(config);

        let detector = RpcClient::new(XmlRpcTransport::new(Arc::clone(&config))?, Arc::clone(&config));
        let info = detector.get_gateway_info(&id).await;
        detector.dispose().await;

        Self::with_info(id, config, info?)
    }

    /// Sets up clients for an already known gateway.
    ///
    /// # Errors
    ///
    /// Returns `Error::Http` if the HTTP client cannot be built.
    pub fn with_info(
        id: impl Into<String>,
        config: Arc<GatewayConfig>,
        info: GatewayInfo,
    ) -> Result<Self> {
        let modes = info.transfer_modes();
        info!("{info}");
        debug!(
            "Used transfer modes: {}",
            modes
                .iter()
                .map(|(interface, mode)| format!("{interface}:{mode}"))
                .collect::<Vec<_>>()
                .join(", ")
        );

        let uses = |mode: TransferMode| modes.values().any(|m| *m == mode);
        let bin = uses(TransferMode::BinRpc)
            .then(|| RpcClient::new(BinRpcTransport::new(Arc::clone(&config)), Arc::clone(&config)));
        let xml = if uses(TransferMode::XmlRpc) {
            Some(RpcClient::new(
                XmlRpcTransport::new(Arc::clone(&config))?,
                Arc::clone(&config),
            ))
        } else {
            None
        };

        Ok(Self {
            id: id.into(),
            info,
            modes,
            bin,
            xml,
        })
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn info(&self) -> &GatewayInfo {
        &self.info
    }

    #[must_use]
    pub fn transfer_modes(&self) -> &BTreeMap<Interface, TransferMode> {
        &self.modes
    }

    pub fn interfaces(&self) -> impl Iterator<Item = Interface> + '_ {
        self.modes.keys().copied()
    }

    fn mode(&self, interface: Interface) -> Result<TransferMode> {
        self.modes
            .get(&interface)
            .copied()
            .ok_or(Error::InterfaceUnavailable(interface))
    }

    fn client_id(&self, interface: Interface) -> String {
        format!("{interface}-{}", self.id)
    }

    /// Registers the callback for every interface.
    ///
    /// # Errors
    ///
    /// Stops at the first interface that fails to register.
    pub async fn init_all(&self) -> Result<()> {
        for interface in self.interfaces() {
            let client_id = self.client_id(interface);
            let gateway_id = self.info.id;
            dispatch!(self, interface, |client| client.init(interface, &client_id, gateway_id))?;
        }
        Ok(())
    }

    /// Deregisters every interface. Failures are logged and skipped.
    pub async fn release_all(&self) {
        for interface in self.interfaces() {
            let result: Result<()> =
                async { dispatch!(self, interface, |client| client.release(interface)) }.await;
            if let Err(err) = result {
                debug!(%interface, gateway = %self.id, "Unable to release connection: {err}");
            }
        }
    }

    /// # Errors
    ///
    /// Returns the transport, fault or parse error.
    pub async fn list_devices(&self, interface: Interface) -> Result<Vec<Device>> {
        dispatch!(self, interface, |client| client.list_devices(interface))
    }

    /// Lists the devices of every interface.
    ///
    /// # Errors
    ///
    /// Stops at the first interface that fails.
    pub async fn list_all_devices(&self) -> Result<Vec<Device>> {
        let mut devices = Vec::new();
        for interface in self.interfaces() {
            devices.extend(self.list_devices(interface).await?);
        }
        Ok(devices)
    }

    /// Loads the datapoint descriptions of one paramset into `channel`.
    ///
    /// A channel without the paramset is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns transport errors and faults other than unknown paramset.
    pub async fn add_channel_datapoints(
        &self,
        channel: &mut Channel,
        paramset_type: ParamsetType,
    ) -> Result<()> {
        let interface = channel.interface;
        match dispatch!(self, interface, |client| client
            .add_channel_datapoints(channel, paramset_type))
        {
            Err(Error::UnknownParamset { .. }) => {
                info!(
                    channel = %channel.address(),
                    %paramset_type,
                    "Cannot load metadata, the channel has no such paramset"
                );
                Ok(())
            }
            other => other,
        }
    }

    /// Lists all devices and loads their datapoint descriptions.
    ///
    /// Devices that fail to load are logged and left out.
    ///
    /// # Errors
    ///
    /// Fails only if listing the devices fails.
    pub async fn load_all_device_metadata(&self) -> Result<Vec<Device>> {
        let devices = self.list_all_devices().await?;
        let mut cache = HashMap::new();
        let mut loaded = Vec::with_capacity(devices.len());

        for mut device in devices {
            match self.load_datapoints_cached(&mut device, &mut cache).await {
                Ok(()) => {
                    debug!(
                        address = %device.address,
                        device_type = %device.device_type,
                        datapoints = device.channels.iter().map(|c| c.datapoints.len()).sum::<usize>(),
                        "Loaded device"
                    );
                    loaded.push(device);
                }
                Err(err) => warn!(
                    address = %device.address,
                    gateway = %self.id,
                    "Can't load device: {err}"
                ),
            }
        }
        Ok(loaded)
    }

    /// Loads the MASTER and VALUES descriptions of every channel of `device`.
    ///
    /// # Errors
    ///
    /// Returns the first transport, fault or parse error.
    pub async fn load_device_metadata(&self, device: &mut Device) -> Result<()> {
        self.load_datapoints_cached(device, &mut HashMap::new()).await
    }

    /// Channels of the same device type, firmware and number share their
    /// datapoint set, unless the set depends on a channel function.
    async fn load_datapoints_cached(
        &self,
        device: &mut Device,
        cache: &mut HashMap<String, Vec<Datapoint>>,
    ) -> Result<()> {
        let firmware = device.firmware.clone().unwrap_or_default();
        for channel in &mut device.channels {
            let key = format!("{}:{firmware}:{}", device.device_type, channel.number);
            if let Some(datapoints) = cache.get(&key) {
                channel.datapoints.clone_from(datapoints);
                continue;
            }

            self.add_channel_datapoints(channel, ParamsetType::Master).await?;
            self.add_channel_datapoints(channel, ParamsetType::Values).await?;
            if channel.datapoint(ParamsetType::Master, CHANNEL_FUNCTION).is_none() {
                cache.insert(key, channel.datapoints.clone());
            }
        }
        Ok(())
    }

    /// Reads the MASTER and VALUES values of `channel`.
    ///
    /// # Errors
    ///
    /// Returns the transport, fault or parse error.
    pub async fn load_channel_values(&self, channel: &mut Channel) -> Result<()> {
        debug!(channel = %channel.address(), "Loading channel values");
        let interface = channel.interface;
        for paramset_type in [ParamsetType::Master, ParamsetType::Values] {
            dispatch!(self, interface, |client| client
                .set_channel_datapoint_values(channel, paramset_type))?;
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the transport, fault or parse error.
    pub async fn get_datapoint_value(&self, channel: &mut Channel, name: &str) -> Result<Value> {
        let interface = channel.interface;
        dispatch!(self, interface, |client| client.get_datapoint_value(channel, name))
    }

    /// Writes a datapoint and stores the new value on it.
    ///
    /// Read-only datapoints and ACTION datapoints set to false are not sent.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownDatapoint` if the channel has no such
    /// datapoint, otherwise the transport or fault error.
    pub async fn send_datapoint(
        &self,
        channel: &mut Channel,
        paramset_type: ParamsetType,
        name: &str,
        value: Value,
        rx_mode: Option<RxMode>,
    ) -> Result<()> {
        let Some(datapoint) = channel.datapoint(paramset_type, name).cloned() else {
            return Err(Error::UnknownDatapoint {
                channel: channel.address(),
                paramset_type,
                name: name.to_string(),
            });
        };

        if datapoint.is_read_only() {
            warn!(channel = %channel.address(), datapoint = name, "Datapoint is read-only, not sent");
            return Ok(());
        }
        if datapoint.value_type == ValueType::Action && value.is_false() {
            warn!(channel = %channel.address(), datapoint = name, "ACTION datapoint cannot be set to false, not sent");
            return Ok(());
        }

        debug!(channel = %channel.address(), datapoint = name, %value, "Sending datapoint");
        let interface = channel.interface;
        let target: &Channel = channel;
        dispatch!(self, interface, |client| client
            .set_datapoint_value(target, &datapoint, value.clone(), rx_mode))?;

        if let Some(datapoint) = channel.datapoint_mut(paramset_type, name) {
            datapoint.value = Some(value);
        }
        Ok(())
    }

    /// RSSI readings of the RF and CUxD interfaces.
    ///
    /// # Errors
    ///
    /// Returns the transport, fault or parse error.
    pub async fn load_rssi_values(&self) -> Result<Vec<RssiInfo>> {
        let mut infos = Vec::new();
        for interface in self.interfaces() {
            if matches!(interface, Interface::Rf | Interface::Cuxd) {
                infos.extend(dispatch!(self, interface, |client| client.load_rssi_info(interface))?);
            }
        }
        Ok(infos)
    }

    /// # Errors
    ///
    /// Returns the transport or fault error.
    pub async fn set_install_mode(&self, enable: bool, seconds: u32) -> Result<()> {
        dispatch!(self, DEFAULT_INTERFACE, |client| client
            .set_install_mode(DEFAULT_INTERFACE, enable, seconds))
    }

    /// # Errors
    ///
    /// Returns the transport error or an I/O-class parse error.
    pub async fn get_install_mode(&self) -> Result<i64> {
        dispatch!(self, DEFAULT_INTERFACE, |client| client
            .get_install_mode(DEFAULT_INTERFACE))
    }

    /// # Errors
    ///
    /// Returns the transport or fault error.
    pub async fn delete_device(&self, device: &Device, flags: DeleteFlags) -> Result<()> {
        info!(address = %device.address, ?flags, "Deleting device");
        let interface = device.interface;
        dispatch!(self, interface, |client| client.delete_device(device, flags.bits()))
    }

    /// Asks the gateway to answer with a `PONG` event for this gateway's id.
    ///
    /// # Errors
    ///
    /// Returns the transport or fault error.
    pub async fn ping(&self) -> Result<()> {
        dispatch!(self, DEFAULT_INTERFACE, |client| client.ping(DEFAULT_INTERFACE, &self.id))
    }

    /// # Errors
    ///
    /// Returns the transport, fault or parse error.
    pub async fn get_all_system_variables(&self) -> Result<BTreeMap<String, Value>> {
        dispatch!(self, DEFAULT_INTERFACE, |client| client
            .get_all_system_variables(DEFAULT_INTERFACE))
    }

    /// # Errors
    ///
    /// Returns the transport or fault error.
    pub async fn set_system_variable(&self, name: &str, value: Value) -> Result<()> {
        dispatch!(self, DEFAULT_INTERFACE, |client| client
            .set_system_variable(DEFAULT_INTERFACE, name, value))
    }

    /// # Errors
    ///
    /// Returns the transport, fault or parse error.
    pub async fn get_all_scripts(&self) -> Result<Vec<String>> {
        dispatch!(self, DEFAULT_INTERFACE, |client| client.get_all_scripts(DEFAULT_INTERFACE))
    }

    /// # Errors
    ///
    /// Returns the transport or fault error.
    pub async fn run_script(&self, name: &str) -> Result<Vec<Value>> {
        dispatch!(self, DEFAULT_INTERFACE, |client| client.run_script(DEFAULT_INTERFACE, name))
    }

    /// Releases every interface and closes all connections.
    pub async fn dispose(&self) {
        self.release_all().await;
        if let Some(client) = &self.bin {
            client.dispose().await;
        }
        if let Some(client) = &self.xml {
            client.dispose().await;
        }
    }
}
