//! Result parsers, one per RPC operation.
//!
//! Each parser turns the positional result array of a call into a typed
//! outcome. Optional fields may be missing; a missing required field (a
//! device address, a datapoint type) is a [`ParseError`].

use std::collections::{BTreeMap, HashMap};

use hmrpc_types::{
    CONFIGURATION_CHANNEL_NUMBER, Channel, Datapoint, Device, Interface, ParamsetType, RssiInfo,
    Value, ValueType,
};
use tracing::{debug, warn};

/// Marker some gateways put in front of group addresses
const GROUP_MARKER: &str = "*";
/// Prefix group addresses are exposed with
pub const GROUP_PREFIX: &str = "T-";
/// Prefix the gateway expects for group addresses on the wire
pub const GROUP_RPC_PREFIX: &str = "INT000";

/// RSSI placeholder for "no reading"
const RSSI_UNKNOWN: i64 = 65536;

const OPERATION_READ: i64 = 0b01;
const OPERATION_WRITE: i64 = 0b10;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("empty result")]
    Empty,

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("expected {expected} for '{field}', found {found}")]
    UnexpectedType {
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("invalid address '{0}'")]
    InvalidAddress(String),
}

/// Description of the gateway's own RF device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceDescription {
    pub device_type: Option<String>,
    pub firmware: Option<String>,
    pub interface: Option<String>,
}

/// The default BidCos interface of the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BidcosInterface {
    pub interface_type: Option<String>,
    pub address: Option<String>,
    pub firmware: Option<String>,
    pub duty_cycle: Option<i64>,
}

fn first(result: &[Value]) -> Result<&Value, ParseError> {
    result.first().ok_or(ParseError::Empty)
}

fn expect_struct<'a>(
    value: &'a Value,
    field: &'static str,
) -> Result<&'a BTreeMap<String, Value>, ParseError> {
    value.as_struct().ok_or(ParseError::UnexpectedType {
        field,
        expected: "struct",
        found: value.type_name(),
    })
}

fn expect_array<'a>(value: &'a Value, field: &'static str) -> Result<&'a [Value], ParseError> {
    value.as_array().ok_or(ParseError::UnexpectedType {
        field,
        expected: "array",
        found: value.type_name(),
    })
}

/// Text of a scalar member; blank strings count as absent.
fn text(map: &BTreeMap<String, Value>, key: &str) -> Option<String> {
    let text = match map.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Double(d) => d.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(_) | Value::Struct(_) => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(i) => Some(*i),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn flag(map: &BTreeMap<String, Value>, key: &str) -> bool {
    match map.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Integer(i)) => *i != 0,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true") || s == "1",
        _ => false,
    }
}

/// Normalizes an address read from the gateway; group markers become `T-`.
#[must_use]
pub fn sanitize_address(address: &str) -> String {
    let address = address.trim();
    match address.strip_prefix(GROUP_MARKER) {
        Some(rest) => format!("{GROUP_PREFIX}{rest}"),
        None => address.to_string(),
    }
}

/// Splits `ABC0123456:3` into device address and channel number.
fn split_channel_address(address: &str) -> Result<(&str, i32), ParseError> {
    let (device, number) = address
        .split_once(':')
        .ok_or_else(|| ParseError::InvalidAddress(address.to_string()))?;
    let number = number
        .parse()
        .map_err(|_| ParseError::InvalidAddress(address.to_string()))?;
    Ok((device, number))
}

/// Parses `listDevices`.
///
/// Every device gets its configuration channel in addition to the channels
/// the gateway lists.
///
/// # Errors
///
/// Fails if an entry has no `ADDRESS` or a channel address has no number.
pub fn list_devices(result: &[Value], interface: Interface) -> Result<Vec<Device>, ParseError> {
    let entries = expect_array(first(result)?, "result")?;

    let mut devices: Vec<Device> = Vec::new();
    let mut channels: Vec<(String, Channel)> = Vec::new();

    for entry in entries {
        let map = expect_struct(entry, "device")?;
        let address = text(map, "ADDRESS")
            .map(|a| sanitize_address(&a))
            .ok_or(ParseError::MissingField("ADDRESS"))?;
        let entry_type = text(map, "TYPE").unwrap_or_default();

        if text(map, "PARENT").is_none() {
            let mut device = Device::new(&address, interface, &entry_type);
            device.firmware = text(map, "FIRMWARE");
            device.id = text(map, "ID");
            device.add_channel(Channel::new(
                &address,
                interface,
                CONFIGURATION_CHANNEL_NUMBER,
                &entry_type,
            ));
            devices.push(device);
        } else {
            let (device_address, number) = split_channel_address(&address)?;
            channels.push((
                device_address.to_string(),
                Channel::new(device_address, interface, number, entry_type),
            ));
        }
    }

    let index: HashMap<String, usize> = devices
        .iter()
        .enumerate()
        .map(|(i, d)| (d.address.clone(), i))
        .collect();
    for (device_address, channel) in channels {
        match index.get(&device_address) {
            Some(&i) => devices[i].add_channel(channel),
            None => warn!(
                address = %channel.address(),
                "Skipping channel without a parent device"
            ),
        }
    }

    Ok(devices)
}

/// Parses `getParamsetDescription` into datapoints of one paramset.
///
/// Unknown datapoint types are kept as strings. A missing `OPERATIONS` mask
/// means readable and writable.
///
/// # Errors
///
/// Fails if a description is not a struct or lacks `TYPE`.
pub fn paramset_description(
    result: &[Value],
    paramset_type: ParamsetType,
) -> Result<Vec<Datapoint>, ParseError> {
    let descriptions = expect_struct(first(result)?, "result")?;

    let mut datapoints = Vec::with_capacity(descriptions.len());
    for (name, description) in descriptions {
        let map = expect_struct(description, "description")?;
        let type_name = text(map, "TYPE").ok_or(ParseError::MissingField("TYPE"))?;
        let value_type = type_name.parse().unwrap_or_else(|_| {
            debug!(datapoint = %name, %type_name, "Unknown datapoint type, using STRING");
            ValueType::String
        });

        let mut datapoint = Datapoint::new(name, paramset_type, value_type);
        let operations = map
            .get("OPERATIONS")
            .and_then(integer)
            .unwrap_or(OPERATION_READ | OPERATION_WRITE);
        datapoint.readable = operations & OPERATION_READ != 0;
        datapoint.writable = operations & OPERATION_WRITE != 0;
        datapoint.unit = text(map, "UNIT");
        datapoint.min = map.get("MIN").cloned();
        datapoint.max = map.get("MAX").cloned();
        datapoint.default_value = map.get("DEFAULT").cloned();
        if let Some(Value::Array(options)) = map.get("VALUE_LIST") {
            datapoint.options = options.iter().map(ToString::to_string).collect();
        }
        datapoints.push(datapoint);
    }
    Ok(datapoints)
}

/// Converts a raw gateway value to the declared type of `datapoint`.
///
/// Values that cannot be converted are returned unchanged.
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Rounded doubles of integer datapoints
#[allow(clippy::cast_precision_loss)] // Gateway integers are far below 2^52
pub fn convert_value(value: &Value, datapoint: &Datapoint) -> Value {
    match (datapoint.value_type, value) {
        (ValueType::Bool | ValueType::Action, Value::Integer(i)) => Value::Bool(*i != 0),
        (ValueType::Bool | ValueType::Action, Value::String(s)) => {
            Value::Bool(s.eq_ignore_ascii_case("true") || s.trim() == "1")
        }
        (ValueType::Integer | ValueType::Enum, Value::Double(d)) => Value::Integer(d.round() as i64),
        (ValueType::Integer | ValueType::Enum, Value::Bool(b)) => Value::Integer(i64::from(*b)),
        (ValueType::Enum, Value::String(s)) => datapoint
            .options
            .iter()
            .position(|option| option == s)
            .and_then(|i| i64::try_from(i).ok())
            .or_else(|| s.trim().parse().ok())
            .map_or_else(|| value.clone(), Value::Integer),
        (ValueType::Integer, Value::String(s)) => s
            .trim()
            .parse()
            .map_or_else(|_| value.clone(), Value::Integer),
        (ValueType::Float, Value::Integer(i)) => Value::Double(*i as f64),
        (ValueType::Float, Value::String(s)) => s
            .trim()
            .parse()
            .map_or_else(|_| value.clone(), Value::Double),
        (ValueType::String, Value::Bool(_) | Value::Integer(_) | Value::Double(_)) => {
            Value::String(value.to_string())
        }
        _ => value.clone(),
    }
}

/// Applies a `getParamset` result to the datapoints of `channel`.
///
/// Names without a known datapoint are logged and skipped.
///
/// # Errors
///
/// Fails if the result is not a struct.
pub fn paramset_values(
    result: &[Value],
    channel: &mut Channel,
    paramset_type: ParamsetType,
) -> Result<(), ParseError> {
    let values = expect_struct(first(result)?, "result")?;
    for (name, value) in values {
        match channel.datapoint_mut(paramset_type, name) {
            Some(datapoint) => {
                let converted = convert_value(value, datapoint);
                datapoint.value = Some(converted);
            }
            None => warn!(
                channel = %channel.address(),
                datapoint = %name,
                %paramset_type,
                "Value for unknown datapoint, ignoring"
            ),
        }
    }
    Ok(())
}

/// Parses `getValue`, converted to the datapoint's type.
///
/// # Errors
///
/// Fails on an empty result.
pub fn datapoint_value(result: &[Value], datapoint: &Datapoint) -> Result<Value, ParseError> {
    Ok(convert_value(first(result)?, datapoint))
}

/// Parses `getInstallMode`: remaining seconds, 0 when off.
///
/// # Errors
///
/// Fails unless the result is an integer.
pub fn install_mode(result: &[Value]) -> Result<i64, ParseError> {
    let value = first(result)?;
    value.as_i64().ok_or(ParseError::UnexpectedType {
        field: "result",
        expected: "integer",
        found: value.type_name(),
    })
}

/// Parses `getDeviceDescription`.
///
/// # Errors
///
/// Fails unless the result is a struct.
pub fn device_description(result: &[Value]) -> Result<DeviceDescription, ParseError> {
    let map = expect_struct(first(result)?, "result")?;
    Ok(DeviceDescription {
        device_type: text(map, "TYPE"),
        firmware: text(map, "FIRMWARE"),
        interface: text(map, "INTERFACE"),
    })
}

/// Parses `listBidcosInterfaces`, picking the default interface or the only one.
///
/// # Errors
///
/// Fails unless the result is an array of structs.
pub fn bidcos_interfaces(result: &[Value]) -> Result<BidcosInterface, ParseError> {
    let entries = expect_array(first(result)?, "result")?;
    let single = entries.len() == 1;

    for entry in entries {
        let map = expect_struct(entry, "interface")?;
        if single || flag(map, "DEFAULT") {
            return Ok(BidcosInterface {
                interface_type: text(map, "TYPE"),
                address: text(map, "ADDRESS"),
                firmware: text(map, "FIRMWARE_VERSION"),
                duty_cycle: map.get("DUTY_CYCLE").and_then(integer),
            });
        }
    }
    Ok(BidcosInterface::default())
}

/// Parses `rssiInfo`: device address -> peer address -> `[device, peer]`.
///
/// # Errors
///
/// Fails unless the result is a struct of structs.
pub fn rssi_info(result: &[Value]) -> Result<Vec<RssiInfo>, ParseError> {
    let devices = expect_struct(first(result)?, "result")?;

    let reading = |value: Option<&Value>| {
        value
            .and_then(integer)
            .filter(|&rssi| rssi != RSSI_UNKNOWN)
            .and_then(|rssi| i32::try_from(rssi).ok())
    };

    let mut infos = Vec::new();
    for (address, peers) in devices {
        for (peer, levels) in expect_struct(peers, "peers")? {
            let levels = expect_array(levels, "rssi")?;
            infos.push(RssiInfo {
                address: sanitize_address(address),
                peer: sanitize_address(peer),
                device_rssi: reading(levels.first()),
                peer_rssi: reading(levels.get(1)),
            });
        }
    }
    Ok(infos)
}

/// Parses `getAllSystemVariables` into name -> value.
///
/// # Errors
///
/// Fails unless the result is a struct.
pub fn system_variables(result: &[Value]) -> Result<BTreeMap<String, Value>, ParseError> {
    Ok(expect_struct(first(result)?, "result")?.clone())
}

/// Parses `getAllScripts` into script names.
///
/// # Errors
///
/// Fails unless the result is an array.
pub fn scripts(result: &[Value]) -> Result<Vec<String>, ParseError> {
    Ok(expect_array(first(result)?, "result")?
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect())
}
