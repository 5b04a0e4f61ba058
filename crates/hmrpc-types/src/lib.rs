//! Shared types for the Homematic gateway RPC layer.
//!
//! This crate provides the device tree (devices, channels, datapoints), the
//! dynamically typed RPC [`Value`], and the gateway descriptors produced by
//! discovery. All types are serializable so collaborators can export them.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Channel number used for the device-level configuration channel.
///
/// This channel addresses the device itself and only carries a MASTER paramset.
pub const CONFIGURATION_CHANNEL_NUMBER: i32 = -1;

/// A dynamically typed RPC value as carried by both wire protocols.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Array(Vec<Value>),
    Struct(BTreeMap<String, Value>),
}

impl Value {
    /// Whether the value means "false": `false`, zero, or the strings
    /// `"false"`/`"0"` in any case.
    #[must_use]
    pub fn is_false(&self) -> bool {
        match self {
            Value::Bool(b) => !*b,
            Value::Integer(i) => *i == 0,
            Value::Double(d) => *d == 0.0,
            Value::String(s) => {
                let s = s.trim();
                s.eq_ignore_ascii_case("false") || s == "0"
            }
            Value::Array(_) | Value::Struct(_) => false,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view of the value; integers widen to `f64`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Gateway integers are far below 2^52
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_struct(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Struct(map) => Some(map),
            _ => None,
        }
    }

    /// Name of the value's type, used in parse error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Struct(_) => "struct",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Double(d) => write!(f, "{d}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Struct(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}={value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Struct(map)
    }
}

/// Error returned when parsing one of the enumerations in this crate from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {}: '{}'", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

/// A logical endpoint on the gateway, each bound to its own port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Interface {
    /// BidCos radio
    Rf,
    Wired,
    Hmip,
    /// Virtual devices of the CUxD addon
    Cuxd,
    Group,
}

impl Interface {
    pub const ALL: [Interface; 5] = [
        Interface::Rf,
        Interface::Wired,
        Interface::Hmip,
        Interface::Cuxd,
        Interface::Group,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Interface::Rf => "RF",
            Interface::Wired => "WIRED",
            Interface::Hmip => "HMIP",
            Interface::Cuxd => "CUXD",
            Interface::Group => "GROUP",
        }
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interface {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Interface::ALL
            .into_iter()
            .find(|i| i.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownVariant {
                kind: "interface",
                value: s.to_string(),
            })
    }
}

/// Wire protocol used to reach an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferMode {
    BinRpc,
    XmlRpc,
}

impl fmt::Display for TransferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferMode::BinRpc => f.write_str("BIN_RPC"),
            TransferMode::XmlRpc => f.write_str("XML_RPC"),
        }
    }
}

/// Named parameter group on a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ParamsetType {
    /// Live state
    Values,
    /// Persisted configuration
    Master,
}

impl ParamsetType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ParamsetType::Values => "VALUES",
            ParamsetType::Master => "MASTER",
        }
    }
}

impl fmt::Display for ParamsetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParamsetType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("VALUES") {
            Ok(ParamsetType::Values)
        } else if s.eq_ignore_ascii_case("MASTER") {
            Ok(ParamsetType::Master)
        } else {
            Err(UnknownVariant {
                kind: "paramset type",
                value: s.to_string(),
            })
        }
    }
}

/// Declared data type of a datapoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValueType {
    Bool,
    Action,
    Integer,
    Float,
    Enum,
    String,
}

impl FromStr for ValueType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BOOL" => Ok(ValueType::Bool),
            "ACTION" => Ok(ValueType::Action),
            "INTEGER" => Ok(ValueType::Integer),
            "FLOAT" => Ok(ValueType::Float),
            "ENUM" => Ok(ValueType::Enum),
            "STRING" => Ok(ValueType::String),
            _ => Err(UnknownVariant {
                kind: "value type",
                value: s.to_string(),
            }),
        }
    }
}

/// A single named, typed parameter of one channel and paramset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datapoint {
    pub name: String,
    pub paramset_type: ParamsetType,
    pub value_type: ValueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    pub readable: bool,
    pub writable: bool,
    /// Datapoint synthesized locally, unknown to the gateway
    #[serde(rename = "virtual", default)]
    pub is_virtual: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    /// Option names of an ENUM datapoint, indexed by value
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl Datapoint {
    #[must_use]
    pub fn new(name: impl Into<String>, paramset_type: ParamsetType, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            paramset_type,
            value_type,
            value: None,
            readable: true,
            writable: true,
            is_virtual: false,
            unit: None,
            min: None,
            max: None,
            default_value: None,
            options: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_integer_type(&self) -> bool {
        matches!(self.value_type, ValueType::Integer | ValueType::Enum)
    }

    #[must_use]
    pub fn is_read_only(&self) -> bool {
        !self.writable
    }
}

/// A numbered sub-unit of a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub device_address: String,
    pub interface: Interface,
    pub number: i32,
    #[serde(rename = "type")]
    pub channel_type: String,
    #[serde(default)]
    pub datapoints: Vec<Datapoint>,
}

impl Channel {
    #[must_use]
    pub fn new(
        device_address: impl Into<String>,
        interface: Interface,
        number: i32,
        channel_type: impl Into<String>,
    ) -> Self {
        Self {
            device_address: device_address.into(),
            interface,
            number,
            channel_type: channel_type.into(),
            datapoints: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_configuration_channel(&self) -> bool {
        self.number == CONFIGURATION_CHANNEL_NUMBER
    }

    /// Address as shown to users: `<device>:<number>`, or the bare device
    /// address for the configuration channel.
    #[must_use]
    pub fn address(&self) -> String {
        if self.is_configuration_channel() {
            self.device_address.clone()
        } else {
            format!("{}:{}", self.device_address, self.number)
        }
    }

    #[must_use]
    pub fn datapoint(&self, paramset_type: ParamsetType, name: &str) -> Option<&Datapoint> {
        self.datapoints
            .iter()
            .find(|dp| dp.paramset_type == paramset_type && dp.name == name)
    }

    pub fn datapoint_mut(&mut self, paramset_type: ParamsetType, name: &str) -> Option<&mut Datapoint> {
        self.datapoints
            .iter_mut()
            .find(|dp| dp.paramset_type == paramset_type && dp.name == name)
    }

    /// Adds a datapoint, replacing an existing one with the same name and paramset.
    pub fn add_datapoint(&mut self, datapoint: Datapoint) {
        match self.datapoint_mut(datapoint.paramset_type, &datapoint.name) {
            Some(existing) => *existing = datapoint,
            None => self.datapoints.push(datapoint),
        }
    }

    pub fn remove_value_datapoints(&mut self) {
        self.datapoints
            .retain(|dp| dp.paramset_type != ParamsetType::Values);
    }
}

/// A physical or virtual unit on one interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub address: String,
    pub interface: Interface,
    #[serde(rename = "type")]
    pub device_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firmware: Option<String>,
    /// Gateway-internal identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub channels: Vec<Channel>,
}

impl Device {
    #[must_use]
    pub fn new(address: impl Into<String>, interface: Interface, device_type: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            interface,
            device_type: device_type.into(),
            firmware: None,
            id: None,
            channels: Vec::new(),
        }
    }

    #[must_use]
    pub fn channel(&self, number: i32) -> Option<&Channel> {
        self.channels.iter().find(|c| c.number == number)
    }

    pub fn channel_mut(&mut self, number: i32) -> Option<&mut Channel> {
        self.channels.iter_mut().find(|c| c.number == number)
    }

    pub fn add_channel(&mut self, channel: Channel) {
        match self.channel_mut(channel.number) {
            Some(existing) => *existing = channel,
            None => self.channels.push(channel),
        }
    }
}

/// Gateway firmware family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayId {
    Ccu,
    Homegear,
    /// Any other gateway speaking the Homematic RPC API
    Default,
}

impl fmt::Display for GatewayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayId::Ccu => f.write_str("CCU"),
            GatewayId::Homegear => f.write_str("HOMEGEAR"),
            GatewayId::Default => f.write_str("DEFAULT"),
        }
    }
}

/// Identity and reachable interfaces of the gateway, computed once at setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayInfo {
    pub id: GatewayId,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub gateway_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firmware: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default)]
    pub interfaces: BTreeSet<Interface>,
}

impl GatewayInfo {
    #[must_use]
    pub fn new(id: GatewayId) -> Self {
        Self {
            id,
            gateway_type: None,
            firmware: None,
            address: None,
            interfaces: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn is_ccu(&self) -> bool {
        self.id == GatewayId::Ccu
    }

    #[must_use]
    pub fn is_homegear(&self) -> bool {
        self.id == GatewayId::Homegear
    }

    #[must_use]
    pub fn has_interface(&self, interface: Interface) -> bool {
        self.interfaces.contains(&interface)
    }

    /// Wire protocol per usable interface for this gateway family.
    ///
    /// RF is always present. Homegear serves everything over BIN-RPC on the RF
    /// port. A CCU uses BIN-RPC for the BidCos interfaces and CUxD and XML-RPC
    /// for HmIP and groups. Other gateways speak XML-RPC only and never expose
    /// CUxD or groups.
    #[must_use]
    pub fn transfer_modes(&self) -> BTreeMap<Interface, TransferMode> {
        let mut modes = BTreeMap::new();
        match self.id {
            GatewayId::Homegear => {
                modes.insert(Interface::Rf, TransferMode::BinRpc);
            }
            GatewayId::Ccu => {
                modes.insert(Interface::Rf, TransferMode::BinRpc);
                for (interface, mode) in [
                    (Interface::Wired, TransferMode::BinRpc),
                    (Interface::Hmip, TransferMode::XmlRpc),
                    (Interface::Cuxd, TransferMode::BinRpc),
                    (Interface::Group, TransferMode::XmlRpc),
                ] {
                    if self.has_interface(interface) {
                        modes.insert(interface, mode);
                    }
                }
            }
            GatewayId::Default => {
                modes.insert(Interface::Rf, TransferMode::XmlRpc);
                for interface in [Interface::Wired, Interface::Hmip] {
                    if self.has_interface(interface) {
                        modes.insert(interface, TransferMode::XmlRpc);
                    }
                }
            }
        }
        modes
    }
}

impl fmt::Display for GatewayInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let interfaces: Vec<&str> = self.interfaces.iter().map(|i| i.as_str()).collect();
        write!(
            f,
            "{} (type: {}, firmware: {}, address: {}, interfaces: {})",
            self.id,
            self.gateway_type.as_deref().unwrap_or("-"),
            self.firmware.as_deref().unwrap_or("-"),
            self.address.as_deref().unwrap_or("-"),
            interfaces.join(", ")
        )
    }
}

/// Signal strength between a device and one of its peers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RssiInfo {
    pub address: String,
    pub peer: String,
    /// RSSI as received by the device, `None` when there is no reading
    pub device_rssi: Option<i32>,
    /// RSSI as received by the peer, `None` when there is no reading
    pub peer_rssi: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_is_false() {
        for value in [
            Value::from(false),
            Value::from(0),
            Value::from(0.0),
            Value::from("false"),
            Value::from("FALSE"),
            Value::from("0"),
        ] {
            assert!(value.is_false(), "{value:?}");
        }
        for value in [
            Value::from(true),
            Value::from(1),
            Value::from("true"),
            Value::from(""),
            Value::Array(vec![]),
        ] {
            assert!(!value.is_false(), "{value:?}");
        }
    }

    #[test]
    fn test_interface_from_str_case_insensitive() {
        assert_eq!("rf".parse::<Interface>().unwrap(), Interface::Rf);
        assert_eq!("HmIp".parse::<Interface>().unwrap(), Interface::Hmip);
        assert!("zigbee".parse::<Interface>().is_err());
    }

    #[test]
    fn test_paramset_type_display() {
        assert_eq!(ParamsetType::Values.to_string(), "VALUES");
        assert_eq!(ParamsetType::Master.to_string(), "MASTER");
        assert_eq!("master".parse::<ParamsetType>().unwrap(), ParamsetType::Master);
    }

    #[test]
    fn test_value_type_parse() {
        assert_eq!("FLOAT".parse::<ValueType>().unwrap(), ValueType::Float);
        assert_eq!("enum".parse::<ValueType>().unwrap(), ValueType::Enum);
        let err = "DUMMY".parse::<ValueType>().unwrap_err();
        assert_eq!(err.to_string(), "unknown value type: 'DUMMY'");
    }

    #[test]
    fn test_channel_address() {
        let channel = Channel::new("LEQ0123456", Interface::Rf, 3, "SWITCH");
        assert_eq!(channel.address(), "LEQ0123456:3");

        let config = Channel::new("LEQ0123456", Interface::Rf, CONFIGURATION_CHANNEL_NUMBER, "");
        assert!(config.is_configuration_channel());
        assert_eq!(config.address(), "LEQ0123456");
    }

    #[test]
    fn test_add_datapoint_replaces_same_name_and_paramset() {
        let mut channel = Channel::new("ABC", Interface::Rf, 1, "SWITCH");
        channel.add_datapoint(Datapoint::new("STATE", ParamsetType::Values, ValueType::Bool));
        channel.add_datapoint(Datapoint::new("STATE", ParamsetType::Master, ValueType::Bool));

        let mut replacement = Datapoint::new("STATE", ParamsetType::Values, ValueType::Bool);
        replacement.writable = false;
        channel.add_datapoint(replacement);

        assert_eq!(channel.datapoints.len(), 2);
        assert!(channel.datapoint(ParamsetType::Values, "STATE").unwrap().is_read_only());
    }

    #[test]
    fn test_remove_value_datapoints() {
        let mut channel = Channel::new("ABC", Interface::Rf, 1, "SWITCH");
        channel.add_datapoint(Datapoint::new("STATE", ParamsetType::Values, ValueType::Bool));
        channel.add_datapoint(Datapoint::new("AES_ACTIVE", ParamsetType::Master, ValueType::Bool));
        channel.remove_value_datapoints();

        assert_eq!(channel.datapoints.len(), 1);
        assert_eq!(channel.datapoints[0].name, "AES_ACTIVE");
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::from(5).as_i64(), Some(5));
        assert_eq!(Value::from(5).as_f64(), Some(5.0));
        assert_eq!(Value::from("x").as_str(), Some("x"));
        assert_eq!(Value::from(true).as_bool(), Some(true));
        assert!(Value::from(1.5).as_i64().is_none());
        assert_eq!(Value::from(vec![Value::from(1)]).type_name(), "array");
    }

    #[test]
    fn test_value_display() {
        let mut map = BTreeMap::new();
        map.insert("LEVEL".to_string(), Value::from(0.5));
        map.insert("ON".to_string(), Value::from(true));
        let value = Value::Array(vec![Value::from(1), Value::Struct(map)]);
        assert_eq!(value.to_string(), "[1, {LEVEL=0.5, ON=true}]");
    }

    #[test]
    fn test_value_json_shape() {
        let value = Value::Array(vec![Value::from(1), Value::from("a"), Value::from(false)]);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"[1,"a",false]"#);
    }

    #[test]
    fn test_transfer_modes_homegear() {
        let mut info = GatewayInfo::new(GatewayId::Homegear);
        info.interfaces.insert(Interface::Rf);
        info.interfaces.insert(Interface::Hmip);

        let modes = info.transfer_modes();
        assert_eq!(modes.len(), 1);
        assert_eq!(modes[&Interface::Rf], TransferMode::BinRpc);
    }

    #[test]
    fn test_transfer_modes_ccu() {
        let mut info = GatewayInfo::new(GatewayId::Ccu);
        info.interfaces.extend([Interface::Hmip, Interface::Cuxd, Interface::Group]);

        let modes = info.transfer_modes();
        assert_eq!(modes[&Interface::Rf], TransferMode::BinRpc);
        assert_eq!(modes[&Interface::Hmip], TransferMode::XmlRpc);
        assert_eq!(modes[&Interface::Cuxd], TransferMode::BinRpc);
        assert_eq!(modes[&Interface::Group], TransferMode::XmlRpc);
        assert!(!modes.contains_key(&Interface::Wired));
    }

    #[test]
    fn test_transfer_modes_default_ignores_cuxd_and_group() {
        let mut info = GatewayInfo::new(GatewayId::Default);
        info.interfaces.extend(Interface::ALL);

        let modes = info.transfer_modes();
        assert_eq!(modes.len(), 3);
        assert!(!modes.contains_key(&Interface::Cuxd));
        assert!(!modes.contains_key(&Interface::Group));
    }

    #[test]
    fn test_gateway_info_display() {
        let mut info = GatewayInfo::new(GatewayId::Ccu);
        info.gateway_type = Some("CCU3".to_string());
        info.firmware = Some("3.61.7".to_string());
        info.interfaces.extend([Interface::Rf, Interface::Hmip]);

        assert_eq!(
            info.to_string(),
            "CCU (type: CCU3, firmware: 3.61.7, address: -, interfaces: RF, HMIP)"
        );
    }
}
