//! Transport-independent request and response shapes.
//!
//! Both wire protocols carry the same logical message: a method name with a
//! positional argument list, answered either by a positional result array or
//! by a fault struct with `faultCode` and `faultString` members.

use std::collections::BTreeMap;
use std::fmt;

use hmrpc_types::Value;

use crate::error::{Error, Result};

/// Fault code the gateway reports for a generic, unexplained failure.
pub const UNKNOWN_FAILURE: i32 = -1;
/// Fault code the gateway reports for a paramset it cannot serve.
pub const UNKNOWN_PARAMSET: i32 = -3;

/// Method name of the callback registration call.
pub const INIT_METHOD: &str = "init";

pub const FAULT_CODE: &str = "faultCode";
pub const FAULT_STRING: &str = "faultString";

/// An RPC call: method name plus ordered arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    method: String,
    params: Vec<Value>,
}

impl Request {
    #[must_use]
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            params: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_params(method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    /// Appends the next positional argument.
    #[must_use]
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }

    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    #[must_use]
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Callback registration requests must never be retried.
    #[must_use]
    pub fn is_init(&self) -> bool {
        self.method == INIT_METHOD
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.method)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{param}")?;
        }
        write!(f, ")")
    }
}

/// Fault reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub code: i32,
    pub message: String,
}

impl Fault {
    #[must_use]
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Reads a fault struct. Returns `None` unless the value is a struct with
    /// a `faultCode` member.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_struct()?;
        let code = map.get(FAULT_CODE)?;
        let code = match code {
            Value::Integer(i) => i32::try_from(*i).unwrap_or(UNKNOWN_FAILURE),
            Value::String(s) => s.trim().parse().unwrap_or(UNKNOWN_FAILURE),
            _ => UNKNOWN_FAILURE,
        };
        let message = map
            .get(FAULT_STRING)
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_default();
        Some(Self { code, message })
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = BTreeMap::new();
        map.insert(FAULT_CODE.to_string(), Value::from(self.code));
        map.insert(FAULT_STRING.to_string(), Value::from(self.message.as_str()));
        Value::Struct(map)
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.message)
    }
}

/// Decoded answer to a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Success(Vec<Value>),
    Fault(Fault),
}

impl Response {
    /// Builds a response from decoded result values.
    ///
    /// Some gateways report faults as a regular result whose first value is
    /// a fault struct; those are turned into `Response::Fault`.
    #[must_use]
    pub fn from_values(values: Vec<Value>) -> Self {
        match values.first().and_then(Fault::from_value) {
            Some(fault) => Response::Fault(fault),
            None => Response::Success(values),
        }
    }

    /// Converts the response into the result array, classifying faults.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownFailure` for code -1, `Error::UnknownParamset` for
    /// code -3 and `Error::Fault` for every other fault code.
    pub fn into_result(self, request: &Request) -> Result<Vec<Value>> {
        match self {
            Response::Success(values) => Ok(values),
            Response::Fault(fault) => Err(Error::from_fault(request.method(), fault)),
        }
    }
}
