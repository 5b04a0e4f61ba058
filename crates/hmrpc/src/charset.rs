//! Character encodings supported on the wire.
//!
//! Gateways default to ISO-8859-1; Homegear installations are often
//! configured for UTF-8. The same charset applies to BIN-RPC strings and to
//! whole XML-RPC documents.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::codec::CodecError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Charset {
    #[default]
    Latin1,
    Utf8,
}

impl Charset {
    /// Canonical name, as used in `Content-Type` and XML declarations.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Charset::Latin1 => "ISO-8859-1",
            Charset::Utf8 => "UTF-8",
        }
    }

    /// Encodes text; characters outside ISO-8859-1 become `?`.
    #[must_use]
    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            Charset::Utf8 => text.as_bytes().to_vec(),
            Charset::Latin1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
                .collect(),
        }
    }

    /// Decodes bytes received from the gateway.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Utf8` when UTF-8 is configured and the bytes are invalid.
    pub fn decode(self, bytes: &[u8]) -> Result<String, CodecError> {
        match self {
            Charset::Utf8 => Ok(std::str::from_utf8(bytes)?.to_string()),
            Charset::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Charset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('_', "-").as_str() {
            "ISO-8859-1" | "ISO8859-1" | "LATIN1" | "LATIN-1" => Ok(Charset::Latin1),
            "UTF-8" | "UTF8" => Ok(Charset::Utf8),
            _ => Err(format!("unsupported charset: {s}")),
        }
    }
}

impl TryFrom<String> for Charset {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Charset> for String {
    fn from(charset: Charset) -> Self {
        charset.name().to_string()
    }
}
