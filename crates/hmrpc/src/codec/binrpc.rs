//! BIN-RPC codec for long-lived TCP sockets.
//!
//! Frame format:
//! ```text
//! +-------+------+-----------------+------------------+
//! | "Bin" | kind | 4 bytes         | N bytes          |
//! |       |      | (body length BE)| (body)           |
//! +-------+------+-----------------+------------------+
//! ```
//!
//! `kind` is `0x00` for requests, `0x01` for responses and `0xFF` for faults.
//! A request body is the method name (u32 length + bytes), the argument count
//! (u32) and the arguments; a response body is a single value. Every value
//! starts with a big-endian u32 type tag.

use std::collections::BTreeMap;

use bytes::{Buf, BufMut, BytesMut};
use hmrpc_types::Value;
use tokio_util::codec::{Decoder, Encoder};

use super::{CodecError, MAX_MESSAGE_SIZE, MAX_NESTING_DEPTH};
use crate::charset::Charset;
use crate::protocol::{Fault, Request, Response};

const MAGIC: &[u8; 3] = b"Bin";
const HEADER_SIZE: usize = 8;

const KIND_REQUEST: u8 = 0x00;
const KIND_RESPONSE: u8 = 0x01;
const KIND_FAULT: u8 = 0xff;

const TYPE_INTEGER: u32 = 0x01;
const TYPE_BOOL: u32 = 0x02;
const TYPE_STRING: u32 = 0x03;
const TYPE_DOUBLE: u32 = 0x04;
const TYPE_INTEGER64: u32 = 0xd1;
const TYPE_ARRAY: u32 = 0x100;
const TYPE_STRUCT: u32 = 0x101;

/// Scale of the 30-bit double mantissa
const MANTISSA_SCALE: f64 = 1_073_741_824.0;

/// One BIN-RPC frame
#[derive(Debug, Clone, PartialEq)]
pub enum BinRpcMessage {
    Request(Request),
    Response(Value),
    Fault(Fault),
}

impl BinRpcMessage {
    /// Converts a frame read from the gateway into a [`Response`].
    ///
    /// # Errors
    ///
    /// Returns `CodecError::UnexpectedMessage` if the gateway sent a request.
    pub fn into_response(self) -> Result<Response, CodecError> {
        match self {
            BinRpcMessage::Response(value) => Ok(Response::from_values(vec![value])),
            BinRpcMessage::Fault(fault) => Ok(Response::Fault(fault)),
            BinRpcMessage::Request(_) => Err(CodecError::UnexpectedMessage("request")),
        }
    }
}

/// Codec for BIN-RPC frames
#[derive(Debug, Default, Clone, Copy)]
pub struct BinRpcCodec {
    charset: Charset,
}

impl BinRpcCodec {
    #[must_use]
    pub fn new(charset: Charset) -> Self {
        Self { charset }
    }
}

impl Decoder for BinRpcCodec {
    type Item = BinRpcMessage;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_SIZE {
            return Ok(None);
        }

        if &src[..3] != MAGIC {
            return Err(CodecError::InvalidHeader([src[0], src[1], src[2]]));
        }

        let kind = src[3];
        let length = u32::from_be_bytes([src[4], src[5], src[6], src[7]]) as usize;

        if length > MAX_MESSAGE_SIZE {
            return Err(CodecError::MessageTooLarge(length));
        }

        if src.len() < HEADER_SIZE + length {
            src.reserve(HEADER_SIZE + length - src.len());
            return Ok(None);
        }

        src.advance(HEADER_SIZE);
        let body = src.split_to(length);
        let mut reader = ValueReader {
            buf: &body[..],
            charset: self.charset,
        };

        let message = match kind {
            KIND_REQUEST => {
                let method = reader.read_string()?;
                let count = reader.read_u32("argument count")? as usize;
                let mut params = Vec::with_capacity(count.min(reader.buf.len()));
                for _ in 0..count {
                    params.push(reader.read_value(0)?);
                }
                BinRpcMessage::Request(Request::with_params(method, params))
            }
            // Void methods may answer with an empty body
            KIND_RESPONSE if body.is_empty() => BinRpcMessage::Response(Value::String(String::new())),
            KIND_RESPONSE => BinRpcMessage::Response(reader.read_value(0)?),
            KIND_FAULT => {
                let value = reader.read_value(0)?;
                BinRpcMessage::Fault(Fault::from_value(&value).ok_or(CodecError::InvalidFault)?)
            }
            other => return Err(CodecError::UnsupportedMessageType(other)),
        };

        Ok(Some(message))
    }
}

impl Encoder<BinRpcMessage> for BinRpcCodec {
    type Error = CodecError;

    // Body size is checked against MAX_MESSAGE_SIZE (fits in u32)
    #[allow(clippy::cast_possible_truncation)]
    fn encode(&mut self, item: BinRpcMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let mut body = BytesMut::new();
        let kind = match &item {
            BinRpcMessage::Request(request) => {
                put_string(&mut body, request.method(), self.charset);
                body.put_u32(request.params().len() as u32);
                for param in request.params() {
                    put_value(&mut body, param, self.charset)?;
                }
                KIND_REQUEST
            }
            BinRpcMessage::Response(value) => {
                put_value(&mut body, value, self.charset)?;
                KIND_RESPONSE
            }
            BinRpcMessage::Fault(fault) => {
                put_value(&mut body, &fault.to_value(), self.charset)?;
                KIND_FAULT
            }
        };

        if body.len() > MAX_MESSAGE_SIZE {
            return Err(CodecError::MessageTooLarge(body.len()));
        }

        dst.reserve(HEADER_SIZE + body.len());
        dst.put_slice(MAGIC);
        dst.put_u8(kind);
        dst.put_u32(body.len() as u32);
        dst.put_slice(&body);

        Ok(())
    }
}

// Lengths are bounded by MAX_MESSAGE_SIZE before a frame is written
#[allow(clippy::cast_possible_truncation)]
fn put_string(dst: &mut BytesMut, text: &str, charset: Charset) {
    let bytes = charset.encode(text);
    dst.put_u32(bytes.len() as u32);
    dst.put_slice(&bytes);
}

#[allow(clippy::cast_possible_truncation)]
fn put_value(dst: &mut BytesMut, value: &Value, charset: Charset) -> Result<(), CodecError> {
    match value {
        Value::Integer(i) => match i32::try_from(*i) {
            Ok(small) => {
                dst.put_u32(TYPE_INTEGER);
                dst.put_i32(small);
            }
            Err(_) => {
                dst.put_u32(TYPE_INTEGER64);
                dst.put_i64(*i);
            }
        },
        Value::Bool(b) => {
            dst.put_u32(TYPE_BOOL);
            dst.put_u8(u8::from(*b));
        }
        Value::String(s) => {
            dst.put_u32(TYPE_STRING);
            put_string(dst, s, charset);
        }
        Value::Double(d) => {
            let (mantissa, exponent) = encode_double(*d)?;
            dst.put_u32(TYPE_DOUBLE);
            dst.put_i32(mantissa);
            dst.put_i32(exponent);
        }
        Value::Array(items) => {
            dst.put_u32(TYPE_ARRAY);
            dst.put_u32(items.len() as u32);
            for item in items {
                put_value(dst, item, charset)?;
            }
        }
        Value::Struct(map) => {
            dst.put_u32(TYPE_STRUCT);
            dst.put_u32(map.len() as u32);
            for (key, item) in map {
                put_string(dst, key, charset);
                put_value(dst, item, charset)?;
            }
        }
    }
    Ok(())
}

/// Splits a double into the gateway's mantissa/exponent pair.
///
/// The magnitude is normalized to `[0.5, 1)` and scaled by 2^30.
// Normalized mantissa times 2^30 always fits in i32
#[allow(clippy::cast_possible_truncation)]
fn encode_double(value: f64) -> Result<(i32, i32), CodecError> {
    if !value.is_finite() {
        return Err(CodecError::NonFiniteDouble(value));
    }

    let mut tmp = value.abs();
    let mut exponent = 0i32;
    if tmp != 0.0 && tmp < 0.5 {
        while tmp < 0.5 {
            tmp *= 2.0;
            exponent -= 1;
        }
    } else {
        while tmp >= 1.0 {
            tmp /= 2.0;
            exponent += 1;
        }
    }
    if value.is_sign_negative() {
        tmp = -tmp;
    }

    Ok(((tmp * MANTISSA_SCALE).round() as i32, exponent))
}

fn decode_double(mantissa: i32, exponent: i32) -> f64 {
    f64::from(mantissa) / MANTISSA_SCALE * 2f64.powi(exponent)
}

struct ValueReader<'a> {
    buf: &'a [u8],
    charset: Charset,
}

impl ValueReader<'_> {
    fn need(&self, n: usize, what: &'static str) -> Result<(), CodecError> {
        if self.buf.remaining() < n {
            Err(CodecError::Truncated(what))
        } else {
            Ok(())
        }
    }

    fn read_u32(&mut self, what: &'static str) -> Result<u32, CodecError> {
        self.need(4, what)?;
        Ok(self.buf.get_u32())
    }

    fn read_string(&mut self) -> Result<String, CodecError> {
        let len = self.read_u32("string length")? as usize;
        self.need(len, "string")?;
        let text = self.charset.decode(&self.buf[..len])?;
        self.buf.advance(len);
        Ok(text)
    }

    fn read_value(&mut self, depth: usize) -> Result<Value, CodecError> {
        if depth > MAX_NESTING_DEPTH {
            return Err(CodecError::NestingTooDeep(MAX_NESTING_DEPTH));
        }
        let tag = self.read_u32("value type")?;
        match tag {
            TYPE_INTEGER => {
                self.need(4, "integer")?;
                Ok(Value::Integer(i64::from(self.buf.get_i32())))
            }
            TYPE_INTEGER64 => {
                self.need(8, "integer64")?;
                Ok(Value::Integer(self.buf.get_i64()))
            }
            TYPE_BOOL => {
                self.need(1, "bool")?;
                Ok(Value::Bool(self.buf.get_u8() != 0))
            }
            TYPE_STRING => Ok(Value::String(self.read_string()?)),
            TYPE_DOUBLE => {
                self.need(8, "double")?;
                let mantissa = self.buf.get_i32();
                let exponent = self.buf.get_i32();
                Ok(Value::Double(decode_double(mantissa, exponent)))
            }
            TYPE_ARRAY => {
                let count = self.read_u32("array length")? as usize;
                let mut items = Vec::with_capacity(count.min(self.buf.len()));
                for _ in 0..count {
                    items.push(self.read_value(depth + 1)?);
                }
                Ok(Value::Array(items))
            }
            TYPE_STRUCT => {
                let count = self.read_u32("struct length")? as usize;
                let mut map = BTreeMap::new();
                for _ in 0..count {
                    let key = self.read_string()?;
                    let value = self.read_value(depth + 1)?;
                    map.insert(key, value);
                }
                Ok(Value::Struct(map))
            }
            other => Err(CodecError::UnknownValueType(other)),
        }
    }
}
