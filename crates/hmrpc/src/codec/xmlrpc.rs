//! XML-RPC document codec.
//!
//! Requests are serialized by hand; responses are parsed with `roxmltree`.
//! The configured charset is applied to the whole document in both
//! directions and announced in the XML declaration.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use hmrpc_types::Value;
use roxmltree::{Document, Node};

use super::{CodecError, MAX_MESSAGE_SIZE, MAX_NESTING_DEPTH};
use crate::charset::Charset;
use crate::protocol::{Fault, Request, Response};

/// Serializes a `methodCall` document.
///
/// # Errors
///
/// Returns `CodecError::NonFiniteDouble` if an argument is NaN or infinite.
pub fn encode_request(request: &Request, charset: Charset) -> Result<Vec<u8>, CodecError> {
    let mut xml = declaration(charset);
    xml.push_str("<methodCall><methodName>");
    escape_into(&mut xml, request.method());
    xml.push_str("</methodName><params>");
    for param in request.params() {
        xml.push_str("<param>");
        write_value(&mut xml, param)?;
        xml.push_str("</param>");
    }
    xml.push_str("</params></methodCall>");
    Ok(charset.encode(&xml))
}

/// Serializes a `methodResponse` document.
///
/// # Errors
///
/// Returns `CodecError::NonFiniteDouble` if a result value is NaN or infinite.
pub fn encode_response(response: &Response, charset: Charset) -> Result<Vec<u8>, CodecError> {
    let mut xml = declaration(charset);
    xml.push_str("<methodResponse>");
    match response {
        Response::Success(values) => {
            xml.push_str("<params>");
            for value in values {
                xml.push_str("<param>");
                write_value(&mut xml, value)?;
                xml.push_str("</param>");
            }
            xml.push_str("</params>");
        }
        Response::Fault(fault) => {
            xml.push_str("<fault>");
            write_value(&mut xml, &fault.to_value())?;
            xml.push_str("</fault>");
        }
    }
    xml.push_str("</methodResponse>");
    Ok(charset.encode(&xml))
}

/// Parses a `methodResponse` document.
///
/// # Errors
///
/// Returns a `CodecError` if the bytes are not a well-formed XML-RPC response.
pub fn decode_response(bytes: &[u8], charset: Charset) -> Result<Response, CodecError> {
    let text = decode_text(bytes, charset)?;
    let doc = Document::parse(&text)?;
    let root = doc.root_element();
    expect_tag(root, "methodResponse")?;

    if let Some(fault) = child_element(root, "fault") {
        let value = parse_value(required_child(fault, "value")?, 0)?;
        let fault = Fault::from_value(&value).ok_or(CodecError::InvalidFault)?;
        return Ok(Response::Fault(fault));
    }

    let values = match child_element(root, "params") {
        Some(params) => parse_params(params)?,
        None => Vec::new(),
    };
    Ok(Response::from_values(values))
}

/// Parses a `methodCall` document.
///
/// # Errors
///
/// Returns a `CodecError` if the bytes are not a well-formed XML-RPC call.
pub fn decode_request(bytes: &[u8], charset: Charset) -> Result<Request, CodecError> {
    let text = decode_text(bytes, charset)?;
    let doc = Document::parse(&text)?;
    let root = doc.root_element();
    expect_tag(root, "methodCall")?;

    let method = required_child(root, "methodName")?
        .text()
        .unwrap_or_default()
        .trim()
        .to_string();
    let params = match child_element(root, "params") {
        Some(params) => parse_params(params)?,
        None => Vec::new(),
    };
    Ok(Request::with_params(method, params))
}

fn declaration(charset: Charset) -> String {
    format!("<?xml version=\"1.0\" encoding=\"{}\"?>", charset.name())
}

fn decode_text(bytes: &[u8], charset: Charset) -> Result<String, CodecError> {
    if bytes.len() > MAX_MESSAGE_SIZE {
        return Err(CodecError::MessageTooLarge(bytes.len()));
    }
    charset.decode(bytes)
}

fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#13;"),
            _ => out.push(c),
        }
    }
}

fn write_value(out: &mut String, value: &Value) -> Result<(), CodecError> {
    out.push_str("<value>");
    match value {
        Value::Integer(i) => {
            let tag = if i32::try_from(*i).is_ok() { "i4" } else { "i8" };
            let _ = write!(out, "<{tag}>{i}</{tag}>");
        }
        Value::Bool(b) => {
            let _ = write!(out, "<boolean>{}</boolean>", u8::from(*b));
        }
        Value::String(s) => {
            out.push_str("<string>");
            escape_into(out, s);
            out.push_str("</string>");
        }
        Value::Double(d) => {
            if !d.is_finite() {
                return Err(CodecError::NonFiniteDouble(*d));
            }
            let _ = write!(out, "<double>{d}</double>");
        }
        Value::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                write_value(out, item)?;
            }
            out.push_str("</data></array>");
        }
        Value::Struct(map) => {
            out.push_str("<struct>");
            for (name, item) in map {
                out.push_str("<member><name>");
                escape_into(out, name);
                out.push_str("</name>");
                write_value(out, item)?;
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
    }
    out.push_str("</value>");
    Ok(())
}

fn elements<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(Node::is_element)
}

fn child_element<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    elements(node).find(|n| n.tag_name().name() == name)
}

fn required_child<'a, 'input>(
    node: Node<'a, 'input>,
    name: &str,
) -> Result<Node<'a, 'input>, CodecError> {
    child_element(node, name).ok_or_else(|| {
        CodecError::InvalidDocument(format!(
            "<{}> without <{name}>",
            node.tag_name().name()
        ))
    })
}

fn expect_tag(node: Node, name: &str) -> Result<(), CodecError> {
    if node.tag_name().name() == name {
        Ok(())
    } else {
        Err(CodecError::InvalidDocument(format!(
            "expected <{name}>, found <{}>",
            node.tag_name().name()
        )))
    }
}

fn parse_params(params: Node) -> Result<Vec<Value>, CodecError> {
    elements(params)
        .filter(|n| n.tag_name().name() == "param")
        .map(|param| parse_value(required_child(param, "value")?, 0))
        .collect()
}

fn parse_value(node: Node, depth: usize) -> Result<Value, CodecError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(CodecError::NestingTooDeep(MAX_NESTING_DEPTH));
    }
    // A bare <value>text</value> is a string
    let Some(typed) = elements(node).next() else {
        return Ok(Value::String(node.text().unwrap_or_default().to_string()));
    };

    let text = typed.text().unwrap_or_default();
    match typed.tag_name().name() {
        "i4" | "int" | "i8" => text
            .trim()
            .parse()
            .map(Value::Integer)
            .map_err(|_| invalid_scalar("integer", text)),
        "boolean" => match text.trim() {
            "1" | "true" => Ok(Value::Bool(true)),
            "0" | "false" => Ok(Value::Bool(false)),
            _ => Err(invalid_scalar("boolean", text)),
        },
        "double" => text
            .trim()
            .parse()
            .map(Value::Double)
            .map_err(|_| invalid_scalar("double", text)),
        "string" | "dateTime.iso8601" => Ok(Value::String(text.to_string())),
        "array" => {
            let data = required_child(typed, "data")?;
            elements(data)
                .filter(|n| n.tag_name().name() == "value")
                .map(|item| parse_value(item, depth + 1))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        "struct" => {
            let mut map = BTreeMap::new();
            for member in elements(typed).filter(|n| n.tag_name().name() == "member") {
                let name = required_child(member, "name")?
                    .text()
                    .unwrap_or_default()
                    .to_string();
                let value = parse_value(required_child(member, "value")?, depth + 1)?;
                map.insert(name, value);
            }
            Ok(Value::Struct(map))
        }
        other => Err(CodecError::InvalidDocument(format!(
            "unsupported value type <{other}>"
        ))),
    }
}

fn invalid_scalar(kind: &str, text: &str) -> CodecError {
    CodecError::InvalidDocument(format!("invalid {kind} '{text}'"))
}
