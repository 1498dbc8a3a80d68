//! Engine.IO / Socket.IO 文本帧编解码
//!
//! 只处理默认命名空间的文本包; 二进制附件包报告为 Unsupported。

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum PacketError {
    #[error("empty packet")]
    Empty,
    #[error("unknown engine.io packet type `{0}`")]
    UnknownType(char),
    #[error("malformed packet: {0}")]
    Malformed(String),
}

/// 握手 (open 包) 参数, 时间单位毫秒
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default = "default_ping_interval")]
    pub ping_interval: u64,
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout: u64,
}

fn default_ping_interval() -> u64 {
    25_000
}

fn default_ping_timeout() -> u64 {
    60_000
}

/// Engine.IO 包
#[derive(Clone, Debug, PartialEq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping(String),
    Pong(String),
    Message(SocketPacket),
    Upgrade,
    Noop,
}

/// Socket.IO 包 (承载在 Engine.IO message 中)
#[derive(Clone, Debug, PartialEq)]
pub enum SocketPacket {
    Connect,
    Disconnect,
    Event { name: String, payload: Value },
    Ack,
    Error(String),
    Unsupported(char),
}

pub fn decode(text: &str) -> Result<EnginePacket, PacketError> {
    let mut chars = text.chars();
    let kind = chars.next().ok_or(PacketError::Empty)?;
    let body = chars.as_str();
    match kind {
        '0' => serde_json::from_str(body)
            .map(EnginePacket::Open)
            .map_err(|e| PacketError::Malformed(format!("open: {}", e))),
        '1' => Ok(EnginePacket::Close),
        '2' => Ok(EnginePacket::Ping(body.to_string())),
        '3' => Ok(EnginePacket::Pong(body.to_string())),
        '4' => decode_socket(body).map(EnginePacket::Message),
        '5' => Ok(EnginePacket::Upgrade),
        '6' => Ok(EnginePacket::Noop),
        other => Err(PacketError::UnknownType(other)),
    }
}

fn decode_socket(text: &str) -> Result<SocketPacket, PacketError> {
    let mut chars = text.chars();
    let kind = chars.next().ok_or(PacketError::Empty)?;
    let body = skip_namespace(chars.as_str());
    match kind {
        '0' => Ok(SocketPacket::Connect),
        '1' => Ok(SocketPacket::Disconnect),
        '2' => decode_event(body),
        '3' => Ok(SocketPacket::Ack),
        '4' => Ok(SocketPacket::Error(body.to_string())),
        other => Ok(SocketPacket::Unsupported(other)),
    }
}

/// "/ns,rest" → "rest"; 默认命名空间原样返回
fn skip_namespace(body: &str) -> &str {
    if body.starts_with('/') {
        match body.find(',') {
            Some(i) => &body[i + 1..],
            None => "",
        }
    } else {
        body
    }
}

/// `42<ack id>?["name", payload]`
fn decode_event(body: &str) -> Result<SocketPacket, PacketError> {
    let body = body.trim_start_matches(|c: char| c.is_ascii_digit());
    let items: Vec<Value> =
        serde_json::from_str(body).map_err(|e| PacketError::Malformed(format!("event: {}", e)))?;
    let mut items = items.into_iter();
    let name = match items.next() {
        Some(Value::String(name)) => name,
        other => {
            return Err(PacketError::Malformed(format!(
                "event name must be a string, got {:?}",
                other
            )))
        }
    };
    Ok(SocketPacket::Event {
        name,
        payload: items.next().unwrap_or(Value::Null),
    })
}

pub fn encode_event(name: &str, payload: &Value) -> String {
    format!("42{}", Value::Array(vec![Value::String(name.to_string()), payload.clone()]))
}

pub fn encode_ping() -> String {
    "2".to_string()
}

pub fn encode_pong(data: &str) -> String {
    format!("3{}", data)
}

pub fn encode_connect() -> String {
    "40".to_string()
}
