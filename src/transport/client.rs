//! Socket.IO 同步客户端
//! Blocking Socket.IO client over a plain WebSocket (no polling transport)
use std::io::ErrorKind;
use std::net::TcpStream;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use serde_json::Value;
use tracing::{debug, info, warn};
use tungstenite::{Message, WebSocket};

use super::packet::{self, EnginePacket, Handshake, SocketPacket};
use super::EventSink;

/// 读超时: 空闲时也能按时发送心跳
const READ_TIMEOUT: Duration = Duration::from_millis(200);
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SocketIoClient {
    socket: WebSocket<TcpStream>,
    eio: u8,
    handshake: Handshake,
    last_ping: Instant,
    last_packet: Instant, // 最近一次收到任意数据包
}

impl SocketIoClient {
    /// 建立连接并完成 Engine.IO 握手
    pub fn connect(host: &str, port: u16, eio: u8) -> Result<Self> {
        if eio != 3 && eio != 4 {
            bail!("不支持的 Engine.IO 版本: {}", eio);
        }

        let addr = format!("{}:{}", host, port);
        let stream = TcpStream::connect(&addr).with_context(|| format!("无法连接 {}", addr))?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT))?;

        let url = format!("ws://{}/socket.io/?EIO={}&transport=websocket", addr, eio);
        let (mut socket, _response) = tungstenite::client(url.as_str(), stream)
            .map_err(|e| anyhow!("WebSocket 握手失败: {}", e))?;

        let handshake = loop {
            match socket.read()? {
                Message::Text(text) => match packet::decode(&text) {
                    Ok(EnginePacket::Open(handshake)) => break handshake,
                    Ok(other) => debug!("握手前忽略: {:?}", other),
                    Err(e) => bail!("握手包解析失败: {}", e),
                },
                Message::Close(_) => bail!("服务端在握手阶段关闭连接"),
                _ => {}
            }
        };

        // EIO 4 需要客户端主动加入默认命名空间
        if eio == 4 {
            socket.send(Message::Text(packet::encode_connect()))?;
        }
        socket.get_ref().set_read_timeout(Some(READ_TIMEOUT))?;

        info!(
            "🔌 connect {} (sid={}, ping={}ms)",
            addr, handshake.sid, handshake.ping_interval
        );

        Ok(Self {
            socket,
            eio,
            handshake,
            last_ping: Instant::now(),
            last_packet: Instant::now(),
        })
    }

    pub fn handshake(&self) -> &Handshake {
        &self.handshake
    }

    /// 阻塞直到下一个事件; 连接关闭或服务端超时无响应时返回 None
    pub fn next_event(&mut self) -> Result<Option<(String, Value)>> {
        loop {
            self.heartbeat()?;

            if self.last_packet.elapsed() > self.silence_limit() {
                warn!("⚠️ 服务端 {:?} 内无响应, 断开", self.silence_limit());
                return Ok(None);
            }

            let text = match self.socket.read() {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) => {
                    info!("🔌 disconnect");
                    return Ok(None);
                }
                Ok(_) => continue,
                Err(tungstenite::Error::Io(e))
                    if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    continue
                }
                Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                    info!("🔌 disconnect");
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            };

            self.last_packet = Instant::now();
            match packet::decode(&text) {
                Ok(EnginePacket::Message(SocketPacket::Event { name, payload })) => {
                    return Ok(Some((name, payload)))
                }
                Ok(EnginePacket::Ping(data)) => {
                    self.socket.send(Message::Text(packet::encode_pong(&data)))?;
                }
                Ok(EnginePacket::Pong(_)) | Ok(EnginePacket::Noop) => {}
                Ok(EnginePacket::Message(SocketPacket::Connect)) => {
                    info!("✅ Socket.IO 命名空间已连接");
                }
                Ok(EnginePacket::Close) | Ok(EnginePacket::Message(SocketPacket::Disconnect)) => {
                    info!("🔌 disconnect");
                    return Ok(None);
                }
                Ok(EnginePacket::Message(SocketPacket::Error(msg))) => {
                    warn!("⚠️ Socket.IO 错误: {}", msg);
                }
                Ok(other) => debug!("忽略数据包: {:?}", other),
                Err(e) => warn!("⚠️ 无法解析的数据包: {}", e),
            }
        }
    }

    /// pingInterval + pingTimeout 内必须收到数据 (EIO 3 的 pong 或 EIO 4 的 ping)
    fn silence_limit(&self) -> Duration {
        Duration::from_millis(
            self.handshake
                .ping_interval
                .saturating_add(self.handshake.ping_timeout),
        )
    }

    /// EIO 3 由客户端按 pingInterval 发送 ping; EIO 4 由服务端发起
    fn heartbeat(&mut self) -> Result<()> {
        if self.eio != 3 {
            return Ok(());
        }
        let interval = Duration::from_millis(self.handshake.ping_interval);
        if self.last_ping.elapsed() >= interval {
            self.socket.send(Message::Text(packet::encode_ping()))?;
            self.last_ping = Instant::now();
        }
        Ok(())
    }

}

impl EventSink for SocketIoClient {
    fn emit(&mut self, event: &str, payload: Value) -> Result<()> {
        self.socket
            .send(Message::Text(packet::encode_event(event, &payload)))
            .with_context(|| format!("发送 {} 失败", event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::net::TcpListener;
    use std::thread;

    const OPEN: &str = r#"0{"sid":"s1","upgrades":[],"pingInterval":25000,"pingTimeout":60000}"#;

    fn next_text(ws: &mut WebSocket<TcpStream>) -> String {
        loop {
            if let Message::Text(text) = ws.read().unwrap() {
                return text;
            }
        }
    }

    #[test]
    fn test_event_round_trip_eio3() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut ws = tungstenite::accept(stream).unwrap();
            ws.send(Message::Text(OPEN.into())).unwrap();
            ws.send(Message::Text("40".into())).unwrap();
            ws.send(Message::Text(
                r#"42["sensor_data",{"gimbal_pose":"1,2,3,4,5,6"}]"#.into(),
            ))
            .unwrap();
            next_text(&mut ws)
        });

        let mut client = SocketIoClient::connect("127.0.0.1", port, 3).unwrap();
        assert_eq!(client.handshake().sid, "s1");

        let (name, payload) = client.next_event().unwrap().unwrap();
        assert_eq!(name, "sensor_data");
        assert_eq!(payload["gimbal_pose"], "1,2,3,4,5,6");

        client.emit("object_lost", json!({"data": ""})).unwrap();
        assert_eq!(server.join().unwrap(), r#"42["object_lost",{"data":""}]"#);
    }

    #[test]
    fn test_eio4_connects_namespace_and_answers_ping() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut ws = tungstenite::accept(stream).unwrap();
            ws.send(Message::Text(OPEN.into())).unwrap();
            let connect = next_text(&mut ws);
            ws.send(Message::Text("2".into())).unwrap();
            let pong = next_text(&mut ws);
            ws.send(Message::Text(r#"42["done"]"#.into())).unwrap();
            (connect, pong)
        });

        let mut client = SocketIoClient::connect("127.0.0.1", port, 4).unwrap();
        let (name, payload) = client.next_event().unwrap().unwrap();
        assert_eq!(name, "done");
        assert_eq!(payload, Value::Null);

        let (connect, pong) = server.join().unwrap();
        assert_eq!(connect, "40");
        assert_eq!(pong, "3");
    }

    #[test]
    fn test_server_close_ends_stream() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut ws = tungstenite::accept(stream).unwrap();
            ws.send(Message::Text(OPEN.into())).unwrap();
            ws.send(Message::Text("41".into())).unwrap();
            // 等客户端读完再断开
            let _ = ws.read();
        });

        let mut client = SocketIoClient::connect("127.0.0.1", port, 3).unwrap();
        assert!(client.next_event().unwrap().is_none());
        drop(client);
        server.join().unwrap();
    }

    #[test]
    fn test_silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut ws = tungstenite::accept(stream).unwrap();
            ws.send(Message::Text(
                r#"0{"sid":"s2","upgrades":[],"pingInterval":100,"pingTimeout":100}"#.into(),
            ))
            .unwrap();
            // 不再发送任何数据, 直到客户端断开
            while ws.read().is_ok() {}
        });

        let mut client = SocketIoClient::connect("127.0.0.1", port, 4).unwrap();
        let start = Instant::now();
        assert!(client.next_event().unwrap().is_none());
        assert!(start.elapsed() >= Duration::from_millis(150));
        drop(client);
        server.join().unwrap();
    }

    #[test]
    fn test_rejects_unknown_eio() {
        assert!(SocketIoClient::connect("127.0.0.1", 1, 2).is_err());
    }
}
