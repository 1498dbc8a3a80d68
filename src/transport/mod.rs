/// 模拟器事件网关 (Event Gateway)
///
/// - packet: Engine.IO / Socket.IO 文本帧编解码
/// - client: 同步 WebSocket 客户端 (心跳、握手、事件收发)
///
/// 跟随器只依赖 `EventSink`, 测试中用记录型实现替换真实连接。
pub mod client;
pub mod packet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use client::SocketIoClient;

// ========== 事件名 ==========

pub const SENSOR_DATA: &str = "sensor_data";
pub const OBJECT_DETECTED: &str = "object_detected";
pub const OBJECT_LOST: &str = "object_lost";
pub const CREATE_BOX_MARKER: &str = "create_box_marker";

/// 出站事件接口
pub trait EventSink {
    fn emit(&mut self, event: &str, payload: Value) -> anyhow::Result<()>;
}

// ========== 消息结构 ==========

/// 入站: 一次传感器采样
#[derive(Clone, Debug, Deserialize)]
pub struct SensorData {
    pub rgb_image: String,
    pub depth_image: String,
    pub gimbal_pose: String,
}

/// 出站: 目标世界坐标
#[derive(Clone, Debug, Serialize)]
pub struct ObjectDetected {
    pub coords: [f64; 3],
}

/// 出站: 目标丢失
#[derive(Clone, Debug, Default, Serialize)]
pub struct ObjectLost {
    pub data: String,
}

/// 出站: 在模拟器中绘制一个方框标记
#[derive(Clone, Debug, Serialize)]
pub struct BoxMarker {
    pub id: u32,
    pub pose: [f64; 6],       // [x, y, z, roll, pitch, yaw]
    pub dimensions: [f64; 3], // [高, 宽, 深]
    pub color: [f64; 4],      // [r, g, b, a], 0-1
    pub duration: f64,        // 秒, -1 为永久
}

/// 测试用: 记录所有出站事件
#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingSink {
    pub events: Vec<(String, Value)>,
}

#[cfg(test)]
impl RecordingSink {
    pub fn named(&self, event: &str) -> Vec<&Value> {
        self.events
            .iter()
            .filter(|(name, _)| name == event)
            .map(|(_, payload)| payload)
            .collect()
    }
}

#[cfg(test)]
impl EventSink for RecordingSink {
    fn emit(&mut self, event: &str, payload: Value) -> anyhow::Result<()> {
        self.events.push((event.to_string(), payload));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sensor_data_from_json() {
        let data: SensorData = serde_json::from_value(json!({
            "rgb_image": "aaa",
            "depth_image": "bbb",
            "gimbal_pose": "1,2,3,4,5,6",
            "extra": 1
        }))
        .unwrap();
        assert_eq!(data.gimbal_pose, "1,2,3,4,5,6");
    }

    #[test]
    fn test_outbound_payload_shapes() {
        let detected = serde_json::to_value(ObjectDetected {
            coords: [1.0, 2.0, 3.0],
        })
        .unwrap();
        assert_eq!(detected, json!({"coords": [1.0, 2.0, 3.0]}));

        let lost = serde_json::to_value(ObjectLost::default()).unwrap();
        assert_eq!(lost, json!({"data": ""}));

        let marker = serde_json::to_value(BoxMarker {
            id: 7,
            pose: [1.0, 2.0, 3.0, 0.0, 0.0, 0.0],
            dimensions: [0.7, 0.7, 2.0],
            color: [0.0, 0.0, 1.0, 0.1],
            duration: 0.4,
        })
        .unwrap();
        assert_eq!(marker["id"], 7);
        assert_eq!(marker["pose"].as_array().unwrap().len(), 6);
    }
}
