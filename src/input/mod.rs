/// 传感器输入 (Sensor Input)
///
/// 每个 `sensor_data` 事件携带一对图像:
/// - Frame:      RGB相机帧, 送入分割模型
/// - DepthFrame: 同一时刻的深度图, 用于像素 → 3D 反投影
pub mod decoder;

pub use decoder::{decode_base64_image, scale_depth, DepthFrame, Frame};
