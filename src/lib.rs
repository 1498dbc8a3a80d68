// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod config; // 运行参数与跟随器配置
pub mod detection; // 目标判定与跟踪
pub mod error; // 单帧错误
pub mod geometry; // 像素 → 世界坐标
pub mod input; // 图像/深度解码
pub mod models; // 模型接口与具体实现
pub mod overlay; // 预测叠加图

pub mod ort_backend;
pub mod transport; // Socket.IO 事件网关

pub use crate::config::{Args, FollowerConfig, Intrinsics};
pub use crate::detection::{Follower, FrameOutcome};
pub use crate::error::FrameError;
pub use crate::geometry::{Pose, WorldPoint};
pub use crate::models::{FcnSegmenter, Model};
pub use crate::ort_backend::{OrtBackend, OrtConfig, OrtEP};
pub use crate::overlay::OverlayWriter;
pub use crate::transport::{EventSink, SocketIoClient};
