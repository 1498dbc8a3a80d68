/// 检测系统 (Detection System)
///
/// 每帧在网关线程中同步完成
/// - types:    预测掩码 / 目标掩码 / 质心
/// - blob:     最大连通区域质心
/// - tracker:  找到/丢失去抖状态机
/// - detector: 跟随器主流程
pub mod blob;
pub mod detector;
pub mod tracker;
pub mod types;

pub use blob::largest_blob_centroid;
pub use detector::{Follower, FrameOutcome};
pub use tracker::{TargetTracker, TrackState, TrackUpdate};
pub use types::{Centroid, PredictionMask, TargetMask, TARGET_CLASS};
