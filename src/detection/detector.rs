//! 跟随器 (Follower)
//! 职责: sensor_data → 分割推理 → 目标判定 → 世界坐标 → 发送 object_detected / object_lost

use std::time::Instant;

use anyhow::Result;
use rand::Rng;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::blob::largest_blob_centroid;
use super::tracker::{TargetTracker, TrackUpdate};
use crate::config::FollowerConfig;
use crate::error::FrameError;
use crate::geometry::{pixel_to_world, Pose, WorldPoint};
use crate::input::{DepthFrame, Frame};
use crate::models::Model;
use crate::overlay::OverlayWriter;
use crate::transport::{
    BoxMarker, EventSink, ObjectDetected, ObjectLost, SensorData, CREATE_BOX_MARKER,
    OBJECT_DETECTED, OBJECT_LOST, SENSOR_DATA,
};

/// 单帧处理结论
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FrameOutcome {
    /// 目标命中, 已发送世界坐标
    Detected(WorldPoint),
    /// 跟踪中未命中 (连续丢失数)
    Missed(u32),
    /// 已发送 object_lost
    Lost,
    /// 未跟踪且未命中
    Idle,
}

pub struct Follower {
    config: FollowerConfig,
    model: Box<dyn Model>,
    tracker: TargetTracker,
    overlay: Option<OverlayWriter>,
    profile: bool,

    // 统计
    count: u64,
    last: Instant,
    current_fps: f64,
}

impl Follower {
    pub fn new(config: FollowerConfig, model: Box<dyn Model>) -> Self {
        let tracker = TargetTracker::new(config.max_missed_frames);
        Self {
            config,
            model,
            tracker,
            overlay: None,
            profile: false,
            count: 0,
            last: Instant::now(),
            current_fps: 0.0,
        }
    }

    /// 开启叠加图保存
    pub fn with_overlay(mut self, writer: OverlayWriter) -> Self {
        self.overlay = Some(writer);
        self
    }

    /// 打印每一阶段耗时
    pub fn with_profile(mut self, profile: bool) -> Self {
        self.profile = profile;
        self
    }

    pub fn tracker(&self) -> &TargetTracker {
        &self.tracker
    }

    /// 网关事件入口; 只有发送失败 (连接问题) 才返回错误
    pub fn handle_event(
        &mut self,
        name: &str,
        payload: Value,
        sink: &mut dyn EventSink,
    ) -> Result<Option<FrameOutcome>> {
        if name != SENSOR_DATA {
            debug!("忽略事件: {}", name);
            return Ok(None);
        }
        let data: SensorData = match serde_json::from_value(payload) {
            Ok(data) => data,
            Err(e) => {
                warn!("⚠️ sensor_data 格式错误: {}", e);
                return Ok(None);
            }
        };

        match self.process_frame(&data, sink) {
            Ok(outcome) => Ok(Some(outcome)),
            Err(e @ FrameError::Emit { .. }) => Err(e.into()),
            Err(e) => {
                warn!("⚠️ 丢弃本帧: {}", e);
                Ok(None)
            }
        }
    }

    /// 处理单帧; 返回错误时跟踪状态保持不变
    pub fn process_frame(
        &mut self,
        data: &SensorData,
        sink: &mut dyn EventSink,
    ) -> Result<FrameOutcome, FrameError> {
        let start_total = Instant::now();

        // 1. 解码相机帧
        let t = Instant::now();
        let frame = Frame::decode(&data.rgb_image, self.config.frame_size)?;
        let decode_ms = t.elapsed().as_secs_f64() * 1000.0;

        // 2. 分割推理
        let t = Instant::now();
        let pred = self.model.forward(&frame, self.profile)?;
        let inference_ms = t.elapsed().as_secs_f64() * 1000.0;

        // 3. 目标判定
        let mask = pred.target_mask(self.config.mask_threshold);
        let hit_count = mask.count();

        let centroid = if hit_count > self.config.min_target_pixels as usize {
            largest_blob_centroid(&mask)
        } else {
            None
        };

        let mut geometry_ms = 0.0;
        let outcome = match centroid {
            Some(centroid) => {
                if let Some(writer) = self.overlay.as_mut() {
                    writer.submit(&frame, &pred, Instant::now());
                }

                // 4. 深度 + 位姿 → 世界坐标
                let t = Instant::now();
                let depth = DepthFrame::decode(&data.depth_image)?.depth_at(
                    centroid.row,
                    centroid.col,
                    self.config.depth_range,
                    self.config.depth_encoding_max,
                )?;
                let pose = Pose::parse(&data.gimbal_pose)?;
                let point = pixel_to_world(
                    centroid.row,
                    centroid.col,
                    depth,
                    &pose,
                    &self.config.intrinsics,
                );
                geometry_ms = t.elapsed().as_secs_f64() * 1000.0;

                self.tracker.update(true);
                debug!(
                    "🎯 目标: 像素=({}, {}) 深度={:.2} 世界=({:.2}, {:.2}, {:.2}) 命中像素={}",
                    centroid.row, centroid.col, depth, point.x, point.y, point.z, hit_count
                );

                self.emit(
                    sink,
                    OBJECT_DETECTED,
                    &ObjectDetected {
                        coords: point.coords(),
                    },
                )?;
                let marker = self.box_marker(&point);
                self.emit(sink, CREATE_BOX_MARKER, &marker)?;
                FrameOutcome::Detected(point)
            }
            None => {
                // 先发送 object_lost, 发送成功后才提交丢失状态
                if self.tracker.would_lose() {
                    info!("❌ 目标丢失");
                    self.emit(sink, OBJECT_LOST, &ObjectLost::default())?;
                }
                match self.tracker.update(false) {
                    TrackUpdate::Lost => FrameOutcome::Lost,
                    TrackUpdate::Missed(n) => FrameOutcome::Missed(n),
                    TrackUpdate::Detected | TrackUpdate::Idle => FrameOutcome::Idle,
                }
            }
        };

        // 统计
        self.count += 1;
        let elapsed = self.last.elapsed().as_secs_f64();
        if elapsed >= 1.0 {
            self.current_fps = self.count as f64 / elapsed;
            self.count = 0;
            self.last = Instant::now();
        }

        if self.profile {
            info!(
                "⏱️ 解码 {:.2}ms | 推理 {:.2}ms | 几何 {:.2}ms | 总计 {:.2}ms | {:.1} FPS",
                decode_ms,
                inference_ms,
                geometry_ms,
                start_total.elapsed().as_secs_f64() * 1000.0,
                self.current_fps
            );
        }

        Ok(outcome)
    }

    fn box_marker(&self, point: &WorldPoint) -> BoxMarker {
        BoxMarker {
            id: rand::thread_rng().gen_range(0..99999),
            pose: [point.x, point.y, point.z, 0.0, 0.0, 0.0],
            dimensions: self.config.marker_dimensions,
            color: self.config.marker_color,
            duration: self.config.marker_duration,
        }
    }

    fn emit<T: Serialize>(
        &self,
        sink: &mut dyn EventSink,
        event: &'static str,
        payload: &T,
    ) -> Result<(), FrameError> {
        let value = serde_json::to_value(payload).map_err(|e| FrameError::Emit {
            event,
            source: e.into(),
        })?;
        sink.emit(event, value)
            .map_err(|source| FrameError::Emit { event, source })
    }
}
