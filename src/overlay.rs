//! 预测叠加图 (Prediction overlay)
//!
//! 渲染在调用线程完成之外的后台线程; 检测路径只负责节流并投递任务。

use std::fs;
use std::path::Path;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use crossbeam_channel::{Sender, TrySendError};
use image::{Rgb, RgbImage};
use tracing::{debug, info, warn};

use crate::config::FollowerConfig;
use crate::detection::types::PredictionMask;
use crate::input::Frame;

/// 各前景类别的叠加颜色 (类别0为背景, 不绘制)
const PALETTE: [(u8, u8, u8); 6] = [
    (0, 0, 255),   // 蓝色 (目标)
    (0, 255, 0),   // 绿色
    (255, 0, 0),   // 红色
    (255, 255, 0), // 黄色
    (255, 0, 255), // 品红
    (0, 255, 255), // 青色
];

fn class_color(class: usize) -> (u8, u8, u8) {
    PALETTE[(class - 1) % PALETTE.len()]
}

/// 在原图上按类别半透明着色, 每个像素取概率最高且超过阈值的前景类别
pub fn render_overlay(
    frame: &Frame,
    pred: &PredictionMask,
    threshold: f32,
    alpha: f32,
) -> RgbImage {
    let mut out = frame.image().clone();
    let probs = pred.probs();
    let (h, w) = (pred.height().min(out.height() as usize), pred.width().min(out.width() as usize));

    for y in 0..h {
        for x in 0..w {
            let mut best: Option<(usize, f32)> = None;
            for c in 1..pred.num_classes() {
                let p = probs[[y, x, c]];
                if p > threshold && best.map_or(true, |(_, bp)| p > bp) {
                    best = Some((c, p));
                }
            }
            if let Some((c, _)) = best {
                let (r, g, b) = class_color(c);
                let px = out.get_pixel_mut(x as u32, y as u32);
                *px = Rgb([
                    blend(px[0], r, alpha),
                    blend(px[1], g, alpha),
                    blend(px[2], b, alpha),
                ]);
            }
        }
    }
    out
}

fn blend(base: u8, color: u8, alpha: f32) -> u8 {
    (base as f32 * (1.0 - alpha) + color as f32 * alpha).round() as u8
}

/// overlay_<unix秒>.<微秒>.png
pub fn overlay_file_name(stamp: DateTime<Utc>) -> String {
    format!(
        "overlay_{}.{:06}.png",
        stamp.timestamp(),
        stamp.timestamp_subsec_micros()
    )
}

/// 保存间隔; 非法值 (负数、NaN、溢出) 回退到默认值
fn throttle_interval(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or_else(|e| {
        let fallback = FollowerConfig::default().overlay_interval_secs;
        warn!("⚠️ overlay_interval_secs={} 无效 ({}), 使用默认值 {}s", secs, e, fallback);
        Duration::from_secs_f64(fallback)
    })
}

struct OverlayJob {
    frame: Frame,
    pred: PredictionMask,
    stamp: DateTime<Utc>,
}

/// 节流的叠加图保存器 (后台线程写盘)
pub struct OverlayWriter {
    tx: Option<Sender<OverlayJob>>,
    handle: Option<JoinHandle<()>>,
    last_saved: Instant,
    interval: Duration,
}

impl OverlayWriter {
    /// 创建输出目录并启动写盘线程; 节流计时从此刻开始
    pub fn spawn(dir: &Path, config: &FollowerConfig) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("无法创建目录 {}", dir.display()))?;

        let (tx, rx) = crossbeam_channel::bounded::<OverlayJob>(config.overlay_queue.max(1));
        let out_dir = dir.to_path_buf();
        let (threshold, alpha) = (config.mask_threshold, config.overlay_alpha);

        let handle = std::thread::Builder::new()
            .name("overlay-writer".to_string())
            .spawn(move || {
                while let Ok(job) = rx.recv() {
                    let img = render_overlay(&job.frame, &job.pred, threshold, alpha);
                    let path = out_dir.join(overlay_file_name(job.stamp));
                    match img.save(&path) {
                        Ok(()) => debug!("💾 叠加图已保存: {}", path.display()),
                        Err(e) => warn!("❌ 叠加图保存失败 {}: {}", path.display(), e),
                    }
                }
            })?;

        info!("🖼️ 叠加图输出目录: {}", dir.display());

        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
            last_saved: Instant::now(),
            interval: throttle_interval(config.overlay_interval_secs),
        })
    }

    /// 距上次保存超过间隔时投递一次任务, 返回是否投递
    pub fn submit(&mut self, frame: &Frame, pred: &PredictionMask, now: Instant) -> bool {
        if now.saturating_duration_since(self.last_saved) <= self.interval {
            return false;
        }
        let Some(tx) = &self.tx else {
            return false;
        };

        let job = OverlayJob {
            frame: frame.clone(),
            pred: pred.clone(),
            stamp: Utc::now(),
        };
        match tx.try_send(job) {
            Ok(()) => {
                self.last_saved = now;
                true
            }
            Err(TrySendError::Full(_)) => {
                debug!("叠加图队列已满, 跳过");
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!("❌ 叠加图写盘线程已退出");
                self.tx = None;
                false
            }
        }
    }
}

impl Drop for OverlayWriter {
    /// 关闭队列并等待已投递的任务写完
    fn drop(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use image::DynamicImage;
    use ndarray::Array3;

    fn frame() -> Frame {
        Frame::from_image(
            DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([100, 100, 100]))),
            4,
        )
        .unwrap()
    }

    fn pred_with_target(pixels: &[(usize, usize)]) -> PredictionMask {
        let mut probs = Array3::<f32>::zeros((4, 4, 3));
        for &(r, c) in pixels {
            probs[[r, c, 1]] = 0.9;
        }
        PredictionMask::new(probs).unwrap()
    }

    #[test]
    fn test_render_only_colors_foreground() {
        let img = render_overlay(&frame(), &pred_with_target(&[(1, 2)]), 0.5, 0.5);
        // 行1列2 → (x=2, y=1), 与蓝色各半混合
        assert_eq!(img.get_pixel(2, 1), &Rgb([50, 50, 178]));
        assert_eq!(img.get_pixel(0, 0), &Rgb([100, 100, 100]));
    }

    #[test]
    fn test_invalid_interval_falls_back() {
        assert_eq!(throttle_interval(0.0), Duration::ZERO);
        assert_eq!(throttle_interval(2.5), Duration::from_millis(2500));
        assert_eq!(throttle_interval(1e20), Duration::from_secs(1));
        assert_eq!(throttle_interval(-1.0), Duration::from_secs(1));
        assert_eq!(throttle_interval(f64::NAN), Duration::from_secs(1));

        let dir = tempfile::tempdir().unwrap();
        let config = FollowerConfig {
            overlay_interval_secs: 1e20,
            ..FollowerConfig::default()
        };
        let writer = OverlayWriter::spawn(dir.path(), &config).unwrap();
        assert_eq!(writer.interval, Duration::from_secs(1));
    }

    #[test]
    fn test_file_name() {
        let stamp = Utc.timestamp_opt(1_700_000_000, 42_000).unwrap();
        assert_eq!(overlay_file_name(stamp), "overlay_1700000000.000042.png");
    }

    #[test]
    fn test_throttle_once_per_interval() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("run1");
        let config = FollowerConfig::default();
        let mut writer = OverlayWriter::spawn(&out, &config).unwrap();
        let start = writer.last_saved;
        let pred = pred_with_target(&[(0, 0)]);

        assert!(!writer.submit(&frame(), &pred, start + Duration::from_millis(500)));
        assert!(!writer.submit(&frame(), &pred, start + Duration::from_millis(1000)));
        assert!(writer.submit(&frame(), &pred, start + Duration::from_millis(1500)));
        std::thread::sleep(Duration::from_millis(2));
        assert!(!writer.submit(&frame(), &pred, start + Duration::from_millis(2000)));
        assert!(writer.submit(&frame(), &pred, start + Duration::from_millis(2600)));

        drop(writer);
        let saved: Vec<_> = fs::read_dir(&out).unwrap().collect();
        assert_eq!(saved.len(), 2);
    }
}
