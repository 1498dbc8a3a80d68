//! 运行参数 (命令行) 与跟随器调参 (JSON文件)

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// 实时跟随程序参数
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "实时目标跟随 - 分割模型 + 模拟器Socket.IO", long_about = None)]
pub struct Args {
    /// 推理用模型文件 (相对 --weights-dir)
    pub model_file: String,

    /// 保存带预测叠加层的图像, 参数为 --runs-dir 下的目录名
    #[arg(long)]
    pub pred_images: Option<String>,

    /// 模型权重目录
    #[arg(long, default_value = "../data/weights")]
    pub weights_dir: PathBuf,

    /// 叠加图输出根目录
    #[arg(long, default_value = "../data/runs")]
    pub runs_dir: PathBuf,

    /// 模拟器地址
    #[arg(long, default_value = "localhost")]
    pub host: String,

    /// 模拟器端口
    #[arg(long, default_value_t = 4567)]
    pub port: u16,

    /// Engine.IO 协议版本 (3 或 4)
    #[arg(long, default_value_t = 3)]
    pub eio: u8,

    /// 跟随器调参文件 (不存在时写入默认值)
    #[arg(long, default_value = "follower.json")]
    pub config: PathBuf,

    /// 使用CUDA推理
    #[arg(long)]
    pub cuda: bool,

    /// GPU编号
    #[arg(long, default_value_t = 0)]
    pub device_id: i32,

    /// 打印每一阶段耗时
    #[arg(long)]
    pub profile: bool,
}

impl Args {
    pub fn model_path(&self) -> PathBuf {
        self.weights_dir.join(&self.model_file)
    }

    pub fn pred_images_dir(&self) -> Option<PathBuf> {
        self.pred_images.as_ref().map(|name| self.runs_dir.join(name))
    }
}

/// 相机内参 (针孔模型)
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Intrinsics {
    pub cx: f64,
    pub cy: f64,
    pub fx: f64,
    pub fy: f64,
}

impl Default for Intrinsics {
    fn default() -> Self {
        Self {
            cx: 128.0,
            cy: 128.0,
            fx: 224.0,
            fy: 224.0,
        }
    }
}

/// 跟随器参数配置
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowerConfig {
    // === 输入 ===
    pub frame_size: u32, // 相机帧边长 (正方形, RGB)

    // === 检测判定 ===
    pub mask_threshold: f32,    // 目标通道概率阈值
    pub min_target_pixels: u32, // 目标像素数需严格大于此值
    pub max_missed_frames: u32, // 连续丢失帧数严格大于此值判定丢失

    // === 几何 ===
    pub intrinsics: Intrinsics,
    pub depth_range: f64,        // 深度图满量程对应的距离
    pub depth_encoding_max: f64, // 深度图编码最大值 (8位 = 255)

    // === 叠加图 ===
    pub overlay_interval_secs: f64, // 两次保存的最小间隔
    pub overlay_alpha: f32,         // 叠加透明度
    pub overlay_queue: usize,       // 后台保存队列长度

    // === 标记框 ===
    pub marker_dimensions: [f64; 3], // [高, 宽, 深]
    pub marker_color: [f64; 4],      // [r, g, b, a]
    pub marker_duration: f64,        // 存在时长(秒), -1 为永久
}

impl Default for FollowerConfig {
    fn default() -> Self {
        Self {
            frame_size: 256,

            mask_threshold: 0.5,
            min_target_pixels: 10,
            max_missed_frames: 8,

            intrinsics: Intrinsics::default(),
            depth_range: 100.0,
            depth_encoding_max: 255.0,

            overlay_interval_secs: 1.0,
            overlay_alpha: 0.5,
            overlay_queue: 4,

            marker_dimensions: [0.7, 0.7, 2.0],
            marker_color: [0.0, 0.0, 1.0, 0.1],
            marker_duration: 0.4,
        }
    }
}

impl FollowerConfig {
    /// 从JSON文件加载配置
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(config) => {
                    info!("✅ 配置已从 {} 加载", path.display());
                    config
                }
                Err(e) => {
                    warn!("⚠️  配置文件解析失败: {}, 使用默认值", e);
                    Self::default()
                }
            },
            Err(_) => {
                info!("📝 配置文件不存在,创建默认配置...");
                let config = Self::default();
                config.save(path);
                config
            }
        }
    }

    /// 保存配置到JSON文件
    pub fn save(&self, path: &Path) {
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = fs::write(path, json) {
                    warn!("❌ 保存配置失败: {}", e);
                } else {
                    info!("💾 配置已保存到 {}", path.display());
                }
            }
            Err(e) => warn!("❌ 序列化配置失败: {}", e),
        }
    }

    /// 打印当前配置
    pub fn print_summary(&self) {
        info!("🎛️  当前跟随器配置:");
        info!("  输入尺寸: {0}x{0}x3", self.frame_size);
        info!("  掩码阈值: {:.2}", self.mask_threshold);
        info!("  最少目标像素: >{}", self.min_target_pixels);
        info!("  丢失判定: 连续 >{} 帧", self.max_missed_frames);
        info!(
            "  相机内参: cx={} cy={} fx={} fy={}",
            self.intrinsics.cx, self.intrinsics.cy, self.intrinsics.fx, self.intrinsics.fy
        );
        info!(
            "  深度缩放: ×{}/{}",
            self.depth_range, self.depth_encoding_max
        );
    }
}
