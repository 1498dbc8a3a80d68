// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

// 全卷积分割网络 (FCN) 的 ONNX 实现
// 包含: 模型加载、推理; 预处理/后处理使用 Model trait 默认实现

use std::path::Path;

use anyhow::{bail, Result};
use ndarray::{Array, IxDyn};
use tracing::{info, warn};

use crate::ort_backend::{OrtBackend, OrtConfig, OrtEP};

pub struct FcnSegmenter {
    engine: OrtBackend,
    size: u32,
}

impl FcnSegmenter {
    /// 加载模型; `size` 为输入帧边长
    pub fn new(path: &Path, size: u32, cuda: bool, device_id: i32) -> Result<Self> {
        if !path.exists() {
            bail!("模型文件不存在: {}", path.display());
        }

        let ep = if cuda {
            OrtEP::CUDA(device_id)
        } else {
            OrtEP::CPU
        };
        let engine = OrtBackend::build(OrtConfig {
            f: path.to_path_buf(),
            ep,
            intra_threads: 4,
        })?;

        // 期望 NHWC: [1|-1, size, size, 3]
        let dims = engine.input_dims();
        let expected = [size as i64, size as i64, 3];
        if dims.len() == 4 && dims[1..] != expected && dims[1..].iter().all(|&d| d > 0) {
            warn!(
                "⚠️ 模型输入维度 {:?} 与帧尺寸 {}x{}x3 不一致",
                dims, size, size
            );
        }

        Ok(Self { engine, size })
    }
}

impl super::Model for FcnSegmenter {
    fn run(&mut self, xs: Array<f32, IxDyn>, profile: bool) -> Result<Array<f32, IxDyn>> {
        self.engine.run(xs, profile)
    }

    fn summary(&self) {
        info!("[FCN 分割模型信息]");
        info!("  输入尺寸: {0}x{0}x3 (NHWC, [-1, 1])", self.size);
        self.engine.summary();
    }
}
