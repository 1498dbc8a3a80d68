/// 检测系统数据结构定义
/// Data structures for the segmentation → target decision path
use ndarray::{Array2, Array3, ArrayD, Axis, Ix3};

use crate::error::FrameError;

/// 目标所在的类别通道
pub const TARGET_CLASS: usize = 1;

/// 逐像素类别概率 (H, W, C), C ≥ 2
#[derive(Clone, Debug, PartialEq)]
pub struct PredictionMask {
    probs: Array3<f32>,
}

impl PredictionMask {
    pub fn new(probs: Array3<f32>) -> Result<Self, FrameError> {
        let (_, _, c) = probs.dim();
        if c <= TARGET_CLASS {
            return Err(FrameError::ModelOutput(format!(
                "expected at least {} class channels, got {}",
                TARGET_CLASS + 1,
                c
            )));
        }
        Ok(Self { probs })
    }

    /// 模型原始输出 → 掩码; 接受 (1, H, W, C) 或 (H, W, C)
    pub fn from_output(ys: ArrayD<f32>, height: u32, width: u32) -> Result<Self, FrameError> {
        let ys = match ys.ndim() {
            4 if ys.shape()[0] == 1 => ys.index_axis_move(Axis(0), 0),
            3 => ys,
            _ => {
                return Err(FrameError::ModelOutput(format!(
                    "unsupported output shape {:?}",
                    ys.shape()
                )))
            }
        };
        let probs = ys
            .into_dimensionality::<Ix3>()
            .map_err(|e| FrameError::ModelOutput(e.to_string()))?;

        let (h, w, _) = probs.dim();
        if h != height as usize || w != width as usize {
            return Err(FrameError::ModelOutput(format!(
                "output {}x{} does not match frame {}x{}",
                h, w, height, width
            )));
        }
        Self::new(probs)
    }

    pub fn probs(&self) -> &Array3<f32> {
        &self.probs
    }

    pub fn height(&self) -> usize {
        self.probs.dim().0
    }

    pub fn width(&self) -> usize {
        self.probs.dim().1
    }

    pub fn num_classes(&self) -> usize {
        self.probs.dim().2
    }

    /// 目标通道概率 > threshold 的位置
    pub fn target_mask(&self, threshold: f32) -> TargetMask {
        TargetMask::new(
            self.probs
                .index_axis(Axis(2), TARGET_CLASS)
                .mapv(|p| p > threshold),
        )
    }
}

/// 目标二值掩码 (每帧重新计算)
#[derive(Clone, Debug, PartialEq)]
pub struct TargetMask {
    mask: Array2<bool>,
}

impl TargetMask {
    pub fn new(mask: Array2<bool>) -> Self {
        Self { mask }
    }

    pub fn mask(&self) -> &Array2<bool> {
        &self.mask
    }

    /// 命中像素数
    pub fn count(&self) -> usize {
        self.mask.iter().filter(|&&v| v).count()
    }

    pub fn height(&self) -> usize {
        self.mask.nrows()
    }

    pub fn width(&self) -> usize {
        self.mask.ncols()
    }
}

/// 最大连通区域的质心 (行, 列), 已截断为整数
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Centroid {
    pub row: usize,
    pub col: usize,
}
