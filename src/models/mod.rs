/// 分割模型接口与实现
///
/// # 架构说明
///
/// 模型对跟随器是一个黑盒: (1, H, W, 3) 归一化张量 → (H, W, C) 类别概率。
/// 任何推理引擎只要实现 `Model::run` 即可接入, 归一化与输出校验由默认方法完成。
///
/// ## 核心流程
/// ```text
/// 相机帧 → preprocess → (1, H, W, 3) f32, 范围 [-1, 1]
///          ↓
///     推理引擎 run
///          ↓
///     原始输出 → postprocess → PredictionMask (H, W, C)
/// ```
use anyhow::Result;
use ndarray::{Array, IxDyn};

use crate::detection::types::PredictionMask;
use crate::error::FrameError;
use crate::input::Frame;

/// 训练时的归一化: x / 255 → [-0.5, 0.5] → [-1, 1], NHWC, batch = 1
pub fn preprocess_input(frame: &Frame) -> Array<f32, IxDyn> {
    let (w, h) = (frame.width() as usize, frame.height() as usize);
    let mut xs = Array::zeros((1, h, w, 3)).into_dyn();
    for (x, y, rgb) in frame.image().enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        for c in 0..3 {
            xs[[0, y, x, c]] = (rgb.0[c] as f32 / 255.0 - 0.5) * 2.0;
        }
    }
    xs
}

/// 统一的分割模型接口
pub trait Model {
    /// 预处理: 相机帧 → 模型输入张量
    fn preprocess(&mut self, frame: &Frame) -> Result<Array<f32, IxDyn>> {
        Ok(preprocess_input(frame))
    }

    /// 推理: 执行模型前向传播
    fn run(&mut self, xs: Array<f32, IxDyn>, profile: bool) -> Result<Array<f32, IxDyn>>;

    /// 后处理: 去掉batch维并校验空间尺寸与类别数
    fn postprocess(
        &self,
        ys: Array<f32, IxDyn>,
        frame: &Frame,
    ) -> Result<PredictionMask, FrameError> {
        PredictionMask::from_output(ys, frame.height(), frame.width())
    }

    /// 完整的推理流程: preprocess → run → postprocess
    fn forward(&mut self, frame: &Frame, profile: bool) -> Result<PredictionMask, FrameError> {
        let xs = self.preprocess(frame).map_err(FrameError::Inference)?;
        let ys = self.run(xs, profile).map_err(FrameError::Inference)?;
        self.postprocess(ys, frame)
    }

    /// 打印模型信息
    fn summary(&self) {}
}

pub mod fcn; // ONNX 导出的全卷积分割网络

pub use fcn::FcnSegmenter;
