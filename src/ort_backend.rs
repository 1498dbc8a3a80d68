// ONNX Runtime 推理后端
//
// 只负责: 会话创建、执行设备选择、单次前向
// 输入/输出均为 f32 张量, 形状由调用方负责

use std::path::PathBuf;

use anyhow::{Context, Result};
use ndarray::{Array, IxDyn};
use ort::{CUDAExecutionProvider, ExecutionProvider, GraphOptimizationLevel, Session};
use tracing::{info, warn};

/// 执行设备
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrtEP {
    CPU,
    CUDA(i32),
}

/// 后端构建参数
#[derive(Debug, Clone)]
pub struct OrtConfig {
    pub f: PathBuf,
    pub ep: OrtEP,
    pub intra_threads: usize,
}

pub struct OrtBackend {
    session: Session,
    ep: OrtEP,
    input_names: Vec<String>,
    input_dims: Vec<i64>,
    output_names: Vec<String>,
}

impl OrtBackend {
    pub fn build(args: OrtConfig) -> Result<Self> {
        let mut builder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(args.intra_threads)?;

        let mut ep = args.ep;
        if let OrtEP::CUDA(device_id) = ep {
            let cuda = CUDAExecutionProvider::default().with_device_id(device_id);
            if cuda.is_available().unwrap_or(false) {
                builder = builder.with_execution_providers([cuda.build()])?;
            } else {
                warn!("⚠️ CUDA 不可用, 回退到 CPU");
                ep = OrtEP::CPU;
            }
        }

        let session = builder
            .commit_from_file(&args.f)
            .with_context(|| format!("无法加载模型 {}", args.f.display()))?;

        let input_names = session.inputs.iter().map(|i| i.name.clone()).collect();
        let input_dims = session
            .inputs
            .first()
            .and_then(|i| i.input_type.tensor_dimensions().cloned())
            .unwrap_or_default();
        let output_names = session.outputs.iter().map(|o| o.name.clone()).collect();

        Ok(Self {
            session,
            ep,
            input_names,
            input_dims,
            output_names,
        })
    }

    /// 单输入单输出前向
    pub fn run(&self, xs: Array<f32, IxDyn>, profile: bool) -> Result<Array<f32, IxDyn>> {
        let t = std::time::Instant::now();

        let shape: Vec<i64> = xs.shape().iter().map(|&d| d as i64).collect();
        let data: Vec<f32> = xs.iter().copied().collect();
        let input = ort::Tensor::from_array((shape, data))?;
        let outputs = self.session.run(ort::inputs![input]?)?;

        let (dims, raw) = outputs[0].try_extract_raw_tensor::<f32>()?;
        let dims: Vec<usize> = dims.iter().map(|&d| d as usize).collect();
        let ys = Array::from_shape_vec(IxDyn(&dims), raw.to_vec())?;

        if profile {
            info!("[ORT Inference]: {:?}", t.elapsed());
        }
        Ok(ys)
    }

    /// 输入张量维度, 动态维为 -1
    pub fn input_dims(&self) -> &[i64] {
        &self.input_dims
    }

    pub fn summary(&self) {
        info!("  执行设备: {:?}", self.ep);
        info!("  输入: {:?} {:?}", self.input_names, self.input_dims);
        info!("  输出: {:?}", self.output_names);
    }
}
