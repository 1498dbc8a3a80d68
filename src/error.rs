//! 单帧处理错误 (Per-frame errors)
//!
//! 任何一种错误都只丢弃当前帧,会话继续运行,跟踪器状态不受影响。

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("decode error: {0}")]
    Decode(String),

    #[error("shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch { expected: String, found: String },

    #[error("pose parse error: {0}")]
    PoseParse(String),

    #[error("depth lookup out of bounds: pixel ({row}, {col}) outside {width}x{height}")]
    DepthOutOfBounds {
        row: usize,
        col: usize,
        width: u32,
        height: u32,
    },

    #[error("unexpected model output: {0}")]
    ModelOutput(String),

    #[error("inference failed: {0}")]
    Inference(#[source] anyhow::Error),

    #[error("emit `{event}` failed: {source}")]
    Emit {
        event: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl From<base64::DecodeError> for FrameError {
    fn from(err: base64::DecodeError) -> Self {
        FrameError::Decode(format!("base64: {}", err))
    }
}

impl From<image::ImageError> for FrameError {
    fn from(err: image::ImageError) -> Self {
        FrameError::Decode(format!("image: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_display() {
        let err = FrameError::ShapeMismatch {
            expected: "256x256x3".to_string(),
            found: "128x128x3".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("256x256x3"));
        assert!(msg.contains("128x128x3"));
    }

    #[test]
    fn test_from_base64_error() {
        use base64::Engine;
        let err = base64::engine::general_purpose::STANDARD
            .decode("@@@")
            .unwrap_err();
        match FrameError::from(err) {
            FrameError::Decode(msg) => assert!(msg.starts_with("base64")),
            other => panic!("Expected Decode error, got {:?}", other),
        }
    }
}
