/// 传感器图像解码器
/// Sensor image decoder: base64 payload → RGB frame / depth samples
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{DynamicImage, GrayImage, Luma, RgbImage};

use crate::error::FrameError;

/// base64 → 图像 (PNG/JPEG, 由内容自动识别格式)
pub fn decode_base64_image(data: &str) -> Result<DynamicImage, FrameError> {
    let bytes = STANDARD.decode(data.trim())?;
    Ok(image::load_from_memory(&bytes)?)
}

/// 相机帧 (固定尺寸 RGB, 只在一个检测周期内存在)
#[derive(Clone, Debug)]
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    /// 解码并校验尺寸, 要求恰好 size×size×3
    pub fn decode(data: &str, size: u32) -> Result<Self, FrameError> {
        Self::from_image(decode_base64_image(data)?, size)
    }

    pub fn from_image(img: DynamicImage, size: u32) -> Result<Self, FrameError> {
        let channels = img.color().channel_count();
        if img.width() != size || img.height() != size || channels != 3 {
            return Err(FrameError::ShapeMismatch {
                expected: format!("{0}x{0}x3", size),
                found: format!("{}x{}x{}", img.height(), img.width(), channels),
            });
        }
        let image = match img {
            DynamicImage::ImageRgb8(rgb) => rgb,
            other => other.to_rgb8(),
        };
        Ok(Self { image })
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// 深度帧: 只保留第0通道的8位编码值
#[derive(Clone, Debug)]
pub struct DepthFrame {
    samples: GrayImage,
}

impl DepthFrame {
    pub fn decode(data: &str) -> Result<Self, FrameError> {
        Ok(Self::from_image(decode_base64_image(data)?))
    }

    /// 单通道直接使用; 三/四通道取第0通道
    pub fn from_image(img: DynamicImage) -> Self {
        let samples = match img {
            DynamicImage::ImageLuma8(gray) => gray,
            other => {
                let rgba = other.to_rgba8();
                GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| {
                    Luma([rgba.get_pixel(x, y)[0]])
                })
            }
        };
        Self { samples }
    }

    pub fn width(&self) -> u32 {
        self.samples.width()
    }

    pub fn height(&self) -> u32 {
        self.samples.height()
    }

    /// 原始编码值, 以 (行, 列) 索引
    pub fn raw(&self, row: usize, col: usize) -> Result<u8, FrameError> {
        if row >= self.samples.height() as usize || col >= self.samples.width() as usize {
            return Err(FrameError::DepthOutOfBounds {
                row,
                col,
                width: self.samples.width(),
                height: self.samples.height(),
            });
        }
        Ok(self.samples.get_pixel(col as u32, row as u32)[0])
    }

    /// 实际距离 = 编码值 × range / encoding_max
    pub fn depth_at(
        &self,
        row: usize,
        col: usize,
        range: f64,
        encoding_max: f64,
    ) -> Result<f64, FrameError> {
        Ok(scale_depth(self.raw(row, col)?, range, encoding_max))
    }
}

/// 8位深度编码 → 距离 (线性)
pub fn scale_depth(raw: u8, range: f64, encoding_max: f64) -> f64 {
    raw as f64 * range / encoding_max
}

/// 测试用: 图像 → PNG → base64
#[cfg(test)]
pub(crate) fn encode_base64_png(img: &DynamicImage) -> String {
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    STANDARD.encode(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbaImage};

    #[test]
    fn test_decode_valid_frame() {
        let img = RgbImage::from_pixel(256, 256, Rgb([10, 20, 30]));
        let data = encode_base64_png(&DynamicImage::ImageRgb8(img));
        let frame = Frame::decode(&data, 256).unwrap();
        assert_eq!(frame.width(), 256);
        assert_eq!(frame.image().get_pixel(5, 5), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_undersized_frame_is_shape_mismatch() {
        let img = RgbImage::new(128, 128);
        let data = encode_base64_png(&DynamicImage::ImageRgb8(img));
        match Frame::decode(&data, 256) {
            Err(FrameError::ShapeMismatch { found, .. }) => assert_eq!(found, "128x128x3"),
            other => panic!("Expected ShapeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_rgba_frame_is_shape_mismatch() {
        let img = RgbaImage::new(256, 256);
        let data = encode_base64_png(&DynamicImage::ImageRgba8(img));
        assert!(matches!(
            Frame::decode(&data, 256),
            Err(FrameError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_garbage_is_decode_error() {
        assert!(matches!(
            Frame::decode("not base64 !!", 256),
            Err(FrameError::Decode(_))
        ));
        // 合法base64, 但不是图像
        let data = STANDARD.encode(b"hello world");
        assert!(matches!(
            Frame::decode(&data, 256),
            Err(FrameError::Decode(_))
        ));
    }

    #[test]
    fn test_depth_scaling_bounds() {
        assert_eq!(scale_depth(255, 100.0, 255.0), 100.0);
        assert_eq!(scale_depth(0, 100.0, 255.0), 0.0);
        assert!((scale_depth(51, 100.0, 255.0) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_depth_from_rgb_uses_first_channel() {
        let mut img = RgbImage::from_pixel(4, 4, Rgb([0, 9, 9]));
        // 行1, 列2 → 像素坐标 (x=2, y=1)
        img.put_pixel(2, 1, Rgb([255, 0, 0]));
        let depth = DepthFrame::decode(&encode_base64_png(&DynamicImage::ImageRgb8(img))).unwrap();
        assert_eq!(depth.raw(1, 2).unwrap(), 255);
        assert_eq!(depth.depth_at(1, 2, 100.0, 255.0).unwrap(), 100.0);
        assert_eq!(depth.raw(2, 1).unwrap(), 0);
    }

    #[test]
    fn test_depth_out_of_bounds() {
        let depth = DepthFrame::from_image(DynamicImage::ImageLuma8(GrayImage::new(8, 8)));
        assert!(matches!(
            depth.raw(8, 0),
            Err(FrameError::DepthOutOfBounds { .. })
        ));
    }
}
