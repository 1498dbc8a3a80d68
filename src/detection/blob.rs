//! 最大连通区域质心 (Largest blob centroid)
//!
//! 8邻域连通; 像素数相同时取行优先扫描中最先出现的区域。

use image::{GrayImage, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};

use super::types::{Centroid, TargetMask};

/// 单个连通区域的统计量
#[derive(Clone, Debug, Default)]
struct BlobStats {
    count: usize,
    first_index: usize, // 行优先扫描中第一个像素的线性下标
    row_sum: usize,
    col_sum: usize,
}

/// 返回最大连通区域的质心, 掩码为空时返回 None
pub fn largest_blob_centroid(mask: &TargetMask) -> Option<Centroid> {
    let (height, width) = (mask.height(), mask.width());
    if height == 0 || width == 0 {
        return None;
    }

    let image = GrayImage::from_fn(width as u32, height as u32, |x, y| {
        if mask.mask()[[y as usize, x as usize]] {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    });
    let labels = connected_components(&image, Connectivity::Eight, Luma([0u8]));

    let mut blobs: Vec<BlobStats> = Vec::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let label = label[0] as usize;
        if label == 0 {
            continue;
        }
        if blobs.len() < label {
            blobs.resize(label, BlobStats::default());
        }
        let (row, col) = (y as usize, x as usize);
        let blob = &mut blobs[label - 1];
        if blob.count == 0 {
            blob.first_index = row * width + col;
        }
        blob.count += 1;
        blob.row_sum += row;
        blob.col_sum += col;
    }

    let mut best: Option<&BlobStats> = None;
    for blob in blobs.iter().filter(|b| b.count > 0) {
        best = match best {
            Some(b)
                if b.count > blob.count
                    || (b.count == blob.count && b.first_index < blob.first_index) =>
            {
                Some(b)
            }
            _ => Some(blob),
        };
    }

    best.map(|b| Centroid {
        row: b.row_sum / b.count,
        col: b.col_sum / b.count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn mask_with(height: usize, width: usize, pixels: &[(usize, usize)]) -> TargetMask {
        let mut mask = Array2::from_elem((height, width), false);
        for &(r, c) in pixels {
            mask[[r, c]] = true;
        }
        TargetMask::new(mask)
    }

    fn rect(r0: usize, r1: usize, c0: usize, c1: usize) -> Vec<(usize, usize)> {
        let mut pixels = Vec::new();
        for r in r0..=r1 {
            for c in c0..=c1 {
                pixels.push((r, c));
            }
        }
        pixels
    }

    #[test]
    fn test_empty_mask() {
        let mask = mask_with(16, 16, &[]);
        assert_eq!(largest_blob_centroid(&mask), None);
    }

    #[test]
    fn test_rectangle_center() {
        // 行 10..=19, 列 20..=29 → 均值 14.5, 24.5 → 截断
        let mask = mask_with(64, 64, &rect(10, 19, 20, 29));
        assert_eq!(
            largest_blob_centroid(&mask),
            Some(Centroid { row: 14, col: 24 })
        );

        // 奇数边长时恰为几何中心
        let mask = mask_with(64, 64, &rect(3, 7, 30, 40));
        assert_eq!(
            largest_blob_centroid(&mask),
            Some(Centroid { row: 5, col: 35 })
        );
    }

    #[test]
    fn test_largest_blob_wins() {
        let mut pixels = rect(0, 1, 0, 1); // 4 像素
        pixels.extend(rect(10, 12, 10, 12)); // 9 像素
        let mask = mask_with(32, 32, &pixels);
        assert_eq!(
            largest_blob_centroid(&mask),
            Some(Centroid { row: 11, col: 11 })
        );
    }

    #[test]
    fn test_diagonal_pixels_are_connected() {
        // 对角线 5 像素 (8邻域下为一个区域) 对比 4 像素方块
        let mut pixels: Vec<(usize, usize)> = (0..5).map(|i| (i, i)).collect();
        pixels.extend(rect(20, 21, 20, 21));
        let mask = mask_with(32, 32, &pixels);
        assert_eq!(
            largest_blob_centroid(&mask),
            Some(Centroid { row: 2, col: 2 })
        );
    }

    #[test]
    fn test_tie_goes_to_first_in_scan_order() {
        let mut pixels = rect(20, 21, 2, 3);
        pixels.extend(rect(4, 5, 20, 21));
        let mask = mask_with(32, 32, &pixels);
        assert_eq!(
            largest_blob_centroid(&mask),
            Some(Centroid { row: 4, col: 20 })
        );
    }
}
