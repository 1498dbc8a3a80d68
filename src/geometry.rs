//! 像素 → 世界坐标 (Pixel to world-frame geometry)
//!
//! 相机坐标系沿用ROS约定: x 向前, y 向左, z 向上。
//! 姿态欧拉角为静态轴 x-y-z 顺序, 即 R = Rz(yaw)·Ry(pitch)·Rx(roll)。

use nalgebra::{Matrix4, Rotation3, Vector3, Vector4};
use serde::Serialize;

use crate::config::Intrinsics;
use crate::error::FrameError;

/// 飞行器/云台位姿, 角度单位为度
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl Pose {
    /// 解析 "x,y,z,roll,pitch,yaw" 并归一化角度
    pub fn parse(s: &str) -> Result<Self, FrameError> {
        // 只取前6个字段, 多余字段忽略
        let fields: Vec<&str> = s.split(',').collect();
        if fields.len() < 6 {
            return Err(FrameError::PoseParse(format!(
                "expected 6 values, got {}",
                fields.len()
            )));
        }
        let values = fields[..6]
            .iter()
            .map(|v| {
                v.trim()
                    .parse::<f64>()
                    .map_err(|e| FrameError::PoseParse(format!("`{}`: {}", v.trim(), e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            x: values[0],
            y: values[1],
            z: values[2],
            roll: normalize_angle(values[3]),
            pitch: normalize_angle(values[4]),
            yaw: normalize_angle(values[5]),
        })
    }

    pub fn position(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    pub fn rotation(&self) -> Rotation3<f64> {
        Rotation3::from_euler_angles(
            self.roll.to_radians(),
            self.pitch.to_radians(),
            self.yaw.to_radians(),
        )
    }

    /// 4×4 齐次变换 [R t; 0 1]
    pub fn to_homogeneous(&self) -> Matrix4<f64> {
        let mut t = self.rotation().to_homogeneous();
        t.fixed_view_mut::<3, 1>(0, 3).copy_from(&self.position());
        t
    }
}

/// 小于 -180° 的角度加 360°
pub fn normalize_angle(deg: f64) -> f64 {
    if deg < -180.0 {
        deg + 360.0
    } else {
        deg
    }
}

/// 世界坐标点
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct WorldPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl WorldPoint {
    pub fn coords(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

/// 针孔反投影: (行, 列, 深度) → 相机坐标 [前, 左, 上]
pub fn back_project(row: usize, col: usize, depth: f64, k: &Intrinsics) -> Vector3<f64> {
    let x = (row as f64 - k.cx) * depth / k.fx;
    let y = (col as f64 - k.cy) * depth / k.fy;
    Vector3::new(depth, -x, y)
}

/// 相机坐标 → 世界坐标
pub fn camera_to_world(point: &Vector3<f64>, pose: &Pose) -> WorldPoint {
    let p = pose.to_homogeneous() * Vector4::new(point.x, point.y, point.z, 1.0);
    WorldPoint {
        x: p[0],
        y: p[1],
        z: p[2],
    }
}

pub fn pixel_to_world(
    row: usize,
    col: usize,
    depth: f64,
    pose: &Pose,
    k: &Intrinsics,
) -> WorldPoint {
    camera_to_world(&back_project(row, col, depth, k), pose)
}
