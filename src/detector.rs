// 该文件是 PesoBuddy （比索伙伴） 项目的一部分。
// src/detector.rs - 检测器接口
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use image::RgbImage;
use serde::Deserialize;

/// 单个检测结果，检测器产出后不再修改
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Detection {
  pub label: String,
  pub confidence: f32,
  #[serde(default)]
  pub bbox: [f32; 4], // [x_min, y_min, x_max, y_max]，归一化坐标
}

impl Detection {
  pub fn new(label: impl Into<String>, confidence: f32) -> Self {
    Self {
      label: label.into(),
      confidence,
      bbox: [0.0; 4],
    }
  }

  pub fn with_bbox(mut self, bbox: [f32; 4]) -> Self {
    self.bbox = bbox;
    self
  }

  /// 归一化面积，退化的框面积为 0
  pub fn area(&self) -> f32 {
    let [x_min, y_min, x_max, y_max] = self.bbox;
    (x_max - x_min).max(0.0) * (y_max - y_min).max(0.0)
  }
}

pub trait Detector {
  type Error;

  /// 对一帧已校正的图像做推理，返回零个或多个检测结果
  fn infer(&mut self, image: &RgbImage) -> Result<Vec<Detection>, Self::Error>;
}

mod replay;
pub use self::replay::{ReplayDetector, ReplayDetectorError};
