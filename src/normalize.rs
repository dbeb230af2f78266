// 该文件是 PesoBuddy （比索伙伴） 项目的一部分。
// src/normalize.rs - 帧方向校正
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

use image::{Rgb, RgbImage, imageops};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};
use tracing::debug;

use crate::frame::Frame;

/// 将帧校正为检测器期望的方向
///
/// 先按 `rotation_degrees` 顺时针旋转，再对前置摄像头画面做水平镜像。
/// 顺序不可交换，否则靠近画面边缘的目标左右会颠倒。
/// 90/180/270 度为精确的四分之一旋转（90/270 会交换宽高），
/// 其余角度绕中心做仿射旋转，画布尺寸不变，空出的区域填黑。
///
/// 宽或高为零的帧返回 `None`，调用方应跳过本轮推理。
pub fn normalize(frame: Frame) -> Option<RgbImage> {
  if frame.is_empty() {
    debug!("空帧 {}x{}，跳过", frame.width(), frame.height());
    return None;
  }

  let (image, degrees, front_facing) = frame.into_parts();
  let rotated = rotate(image, degrees);

  if front_facing {
    Some(imageops::flip_horizontal(&rotated))
  } else {
    Some(rotated)
  }
}

fn rotate(image: RgbImage, degrees: i32) -> RgbImage {
  match degrees.rem_euclid(360) {
    0 => image,
    90 => imageops::rotate90(&image),
    180 => imageops::rotate180(&image),
    270 => imageops::rotate270(&image),
    other => {
      debug!("非直角旋转: {} 度", other);
      rotate_about_center(
        &image,
        (other as f32).to_radians(),
        Interpolation::Nearest,
        Rgb([0, 0, 0]),
      )
    }
  }
}
