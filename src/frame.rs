// 该文件是 PesoBuddy （比索伙伴） 项目的一部分。
// src/frame.rs - 相机帧定义
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

use image::{DynamicImage, RgbImage, RgbaImage};
use thiserror::Error;

const RGB_CHANNELS: usize = 3;
const RGBA_CHANNELS: usize = 4;

#[derive(Error, Debug)]
pub enum FrameError {
  #[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  BufferSizeMismatch { expected: usize, actual: usize },
}

/// 一次分析周期内的相机帧
///
/// 帧携带采集时的原始方向信息，由 [`crate::normalize::normalize`] 负责旋转与镜像。
/// 帧只在单个分析周期内存在，交给检测器后即被丢弃。
#[derive(Debug, Clone)]
pub struct Frame {
  image: RgbImage,
  rotation_degrees: i32,
  front_facing: bool,
}

impl Frame {
  pub fn new(image: RgbImage) -> Self {
    Self {
      image,
      rotation_degrees: 0,
      front_facing: false,
    }
  }

  /// 从紧密排列的 RGB 数据创建帧
  pub fn from_rgb(width: u32, height: u32, data: Vec<u8>) -> Result<Self, FrameError> {
    let expected = RGB_CHANNELS * width as usize * height as usize;
    let actual = data.len();
    RgbImage::from_raw(width, height, data)
      .map(Self::new)
      .ok_or(FrameError::BufferSizeMismatch { expected, actual })
  }

  /// 从紧密排列的 RGBA 数据创建帧，透明通道被丢弃
  pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self, FrameError> {
    let expected = RGBA_CHANNELS * width as usize * height as usize;
    let actual = data.len();
    let rgba = RgbaImage::from_raw(width, height, data)
      .ok_or(FrameError::BufferSizeMismatch { expected, actual })?;
    Ok(Self::new(DynamicImage::ImageRgba8(rgba).to_rgb8()))
  }

  /// 需要纠正的顺时针旋转角度
  pub fn with_rotation(mut self, degrees: i32) -> Self {
    self.rotation_degrees = degrees;
    self
  }

  /// 前置摄像头的画面需要水平镜像
  pub fn with_front_facing(mut self, front_facing: bool) -> Self {
    self.front_facing = front_facing;
    self
  }

  pub fn width(&self) -> u32 {
    self.image.width()
  }

  pub fn height(&self) -> u32 {
    self.image.height()
  }

  pub fn rotation_degrees(&self) -> i32 {
    self.rotation_degrees
  }

  pub fn front_facing(&self) -> bool {
    self.front_facing
  }

  /// 宽或高为零的帧没有可分析的内容
  pub fn is_empty(&self) -> bool {
    self.image.width() == 0 || self.image.height() == 0
  }

  pub fn image(&self) -> &RgbImage {
    &self.image
  }

  pub(crate) fn into_parts(self) -> (RgbImage, i32, bool) {
    (self.image, self.rotation_degrees, self.front_facing)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rgb_buffer_must_match_geometry() {
    assert!(Frame::from_rgb(2, 2, vec![0; 12]).is_ok());
    match Frame::from_rgb(2, 2, vec![0; 11]) {
      Err(FrameError::BufferSizeMismatch { expected, actual }) => {
        assert_eq!(expected, 12);
        assert_eq!(actual, 11);
      }
      other => panic!("unexpected result: {:?}", other),
    }
  }

  #[test]
  fn rgba_buffer_drops_alpha() {
    let frame = Frame::from_rgba(1, 1, vec![10, 20, 30, 255]).unwrap();
    assert_eq!(frame.image().get_pixel(0, 0).0, [10, 20, 30]);
  }

  #[test]
  fn zero_area_frames_are_empty() {
    let frame = Frame::from_rgb(0, 4, Vec::new()).unwrap();
    assert!(frame.is_empty());
    assert!(!Frame::new(RgbImage::new(1, 1)).is_empty());
  }
}
