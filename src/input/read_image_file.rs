// 该文件是 PesoBuddy （比索伙伴） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use std::time::Duration;

use image::{ImageReader, RgbImage};
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::Frame, query_flag, query_value};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(#[from] image::ImageError),
}

/// 把一张图片当作相机反复输出
///
/// URL 形式：`image:///path/to/coin.jpg?rotate=90&front=true&repeat=30&fps=15`
/// - `rotate`：帧携带的待校正角度，默认 0；
/// - `front`：是否为前置摄像头；
/// - `repeat`：输出次数，默认 1；
/// - `fps`：输出节奏，默认不限速。
pub struct ImageFileInput {
  image: RgbImage,
  rotation_degrees: i32,
  front_facing: bool,
  remaining: usize,
  interval: Option<Duration>,
  emitted: usize,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    let path = url.path();
    let image = ImageReader::open(path)?.decode()?.to_rgb8();
    info!("读取图片: {} ({}x{})", path, image.width(), image.height());

    Ok(
      ImageFileInput::new(image)
        .with_rotation(query_value(url, "rotate").unwrap_or(0))
        .with_front_facing(query_flag(url, "front"))
        .with_repeat(query_value(url, "repeat").unwrap_or(1))
        .with_interval(query_value(url, "fps").and_then(frame_interval)),
    )
  }
}

/// 帧率换算为输出间隔；非正数或换算溢出时不限速
fn frame_interval(fps: f64) -> Option<Duration> {
  if fps > 0.0 {
    Duration::try_from_secs_f64(1.0 / fps).ok()
  } else {
    None
  }
}

impl ImageFileInput {
  pub fn new(image: RgbImage) -> Self {
    Self {
      image,
      rotation_degrees: 0,
      front_facing: false,
      remaining: 1,
      interval: None,
      emitted: 0,
    }
  }

  pub fn with_rotation(mut self, degrees: i32) -> Self {
    self.rotation_degrees = degrees;
    self
  }

  pub fn with_front_facing(mut self, front_facing: bool) -> Self {
    self.front_facing = front_facing;
    self
  }

  pub fn with_repeat(mut self, repeat: usize) -> Self {
    self.remaining = repeat;
    self
  }

  pub fn with_interval(mut self, interval: Option<Duration>) -> Self {
    self.interval = interval;
    self
  }
}

impl Iterator for ImageFileInput {
  type Item = Frame;

  fn next(&mut self) -> Option<Self::Item> {
    if self.remaining == 0 {
      return None;
    }
    if self.emitted > 0
      && let Some(interval) = self.interval
    {
      std::thread::sleep(interval);
    }
    self.remaining -= 1;
    self.emitted += 1;

    Some(
      Frame::new(self.image.clone())
        .with_rotation(self.rotation_degrees)
        .with_front_facing(self.front_facing),
    )
  }
}
