// 该文件是 PesoBuddy （比索伙伴） 项目的一部分。
// src/input/gstreamer_input.rs - GStreamer 相机输入
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

//! # GStreamer 相机输入
//!
//! 通过 GStreamer 管道读取相机或视频文件，输出 RGB 帧。
//!
//! appsink 设置为 `max-buffers=1 drop=true`：分析跟不上时 GStreamer 只保留最新的一帧，
//! 与 [`crate::input::LatestFrames`] 的策略一致。
//!
//! 旋转与镜像不在管道中完成，而是记录在 [`Frame`] 上交给帧校正处理。
//!
//! ## URL 形式
//!
//! - `gst://camera/dev/video0?width=640&height=480&fps=15&rotate=90&front=true`
//! - `gst://file/path/to/video.mp4?rotate=180`
//!
//! ## 系统依赖
//!
//! **Ubuntu/Debian:**
//! ```bash
//! sudo apt-get install libgstreamer1.0-dev libgstreamer-plugins-base1.0-dev
//! ```

use std::collections::HashMap;

use gstreamer::{self as gst, prelude::*};
use gstreamer_app as gst_app;
use gstreamer_video as gst_video;
use image::RgbImage;
use thiserror::Error;
use tracing::{error, info, warn};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::Frame, query_flag, query_value};

const RGB_CHANNELS: usize = 3;

/// GStreamer 输入错误类型
#[derive(Error, Debug)]
pub enum GStreamerInputError {
  /// URI scheme 不匹配（期望 "gst://"）
  #[error("URI scheme mismatch")]
  SchemeMismatch,
  #[error("GStreamer error: {0}")]
  GStreamerError(#[from] gst::glib::Error),
  #[error("GStreamer boolean error: {0}")]
  GStreamerBoolError(#[from] gst::glib::BoolError),
  #[error("Failed to get appsink element")]
  AppSinkNotFound,
  #[error("Failed to convert element to appsink")]
  AppSinkConversionFailed,
  #[error("Failed to get video info from caps")]
  VideoInfoError,
  #[error("Unsupported video format")]
  UnsupportedFormat,
  #[error("Pipeline error: {0}")]
  PipelineError(String),
  /// 缓冲区大小不匹配
  #[error("Buffer size mismatch: expected {expected} bytes, got {actual} bytes")]
  BufferSizeMismatch { expected: usize, actual: usize },
  #[error("State change error: {0}")]
  StateChangeError(#[from] gst::StateChangeError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GStreamerInputBuilderItem {
  FileSource(String),
  CameraSource {
    camera: String,
    width: u32,
    height: u32,
    fps: u32,
  },
  TargetFormat {
    format: String,
  },
}

impl GStreamerInputBuilderItem {
  fn to_pipeline(&self) -> String {
    match self {
      GStreamerInputBuilderItem::FileSource(path) => {
        format!("filesrc location={} ! decodebin", path)
      }
      GStreamerInputBuilderItem::CameraSource {
        camera,
        width,
        height,
        fps,
      } => format!(
        "v4l2src device={} ! video/x-raw,width={},height={},framerate={}/1",
        camera, width, height, fps
      ),
      GStreamerInputBuilderItem::TargetFormat { format } => {
        format!("videoconvert ! video/x-raw,format={}", format)
      }
    }
  }
}

/// GStreamer 输入管道构建器
#[derive(Debug, Clone)]
pub struct GStreamerInputPipelineBuilder {
  items: Vec<GStreamerInputBuilderItem>,
  rotation_degrees: i32,
  front_facing: bool,
}

impl Default for GStreamerInputPipelineBuilder {
  fn default() -> Self {
    Self::new()
  }
}

impl GStreamerInputPipelineBuilder {
  pub fn new() -> Self {
    Self {
      items: Vec::new(),
      rotation_degrees: 0,
      front_facing: false,
    }
  }

  pub fn camera(mut self, camera: &str, width: u32, height: u32, fps: u32) -> Self {
    self.items.push(GStreamerInputBuilderItem::CameraSource {
      camera: camera.to_string(),
      width,
      height,
      fps,
    });
    self
  }

  pub fn file(mut self, path: &str) -> Self {
    self
      .items
      .push(GStreamerInputBuilderItem::FileSource(path.to_string()));
    self
  }

  pub fn rotation(mut self, degrees: i32) -> Self {
    self.rotation_degrees = degrees;
    self
  }

  pub fn front_facing(mut self, front_facing: bool) -> Self {
    self.front_facing = front_facing;
    self
  }

  /// 不含 appsink 的管道描述
  pub fn description(&self) -> String {
    self
      .items
      .iter()
      .map(GStreamerInputBuilderItem::to_pipeline)
      .chain(std::iter::once(
        GStreamerInputBuilderItem::TargetFormat {
          format: "RGB".to_string(),
        }
        .to_pipeline(),
      ))
      .collect::<Vec<String>>()
      .join(" ! ")
  }

  pub fn build(self) -> Result<GStreamerInput, GStreamerInputError> {
    gst::init()?;

    let full_pipeline = format!(
      "{} ! appsink max-buffers=1 drop=true name=sink",
      self.description()
    );
    info!("GStreamer pipeline description: {}", full_pipeline);

    let pipeline = gst::parse::launch(&full_pipeline)?
      .downcast::<gst::Pipeline>()
      .map_err(|_| GStreamerInputError::PipelineError("Failed to create pipeline".to_string()))?;

    let appsink = pipeline
      .by_name("sink")
      .ok_or(GStreamerInputError::AppSinkNotFound)?
      .downcast::<gst_app::AppSink>()
      .map_err(|_| GStreamerInputError::AppSinkConversionFailed)?;

    pipeline.set_state(gst::State::Playing)?;

    Ok(GStreamerInput {
      pipeline,
      appsink,
      rotation_degrees: self.rotation_degrees,
      front_facing: self.front_facing,
    })
  }
}

impl FromUrlWithScheme for GStreamerInputPipelineBuilder {
  const SCHEME: &'static str = "gst";
}

impl FromUrl for GStreamerInputPipelineBuilder {
  type Error = GStreamerInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(GStreamerInputError::SchemeMismatch);
    }

    let query: HashMap<String, String> = url
      .query_pairs()
      .map(|(k, v)| (String::from(k), String::from(v)))
      .collect();
    let number = |key: &str, default: u32| {
      query
        .get(key)
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(default)
    };

    let builder = match url.host_str() {
      Some("camera") => Self::new().camera(
        url.path(),
        number("width", 640),
        number("height", 480),
        number("fps", 15),
      ),
      Some("file") => Self::new().file(url.path()),
      _ => return Err(GStreamerInputError::SchemeMismatch),
    };

    let rotation = query_value(url, "rotate").unwrap_or(0);
    let front = query_flag(url, "front");

    Ok(builder.rotation(rotation).front_facing(front))
  }
}

/// GStreamer 相机输入，迭代产出 [`Frame`]
pub struct GStreamerInput {
  pipeline: gst::Pipeline,
  appsink: gst_app::AppSink,
  rotation_degrees: i32,
  front_facing: bool,
}

impl Drop for GStreamerInput {
  fn drop(&mut self) {
    if let Err(e) = self.pipeline.set_state(gst::State::Null) {
      warn!("Failed to stop GStreamer pipeline: {}", e);
    }
  }
}

impl GStreamerInput {
  fn pull_sample(&self) -> Option<gst::Sample> {
    self
      .appsink
      .pull_sample()
      .map_err(|e| {
        error!("Failed to pull sample: {}", e);
        e
      })
      .ok()
  }
}

impl Iterator for GStreamerInput {
  type Item = Frame;

  fn next(&mut self) -> Option<Self::Item> {
    let sample = self.pull_sample()?;
    // 转换失败时输出空帧，由帧校正计为跳过；appsink 结束才返回 None
    let image = match convert_sample(sample) {
      Ok(image) => image,
      Err(e) => {
        error!("Failed to fetch sample: {}", e);
        RgbImage::new(0, 0)
      }
    };
    Some(
      Frame::new(image)
        .with_rotation(self.rotation_degrees)
        .with_front_facing(self.front_facing),
    )
  }
}

fn convert_sample(sample: gst::Sample) -> Result<RgbImage, GStreamerInputError> {
  let buffer = sample
    .buffer()
    .ok_or_else(|| GStreamerInputError::PipelineError("No buffer in sample".to_string()))?;
  let caps = sample
    .caps()
    .ok_or_else(|| GStreamerInputError::PipelineError("No caps in sample".to_string()))?;

  let video_info =
    gst_video::VideoInfo::from_caps(caps).map_err(|_| GStreamerInputError::VideoInfoError)?;
  if video_info.format() != gst_video::VideoFormat::Rgb {
    return Err(GStreamerInputError::UnsupportedFormat);
  }

  let width = video_info.width() as usize;
  let height = video_info.height() as usize;
  let stride = video_info.stride()[0] as usize;
  let row = width * RGB_CHANNELS;

  let map = buffer.map_readable().map_err(|e| {
    GStreamerInputError::PipelineError(format!("Failed to map buffer for reading: {}", e))
  })?;
  let data = map.as_slice();

  let expected = if height == 0 {
    0
  } else {
    stride * (height - 1) + row
  };
  if data.len() < expected {
    return Err(GStreamerInputError::BufferSizeMismatch {
      expected,
      actual: data.len(),
    });
  }

  // 去掉每行末尾的对齐填充
  let mut pixels = Vec::with_capacity(row * height);
  for h in 0..height {
    pixels.extend_from_slice(&data[h * stride..h * stride + row]);
  }

  RgbImage::from_raw(width as u32, height as u32, pixels).ok_or(
    GStreamerInputError::BufferSizeMismatch {
      expected: row * height,
      actual: data.len(),
    },
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn camera_url_builds_pipeline() {
    let url = Url::parse("gst://camera/dev/video2?width=320&height=240&fps=30&rotate=90&front=true")
      .unwrap();
    let builder = GStreamerInputPipelineBuilder::from_url(&url).unwrap();
    assert_eq!(
      builder.description(),
      "v4l2src device=/dev/video2 ! video/x-raw,width=320,height=240,framerate=30/1 ! \
       videoconvert ! video/x-raw,format=RGB"
    );
    assert_eq!(builder.rotation_degrees, 90);
    assert!(builder.front_facing);
  }

  #[test]
  fn file_url_builds_pipeline() {
    let url = Url::parse("gst://file/data/coins.mp4").unwrap();
    let builder = GStreamerInputPipelineBuilder::from_url(&url).unwrap();
    assert_eq!(
      builder.description(),
      "filesrc location=/data/coins.mp4 ! decodebin ! videoconvert ! video/x-raw,format=RGB"
    );
    assert_eq!(builder.rotation_degrees, 0);
  }

  #[test]
  fn unknown_host_is_rejected() {
    let url = Url::parse("gst://rtsp/stream").unwrap();
    assert!(matches!(
      GStreamerInputPipelineBuilder::from_url(&url),
      Err(GStreamerInputError::SchemeMismatch)
    ));
  }
}
