// 该文件是 PesoBuddy （比索伙伴） 项目的一部分。
// src/illumination/v4l2_torch.rs - V4L2 闪光灯控制
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

use tracing::{debug, error, info};
use url::Url;
use v4l::control::{Control, Value};

use crate::{
  FromUrl, FromUrlWithScheme,
  illumination::{Illumination, IlluminationError},
};

// V4L2_CID_FLASH_CLASS_BASE + 1
const V4L2_CID_FLASH_LED_MODE: u32 = 0x009c_0901;
const V4L2_FLASH_LED_MODE_NONE: i64 = 0;
const V4L2_FLASH_LED_MODE_TORCH: i64 = 2;

/// 通过 V4L2 闪光灯控制项切换手电筒模式
///
/// URL 形式：`v4l2:///dev/video0`，路径为空时使用 `/dev/video0`。
/// 每次切换时打开设备，不长期占用句柄。
pub struct V4l2Torch {
  device_path: String,
}

impl FromUrlWithScheme for V4l2Torch {
  const SCHEME: &'static str = "v4l2";
}

impl FromUrl for V4l2Torch {
  type Error = IlluminationError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(IlluminationError::SchemeMismatch);
    }

    let device_path = if url.path().is_empty() || url.path() == "/" {
      "/dev/video0".to_string()
    } else {
      url.path().to_string()
    };

    // 打开一次以确认设备存在
    v4l::Device::with_path(&device_path)?;
    info!("补光设备: {}", device_path);

    Ok(V4l2Torch { device_path })
  }
}

impl Illumination for V4l2Torch {
  fn set_enabled(&mut self, enabled: bool) -> Result<(), IlluminationError> {
    let device = v4l::Device::with_path(&self.device_path)?;
    let mode = if enabled {
      V4L2_FLASH_LED_MODE_TORCH
    } else {
      V4L2_FLASH_LED_MODE_NONE
    };
    debug!("设置闪光灯模式: {}", mode);
    device.set_control(Control {
      id: V4L2_CID_FLASH_LED_MODE,
      value: Value::Integer(mode),
    })?;
    Ok(())
  }
}
