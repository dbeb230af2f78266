// 该文件是 PesoBuddy （比索伙伴） 项目的一部分。
// src/illumination.rs - 补光控制
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

use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme};

#[derive(Error, Debug)]
pub enum IlluminationError {
  #[error("没有可用的补光设备")]
  Unavailable,
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("设备错误: {0}")]
  DeviceError(#[from] std::io::Error),
  #[error("补光设备拒绝请求: {0}")]
  Rejected(String),
}

/// 补光灯（手电筒）控制
pub trait Illumination: Send {
  fn set_enabled(&mut self, enabled: bool) -> Result<(), IlluminationError>;
}

impl<L: Illumination + ?Sized> Illumination for Box<L> {
  fn set_enabled(&mut self, enabled: bool) -> Result<(), IlluminationError> {
    (**self).set_enabled(enabled)
  }
}

/// 记录请求的补光设备，可以设置为拒绝所有请求
///
/// 克隆体共享同一份记录。
#[derive(Debug, Default, Clone)]
pub struct ScriptedIllumination {
  requests: Arc<Mutex<Vec<bool>>>,
  fault: Option<String>,
}

impl ScriptedIllumination {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn failing(reason: impl Into<String>) -> Self {
    Self {
      requests: Arc::default(),
      fault: Some(reason.into()),
    }
  }

  pub fn requests(&self) -> Vec<bool> {
    self
      .requests
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }
}

impl Illumination for ScriptedIllumination {
  fn set_enabled(&mut self, enabled: bool) -> Result<(), IlluminationError> {
    self
      .requests
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push(enabled);
    match &self.fault {
      Some(reason) => Err(IlluminationError::Rejected(reason.clone())),
      None => Ok(()),
    }
  }
}

#[cfg(feature = "v4l2_torch")]
mod v4l2_torch;
#[cfg(feature = "v4l2_torch")]
pub use self::v4l2_torch::V4l2Torch;

impl FromUrlWithScheme for ScriptedIllumination {
  const SCHEME: &'static str = "scripted";
}

impl FromUrl for ScriptedIllumination {
  type Error = IlluminationError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(IlluminationError::SchemeMismatch);
    }
    Ok(ScriptedIllumination::new())
  }
}

/// 按 URL 选择补光设备
pub fn illumination_from_url(url: &Url) -> Result<Box<dyn Illumination>, IlluminationError> {
  match url.scheme() {
    #[cfg(feature = "v4l2_torch")]
    V4l2Torch::SCHEME => Ok(Box::new(V4l2Torch::from_url(url)?)),
    ScriptedIllumination::SCHEME => Ok(Box::new(ScriptedIllumination::from_url(url)?)),
    _ => Err(IlluminationError::SchemeMismatch),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn scripted_records_requests() {
    let mut light = ScriptedIllumination::new();
    let observer = light.clone();
    light.set_enabled(true).unwrap();
    light.set_enabled(false).unwrap();
    assert_eq!(observer.requests(), vec![true, false]);
  }

  #[test]
  fn failing_light_reports_fault() {
    let mut light = ScriptedIllumination::failing("no torch");
    assert!(matches!(
      light.set_enabled(true),
      Err(IlluminationError::Rejected(reason)) if reason == "no torch"
    ));
  }

  #[test]
  fn url_selects_backend() {
    let url = Url::parse("scripted:").unwrap();
    assert!(illumination_from_url(&url).is_ok());

    let url = Url::parse("http://lamp.local/").unwrap();
    assert!(matches!(
      illumination_from_url(&url),
      Err(IlluminationError::SchemeMismatch)
    ));
  }
}
