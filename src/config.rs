// 该文件是 PesoBuddy （比索伙伴） 项目的一部分。
// src/config.rs - 播报配置
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

/// 默认置信度阈值
pub const DEFAULT_THRESHOLD: f32 = 0.90;
/// 默认冷却时长
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(2000);
/// 启动时的欢迎语
pub const DEFAULT_GREETING: &str =
  "PesoBuddy is ready to detect. Please place the item in front of the camera.";

/// 播报管线配置
#[derive(Debug, Clone, PartialEq)]
pub struct AnnounceConfig {
  /// 置信度不低于该值的检测才会被播报
  pub threshold: f32,
  /// 一次播报之后的静默时长
  pub cooldown: Duration,
  /// 播报器启动时说出的欢迎语，`None` 表示不播报
  pub greeting: Option<String>,
}

impl Default for AnnounceConfig {
  fn default() -> Self {
    Self {
      threshold: DEFAULT_THRESHOLD,
      cooldown: DEFAULT_COOLDOWN,
      greeting: Some(DEFAULT_GREETING.to_string()),
    }
  }
}

impl AnnounceConfig {
  pub fn with_threshold(mut self, threshold: f32) -> Self {
    self.threshold = threshold;
    self
  }

  pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
    self.cooldown = cooldown;
    self
  }

  pub fn with_greeting(mut self, greeting: Option<String>) -> Self {
    self.greeting = greeting;
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_match_announcement_policy() {
    let config = AnnounceConfig::default();
    assert_eq!(config.threshold, 0.90);
    assert_eq!(config.cooldown, Duration::from_millis(2000));
    assert!(config.greeting.is_some());
  }

  #[test]
  fn builder_overrides() {
    let config = AnnounceConfig::default()
      .with_threshold(0.5)
      .with_cooldown(Duration::from_millis(10))
      .with_greeting(None);
    assert_eq!(config.threshold, 0.5);
    assert_eq!(config.cooldown, Duration::from_millis(10));
    assert_eq!(config.greeting, None);
  }
}
