// 该文件是 PesoBuddy （比索伙伴） 项目的一部分。
// src/gate.rs - 播报节流门
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

//! # 播报节流门
//!
//! 相机推理每秒运行多次，远快于人听清一句播报的速度。节流门保证每个冷却窗口内
//! 最多播报一次，与帧率无关：
//!
//! - `Active`：接受新的检测；置信度达到阈值的检测使其进入 `Cooling`，并允许播报一次；
//! - `Cooling`：截止时间之前的所有检测都被丢弃，不排队也不重试；
//! - 截止时间到达后回到 `Active`，没有任何输出。
//!
//! 时间由调用方传入，节流门本身不读取时钟。

use std::time::{Duration, Instant};

use tracing::debug;

use crate::{config::AnnounceConfig, detector::Detection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
  Active,
  Cooling { until: Instant },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
  /// 检测通过，调用方应播报一次
  Announce,
  /// 置信度不足
  BelowThreshold,
  /// 仍在冷却中
  Cooling,
}

#[derive(Debug, Clone)]
pub struct NotificationGate {
  threshold: f32,
  cooldown: Duration,
  state: GateState,
}

impl NotificationGate {
  pub fn new(config: &AnnounceConfig) -> Self {
    Self {
      threshold: config.threshold,
      cooldown: config.cooldown,
      state: GateState::Active,
    }
  }

  pub fn state(&self) -> GateState {
    self.state
  }

  pub fn threshold(&self) -> f32 {
    self.threshold
  }

  /// 冷却截止时间，处于 `Active` 时为 `None`
  pub fn deadline(&self) -> Option<Instant> {
    match self.state {
      GateState::Active => None,
      GateState::Cooling { until } => Some(until),
    }
  }

  pub fn is_paused(&self, now: Instant) -> bool {
    matches!(self.state, GateState::Cooling { until } if now < until)
  }

  pub fn is_qualifying(&self, detection: &Detection) -> bool {
    detection.confidence >= self.threshold
  }

  /// 截止时间已过则回到 `Active`，返回是否发生了状态切换
  pub fn poll(&mut self, now: Instant) -> bool {
    match self.state {
      GateState::Cooling { until } if now >= until => {
        debug!("冷却结束，恢复检测");
        self.state = GateState::Active;
        true
      }
      _ => false,
    }
  }

  /// 判断一次检测能否播报；通过时节流门进入冷却
  pub fn admit(&mut self, detection: &Detection, now: Instant) -> Admission {
    self.poll(now);

    if let GateState::Cooling { .. } = self.state {
      return Admission::Cooling;
    }

    if !self.is_qualifying(detection) {
      debug!(
        "置信度过低: {:.2} < {:.2}，不播报",
        detection.confidence, self.threshold
      );
      return Admission::BelowThreshold;
    }

    self.state = GateState::Cooling {
      until: now + self.cooldown,
    };
    Admission::Announce
  }
}
