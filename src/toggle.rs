// 该文件是 PesoBuddy （比索伙伴） 项目的一部分。
// src/toggle.rs - 模式开关
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

use tracing::info;

use crate::{
  accumulator::Accumulator,
  illumination::{Illumination, IlluminationError},
  speech::Notification,
};

/// 两个开关的当前状态
///
/// `counter_on` 直接读取自 [`Accumulator::is_active`]，不单独保存。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleState {
  pub flash_on: bool,
  pub counter_on: bool,
}

/// 补光与计数两个开关，每次切换都会给出确认语音
pub struct ModeController {
  flash_on: bool,
  illumination: Option<Box<dyn Illumination>>,
}

impl ModeController {
  pub fn new(illumination: Option<Box<dyn Illumination>>) -> Self {
    Self {
      flash_on: false,
      illumination,
    }
  }

  pub fn flash_on(&self) -> bool {
    self.flash_on
  }

  pub fn state(&self, accumulator: &Accumulator) -> ToggleState {
    ToggleState {
      flash_on: self.flash_on,
      counter_on: accumulator.is_active(),
    }
  }

  /// 切换补光
  ///
  /// 没有补光设备或设备报错时拒绝切换，状态不变，也不播报。
  pub fn toggle_illumination(&mut self) -> Result<Notification, IlluminationError> {
    let light = self
      .illumination
      .as_mut()
      .ok_or(IlluminationError::Unavailable)?;

    let target = !self.flash_on;
    light.set_enabled(target)?;
    self.flash_on = target;
    info!("补光: {}", if target { "开启" } else { "关闭" });

    Ok(Notification::interrupt(if target {
      "Flash is On"
    } else {
      "Flash is Off"
    }))
  }

  /// 切换计数模式，状态由累计器持有
  pub fn toggle_accumulation(&self, accumulator: &mut Accumulator) -> Notification {
    accumulator.toggle()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::illumination::ScriptedIllumination;

  #[test]
  fn illumination_toggle_is_idempotent_over_two_presses() {
    let light = ScriptedIllumination::new();
    let mut modes = ModeController::new(Some(Box::new(light.clone())));

    let first = modes.toggle_illumination().unwrap();
    assert!(modes.flash_on());
    let second = modes.toggle_illumination().unwrap();
    assert!(!modes.flash_on());

    assert_eq!(first, Notification::interrupt("Flash is On"));
    assert_eq!(second, Notification::interrupt("Flash is Off"));
    assert_eq!(light.requests(), vec![true, false]);
  }

  #[test]
  fn missing_light_rejects_toggle() {
    let mut modes = ModeController::new(None);
    assert!(matches!(
      modes.toggle_illumination(),
      Err(IlluminationError::Unavailable)
    ));
    assert!(!modes.flash_on());
  }

  #[test]
  fn faulty_light_leaves_state_unchanged() {
    let mut modes = ModeController::new(Some(Box::new(ScriptedIllumination::failing("busy"))));
    assert!(modes.toggle_illumination().is_err());
    assert!(!modes.flash_on());
  }

  #[test]
  fn counter_state_is_read_from_accumulator() {
    let modes = ModeController::new(None);
    let mut acc = Accumulator::new();
    assert!(!modes.state(&acc).counter_on);

    let n = modes.toggle_accumulation(&mut acc);
    assert_eq!(n, Notification::interrupt("Counter is On"));
    assert_eq!(
      modes.state(&acc),
      ToggleState {
        flash_on: false,
        counter_on: true
      }
    );
  }
}
