// 该文件是 PesoBuddy （比索伙伴） 项目的一部分。
// src/accumulator.rs - 面额累计
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

use tracing::{debug, info};

use crate::speech::Notification;

/// 累计模式下两段播报之间的停顿
const TOTAL_BREAK: &str = r#"<break time="1000ms"/>"#;

/// 取标签中第一个以空白分隔的词作为面额
///
/// 无法解析时返回 0（包括负数），不会中断管线。
pub fn extract_value(label: &str) -> u64 {
  label
    .split_whitespace()
    .next()
    .and_then(|token| token.parse::<u64>().ok())
    .unwrap_or(0)
}

/// 检测播报的文本
pub fn detected_message(label: &str) -> String {
  format!("Detected {} pesos", label)
}

/// 面额累计器
///
/// `active` 同时也是“计数开关”的唯一状态，关闭时总额清零。
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Accumulator {
  total: u64,
  active: bool,
}

impl Accumulator {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn total(&self) -> u64 {
    self.total
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  /// 处理一次通过节流门的检测，返回需要播报的语音
  pub fn on_qualifying_detection(&mut self, label: &str) -> Notification {
    let message = detected_message(label);
    if !self.active {
      return Notification::append(message);
    }

    let value = extract_value(label);
    self.total = self.total.saturating_add(value);
    debug!("累计 {} (+{})", self.total, value);

    Notification::interrupt(format!(
      "<speak>{}{}Total: {} pesos</speak>",
      message, TOTAL_BREAK, self.total
    ))
  }

  pub fn set_active(&mut self, active: bool) -> Notification {
    self.active = active;
    if !active {
      self.total = 0;
    }
    info!("计数模式: {}", if active { "开启" } else { "关闭" });

    Notification::interrupt(if active {
      "Counter is On"
    } else {
      "Counter is Off"
    })
  }

  pub fn toggle(&mut self) -> Notification {
    self.set_active(!self.active)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::speech::SpeechPolicy;

  #[test]
  fn extracts_leading_number() {
    assert_eq!(extract_value("5 pesos"), 5);
    assert_eq!(extract_value("20 pesos bill"), 20);
    assert_eq!(extract_value("  10\tpesos"), 10);
    assert_eq!(extract_value("1000"), 1000);
  }

  #[test]
  fn unparseable_labels_are_worth_nothing() {
    assert_eq!(extract_value("pesos"), 0);
    assert_eq!(extract_value(""), 0);
    assert_eq!(extract_value("   "), 0);
    assert_eq!(extract_value("-5 pesos"), 0);
    assert_eq!(extract_value("5.5 pesos"), 0);
    assert_eq!(extract_value("99999999999999999999999 pesos"), 0);
  }

  #[test]
  fn inactive_detection_appends_label_only() {
    let mut acc = Accumulator::new();
    let n = acc.on_qualifying_detection("1 peso");
    assert_eq!(n, Notification::append("Detected 1 peso pesos"));
    assert_eq!(acc.total(), 0);
  }

  #[test]
  fn accumulation_round_trip() {
    let mut acc = Accumulator::new();
    assert_eq!((acc.total(), acc.is_active()), (0, false));

    assert_eq!(acc.toggle(), Notification::interrupt("Counter is On"));
    assert_eq!((acc.total(), acc.is_active()), (0, true));

    let n = acc.on_qualifying_detection("10 pesos");
    assert_eq!(acc.total(), 10);
    assert_eq!(n.policy, SpeechPolicy::Interrupt);
    assert_eq!(
      n.text,
      r#"<speak>Detected 10 pesos pesos<break time="1000ms"/>Total: 10 pesos</speak>"#
    );

    let n = acc.on_qualifying_detection("20 pesos");
    assert_eq!(acc.total(), 30);
    assert!(n.text.contains("Total: 30 pesos"));

    assert_eq!(acc.toggle(), Notification::interrupt("Counter is Off"));
    assert_eq!((acc.total(), acc.is_active()), (0, false));
  }

  #[test]
  fn unparseable_label_adds_nothing_but_is_announced() {
    let mut acc = Accumulator::new();
    acc.set_active(true);
    acc.on_qualifying_detection("5 pesos");
    let n = acc.on_qualifying_detection("coin");
    assert_eq!(acc.total(), 5);
    assert!(n.text.contains("Detected coin pesos"));
    assert!(n.text.contains("Total: 5 pesos"));
  }

  #[test]
  fn activation_starts_from_zero() {
    let mut acc = Accumulator::new();
    acc.set_active(true);
    acc.on_qualifying_detection("50 pesos");
    acc.set_active(false);
    acc.set_active(true);
    assert_eq!(acc.total(), 0);
  }
}
