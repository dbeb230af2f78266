// 该文件是 PesoBuddy （比索伙伴） 项目的一部分。
// src/select.rs - 最佳检测结果选择
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

use std::cmp::Ordering;

use crate::detector::Detection;

/// 从一帧的检测结果中选出唯一需要关注的一个
///
/// 不依赖检测器的输出顺序：置信度最高者胜出，置信度相同时取面积更大的框，
/// 仍然相同时保留检测器给出的先后顺序。NaN 置信度排在所有实数之后。
pub fn select(detections: Vec<Detection>) -> Option<Detection> {
  detections
    .into_iter()
    .enumerate()
    .max_by(|(ia, a), (ib, b)| rank(a, b).then_with(|| ib.cmp(ia)))
    .map(|(_, detection)| detection)
}

fn rank(a: &Detection, b: &Detection) -> Ordering {
  confidence_key(a)
    .total_cmp(&confidence_key(b))
    .then_with(|| a.area().total_cmp(&b.area()))
}

fn confidence_key(detection: &Detection) -> f32 {
  if detection.confidence.is_nan() {
    f32::NEG_INFINITY
  } else {
    detection.confidence
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_frame_selects_nothing() {
    assert_eq!(select(Vec::new()), None);
  }

  #[test]
  fn highest_confidence_wins_regardless_of_order() {
    let picked = select(vec![
      Detection::new("5 pesos", 0.95),
      Detection::new("1 peso", 0.99),
      Detection::new("10 pesos", 0.40),
    ])
    .unwrap();
    assert_eq!(picked.label, "1 peso");
  }

  #[test]
  fn larger_box_breaks_confidence_tie() {
    let picked = select(vec![
      Detection::new("small", 0.9).with_bbox([0.0, 0.0, 0.1, 0.1]),
      Detection::new("large", 0.9).with_bbox([0.0, 0.0, 0.5, 0.5]),
    ])
    .unwrap();
    assert_eq!(picked.label, "large");
  }

  #[test]
  fn full_tie_keeps_detector_order() {
    let picked = select(vec![
      Detection::new("first", 0.9),
      Detection::new("second", 0.9),
    ])
    .unwrap();
    assert_eq!(picked.label, "first");
  }

  #[test]
  fn nan_confidence_never_wins() {
    let picked = select(vec![
      Detection::new("broken", f32::NAN),
      Detection::new("real", 0.1),
    ])
    .unwrap();
    assert_eq!(picked.label, "real");
  }
}
