// 该文件是 PesoBuddy （比索伙伴） 项目的一部分。
// src/task.rs - 分析任务
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

use std::{
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
  time::{Duration, Instant},
};

use tracing::{debug, error, info, warn};

use crate::{
  announcer::DetectionSink, detector::Detector, frame::Frame, normalize::normalize,
};

pub trait Task<I, D, O>: Sized {
  type Error;
  fn run_task(self, input: I, detector: D, output: O) -> Result<CycleStats, Self::Error>;
}

/// 分析周期统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleStats {
  /// 完成推理的帧数
  pub analyzed: u64,
  /// 空帧或损坏帧，未送入检测器
  pub skipped: u64,
  /// 检测器报错，按无检测结果处理
  pub detector_failures: u64,
  pub inference_time: Duration,
}

impl CycleStats {
  pub fn mean_inference_time(&self) -> Option<Duration> {
    let runs = u128::from(self.analyzed + self.detector_failures);
    if runs == 0 {
      return None;
    }
    let nanos = self.inference_time.as_nanos() / runs;
    Some(Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX)))
  }
}

/// 持续分析：取帧、校正、推理，把结果交给播报器
#[derive(Default, Debug)]
pub struct ContinuousTask {
  frame_number: Option<u64>,
  stop: Arc<AtomicBool>,
}

impl ContinuousTask {
  pub fn with_frame_number(mut self, frame_number: Option<u64>) -> Self {
    self.frame_number = frame_number;
    self
  }

  /// 置位后任务在当前帧结束时退出
  pub fn stop_flag(&self) -> Arc<AtomicBool> {
    Arc::clone(&self.stop)
  }
}

impl<I, D, O> Task<I, D, O> for ContinuousTask
where
  I: Iterator<Item = Frame>,
  D: Detector,
  D::Error: std::fmt::Display,
  O: DetectionSink,
  O::Error: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, mut detector: D, output: O) -> Result<CycleStats, Self::Error> {
    info!("开始任务...");
    let mut stats = CycleStats::default();
    let mut frame_index = 0u64;

    for frame in input {
      frame_index += 1;

      let Some(image) = normalize(frame) else {
        stats.skipped += 1;
        warn!("第 {} 帧为空，跳过", frame_index);
        continue;
      };

      let now = Instant::now();
      let detections = match detector.infer(&image) {
        Ok(detections) => {
          stats.analyzed += 1;
          detections
        }
        Err(e) => {
          stats.detector_failures += 1;
          error!("第 {} 帧推理失败: {}", frame_index, e);
          Vec::new()
        }
      };
      let elapsed = now.elapsed();
      stats.inference_time += elapsed;
      info!(
        "第 {} 帧推理完成，耗时: {:.2?}，检测到 {} 个对象",
        frame_index,
        elapsed,
        detections.len()
      );
      for det in &detections {
        debug!("  - {}: {:.2}%", det.label, det.confidence * 100.0);
      }

      output.submit(detections)?;

      if self.frame_number.map(|n| frame_index >= n).unwrap_or(false) {
        info!("达到指定帧数 {}, 退出任务循环", frame_index);
        break;
      }
      if self.stop.load(Ordering::SeqCst) {
        warn!("收到停止请求，退出任务循环");
        break;
      }
    }

    info!(
      "任务完成: 分析 {} 帧, 跳过 {} 帧, 推理失败 {} 次, 平均推理耗时 {:.2?}",
      stats.analyzed,
      stats.skipped,
      stats.detector_failures,
      stats.mean_inference_time().unwrap_or_default()
    );
    Ok(stats)
  }
}

#[cfg(test)]
mod tests {
  use std::{cell::RefCell, convert::Infallible};

  use image::RgbImage;

  use super::*;
  use crate::detector::{Detection, ReplayDetector};

  #[derive(Default)]
  struct Collect {
    frames: RefCell<Vec<Vec<Detection>>>,
  }

  impl DetectionSink for &Collect {
    type Error = Infallible;

    fn submit(&self, detections: Vec<Detection>) -> Result<(), Self::Error> {
      self.frames.borrow_mut().push(detections);
      Ok(())
    }
  }

  fn frames(count: usize) -> impl Iterator<Item = Frame> {
    (0..count).map(|_| Frame::new(RgbImage::new(4, 4)))
  }

  fn detector(script: &str) -> ReplayDetector {
    ReplayDetector::from_reader(script.as_bytes()).unwrap()
  }

  #[test]
  fn forwards_each_frame() {
    let sink = Collect::default();
    let stats = ContinuousTask::default()
      .run_task(
        frames(2),
        detector("[{\"label\": \"5 pesos\", \"confidence\": 0.95}]\n[]\n"),
        &sink,
      )
      .unwrap();

    assert_eq!(stats.analyzed, 2);
    let seen = sink.frames.borrow();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0][0].label, "5 pesos");
    assert!(seen[1].is_empty());
  }

  #[test]
  fn empty_frames_skip_the_detector() {
    let sink = Collect::default();
    let input = vec![
      Frame::new(RgbImage::new(0, 0)),
      Frame::new(RgbImage::new(4, 4)),
    ];
    let stats = ContinuousTask::default()
      .run_task(
        input.into_iter(),
        detector("[{\"label\": \"1 peso\", \"confidence\": 0.99}]\n"),
        &sink,
      )
      .unwrap();

    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.analyzed, 1);
    // 跳过的帧没有消耗脚本
    assert_eq!(sink.frames.borrow()[0][0].label, "1 peso");
  }

  #[test]
  fn detector_failure_counts_as_no_detections() {
    let sink = Collect::default();
    let stats = ContinuousTask::default()
      .run_task(
        frames(2),
        detector("{\"error\": \"npu timeout\"}\n[{\"label\": \"1 peso\", \"confidence\": 0.99}]\n"),
        &sink,
      )
      .unwrap();

    assert_eq!(stats.detector_failures, 1);
    assert_eq!(stats.analyzed, 1);
    let seen = sink.frames.borrow();
    assert!(seen[0].is_empty());
    assert_eq!(seen[1].len(), 1);
  }

  #[test]
  fn mean_inference_time_covers_failures() {
    let stats = CycleStats {
      analyzed: 3,
      detector_failures: 1,
      inference_time: Duration::from_millis(100),
      ..CycleStats::default()
    };
    assert_eq!(stats.mean_inference_time(), Some(Duration::from_millis(25)));
    assert_eq!(CycleStats::default().mean_inference_time(), None);
  }

  #[test]
  fn mean_inference_time_with_huge_run_count() {
    // 2^32 次推理不能被截断成 0
    let stats = CycleStats {
      analyzed: 1 << 32,
      inference_time: Duration::from_secs(1 << 32),
      ..CycleStats::default()
    };
    assert_eq!(stats.mean_inference_time(), Some(Duration::from_secs(1)));
  }

  #[test]
  fn stops_at_frame_number() {
    let sink = Collect::default();
    let stats = ContinuousTask::default()
      .with_frame_number(Some(3))
      .run_task(frames(10), detector(""), &sink)
      .unwrap();
    assert_eq!(stats.analyzed, 3);
  }

  #[test]
  fn stop_flag_ends_loop() {
    let sink = Collect::default();
    let task = ContinuousTask::default();
    task.stop_flag().store(true, Ordering::SeqCst);
    let stats = task.run_task(frames(10), detector(""), &sink).unwrap();
    assert_eq!(stats.analyzed, 1);
  }
}
