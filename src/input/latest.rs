// 该文件是 PesoBuddy （比索伙伴） 项目的一部分。
// src/input/latest.rs - 只保留最新帧
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
  sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
  thread,
};

use tracing::{debug, info, warn};

use crate::frame::Frame;

#[derive(Debug, Default)]
struct Slot {
  frame: Option<Frame>,
  finished: bool,
  closed: bool,
  dropped: u64,
}

/// 单帧槽位：新帧覆盖尚未取走的旧帧，旧帧计为丢弃
#[derive(Debug, Default)]
pub struct LatestSlot {
  slot: Mutex<Slot>,
  ready: Condvar,
}

impl LatestSlot {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, Slot> {
    self.slot.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// 放入一帧，返回是否覆盖了未被取走的帧
  pub fn push(&self, frame: Frame) -> bool {
    let mut slot = self.lock();
    let replaced = slot.frame.replace(frame).is_some();
    if replaced {
      slot.dropped += 1;
      debug!("分析未完成，丢弃旧帧");
    }
    self.ready.notify_one();
    replaced
  }

  /// 不阻塞地取出当前帧
  pub fn try_take(&self) -> Option<Frame> {
    self.lock().frame.take()
  }

  /// 阻塞直到有新帧；来源结束且槽位为空时返回 `None`
  pub fn take(&self) -> Option<Frame> {
    let mut slot = self.lock();
    loop {
      if let Some(frame) = slot.frame.take() {
        return Some(frame);
      }
      if slot.finished {
        return None;
      }
      slot = self
        .ready
        .wait(slot)
        .unwrap_or_else(PoisonError::into_inner);
    }
  }

  /// 来源已结束
  pub fn finish(&self) {
    self.lock().finished = true;
    self.ready.notify_all();
  }

  /// 消费方已离开，生产方应停止
  pub fn close(&self) {
    self.lock().closed = true;
  }

  pub fn is_closed(&self) -> bool {
    self.lock().closed
  }

  pub fn dropped(&self) -> u64 {
    self.lock().dropped
  }
}

/// 在后台线程采集帧，分析线程每次只拿到最新的一帧
pub struct LatestFrames {
  slot: Arc<LatestSlot>,
}

impl LatestFrames {
  pub fn spawn<I>(source: I) -> Self
  where
    I: Iterator<Item = Frame> + Send + 'static,
  {
    let slot = Arc::new(LatestSlot::new());
    let producer = Arc::clone(&slot);

    thread::spawn(move || {
      for frame in source {
        if producer.is_closed() {
          debug!("分析线程已退出，停止采集");
          break;
        }
        producer.push(frame);
      }
      producer.finish();
      info!("帧来源结束");
    });

    Self { slot }
  }

  pub fn dropped(&self) -> u64 {
    self.slot.dropped()
  }
}

impl Iterator for LatestFrames {
  type Item = Frame;

  fn next(&mut self) -> Option<Self::Item> {
    self.slot.take()
  }
}

impl Drop for LatestFrames {
  fn drop(&mut self) {
    self.slot.close();
    let dropped = self.slot.dropped();
    if dropped > 0 {
      warn!("共丢弃 {} 帧", dropped);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::RgbImage;

  fn frame(width: u32) -> Frame {
    Frame::new(RgbImage::new(width, 1))
  }

  #[test]
  fn newer_frame_replaces_pending_one() {
    let slot = LatestSlot::new();
    assert!(!slot.push(frame(1)));
    assert!(slot.push(frame(2)));
    assert!(slot.push(frame(3)));

    assert_eq!(slot.try_take().map(|f| f.width()), Some(3));
    assert!(slot.try_take().is_none());
    assert_eq!(slot.dropped(), 2);
  }

  #[test]
  fn take_drains_before_finishing() {
    let slot = LatestSlot::new();
    slot.push(frame(1));
    slot.finish();
    assert_eq!(slot.take().map(|f| f.width()), Some(1));
    assert!(slot.take().is_none());
  }

  #[test]
  fn take_waits_for_producer() {
    let slot = Arc::new(LatestSlot::new());
    let producer = Arc::clone(&slot);
    let worker = thread::spawn(move || {
      thread::sleep(std::time::Duration::from_millis(20));
      producer.push(frame(7));
    });
    assert_eq!(slot.take().map(|f| f.width()), Some(7));
    worker.join().unwrap();
  }

  #[test]
  fn spawned_source_ends() {
    let frames = LatestFrames::spawn((1..=5).map(frame));
    let seen: Vec<u32> = frames.map(|f| f.width()).collect();
    // 至少拿到最后一帧，其余可能被丢弃
    assert_eq!(seen.last(), Some(&5));
    assert!(seen.windows(2).all(|w| w[0] < w[1]));
  }
}
