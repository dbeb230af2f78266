// 该文件是 PesoBuddy （比索伙伴） 项目的一部分。
// src/announcer.rs - 播报事件队列
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

//! # 播报器
//!
//! 节流门、累计器与模式开关的状态只归一个线程所有。检测结果、用户的开关命令、
//! 冷却到期以及退出请求都作为事件进入同一个队列，按到达顺序逐个处理：
//!
//! ```text
//! 分析线程 ──Detections──┐
//! 控制台   ──Toggle*─────┼──> mpsc 队列 ──> 播报线程 (AnnouncerCore) ──> Speaker
//! 冷却定时 (recv_timeout)┘
//! ```
//!
//! [`AnnouncerCore`] 是不含线程的同步内核，可以直接在测试中驱动。

use std::{
  sync::mpsc::{self, Receiver, RecvTimeoutError, Sender},
  thread::{self, JoinHandle},
  time::Instant,
};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
  accumulator::Accumulator,
  config::AnnounceConfig,
  detector::Detection,
  gate::{Admission, NotificationGate},
  illumination::Illumination,
  select::select,
  speech::{Notification, Speaker},
  toggle::{ModeController, ToggleState},
};

#[derive(Debug)]
pub enum Event {
  Detections(Vec<Detection>),
  ToggleIllumination,
  ToggleAccumulation,
  Shutdown,
}

#[derive(Error, Debug)]
pub enum AnnouncerError {
  #[error("播报线程已退出")]
  Closed,
  #[error("播报线程异常退出")]
  Panicked,
}

/// 分析结果的去处
pub trait DetectionSink {
  type Error;
  fn submit(&self, detections: Vec<Detection>) -> Result<(), Self::Error>;
}

/// 播报统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AnnouncerStats {
  pub announced: u64,
  pub below_threshold: u64,
  pub suppressed: u64,
  pub empty_frames: u64,
}

pub struct AnnouncerCore<S> {
  gate: NotificationGate,
  accumulator: Accumulator,
  modes: ModeController,
  speaker: S,
  greeting: Option<String>,
  stats: AnnouncerStats,
}

impl<S: Speaker> AnnouncerCore<S> {
  pub fn new(
    config: &AnnounceConfig,
    speaker: S,
    illumination: Option<Box<dyn Illumination>>,
  ) -> Self {
    Self {
      gate: NotificationGate::new(config),
      accumulator: Accumulator::new(),
      modes: ModeController::new(illumination),
      speaker,
      greeting: config.greeting.clone(),
      stats: AnnouncerStats::default(),
    }
  }

  pub fn gate(&self) -> &NotificationGate {
    &self.gate
  }

  pub fn accumulator(&self) -> &Accumulator {
    &self.accumulator
  }

  pub fn toggle_state(&self) -> ToggleState {
    self.modes.state(&self.accumulator)
  }

  pub fn stats(&self) -> AnnouncerStats {
    self.stats
  }

  pub fn speaker(&self) -> &S {
    &self.speaker
  }

  pub fn greet(&self) {
    if let Some(greeting) = &self.greeting {
      self.emit(&Notification::interrupt(greeting.as_str()));
    }
  }

  /// 处理一个事件，返回 `false` 表示应当退出
  pub fn handle(&mut self, event: Event, now: Instant) -> bool {
    match event {
      Event::Detections(detections) => {
        self.on_detections(detections, now);
      }
      Event::ToggleIllumination => {
        self.toggle_illumination();
      }
      Event::ToggleAccumulation => {
        self.toggle_accumulation();
      }
      Event::Shutdown => return false,
    }
    true
  }

  /// 一帧的检测结果：选出最佳检测，经过节流门后播报
  pub fn on_detections(
    &mut self,
    detections: Vec<Detection>,
    now: Instant,
  ) -> Option<Notification> {
    let Some(best) = select(detections) else {
      self.stats.empty_frames += 1;
      return None;
    };

    match self.gate.admit(&best, now) {
      Admission::Announce => {
        info!("检测到 {} ({:.2}%)", best.label, best.confidence * 100.0);
        let notification = self.accumulator.on_qualifying_detection(&best.label);
        self.emit(&notification);
        self.stats.announced += 1;
        Some(notification)
      }
      Admission::BelowThreshold => {
        self.stats.below_threshold += 1;
        None
      }
      Admission::Cooling => {
        debug!("冷却中，忽略 {}", best.label);
        self.stats.suppressed += 1;
        None
      }
    }
  }

  pub fn toggle_illumination(&mut self) -> Option<Notification> {
    match self.modes.toggle_illumination() {
      Ok(notification) => {
        self.emit(&notification);
        Some(notification)
      }
      Err(e) => {
        error!("无法切换补光: {}", e);
        None
      }
    }
  }

  pub fn toggle_accumulation(&mut self) -> Notification {
    let notification = self.modes.toggle_accumulation(&mut self.accumulator);
    self.emit(&notification);
    notification
  }

  /// 冷却到期
  pub fn expire(&mut self, now: Instant) {
    self.gate.poll(now);
  }

  fn emit(&self, notification: &Notification) {
    if let Err(e) = self.speaker.say(notification) {
      error!("语音输出失败: {}", e);
    }
  }
}

/// 在独立线程上运行的播报器
pub struct Announcer<S> {
  handle: AnnouncerHandle,
  worker: Option<JoinHandle<AnnouncerCore<S>>>,
}

impl<S: Speaker + 'static> Announcer<S> {
  pub fn spawn(core: AnnouncerCore<S>) -> Self {
    let (tx, rx) = mpsc::channel();
    let worker = thread::spawn(move || run(core, rx));
    Self {
      handle: AnnouncerHandle { tx },
      worker: Some(worker),
    }
  }

  pub fn handle(&self) -> AnnouncerHandle {
    self.handle.clone()
  }

  /// 处理完队列中已有的事件后退出，返回最终状态
  pub fn join(mut self) -> Result<AnnouncerCore<S>, AnnouncerError> {
    let _ = self.handle.tx.send(Event::Shutdown);
    let worker = self.worker.take().ok_or(AnnouncerError::Closed)?;
    worker.join().map_err(|_| AnnouncerError::Panicked)
  }
}

impl<S> Drop for Announcer<S> {
  fn drop(&mut self) {
    if let Some(worker) = self.worker.take() {
      let _ = self.handle.tx.send(Event::Shutdown);
      if worker.join().is_err() {
        warn!("播报线程异常退出");
      }
    }
  }
}

fn run<S: Speaker>(mut core: AnnouncerCore<S>, rx: Receiver<Event>) -> AnnouncerCore<S> {
  info!("播报器启动");
  core.greet();

  loop {
    let event = match core.gate.deadline() {
      Some(until) => match rx.recv_timeout(until.saturating_duration_since(Instant::now())) {
        Ok(event) => event,
        Err(RecvTimeoutError::Timeout) => {
          core.expire(Instant::now());
          continue;
        }
        Err(RecvTimeoutError::Disconnected) => break,
      },
      None => match rx.recv() {
        Ok(event) => event,
        Err(_) => break,
      },
    };

    if !core.handle(event, Instant::now()) {
      break;
    }
  }

  let stats = core.stats();
  info!(
    "播报器退出: 播报 {} 次, 低置信度 {} 次, 冷却中忽略 {} 次, 空帧 {} 次",
    stats.announced, stats.below_threshold, stats.suppressed, stats.empty_frames
  );
  core
}

/// 向播报器发送事件，可在多个线程间克隆
#[derive(Debug, Clone)]
pub struct AnnouncerHandle {
  tx: Sender<Event>,
}

impl AnnouncerHandle {
  fn send(&self, event: Event) -> Result<(), AnnouncerError> {
    self.tx.send(event).map_err(|_| AnnouncerError::Closed)
  }

  pub fn toggle_illumination(&self) -> Result<(), AnnouncerError> {
    self.send(Event::ToggleIllumination)
  }

  pub fn toggle_accumulation(&self) -> Result<(), AnnouncerError> {
    self.send(Event::ToggleAccumulation)
  }
}

impl DetectionSink for AnnouncerHandle {
  type Error = AnnouncerError;

  fn submit(&self, detections: Vec<Detection>) -> Result<(), Self::Error> {
    self.send(Event::Detections(detections))
  }
}
