// 该文件是 PesoBuddy （比索伙伴） 项目的一部分。
// src/speech.rs - 语音输出
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

use serde::Serialize;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme};

/// 语音子系统内部队列的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechPolicy {
  /// 打断正在播放的语音并清空队列
  Interrupt,
  /// 排在已有语音之后
  Append,
}

/// 一条待播报的语音
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
  pub text: String,
  pub policy: SpeechPolicy,
}

impl Notification {
  pub fn interrupt(text: impl Into<String>) -> Self {
    Self {
      text: text.into(),
      policy: SpeechPolicy::Interrupt,
    }
  }

  pub fn append(text: impl Into<String>) -> Self {
    Self {
      text: text.into(),
      policy: SpeechPolicy::Append,
    }
  }
}

#[derive(Error, Debug)]
pub enum SpeechError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("语音工作线程已退出")]
  WorkerGone,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("序列化错误: {0}")]
  SerializeError(#[from] serde_json::Error),
}

/// 语音输出
///
/// `speak` 只负责提交，不等待播放结束。
pub trait Speaker: Send {
  fn speak(&self, text: &str, policy: SpeechPolicy) -> Result<(), SpeechError>;

  fn say(&self, notification: &Notification) -> Result<(), SpeechError> {
    self.speak(&notification.text, notification.policy)
  }
}

impl<S: Speaker + ?Sized> Speaker for Box<S> {
  fn speak(&self, text: &str, policy: SpeechPolicy) -> Result<(), SpeechError> {
    (**self).speak(text, policy)
  }
}

/// 仅写日志的语音输出，用于没有语音引擎的环境
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSpeaker;

impl FromUrlWithScheme for LogSpeaker {
  const SCHEME: &'static str = "log";
}

impl FromUrl for LogSpeaker {
  type Error = SpeechError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(SpeechError::SchemeMismatch);
    }
    Ok(LogSpeaker)
  }
}

impl Speaker for LogSpeaker {
  fn speak(&self, text: &str, policy: SpeechPolicy) -> Result<(), SpeechError> {
    info!("播报 ({:?}): {}", policy, text);
    Ok(())
  }
}

/// 把所有语音记录在内存中，克隆体共享同一份记录
#[derive(Debug, Default, Clone)]
pub struct MemorySpeaker {
  spoken: Arc<Mutex<Vec<Notification>>>,
}

impl MemorySpeaker {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn spoken(&self) -> Vec<Notification> {
    self
      .spoken
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }

  pub fn texts(&self) -> Vec<String> {
    self.spoken().into_iter().map(|n| n.text).collect()
  }
}

impl Speaker for MemorySpeaker {
  fn speak(&self, text: &str, policy: SpeechPolicy) -> Result<(), SpeechError> {
    self
      .spoken
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push(Notification {
        text: text.to_string(),
        policy,
      });
    Ok(())
  }
}

#[cfg(feature = "command_speech")]
mod command;
#[cfg(feature = "command_speech")]
pub use self::command::{CommandSpeaker, CommandSpeakerBuilder};

mod journal;
pub use self::journal::JournalSpeaker;

pub enum SpeakerWrapper {
  Log(LogSpeaker),
  #[cfg(feature = "command_speech")]
  Command(CommandSpeaker),
}

impl FromUrl for SpeakerWrapper {
  type Error = SpeechError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      LogSpeaker::SCHEME => Ok(SpeakerWrapper::Log(LogSpeaker::from_url(url)?)),
      #[cfg(feature = "command_speech")]
      CommandSpeakerBuilder::SCHEME => Ok(SpeakerWrapper::Command(
        CommandSpeakerBuilder::from_url(url)?.build(),
      )),
      _ => Err(SpeechError::SchemeMismatch),
    }
  }
}

impl Speaker for SpeakerWrapper {
  fn speak(&self, text: &str, policy: SpeechPolicy) -> Result<(), SpeechError> {
    match self {
      SpeakerWrapper::Log(speaker) => speaker.speak(text, policy),
      #[cfg(feature = "command_speech")]
      SpeakerWrapper::Command(speaker) => speaker.speak(text, policy),
    }
  }
}
