// 该文件是 PesoBuddy （比索伙伴） 项目的一部分。
// src/speech/journal.rs - 播报记录
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
  fs::{File, OpenOptions},
  io::Write,
  path::Path,
  sync::{Mutex, PoisonError},
};

use chrono::Utc;
use tracing::info;

use crate::speech::{SpeechError, SpeechPolicy, Speaker};

/// 在转发给内部语音输出之前，把每条语音以 JSON 行追加到文件
pub struct JournalSpeaker<S> {
  inner: S,
  file: Mutex<File>,
}

impl<S: Speaker> JournalSpeaker<S> {
  pub fn create<P: AsRef<Path>>(path: P, inner: S) -> Result<Self, SpeechError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    info!("播报记录文件: {}", path.display());

    Ok(Self {
      inner,
      file: Mutex::new(file),
    })
  }

  pub fn inner(&self) -> &S {
    &self.inner
  }
}

impl<S: Speaker> Speaker for JournalSpeaker<S> {
  fn speak(&self, text: &str, policy: SpeechPolicy) -> Result<(), SpeechError> {
    let record = serde_json::json!({
      "time": Utc::now().to_rfc3339(),
      "policy": policy,
      "text": text,
    });

    {
      let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
      serde_json::to_writer(&mut *file, &record)?;
      file.write_all(b"\n")?;
    }

    self.inner.speak(text, policy)
  }
}
