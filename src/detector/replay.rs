// 该文件是 PesoBuddy （比索伙伴） 项目的一部分。
// src/detector/replay.rs - 回放检测器
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

//! # 回放检测器
//!
//! 从 JSON Lines 脚本中逐帧回放事先记录的检测结果，每行对应一帧：
//!
//! ```text
//! [{"label": "5 pesos", "confidence": 0.95}, {"label": "1 peso", "confidence": 0.99}]
//! []
//! {"error": "npu timeout"}
//! ```
//!
//! 空行等价于 `[]`；`{"error": ...}` 行模拟一次推理失败。

use std::io::BufRead;

use image::RgbImage;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  detector::{Detection, Detector},
  query_flag,
};

#[derive(Error, Debug)]
pub enum ReplayDetectorError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("脚本第 {line} 行解析失败: {source}")]
  ParseError {
    line: usize,
    source: serde_json::Error,
  },
  #[error("脚本模拟的推理失败: {0}")]
  Scripted(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ScriptLine {
  Detections(Vec<Detection>),
  Failure { error: String },
}

pub struct ReplayDetector {
  script: Vec<ScriptLine>,
  cursor: usize,
  looping: bool,
}

impl FromUrlWithScheme for ReplayDetector {
  const SCHEME: &'static str = "replay";
}

impl FromUrl for ReplayDetector {
  type Error = ReplayDetectorError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ReplayDetectorError::SchemeMismatch);
    }

    info!("加载回放脚本: {}", url.path());
    let file = std::fs::File::open(url.path())?;
    let detector = Self::from_reader(std::io::BufReader::new(file))?;
    Ok(detector.with_looping(query_flag(url, "loop")))
  }
}

impl ReplayDetector {
  pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, ReplayDetectorError> {
    let mut script = Vec::new();
    for (index, line) in reader.lines().enumerate() {
      let line = line?;
      let line = line.trim();
      if line.is_empty() {
        script.push(ScriptLine::Detections(Vec::new()));
        continue;
      }
      let parsed = serde_json::from_str(line).map_err(|source| ReplayDetectorError::ParseError {
        line: index + 1,
        source,
      })?;
      script.push(parsed);
    }
    debug!("回放脚本共 {} 帧", script.len());

    Ok(Self {
      script,
      cursor: 0,
      looping: false,
    })
  }

  /// 脚本用尽后从头开始
  pub fn with_looping(mut self, looping: bool) -> Self {
    self.looping = looping;
    self
  }

  pub fn len(&self) -> usize {
    self.script.len()
  }

  pub fn is_empty(&self) -> bool {
    self.script.is_empty()
  }
}

impl Detector for ReplayDetector {
  type Error = ReplayDetectorError;

  fn infer(&mut self, _image: &RgbImage) -> Result<Vec<Detection>, Self::Error> {
    if self.cursor >= self.script.len() {
      if !self.looping || self.script.is_empty() {
        return Ok(Vec::new());
      }
      self.cursor = 0;
    }

    let line = self.script[self.cursor].clone();
    self.cursor += 1;

    match line {
      ScriptLine::Detections(detections) => Ok(detections),
      ScriptLine::Failure { error } => Err(ReplayDetectorError::Scripted(error)),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const SCRIPT: &str = r#"[{"label": "5 pesos", "confidence": 0.95}, {"label": "1 peso", "confidence": 0.99, "bbox": [0.1, 0.1, 0.4, 0.4]}]

{"error": "npu timeout"}
"#;

  fn image() -> RgbImage {
    RgbImage::new(1, 1)
  }

  #[test]
  fn replays_lines_in_order() {
    let mut detector = ReplayDetector::from_reader(SCRIPT.as_bytes()).unwrap();
    assert_eq!(detector.len(), 3);

    let first = detector.infer(&image()).unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first[1].label, "1 peso");
    assert_eq!(first[1].bbox, [0.1, 0.1, 0.4, 0.4]);

    assert!(detector.infer(&image()).unwrap().is_empty());

    match detector.infer(&image()) {
      Err(ReplayDetectorError::Scripted(msg)) => assert_eq!(msg, "npu timeout"),
      other => panic!("unexpected result: {:?}", other),
    }

    // 用尽后不再产出
    assert!(detector.infer(&image()).unwrap().is_empty());
  }

  #[test]
  fn looping_restarts_script() {
    let mut detector = ReplayDetector::from_reader(SCRIPT.as_bytes())
      .unwrap()
      .with_looping(true);
    for _ in 0..3 {
      let _ = detector.infer(&image());
    }
    assert_eq!(detector.infer(&image()).unwrap().len(), 2);
  }

  #[test]
  fn reports_broken_line_number() {
    let script = "[]\n[{\"label\": 1}]\n";
    match ReplayDetector::from_reader(script.as_bytes()) {
      Err(ReplayDetectorError::ParseError { line, .. }) => assert_eq!(line, 2),
      Err(e) => panic!("unexpected error: {}", e),
      Ok(_) => panic!("script should not parse"),
    }
  }

  #[test]
  fn rejects_foreign_scheme() {
    let url = Url::parse("file:///tmp/script.jsonl").unwrap();
    assert!(matches!(
      ReplayDetector::from_url(&url),
      Err(ReplayDetectorError::SchemeMismatch)
    ));
  }
}
