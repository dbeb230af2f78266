// 该文件是 PesoBuddy （比索伙伴） 项目的一部分。
// src/args.rs - 项目参数配置
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

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use url::Url;

use pesobuddy::config::{AnnounceConfig, DEFAULT_GREETING};

/// PesoBuddy 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入来源
  /// - 图片: image:///path/to/coin.jpg?rotate=90&front=true&repeat=30&fps=15
  /// - 相机: gst://camera/dev/video0?width=640&height=480&fps=15&rotate=90
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 检测器，例如 replay:///path/to/script.jsonl?loop=true
  #[arg(long, value_name = "DETECTOR")]
  pub detector: Url,

  /// 语音输出：log: 或 cmd:///usr/bin/espeak-ng?arg=-m
  #[arg(long, value_name = "SPEECH", default_value = "log:")]
  pub speech: Url,

  /// 补光灯，例如 v4l2:///dev/video0；不指定时补光不可用
  #[arg(long, value_name = "LIGHT")]
  pub illumination: Option<Url>,

  /// 播报置信度阈值 (0.0 - 1.0)
  #[arg(long, value_name = "THRESHOLD", default_value_t = 0.90)]
  pub threshold: f32,

  /// 播报后的冷却时间（毫秒）
  #[arg(long, value_name = "MILLIS", default_value_t = 2000)]
  pub cooldown_ms: u64,

  #[arg(long, value_name = "FRAME_NUMBER")]
  pub frame_number: Option<u64>,

  /// 把每条播报记录到 JSON Lines 文件
  #[arg(long, value_name = "FILE")]
  pub journal: Option<PathBuf>,

  /// 不播放启动提示
  #[arg(long)]
  pub no_greeting: bool,

  /// 不从标准输入读取控制命令
  #[arg(long)]
  pub no_console: bool,
}

impl Args {
  pub fn announce_config(&self) -> AnnounceConfig {
    let greeting = (!self.no_greeting).then(|| DEFAULT_GREETING.to_string());
    AnnounceConfig::default()
      .with_threshold(self.threshold)
      .with_cooldown(Duration::from_millis(self.cooldown_ms))
      .with_greeting(greeting)
  }
}
