// 该文件是 PesoBuddy （比索伙伴） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use std::{
  io::BufRead,
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
  thread,
  time::Duration,
};

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};

use pesobuddy::{
  FromUrl,
  announcer::{Announcer, AnnouncerCore, AnnouncerHandle},
  detector::ReplayDetector,
  illumination::illumination_from_url,
  input::{InputWrapper, LatestFrames},
  speech::{JournalSpeaker, Speaker, SpeakerWrapper},
  task::{ContinuousTask, Task},
};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("输入来源: {}", args.input);
  info!("检测器: {}", args.detector);
  info!("语音输出: {}", args.speech);
  info!("置信度阈值: {}", args.threshold);
  info!("冷却时间: {} ms", args.cooldown_ms);

  let speaker = SpeakerWrapper::from_url(&args.speech)?;
  let speaker: Box<dyn Speaker> = match &args.journal {
    Some(path) => Box::new(JournalSpeaker::create(path, speaker)?),
    None => Box::new(speaker),
  };

  let illumination = args
    .illumination
    .as_ref()
    .map(illumination_from_url)
    .transpose()?;
  if illumination.is_none() {
    warn!("未配置补光灯，补光开关不可用");
  }

  let detector = ReplayDetector::from_url(&args.detector)?;

  let core = AnnouncerCore::new(&args.announce_config(), speaker, illumination);
  let announcer = Announcer::spawn(core);

  let task = ContinuousTask::default().with_frame_number(args.frame_number);
  let stop = task.stop_flag();

  let ctrlc_stop = Arc::clone(&stop);
  ctrlc::set_handler(move || {
    info!("收到中断信号，准备退出...");
    ctrlc_stop.store(true, Ordering::SeqCst);
    thread::spawn(|| {
      thread::sleep(Duration::from_secs(30));
      warn!("强制退出程序");
      std::process::exit(1);
    });
  })?;

  if !args.no_console {
    spawn_console(announcer.handle(), Arc::clone(&stop));
  }

  let input = InputWrapper::from_url(&args.input)?;
  let frames = LatestFrames::spawn(input);

  let stats = task.run_task(frames, detector, announcer.handle())?;

  let core = announcer.join()?;
  let state = core.toggle_state();
  info!(
    "处理完成: 分析 {} 帧, 播报 {} 次, 补光 {}, 累计 {} ({} pesos)",
    stats.analyzed,
    core.stats().announced,
    if state.flash_on { "开" } else { "关" },
    if state.counter_on { "开" } else { "关" },
    core.accumulator().total()
  );

  Ok(())
}

/// 从标准输入读取控制命令：`f`/`flash` 切换补光，`c`/`counter` 切换累计，`q`/`quit` 退出
fn spawn_console(handle: AnnouncerHandle, stop: Arc<AtomicBool>) {
  thread::spawn(move || {
    info!("控制台命令: f(flash) 切换补光, c(counter) 切换累计, q(quit) 退出");
    for line in std::io::stdin().lock().lines() {
      let line = match line {
        Ok(line) => line,
        Err(e) => {
          error!("读取标准输入失败: {}", e);
          break;
        }
      };

      let sent = match line.trim() {
        "" => continue,
        "f" | "flash" => handle.toggle_illumination(),
        "c" | "counter" => handle.toggle_accumulation(),
        "q" | "quit" => {
          info!("收到退出命令");
          stop.store(true, Ordering::SeqCst);
          break;
        }
        other => {
          warn!("未知命令: {}", other);
          continue;
        }
      };

      if sent.is_err() {
        warn!("播报器已退出，控制台停止");
        break;
      }
    }
  });
}
