// 该文件是 PesoBuddy （比索伙伴） 项目的一部分。
// src/speech/command.rs - 外部语音合成程序
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

//! # 外部语音合成
//!
//! 每条语音启动一次外部 TTS 程序（例如 `espeak-ng -m`，`-m` 让它解析
//! `<break>` 之类的 SSML 标记），文本作为最后一个参数传入。
//!
//! 队列由独立的工作线程持有，`speak` 只是向线程发送请求：
//! - `Interrupt`：结束正在播放的进程，清空队列，再播放新文本；
//! - `Append`：追加到队尾。
//!
//! URL 形式：`cmd:///usr/bin/espeak-ng?arg=-m&arg=-s&arg=150`

use std::{
  collections::VecDeque,
  process::{Child, Command, Stdio},
  sync::mpsc::{self, Receiver, RecvTimeoutError, Sender},
  thread::{self, JoinHandle},
  time::Duration,
};

use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  speech::{SpeechError, SpeechPolicy, Speaker},
};

const CHILD_POLL_INTERVAL: Duration = Duration::from_millis(20);

enum Request {
  Say(String, SpeechPolicy),
  Stop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpeakerBuilder {
  program: String,
  args: Vec<String>,
}

impl FromUrlWithScheme for CommandSpeakerBuilder {
  const SCHEME: &'static str = "cmd";
}

impl FromUrl for CommandSpeakerBuilder {
  type Error = SpeechError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(SpeechError::SchemeMismatch);
    }

    let args = url
      .query_pairs()
      .filter(|(k, _)| k == "arg")
      .map(|(_, v)| v.into_owned())
      .collect();

    Ok(CommandSpeakerBuilder {
      program: url.path().to_string(),
      args,
    })
  }
}

impl CommandSpeakerBuilder {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn program(&self) -> &str {
    &self.program
  }

  pub fn args(&self) -> &[String] {
    &self.args
  }

  pub fn build(self) -> CommandSpeaker {
    info!("语音合成程序: {} {:?}", self.program, self.args);
    let (tx, rx) = mpsc::channel();
    let worker = thread::spawn(move || run_worker(self, rx));
    CommandSpeaker {
      tx,
      worker: Some(worker),
    }
  }
}

pub struct CommandSpeaker {
  tx: Sender<Request>,
  worker: Option<JoinHandle<()>>,
}

impl Speaker for CommandSpeaker {
  fn speak(&self, text: &str, policy: SpeechPolicy) -> Result<(), SpeechError> {
    self
      .tx
      .send(Request::Say(text.to_string(), policy))
      .map_err(|_| SpeechError::WorkerGone)
  }
}

impl Drop for CommandSpeaker {
  fn drop(&mut self) {
    let _ = self.tx.send(Request::Stop);
    if let Some(worker) = self.worker.take()
      && worker.join().is_err()
    {
      warn!("语音工作线程异常退出");
    }
  }
}

fn run_worker(builder: CommandSpeakerBuilder, rx: Receiver<Request>) {
  let mut queue: VecDeque<String> = VecDeque::new();
  let mut current: Option<Child> = None;

  loop {
    if let Some(child) = current.as_mut() {
      match child.try_wait() {
        Ok(Some(status)) => {
          debug!("语音播放结束: {}", status);
          current = None;
        }
        Ok(None) => {}
        Err(e) => {
          warn!("查询语音进程状态失败: {}", e);
          current = None;
        }
      }
    }

    if current.is_none()
      && let Some(text) = queue.pop_front()
    {
      match spawn(&builder, &text) {
        Ok(child) => current = Some(child),
        Err(e) => error!("启动语音合成程序失败: {}", e),
      }
    }

    // 空闲时阻塞等待，否则定期轮询子进程
    let request = if current.is_none() && queue.is_empty() {
      rx.recv().map_err(|_| RecvTimeoutError::Disconnected)
    } else {
      rx.recv_timeout(CHILD_POLL_INTERVAL)
    };

    match request {
      Ok(Request::Say(text, SpeechPolicy::Interrupt)) => {
        if !queue.is_empty() {
          debug!("打断播报，丢弃 {} 条排队语音", queue.len());
        }
        queue.clear();
        stop(&mut current);
        queue.push_back(text);
      }
      Ok(Request::Say(text, SpeechPolicy::Append)) => queue.push_back(text),
      Ok(Request::Stop) | Err(RecvTimeoutError::Disconnected) => {
        stop(&mut current);
        break;
      }
      Err(RecvTimeoutError::Timeout) => {}
    }
  }

  debug!("语音工作线程退出");
}

fn spawn(builder: &CommandSpeakerBuilder, text: &str) -> std::io::Result<Child> {
  Command::new(&builder.program)
    .args(&builder.args)
    .arg(text)
    .stdin(Stdio::null())
    .stdout(Stdio::null())
    .spawn()
}

fn stop(current: &mut Option<Child>) {
  if let Some(mut child) = current.take() {
    if let Err(e) = child.kill() {
      debug!("结束语音进程失败: {}", e);
    }
    let _ = child.wait();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_program_and_args_from_url() {
    let url = Url::parse("cmd:///usr/bin/espeak-ng?arg=-m&arg=-s&arg=150&voice=en").unwrap();
    let builder = CommandSpeakerBuilder::from_url(&url).unwrap();
    assert_eq!(builder.program(), "/usr/bin/espeak-ng");
    assert_eq!(builder.args(), ["-m", "-s", "150"]);
  }

  #[test]
  fn builder_matches_url_form() {
    let url = Url::parse("cmd:///usr/bin/espeak-ng?arg=-m").unwrap();
    assert_eq!(
      CommandSpeakerBuilder::from_url(&url).unwrap(),
      CommandSpeakerBuilder::new("/usr/bin/espeak-ng").arg("-m")
    );
  }

  #[test]
  fn rejects_foreign_scheme() {
    let url = Url::parse("log:").unwrap();
    assert!(matches!(
      CommandSpeakerBuilder::from_url(&url),
      Err(SpeechError::SchemeMismatch)
    ));
  }

  #[test]
  fn missing_program_is_not_fatal() {
    let speaker = CommandSpeakerBuilder::new("/nonexistent/pesobuddy-tts").build();
    assert!(speaker.speak("Flash is On", SpeechPolicy::Interrupt).is_ok());
    assert!(speaker.speak("Detected 5 pesos pesos", SpeechPolicy::Append).is_ok());
    drop(speaker);
  }

  fn read_lines(path: &std::path::Path) -> Vec<String> {
    std::fs::read_to_string(path)
      .unwrap_or_default()
      .lines()
      .map(str::to_string)
      .collect()
  }

  #[test]
  fn interrupt_flushes_queue_and_append_waits() {
    let log = std::env::temp_dir().join(format!("pesobuddy-tts-{}.log", std::process::id()));
    let _ = std::fs::remove_file(&log);

    // 每条语音先写入文本再“播放” 300ms，文本由 sh 作为 $0 收到
    let script = format!("echo \"$0\" >> '{}'; sleep 0.3", log.display());
    let speaker = CommandSpeakerBuilder::new("sh").arg("-c").arg(script).build();

    for text in ["a", "b", "c"] {
      speaker.speak(text, SpeechPolicy::Append).unwrap();
    }
    thread::sleep(Duration::from_millis(100));
    speaker.speak("x", SpeechPolicy::Interrupt).unwrap();
    speaker.speak("y", SpeechPolicy::Append).unwrap();

    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while read_lines(&log).len() < 3 && std::time::Instant::now() < deadline {
      thread::sleep(Duration::from_millis(20));
    }
    // 等待 y 播放结束，确认没有被清掉的语音再出现
    thread::sleep(Duration::from_millis(400));
    drop(speaker);

    let spoken = read_lines(&log);
    let _ = std::fs::remove_file(&log);
    assert_eq!(spoken, ["a", "x", "y"]);
  }
}
