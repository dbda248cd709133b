use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::{
  io::{AsyncBufReadExt, AsyncWriteExt, BufReader as TokioBufReader},
  net::UnixStream,
  process::{Child as TokioChild, Command},
  sync::mpsc,
  task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::error::AudioError;

/// Events the audio resource raises on its own (not in response to a call).
#[derive(Debug, Clone, PartialEq)]
pub enum AudioEvent {
  /// The track played to its natural end.
  Ended,
  /// The resource failed while loading or playing.
  Failed(String),
}

/// The audio element surface the playback controller drives.
pub trait AudioBackend {
  /// Bind the resource to `source`. Called once, lazily, before the first play.
  fn load(&mut self, source: &Path, volume: u8) -> Result<(), AudioError>;

  async fn play(&mut self) -> Result<(), AudioError>;

  async fn pause(&mut self) -> Result<(), AudioError>;

  async fn seek(&mut self, seconds: f64) -> Result<(), AudioError>;

  /// Current playback position in seconds.
  fn position(&self) -> f64;

  fn is_paused(&self) -> bool;

  /// Drain events raised since the last call.
  fn poll_events(&mut self) -> Vec<AudioEvent>;

  /// Release the resource for good (process exit).
  async fn shutdown(&mut self);
}

// --- mpv ---

/// Property updates read from mpv's IPC socket.
#[derive(Debug, Clone, PartialEq)]
enum MpvEvent {
  Position(f64),
  Pause(bool),
}

const OBSERVE_TIME_POS: &str = "{\"command\":[\"observe_property\",1,\"time-pos\"]}\n";
const OBSERVE_PAUSE: &str = "{\"command\":[\"observe_property\",2,\"pause\"]}\n";

/// Parse one line of mpv IPC output into a property update we care about.
fn parse_ipc_event(line: &str) -> Option<MpvEvent> {
  let val = serde_json::from_str::<serde_json::Value>(line).ok()?;
  if val.get("event").and_then(|v| v.as_str()) != Some("property-change") {
    return None;
  }
  match val.get("name").and_then(|v| v.as_str())? {
    "time-pos" => val.get("data").and_then(|v| v.as_f64()).map(MpvEvent::Position),
    "pause" => val.get("data").and_then(|v| v.as_bool()).map(MpvEvent::Pause),
    _ => None,
  }
}

/// Plays the soundtrack through an `mpv` child process.
///
/// The process is spawned on the first `play` and lives until the track ends
/// or `shutdown` is called. Pause and seek go over the JSON IPC socket; a
/// monitor task observes `time-pos` and `pause` so `position()` stays current.
pub struct MpvAudio {
  source: Option<PathBuf>,
  volume: u8,
  current_process: Option<TokioChild>,
  monitor_handle: Option<JoinHandle<()>>,
  status_rx: Option<mpsc::Receiver<MpvEvent>>,
  ipc_socket_path: Option<String>,
  position: f64,
  paused: bool,
  pending: VecDeque<AudioEvent>,
}

impl MpvAudio {
  pub fn new() -> Self {
    Self {
      source: None,
      volume: 0,
      current_process: None,
      monitor_handle: None,
      status_rx: None,
      ipc_socket_path: None,
      position: 0.0,
      paused: true,
      pending: VecDeque::new(),
    }
  }

  async fn spawn(&mut self) -> Result<(), AudioError> {
    let source = self.source.clone().ok_or_else(|| AudioError::SourceMissing("<not loaded>".to_string()))?;
    if !source.exists() {
      return Err(AudioError::SourceMissing(source.display().to_string()));
    }

    let socket_path = std::env::temp_dir().join(format!("webbash-mpv-{}.sock", std::process::id()));
    let socket_path_str =
      socket_path.to_str().ok_or_else(|| AudioError::Spawn("temp dir path is not valid UTF-8".to_string()))?.to_string();
    // Remove stale socket if it exists from a previous crash.
    let _ = std::fs::remove_file(&socket_path);

    let mut cmd = Command::new("mpv");
    cmd.args([
      "--no-video",
      "--no-terminal",
      "--loop-file=no",
      &format!("--volume={}", self.volume),
      &format!("--input-ipc-server={}", socket_path_str),
    ]);
    cmd.arg(&source);
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::null());
    cmd.stderr(Stdio::null());
    cmd.kill_on_drop(true);

    let child = cmd.spawn().map_err(|e| {
      if e.kind() == std::io::ErrorKind::NotFound { AudioError::PlayerMissing } else { AudioError::Spawn(e.to_string()) }
    })?;

    let (tx, rx) = mpsc::channel::<MpvEvent>(32);
    let monitor_path = socket_path_str.clone();
    let monitor_handle = tokio::spawn(async move {
      monitor_ipc(monitor_path, tx).await;
    });

    info!(source = %source.display(), socket = %socket_path_str, "audio: mpv spawned");
    self.current_process = Some(child);
    self.monitor_handle = Some(monitor_handle);
    self.status_rx = Some(rx);
    self.ipc_socket_path = Some(socket_path_str);
    self.position = 0.0;
    self.paused = false;
    Ok(())
  }

  async fn send_command(&self, cmd: serde_json::Value) -> Result<(), AudioError> {
    let Some(ref socket_path) = self.ipc_socket_path else {
      return Ok(());
    };
    let mut stream = UnixStream::connect(socket_path)
      .await
      .map_err(|e| AudioError::Control(format!("failed to connect to mpv IPC socket: {}", e)))?;
    let mut line = cmd.to_string();
    line.push('\n');
    stream.write_all(line.as_bytes()).await.map_err(|e| AudioError::Control(format!("mpv IPC write failed: {}", e)))?;
    Ok(())
  }

  /// Tear down process state after mpv exited or was killed.
  fn clear_process(&mut self) {
    if let Some(handle) = self.monitor_handle.take() {
      handle.abort();
    }
    self.status_rx = None;
    self.current_process = None;
    self.paused = true;
    if let Some(path) = self.ipc_socket_path.take() {
      let _ = std::fs::remove_file(&path);
    }
  }
}

impl Default for MpvAudio {
  fn default() -> Self {
    Self::new()
  }
}

impl AudioBackend for MpvAudio {
  fn load(&mut self, source: &Path, volume: u8) -> Result<(), AudioError> {
    self.source = Some(source.to_path_buf());
    self.volume = volume.min(100);
    Ok(())
  }

  async fn play(&mut self) -> Result<(), AudioError> {
    if self.current_process.is_none() {
      return self.spawn().await;
    }
    self.send_command(serde_json::json!({ "command": ["set_property", "pause", false] })).await?;
    self.paused = false;
    Ok(())
  }

  async fn pause(&mut self) -> Result<(), AudioError> {
    if self.current_process.is_none() {
      self.paused = true;
      return Ok(());
    }
    self.send_command(serde_json::json!({ "command": ["set_property", "pause", true] })).await?;
    self.paused = true;
    Ok(())
  }

  async fn seek(&mut self, seconds: f64) -> Result<(), AudioError> {
    self.position = seconds;
    if self.current_process.is_none() {
      return Ok(());
    }
    self.send_command(serde_json::json!({ "command": ["seek", seconds, "absolute"] })).await
  }

  fn position(&self) -> f64 {
    self.position
  }

  fn is_paused(&self) -> bool {
    self.paused
  }

  fn poll_events(&mut self) -> Vec<AudioEvent> {
    if let Some(rx) = &mut self.status_rx {
      while let Ok(event) = rx.try_recv() {
        match event {
          MpvEvent::Position(pos) => self.position = pos,
          MpvEvent::Pause(paused) => self.paused = paused,
        }
      }
    }

    if let Some(child) = &mut self.current_process {
      match child.try_wait() {
        Ok(Some(status)) if status.success() => {
          info!("audio: track ended");
          self.clear_process();
          self.pending.push_back(AudioEvent::Ended);
        }
        Ok(Some(status)) => {
          warn!(code = ?status.code(), "audio: mpv exited with failure");
          self.clear_process();
          self.pending.push_back(AudioEvent::Failed(format!("mpv exited with {}", status)));
        }
        Ok(None) => {}
        Err(e) => {
          warn!(err = %e, "audio: failed to query mpv status");
        }
      }
    }

    self.pending.drain(..).collect()
  }

  async fn shutdown(&mut self) {
    if let Some(handle) = self.monitor_handle.take() {
      handle.abort();
      let _ = handle.await;
    }
    if let Some(mut child) = self.current_process.take() {
      if let Err(e) = child.kill().await {
        warn!(err = %e, "audio: failed to kill mpv");
      }
      let _ = child.wait().await;
    }
    self.clear_process();
  }
}

/// Connect to mpv's IPC socket (retrying while mpv starts up) and forward
/// property changes until the socket closes.
async fn monitor_ipc(socket_path: String, tx: mpsc::Sender<MpvEvent>) {
  let mut stream = None;
  for attempt in 0..20 {
    match UnixStream::connect(&socket_path).await {
      Ok(s) => {
        stream = Some(s);
        break;
      }
      Err(e) => {
        debug!(attempt, err = %e, "audio: mpv IPC not ready, retrying");
        tokio::time::sleep(Duration::from_millis(100)).await;
      }
    }
  }
  let Some(stream) = stream else {
    warn!("audio: gave up connecting to mpv IPC socket");
    return;
  };

  let (read_half, mut write_half) = stream.into_split();
  for cmd in [OBSERVE_TIME_POS, OBSERVE_PAUSE] {
    if let Err(e) = write_half.write_all(cmd.as_bytes()).await {
      warn!(err = %e, "audio: failed to register mpv observers");
      return;
    }
  }

  let mut lines = TokioBufReader::new(read_half).lines();
  while let Ok(Some(line)) = lines.next_line().await {
    if let Some(event) = parse_ipc_event(&line)
      && tx.send(event).await.is_err()
    {
      break;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_time_pos_change() {
    let line = r#"{"event":"property-change","id":1,"name":"time-pos","data":12.5}"#;
    assert_eq!(parse_ipc_event(line), Some(MpvEvent::Position(12.5)));
  }

  #[test]
  fn parses_pause_change() {
    let line = r#"{"event":"property-change","id":2,"name":"pause","data":true}"#;
    assert_eq!(parse_ipc_event(line), Some(MpvEvent::Pause(true)));
  }

  #[test]
  fn ignores_null_data_and_other_events() {
    assert_eq!(parse_ipc_event(r#"{"event":"property-change","id":1,"name":"time-pos","data":null}"#), None);
    assert_eq!(parse_ipc_event(r#"{"event":"end-file","reason":"eof"}"#), None);
    assert_eq!(parse_ipc_event(r#"{"request_id":0,"error":"success"}"#), None);
    assert_eq!(parse_ipc_event("not json"), None);
  }

  #[tokio::test]
  async fn play_without_source_file_fails() {
    let mut audio = MpvAudio::new();
    audio.load(Path::new("/definitely/not/here.mp3"), 12).unwrap();
    assert!(matches!(audio.play().await, Err(AudioError::SourceMissing(_))));
    assert!(audio.is_paused());
  }

  #[tokio::test]
  async fn seek_without_process_just_moves_position() {
    let mut audio = MpvAudio::new();
    audio.seek(3.0).await.unwrap();
    assert_eq!(audio.position(), 3.0);
    audio.pause().await.unwrap();
    assert!(audio.poll_events().is_empty());
  }
}
