//! Domain error taxonomy.
//!
//! Every variant here is recoverable: handlers turn them into a single
//! transcript line and the session carries on.

use thiserror::Error;

/// Base64 / UTF-8 decoding failure from `db64`.
#[derive(Debug, Error)]
pub enum DecodeError {
  #[error("invalid base64: {0}")]
  Base64(#[from] base64::DecodeError),

  #[error("decoded bytes are not valid UTF-8")]
  Utf8(#[from] std::string::FromUtf8Error),
}

/// Remote profile / IP lookup failure. Never cached.
#[derive(Debug, Error)]
pub enum RemoteError {
  #[error("network error: {0}")]
  Network(String),

  #[error("{url} returned HTTP {status}")]
  Status { url: String, status: u16 },

  #[error("unexpected response shape from {url}: {reason}")]
  Schema { url: String, reason: String },
}

/// Audio resource failed to load or play.
#[derive(Debug, Error)]
pub enum AudioError {
  #[error("mpv not found. Install it with: brew install mpv (macOS) or apt install mpv (Linux)")]
  PlayerMissing,

  #[error("failed to start audio: {0}")]
  Spawn(String),

  #[error("audio control failed: {0}")]
  Control(String),

  #[error("audio file not found: {0}")]
  SourceMissing(String),
}

/// Lyric data that is not an array of `{ text, startTime, endTime }`.
#[derive(Debug, Error)]
pub enum LyricsFormatError {
  #[error("invalid JSON: {0}")]
  Json(#[from] serde_json::Error),

  #[error("line {index}: startTime {start} must be before endTime {end}")]
  Window { index: usize, start: f64, end: f64 },

  #[error("no timed lines found")]
  Empty,

  #[error("failed to read lyrics: {0}")]
  Io(#[from] std::io::Error),
}

/// Errors raised at the dispatch boundary.
#[derive(Debug, Error)]
pub enum CommandError {
  #[error("Command not found: {0}. Type \"help\" for available commands.")]
  NotFound(String),

  #[error("{command}: {message}")]
  Handler { command: &'static str, message: String },
}
