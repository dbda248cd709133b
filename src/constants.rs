//! Application constants loaded from `constants.ron` at compile time.
//!
//! The RON file is embedded via `include_str!`, so there is no runtime file
//! I/O. Parsed once on first access via `LazyLock`.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// All tuneable application constants.
#[derive(Debug, Deserialize)]
pub struct Constants {
  // Identity shown by info/whoami/repo/social/email
  pub github_api_user: String,
  pub github_html_user: String,
  pub email: String,
  pub default_username: String,
  pub banner: String,
  pub help_version: String,

  // Remote endpoints
  pub github_api_base: String,
  pub ip_lookup_url: String,
  pub user_agent: String,
  pub projects_limit: usize,

  // Audio
  pub audio_path: String,
  pub audio_volume: u8,

  // Lyrics
  pub lyrics_path: String,
  pub lyrics_poll_ms: u64,
  pub lyrics_preroll_secs: f64,
  pub lyrics_mount_delay_ms: u64,
  pub entrance_base_secs: f64,
  pub entrance_stagger_secs: f64,
  pub exit_secs: f64,

  // Effects
  pub fun_duration_ms: u64,
  pub myip_frame_ms: u64,

  /// Command name → help icon.
  pub icons: BTreeMap<String, String>,
}

static CONSTANTS: LazyLock<Constants> = LazyLock::new(|| {
  // Safety: the RON file is embedded at compile time; if it's malformed this is a build-time error.
  ron::from_str(include_str!("../constants.ron")).expect("constants.ron must be valid RON (embedded at compile time)")
});

/// Returns a reference to the parsed application constants.
pub fn constants() -> &'static Constants {
  &CONSTANTS
}
