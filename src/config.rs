use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::warn;

const APP_NAME: &str = "webbash";
const PREFS_FILE: &str = "prefs.toml";

/// User preferences persisted between runs. Every field is optional so an
/// older or hand-edited file still loads.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
pub struct Config {
  pub theme_name: Option<String>,
  /// Name shown in the prompt echo.
  pub username: Option<String>,
  /// Start the soundtrack on the first key press.
  pub autoplay: Option<bool>,
}

pub fn project_dirs() -> Option<ProjectDirs> {
  ProjectDirs::from("", "", APP_NAME)
}

fn prefs_path() -> Option<PathBuf> {
  project_dirs().map(|dirs| dirs.config_dir().join(PREFS_FILE))
}

impl Config {
  pub fn load() -> Self {
    if let Some(config_file) = prefs_path()
      && let Ok(content) = std::fs::read_to_string(&config_file)
    {
      match toml::from_str(&content) {
        Ok(config) => return config,
        Err(e) => warn!(path = %config_file.display(), err = %e, "config: ignoring malformed prefs"),
      }
    }
    Self::default()
  }

  pub fn save(&self) {
    if let Some(proj_dirs) = project_dirs() {
      let config_dir = proj_dirs.config_dir();
      if std::fs::create_dir_all(config_dir).is_ok() {
        let config_file = config_dir.join(PREFS_FILE);
        match toml::to_string(self) {
          Ok(content) => {
            if let Err(e) = std::fs::write(&config_file, content) {
              warn!(path = %config_file.display(), err = %e, "config: failed to write prefs");
            }
          }
          Err(e) => warn!(err = %e, "config: failed to serialize prefs"),
        }
      }
    }
  }
}
