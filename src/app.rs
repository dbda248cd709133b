use std::time::Instant;

use tracing::{debug, info};

use crate::audio::{AudioBackend, MpvAudio};
use crate::config::Config;
use crate::interpreter::Interpreter;
use crate::panel::LyricsPanel;
use crate::remote::{HttpTransport, Transport};
use crate::theme::{THEMES, Theme, theme_index};

pub struct App<T: Transport + 'static = HttpTransport, A: AudioBackend = MpvAudio> {
  pub interpreter: Interpreter<T, A, LyricsPanel>,
  pub theme_index: usize,
  pub should_quit: bool,
  /// Rows scrolled up from the bottom of the transcript.
  pub scroll_back: usize,
  /// Horizontal scroll of the input line, in display columns.
  pub input_scroll: usize,
  config: Config,
  /// Whether any key has been pressed yet (gates autoplay).
  interacted: bool,
  /// Save preference changes to disk.
  persist: bool,
}

impl<T: Transport + 'static, A: AudioBackend> App<T, A> {
  pub fn new(interpreter: Interpreter<T, A, LyricsPanel>, config: Config) -> Self {
    let theme_index = theme_index(config.theme_name.as_deref());
    Self {
      interpreter,
      theme_index,
      should_quit: false,
      scroll_back: 0,
      input_scroll: 0,
      config,
      interacted: false,
      persist: true,
    }
  }

  /// Keep preference changes in memory only.
  #[cfg(test)]
  pub fn without_persistence(mut self) -> Self {
    self.persist = false;
    self
  }

  pub fn theme(&self) -> &'static Theme {
    &THEMES[self.theme_index % THEMES.len()]
  }

  pub fn next_theme(&mut self) {
    self.theme_index = (self.theme_index + 1) % THEMES.len();
    self.config.theme_name = Some(self.theme().name.to_string());
    debug!(theme = self.theme().name, "app: theme changed");
    if self.persist {
      self.config.save();
    }
  }

  /// Runs once, on the first key press of the session.
  pub async fn note_interaction(&mut self) {
    if self.interacted {
      return;
    }
    self.interacted = true;
    self.interpreter.first_interaction().await;
  }

  pub fn tick(&mut self, now: Instant) {
    self.interpreter.tick(now);
    self.interpreter.lyrics.surface_mut().prune(now);
  }

  pub fn scroll_up(&mut self, rows: usize) {
    self.scroll_back = self.scroll_back.saturating_add(rows);
  }

  pub fn scroll_down(&mut self, rows: usize) {
    self.scroll_back = self.scroll_back.saturating_sub(rows);
  }

  pub async fn focus_lost(&mut self) {
    self.interpreter.suspend().await;
  }

  pub async fn focus_gained(&mut self) {
    self.interpreter.resume().await;
  }

  pub async fn shutdown(&mut self) {
    info!("app: shutting down");
    self.interpreter.shutdown(Instant::now()).await;
  }
}
