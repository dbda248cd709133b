use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::audio::{AudioBackend, AudioEvent};
use crate::events::{EventBus, Subscription, SubscriptionId};

/// Snapshot of the playback lifecycle. `Copy`, so callers can never mutate
/// the controller through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackState {
  pub is_playing: bool,
  pub has_started: bool,
  /// Set once by the natural end of the track; cleared only by `reset`.
  pub has_completed_initial_play: bool,
  pub is_waiting_for_restart: bool,
  pub autoplay_enabled: bool,
}

impl Default for PlaybackState {
  fn default() -> Self {
    Self {
      is_playing: false,
      has_started: false,
      has_completed_initial_play: false,
      is_waiting_for_restart: false,
      autoplay_enabled: true,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
  Idle,
  Playing,
  /// Finished naturally; waiting for `start`.
  Ended,
  /// Started earlier, currently stopped by the user.
  Stopped,
}

impl PlaybackState {
  pub fn phase(&self) -> PlaybackPhase {
    if self.is_playing {
      PlaybackPhase::Playing
    } else if self.is_waiting_for_restart || self.has_completed_initial_play {
      PlaybackPhase::Ended
    } else if self.has_started {
      PlaybackPhase::Stopped
    } else {
      PlaybackPhase::Idle
    }
  }
}

/// Published to subscribers of [`PlaybackController::subscribe`].
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
  /// Playback actually began (used to kick off lyrics sync).
  Started,
  /// The track reached its end.
  Ended,
  /// The resource failed to load or play. Carries a user-facing message.
  Failed(String),
}

/// Result of the `start` command's restart state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
  Started,
  Restarted,
  AlreadyRunning,
}

/// Owns the single soundtrack resource and its lifecycle flags.
pub struct PlaybackController<A: AudioBackend> {
  backend: A,
  source: PathBuf,
  volume: u8,
  loaded: bool,
  state: PlaybackState,
  events: EventBus<PlaybackEvent>,
}

impl<A: AudioBackend> PlaybackController<A> {
  pub fn new(backend: A, source: PathBuf, volume: u8) -> Self {
    Self { backend, source, volume, loaded: false, state: PlaybackState::default(), events: EventBus::default() }
  }

  pub fn subscribe(&mut self) -> Subscription<PlaybackEvent> {
    self.events.subscribe()
  }

  pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
    self.events.unsubscribe(id)
  }

  pub fn state(&self) -> PlaybackState {
    self.state
  }

  pub fn is_playing(&self) -> bool {
    self.state.is_playing
  }

  pub fn position(&self) -> f64 {
    if self.loaded { self.backend.position() } else { 0.0 }
  }

  pub fn set_autoplay(&mut self, enabled: bool) {
    self.state.autoplay_enabled = enabled;
  }

  #[cfg(test)]
  pub fn backend(&self) -> &A {
    &self.backend
  }

  #[cfg(test)]
  pub fn backend_mut(&mut self) -> &mut A {
    &mut self.backend
  }

  /// Load the resource on first use, then play. A rejected play reverts
  /// `is_playing` and is reported to subscribers as `Failed`.
  pub async fn start(&mut self) {
    if !self.loaded {
      if let Err(e) = self.backend.load(&self.source, self.volume) {
        warn!(err = %e, "playback: failed to load audio resource");
        self.events.publish(PlaybackEvent::Failed(format!("Audio failed to load: {}", e)));
        return;
      }
      self.loaded = true;
      debug!(source = %self.source.display(), volume = self.volume, "playback: resource loaded");
    }

    let was_started = self.state.has_started;
    self.state.is_playing = true;
    self.state.has_started = true;
    match self.backend.play().await {
      Ok(()) => {
        info!("playback: started");
        self.events.publish(PlaybackEvent::Started);
      }
      Err(e) => {
        warn!(err = %e, "playback: play rejected");
        self.state.is_playing = false;
        self.state.has_started = was_started;
        self.events.publish(PlaybackEvent::Failed(format!("Audio error: {}", e)));
      }
    }
  }

  /// Pause and rewind. Backend failures are logged and swallowed.
  pub async fn stop(&mut self) {
    if !self.loaded {
      return;
    }
    self.state.is_playing = false;
    if let Err(e) = self.backend.pause().await {
      debug!(err = %e, "playback: pause failed during stop");
    }
    if let Err(e) = self.backend.seek(0.0).await {
      debug!(err = %e, "playback: rewind failed during stop");
    }
  }

  /// Clear every lifecycle flag, rewind and pause. Used before a restart.
  pub async fn reset(&mut self) {
    self.state.has_started = false;
    self.state.has_completed_initial_play = false;
    self.state.is_waiting_for_restart = false;
    self.state.is_playing = false;
    if self.loaded {
      if let Err(e) = self.backend.seek(0.0).await {
        debug!(err = %e, "playback: rewind failed during reset");
      }
      if let Err(e) = self.backend.pause().await {
        debug!(err = %e, "playback: pause failed during reset");
      }
    }
  }

  /// The `start` command: restart after completion, first start, or refuse.
  pub async fn execute_start(&mut self) -> StartOutcome {
    if self.state.has_completed_initial_play || self.state.is_waiting_for_restart {
      self.reset().await;
      self.start().await;
      StartOutcome::Restarted
    } else if !self.state.has_started {
      self.start().await;
      StartOutcome::Started
    } else {
      StartOutcome::AlreadyRunning
    }
  }

  /// First-interaction autoplay: starts once if enabled and nothing has
  /// played yet. Returns whether it started.
  pub async fn autostart(&mut self) -> bool {
    let s = self.state;
    if s.autoplay_enabled && !s.has_started && !s.has_completed_initial_play {
      self.start().await;
      return true;
    }
    false
  }

  /// Pause without touching lifecycle flags (terminal lost focus).
  pub async fn suspend(&mut self) {
    if self.loaded
      && !self.backend.is_paused()
      && let Err(e) = self.backend.pause().await
    {
      debug!(err = %e, "playback: suspend failed");
    }
  }

  /// Resume after `suspend` if playback is logically running.
  pub async fn resume(&mut self) {
    if self.state.is_playing
      && self.backend.is_paused()
      && let Err(e) = self.backend.play().await
    {
      debug!(err = %e, "playback: resume failed");
    }
  }

  /// Drain backend events, update the lifecycle and republish.
  pub fn poll(&mut self) {
    for event in self.backend.poll_events() {
      match event {
        AudioEvent::Ended => {
          info!("playback: ended, waiting for restart");
          self.state.is_playing = false;
          self.state.has_completed_initial_play = true;
          self.state.is_waiting_for_restart = true;
          self.events.publish(PlaybackEvent::Ended);
        }
        AudioEvent::Failed(msg) => {
          warn!(err = %msg, "playback: resource failed");
          self.state.is_playing = false;
          self.events.publish(PlaybackEvent::Failed(format!("Audio failed to load: {}", msg)));
        }
      }
    }
  }

  pub async fn shutdown(&mut self) {
    self.state.is_playing = false;
    self.backend.shutdown().await;
  }
}
