//! Terminal rendition of the lyrics region.
//!
//! Keeps the one line on screen and the animation it is in, so the UI can
//! ask how much of it to reveal at any instant.

use std::time::{Duration, Instant};

use crate::lyrics::{LineId, LyricsMutation, LyricsSurface, LyricsTiming};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Anim {
  /// Mounted, entrance not yet started.
  Hidden,
  Entering { start: Instant, duration: Duration },
  Shown,
  Exiting { start: Instant, duration: Duration, dismiss: bool },
}

#[derive(Debug, Clone)]
struct PanelLine {
  id: LineId,
  text: String,
  anim: Anim,
}

/// What the UI should draw right now.
#[derive(Debug, Clone, PartialEq)]
pub struct LineView {
  pub text: String,
  /// Characters revealed so far (staggered entrance).
  pub revealed: usize,
  /// 1.0 fully visible, 0.0 gone.
  pub opacity: f64,
}

pub struct LyricsPanel {
  timing: LyricsTiming,
  active: bool,
  line: Option<PanelLine>,
}

impl LyricsPanel {
  pub fn new(timing: LyricsTiming) -> Self {
    Self { timing, active: false, line: None }
  }

  /// Whether the region takes up screen space.
  pub fn is_visible(&self) -> bool {
    self.active || self.line.is_some()
  }

  /// Drop a dismissed line once its exit has played.
  pub fn prune(&mut self, now: Instant) {
    if let Some(PanelLine { anim: Anim::Exiting { start, duration, dismiss: true }, .. }) = self.line
      && now.saturating_duration_since(start) >= duration
    {
      self.line = None;
    }
  }

  pub fn view(&self, now: Instant) -> Option<LineView> {
    let line = self.line.as_ref()?;
    let chars = line.text.chars().count();
    let (revealed, opacity) = match line.anim {
      Anim::Hidden => (0, 0.0),
      Anim::Entering { start, .. } => {
        let elapsed = now.saturating_duration_since(start);
        // Character i starts after `stagger * i`.
        let stagger = self.timing.entrance_stagger.as_secs_f64();
        let revealed = if stagger > 0.0 {
          ((elapsed.as_secs_f64() / stagger).floor() as usize + 1).min(chars)
        } else {
          chars
        };
        let ramp = (elapsed.as_secs_f64() / self.timing.entrance_base.as_secs_f64().max(f64::EPSILON)).min(1.0);
        (revealed, ramp)
      }
      Anim::Shown => (chars, 1.0),
      Anim::Exiting { start, duration, .. } => {
        let elapsed = now.saturating_duration_since(start).as_secs_f64();
        (chars, (1.0 - elapsed / duration.as_secs_f64().max(f64::EPSILON)).max(0.0))
      }
    };
    Some(LineView { text: line.text.clone(), revealed, opacity })
  }

  fn with_line(&mut self, id: LineId, f: impl FnOnce(&mut PanelLine)) {
    if let Some(line) = self.line.as_mut().filter(|l| l.id == id) {
      f(line);
    }
  }
}

impl LyricsSurface for LyricsPanel {
  fn apply(&mut self, mutation: LyricsMutation, now: Instant) {
    match mutation {
      LyricsMutation::ZoneActive(active) => self.active = active,
      LyricsMutation::Mount { id, text } => self.line = Some(PanelLine { id, text, anim: Anim::Hidden }),
      LyricsMutation::Entrance { id, duration } => {
        self.with_line(id, |l| l.anim = Anim::Entering { start: now, duration });
      }
      LyricsMutation::Exit { id, duration } => {
        self.with_line(id, |l| l.anim = Anim::Exiting { start: now, duration, dismiss: false });
      }
      LyricsMutation::Dismiss { id, duration } => {
        self.with_line(id, |l| l.anim = Anim::Exiting { start: now, duration, dismiss: true });
      }
      LyricsMutation::Remove { id } => {
        if self.line.as_ref().is_some_and(|l| l.id == id) {
          self.line = None;
        }
      }
      LyricsMutation::Clear => self.line = None,
    }
    // Entrance finishes on its own; settle it so later views are cheap.
    if let Some(PanelLine { anim: Anim::Entering { start, duration }, .. }) = self.line
      && now.saturating_duration_since(start) >= duration
      && let Some(line) = self.line.as_mut()
    {
      line.anim = Anim::Shown;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn timing() -> LyricsTiming {
    LyricsTiming {
      poll: Duration::from_millis(100),
      preroll_secs: 1.15,
      mount_delay: Duration::from_millis(50),
      entrance_base: Duration::from_millis(600),
      entrance_stagger: Duration::from_millis(30),
      exit: Duration::from_millis(400),
    }
  }

  #[test]
  fn entrance_reveals_progressively() {
    let mut p = LyricsPanel::new(timing());
    let t0 = Instant::now();
    p.apply(LyricsMutation::ZoneActive(true), t0);
    p.apply(LyricsMutation::Mount { id: 1, text: "hello".into() }, t0);
    assert_eq!(p.view(t0).map(|v| v.revealed), Some(0));

    p.apply(LyricsMutation::Entrance { id: 1, duration: Duration::from_millis(720) }, t0);
    assert_eq!(p.view(t0).map(|v| v.revealed), Some(1));
    assert_eq!(p.view(t0 + Duration::from_millis(65)).map(|v| v.revealed), Some(3));
    let done = p.view(t0 + Duration::from_millis(720)).unwrap();
    assert_eq!(done.revealed, 5);
    assert_eq!(done.opacity, 1.0);
  }

  #[test]
  fn mutations_for_other_ids_are_ignored() {
    let mut p = LyricsPanel::new(timing());
    let t0 = Instant::now();
    p.apply(LyricsMutation::Mount { id: 2, text: "x".into() }, t0);
    p.apply(LyricsMutation::Remove { id: 1 }, t0);
    assert!(p.view(t0).is_some());
    p.apply(LyricsMutation::Remove { id: 2 }, t0);
    assert!(p.view(t0).is_none());
  }

  #[test]
  fn dismiss_plays_exit_then_clears_itself() {
    let mut p = LyricsPanel::new(timing());
    let t0 = Instant::now();
    p.apply(LyricsMutation::ZoneActive(true), t0);
    p.apply(LyricsMutation::Mount { id: 0, text: "bye".into() }, t0);
    p.apply(LyricsMutation::Dismiss { id: 0, duration: Duration::from_millis(400) }, t0);
    p.apply(LyricsMutation::ZoneActive(false), t0);
    assert!(p.is_visible(), "still animating out");

    let half = p.view(t0 + Duration::from_millis(200)).unwrap();
    assert!((half.opacity - 0.5).abs() < 1e-9);

    p.prune(t0 + Duration::from_millis(399));
    assert!(p.is_visible());
    p.prune(t0 + Duration::from_millis(400));
    assert!(!p.is_visible());
  }

  #[test]
  fn plain_exit_waits_for_remove() {
    let mut p = LyricsPanel::new(timing());
    let t0 = Instant::now();
    p.apply(LyricsMutation::Mount { id: 0, text: "a".into() }, t0);
    p.apply(LyricsMutation::Exit { id: 0, duration: Duration::from_millis(400) }, t0);
    p.prune(t0 + Duration::from_secs(5));
    assert!(p.view(t0 + Duration::from_secs(5)).is_some_and(|v| v.opacity == 0.0));
  }
}
