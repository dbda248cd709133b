//! Synchronized lyrics display.
//!
//! The engine polls the playback clock every 100 ms, picks the first timed
//! line that contains the current position and has not been shown this
//! session, and drives its entrance / disappear / exit sequence on the
//! [`LyricsSurface`]. Every pending step (the poll itself, delayed mounts,
//! animation completions, disappear deadlines) is an entry in one
//! [`Timers`] collection, so `stop_sync` cancels all of them at once.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::constants::constants;
use crate::error::LyricsFormatError;
use crate::lrc::parse_lrc;
use crate::schedule::Timers;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricLine {
  pub text: String,
  pub start_time: f64,
  pub end_time: f64,
}

impl LyricLine {
  pub fn contains(&self, t: f64) -> bool {
    self.start_time <= t && t <= self.end_time
  }
}

/// Check windows and return the lines sorted by start time (stable).
pub fn validate(mut lines: Vec<LyricLine>) -> Result<Vec<LyricLine>, LyricsFormatError> {
  for (index, line) in lines.iter().enumerate() {
    let (start, end) = (line.start_time, line.end_time);
    if !start.is_finite() || !end.is_finite() || start >= end {
      return Err(LyricsFormatError::Window { index, start, end });
    }
  }
  lines.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
  Ok(lines)
}

/// Parse a JSON array of `{ text, startTime, endTime }`.
pub fn parse_lyrics(json: &str) -> Result<Vec<LyricLine>, LyricsFormatError> {
  let lines: Vec<LyricLine> = serde_json::from_str(json)?;
  validate(lines)
}

// --- Sources ---

/// Where the bundled lyrics come from.
pub trait LyricsSource {
  async fn fetch(&self) -> Result<Vec<LyricLine>, LyricsFormatError>;
}

/// Lyrics stored on disk as JSON, or as LRC when the extension is `.lrc`.
pub struct FileLyrics {
  pub path: PathBuf,
}

impl LyricsSource for FileLyrics {
  async fn fetch(&self) -> Result<Vec<LyricLine>, LyricsFormatError> {
    let content = tokio::fs::read_to_string(&self.path).await?;
    let is_lrc = self.path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("lrc"));
    if is_lrc {
      let lines = parse_lrc(&content);
      if lines.is_empty() {
        return Err(LyricsFormatError::Empty);
      }
      validate(lines)
    } else {
      parse_lyrics(&content)
    }
  }
}

// --- Clock ---

/// Read-only view of playback the matcher needs.
pub trait PlaybackClock {
  fn position(&self) -> f64;
  fn is_playing(&self) -> bool;
}

impl<A: crate::audio::AudioBackend> PlaybackClock for crate::playback::PlaybackController<A> {
  fn position(&self) -> f64 {
    crate::playback::PlaybackController::position(self)
  }

  fn is_playing(&self) -> bool {
    crate::playback::PlaybackController::is_playing(self)
  }
}

// --- Surface ---

pub type LineId = u64;

/// Mutations of the lyrics display region.
#[derive(Debug, Clone, PartialEq)]
pub enum LyricsMutation {
  ZoneActive(bool),
  /// Put a new line element up (hidden until its entrance plays).
  Mount { id: LineId, text: String },
  Entrance { id: LineId, duration: Duration },
  Exit { id: LineId, duration: Duration },
  Remove { id: LineId },
  /// Final exit on stop: the surface animates the line out and clears
  /// itself without further instructions.
  Dismiss { id: LineId, duration: Duration },
  Clear,
}

/// The display region the engine draws into.
pub trait LyricsSurface {
  fn apply(&mut self, mutation: LyricsMutation, now: Instant);
}

// --- Timing ---

#[derive(Debug, Clone, Copy)]
pub struct LyricsTiming {
  pub poll: Duration,
  /// How long before a line's `end_time` it starts to disappear.
  pub preroll_secs: f64,
  /// Delay before mounting when nothing is on screen.
  pub mount_delay: Duration,
  pub entrance_base: Duration,
  pub entrance_stagger: Duration,
  pub exit: Duration,
}

impl LyricsTiming {
  pub fn from_constants() -> Self {
    let c = constants();
    Self {
      poll: Duration::from_millis(c.lyrics_poll_ms),
      preroll_secs: c.lyrics_preroll_secs,
      mount_delay: Duration::from_millis(c.lyrics_mount_delay_ms),
      entrance_base: Duration::from_secs_f64(c.entrance_base_secs),
      entrance_stagger: Duration::from_secs_f64(c.entrance_stagger_secs),
      exit: Duration::from_secs_f64(c.exit_secs),
    }
  }

  /// Per-character staggered entrance: the last character starts
  /// `stagger * (n - 1)` after the first.
  pub fn entrance(&self, text: &str) -> Duration {
    let chars = text.chars().count().saturating_sub(1) as u32;
    self.entrance_base + self.entrance_stagger * chars
  }
}

impl Default for LyricsTiming {
  fn default() -> Self {
    Self::from_constants()
  }
}

// --- Engine ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LyricsTask {
  Poll,
  Mount { index: usize },
  EntranceDone { id: LineId },
  Disappear { id: LineId },
  ExitDone { id: LineId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinePhase {
  Entering,
  Visible,
  Exiting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ShownLine {
  id: LineId,
  index: usize,
  phase: LinePhase,
  /// When the running exit animation completes.
  exit_done: Option<Instant>,
}

pub struct LyricsEngine<S: LyricsSurface> {
  lines: Vec<LyricLine>,
  loaded: bool,
  displayed: HashSet<usize>,
  current_index: Option<usize>,
  active: bool,
  timers: Timers<LyricsTask>,
  shown: Option<ShownLine>,
  next_line_id: LineId,
  timing: LyricsTiming,
  surface: S,
}

impl<S: LyricsSurface> LyricsEngine<S> {
  pub fn new(surface: S, timing: LyricsTiming) -> Self {
    Self {
      lines: Vec::new(),
      loaded: false,
      displayed: HashSet::new(),
      current_index: None,
      active: false,
      timers: Timers::new(),
      shown: None,
      next_line_id: 0,
      timing,
      surface,
    }
  }

  pub fn lines(&self) -> &[LyricLine] {
    &self.lines
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn current_index(&self) -> Option<usize> {
    self.current_index
  }

  /// Phase of the line currently on the surface, if any.
  #[cfg(test)]
  pub fn shown_phase(&self) -> Option<LinePhase> {
    self.shown.map(|s| s.phase)
  }

  pub fn surface(&self) -> &S {
    &self.surface
  }

  pub fn surface_mut(&mut self) -> &mut S {
    &mut self.surface
  }

  #[cfg(test)]
  pub fn pending_tasks(&self) -> usize {
    self.timers.len()
  }

  #[cfg(test)]
  pub fn next_deadline(&self) -> Option<Instant> {
    self.timers.next_deadline()
  }

  /// Load the bundled lyrics once. Failures are logged and leave the list
  /// empty; a later call may retry. Calls after a success do nothing.
  pub async fn load<L: LyricsSource>(&mut self, source: &L) {
    if self.loaded {
      return;
    }
    match source.fetch().await {
      Ok(lines) => {
        info!(count = lines.len(), "lyrics: loaded");
        self.lines = lines;
        self.loaded = true;
      }
      Err(e) => {
        error!(err = %e, "lyrics: failed to load bundled lyrics");
        self.lines.clear();
      }
    }
  }

  /// Replace the line list with caller-supplied JSON.
  pub fn load_custom(&mut self, json: &str) -> Result<usize, LyricsFormatError> {
    let lines = parse_lyrics(json)?;
    info!(count = lines.len(), "lyrics: custom lyrics loaded");
    self.lines = lines;
    self.loaded = true;
    Ok(self.lines.len())
  }

  pub fn to_pretty_json(&self) -> String {
    serde_json::to_string_pretty(&self.lines).unwrap_or_else(|_| "[]".to_string())
  }

  pub fn start_sync(&mut self, now: Instant) {
    debug!(lines = self.lines.len(), "lyrics: sync started");
    self.active = true;
    self.current_index = None;
    self.displayed.clear();
    self.timers.cancel_where(|t| *t == LyricsTask::Poll);
    self.timers.schedule_at(now + self.timing.poll, LyricsTask::Poll);
    self.surface.apply(LyricsMutation::ZoneActive(true), now);
  }

  /// Stop syncing. Every pending task is dropped before this returns; the
  /// shown line (if any) is handed to the surface for its final exit.
  pub fn stop_sync(&mut self, now: Instant) {
    let cancelled = self.timers.cancel_all();
    debug!(cancelled, "lyrics: sync stopped");
    self.active = false;
    self.current_index = None;
    self.displayed.clear();

    match self.shown.take() {
      Some(line) => {
        self.surface.apply(LyricsMutation::Dismiss { id: line.id, duration: self.timing.exit }, now);
      }
      None => self.surface.apply(LyricsMutation::Clear, now),
    }
    self.surface.apply(LyricsMutation::ZoneActive(false), now);
  }

  /// Run every task due at `now`.
  pub fn tick(&mut self, now: Instant, clock: &impl PlaybackClock) {
    while let Some((at, task)) = self.timers.pop_due(now) {
      match task {
        LyricsTask::Poll => {
          self.match_line(at, clock);
          if self.active {
            let mut next = at + self.timing.poll;
            if next <= now {
              next = now + self.timing.poll;
            }
            self.timers.schedule_at(next, LyricsTask::Poll);
          }
        }
        LyricsTask::Mount { index } => self.mount(index, at),
        LyricsTask::EntranceDone { id } => self.entrance_done(id, now, clock),
        LyricsTask::Disappear { id } => {
          if self.shown.is_some_and(|s| s.id == id && s.phase != LinePhase::Exiting) {
            self.begin_exit(at);
          }
        }
        LyricsTask::ExitDone { id } => {
          if self.shown.is_some_and(|s| s.id == id) {
            self.shown = None;
            self.surface.apply(LyricsMutation::Remove { id }, at);
          }
        }
      }
    }
  }

  /// One poll: first undisplayed line whose window contains the position wins.
  fn match_line(&mut self, at: Instant, clock: &impl PlaybackClock) {
    if !self.active || !clock.is_playing() {
      return;
    }
    let t = clock.position();
    let found = self.lines.iter().enumerate().find(|(i, line)| line.contains(t) && !self.displayed.contains(i));
    if let Some((index, _)) = found {
      self.displayed.insert(index);
      self.current_index = Some(index);
      debug!(index, position = t, "lyrics: line matched");
      self.transition(index, at);
    }
  }

  /// Replace whatever is on screen with line `index`.
  fn transition(&mut self, index: usize, at: Instant) {
    self.timers.cancel_where(|t| !matches!(t, LyricsTask::Poll | LyricsTask::ExitDone { .. }));

    let mount_at = match self.shown {
      // Already leaving: the new line follows the running exit.
      Some(ShownLine { exit_done: Some(done), .. }) => done,
      Some(_) => self.begin_exit(at),
      None => at + self.timing.mount_delay,
    };
    self.timers.schedule_at(mount_at, LyricsTask::Mount { index });
  }

  /// Play the shown line's exit; returns when it completes.
  fn begin_exit(&mut self, at: Instant) -> Instant {
    let done = at + self.timing.exit;
    if let Some(line) = self.shown.as_mut() {
      line.phase = LinePhase::Exiting;
      line.exit_done = Some(done);
      let id = line.id;
      self.surface.apply(LyricsMutation::Exit { id, duration: self.timing.exit }, at);
      self.timers.schedule_at(done, LyricsTask::ExitDone { id });
    }
    done
  }

  fn mount(&mut self, index: usize, at: Instant) {
    let Some(line) = self.lines.get(index) else { return };
    let text = line.text.clone();

    if let Some(old) = self.shown.take() {
      self.surface.apply(LyricsMutation::Remove { id: old.id }, at);
    }

    let id = self.next_line_id;
    self.next_line_id += 1;
    let duration = self.timing.entrance(&text);
    self.surface.apply(LyricsMutation::Mount { id, text }, at);
    self.surface.apply(LyricsMutation::Entrance { id, duration }, at);
    self.shown = Some(ShownLine { id, index, phase: LinePhase::Entering, exit_done: None });
    self.timers.schedule_at(at + duration, LyricsTask::EntranceDone { id });
  }

  /// Entrance finished: schedule the disappear at `end_time - preroll`.
  /// The delay counts from `now`, the instant the clock was read.
  fn entrance_done(&mut self, id: LineId, now: Instant, clock: &impl PlaybackClock) {
    let Some(shown) = self.shown.as_mut().filter(|s| s.id == id) else { return };
    shown.phase = LinePhase::Visible;
    let Some(line) = self.lines.get(shown.index) else { return };

    let disappear_at = line.end_time - self.timing.preroll_secs;
    let remaining = disappear_at - clock.position();
    if remaining > self.timing.exit.as_secs_f64() {
      self.timers.schedule_at(now + Duration::from_secs_f64(remaining), LyricsTask::Disappear { id });
    } else if remaining > 0.0 {
      self.begin_exit(now);
    }
  }
}

#[cfg(test)]
pub(crate) mod fake {
  use std::cell::Cell;
  use std::time::Instant;

  use super::{LyricsMutation, LyricsSurface, PlaybackClock};

  /// Records every mutation instead of drawing.
  #[derive(Debug, Default)]
  pub struct RecordingSurface {
    pub log: Vec<LyricsMutation>,
  }

  impl RecordingSurface {
    pub fn mounted_texts(&self) -> Vec<&str> {
      self
        .log
        .iter()
        .filter_map(|m| match m {
          LyricsMutation::Mount { text, .. } => Some(text.as_str()),
          _ => None,
        })
        .collect()
    }
  }

  impl LyricsSurface for RecordingSurface {
    fn apply(&mut self, mutation: LyricsMutation, _now: Instant) {
      self.log.push(mutation);
    }
  }

  pub struct ManualClock {
    pub position: Cell<f64>,
    pub playing: Cell<bool>,
  }

  impl ManualClock {
    pub fn playing_at(position: f64) -> Self {
      Self { position: Cell::new(position), playing: Cell::new(true) }
    }
  }

  impl PlaybackClock for ManualClock {
    fn position(&self) -> f64 {
      self.position.get()
    }

    fn is_playing(&self) -> bool {
      self.playing.get()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::fake::{ManualClock, RecordingSurface};
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

  fn line(text: &str, start: f64, end: f64) -> LyricLine {
    LyricLine { text: text.to_string(), start_time: start, end_time: end }
  }

  fn engine(lines: Vec<LyricLine>) -> LyricsEngine<RecordingSurface> {
    let mut e = LyricsEngine::new(RecordingSurface::default(), timing());
    e.lines = lines;
    e.loaded = true;
    e
  }

  /// Advance in 100 ms steps from `from` to `to` (seconds of playback),
  /// keeping the audio clock in lockstep with wall time.
  fn run(e: &mut LyricsEngine<RecordingSurface>, clock: &ManualClock, t0: Instant, from: u64, to: u64) {
    for step in from..=to {
      clock.position.set(step as f64 / 10.0);
      e.tick(t0 + Duration::from_millis(step * 100), clock);
    }
  }

  #[test]
  fn parse_accepts_valid_and_sorts() {
    let json = r#"[{"text":"b","startTime":2,"endTime":4},{"text":"a","startTime":0.5,"endTime":2}]"#;
    let lines = parse_lyrics(json).unwrap();
    assert_eq!(lines.iter().map(|l| l.text.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
  }

  #[test]
  fn parse_rejects_bad_shapes() {
    assert!(matches!(parse_lyrics(r#"{"text":"a"}"#), Err(LyricsFormatError::Json(_))));
    assert!(matches!(parse_lyrics(r#"[{"text":"a","startTime":0}]"#), Err(LyricsFormatError::Json(_))));
    assert!(matches!(parse_lyrics(r#"[{"text":1,"startTime":0,"endTime":1}]"#), Err(LyricsFormatError::Json(_))));
    assert!(matches!(parse_lyrics(r#"[{"text":"a","startTime":"0","endTime":1}]"#), Err(LyricsFormatError::Json(_))));
    assert!(matches!(
      parse_lyrics(r#"[{"text":"a","startTime":3,"endTime":3}]"#),
      Err(LyricsFormatError::Window { index: 0, .. })
    ));
    assert!(parse_lyrics("[]").unwrap().is_empty());
  }

  #[test]
  fn entrance_duration_staggers_per_char() {
    let t = timing();
    assert_eq!(t.entrance(""), Duration::from_millis(600));
    assert_eq!(t.entrance("a"), Duration::from_millis(600));
    assert_eq!(t.entrance("abc"), Duration::from_millis(660));
  }

  #[test]
  fn each_line_shows_once_in_order() {
    let mut e = engine(vec![line("one", 0.0, 2.0), line("two", 2.0, 4.0), line("three", 4.0, 6.0)]);
    let clock = ManualClock::playing_at(0.0);
    let t0 = Instant::now();
    e.start_sync(t0);
    run(&mut e, &clock, t0, 0, 60);

    assert_eq!(e.surface().mounted_texts(), vec!["one", "two", "three"]);
    assert_eq!(e.current_index(), Some(2));
  }

  #[test]
  fn boundary_goes_to_next_line_once_previous_was_shown() {
    let mut e = engine(vec![line("one", 0.0, 2.0), line("two", 2.0, 4.0)]);
    let clock = ManualClock::playing_at(2.0);
    let t0 = Instant::now();
    e.start_sync(t0);
    // At exactly 2.0 both windows contain the position: first match wins.
    e.tick(t0 + Duration::from_millis(100), &clock);
    assert_eq!(e.current_index(), Some(0));
    e.tick(t0 + Duration::from_millis(200), &clock);
    assert_eq!(e.current_index(), Some(1));
  }

  #[test]
  fn new_line_during_exit_is_not_skipped_or_duplicated() {
    // "two" matches at 1.0 and mounts after "one" exits (1.4); "three"
    // matches at 1.3 while that exit is still animating.
    let mut e = engine(vec![line("one", 0.0, 1.0), line("two", 1.0, 1.3), line("three", 1.3, 5.0)]);
    let clock = ManualClock::playing_at(0.0);
    let t0 = Instant::now();
    e.start_sync(t0);
    run(&mut e, &clock, t0, 0, 50);

    let mounted = e.surface().mounted_texts();
    assert_eq!(mounted.iter().filter(|t| **t == "three").count(), 1);
    assert_eq!(mounted.last(), Some(&"three"));
    assert_eq!(mounted.iter().filter(|t| **t == "one").count(), 1);
  }

  #[test]
  fn exit_precedes_next_mount() {
    let mut e = engine(vec![line("one", 0.0, 2.0), line("two", 2.0, 4.0)]);
    let clock = ManualClock::playing_at(0.0);
    let t0 = Instant::now();
    e.start_sync(t0);
    run(&mut e, &clock, t0, 0, 30);

    let log = &e.surface().log;
    let exit_one = log.iter().position(|m| matches!(m, LyricsMutation::Exit { id: 0, .. })).unwrap();
    let remove_one = log.iter().position(|m| matches!(m, LyricsMutation::Remove { id: 0 })).unwrap();
    let mount_two = log.iter().position(|m| matches!(m, LyricsMutation::Mount { id: 1, .. })).unwrap();
    assert!(exit_one < remove_one && remove_one < mount_two);
  }

  #[test]
  fn long_line_disappears_before_its_end() {
    let mut e = engine(vec![line("hold", 0.0, 10.0)]);
    let clock = ManualClock::playing_at(0.0);
    let t0 = Instant::now();
    e.start_sync(t0);
    run(&mut e, &clock, t0, 0, 85);
    assert_eq!(e.shown_phase(), Some(LinePhase::Visible));

    // Disappear deadline is 10.0 - 1.15 = 8.85 s.
    run(&mut e, &clock, t0, 86, 95);
    assert!(e.surface().log.iter().any(|m| matches!(m, LyricsMutation::Exit { id: 0, .. })));
    assert!(e.surface().log.iter().any(|m| matches!(m, LyricsMutation::Remove { id: 0 })));
    assert_eq!(e.shown_phase(), None);
  }

  #[test]
  fn late_entrance_tick_does_not_pull_disappear_forward() {
    let mut e = engine(vec![line("hold", 0.0, 10.0)]);
    let clock = ManualClock::playing_at(0.0);
    let t0 = Instant::now();
    e.start_sync(t0);
    run(&mut e, &clock, t0, 0, 2);
    assert_eq!(e.shown_phase(), Some(LinePhase::Entering));

    // The entrance was due well before this tick; the clock has moved on.
    clock.position.set(1.3);
    e.tick(t0 + Duration::from_millis(1300), &clock);
    assert_eq!(e.shown_phase(), Some(LinePhase::Visible));

    // Disappear belongs at 8.85 s of playback.
    run(&mut e, &clock, t0, 14, 88);
    assert!(!e.surface().log.iter().any(|m| matches!(m, LyricsMutation::Exit { .. })));
    run(&mut e, &clock, t0, 89, 89);
    assert_eq!(e.shown_phase(), Some(LinePhase::Exiting));
  }

  #[test]
  fn short_line_exits_right_after_entrance() {
    // Disappear is due at 1.25 s; the entrance completes on the 0.9 s tick,
    // leaving less than one exit duration.
    let mut e = engine(vec![line("abc", 0.0, 2.4)]);
    let clock = ManualClock::playing_at(0.0);
    let t0 = Instant::now();
    e.start_sync(t0);
    run(&mut e, &clock, t0, 0, 9);
    assert_eq!(e.shown_phase(), Some(LinePhase::Exiting));
  }

  #[test]
  fn stop_in_same_tick_leaves_nothing_to_fire() {
    let mut e = engine(vec![line("one", 0.0, 2.0)]);
    let clock = ManualClock::playing_at(0.5);
    let t0 = Instant::now();
    e.start_sync(t0);
    e.stop_sync(t0);
    assert_eq!(e.pending_tasks(), 0);

    e.surface_mut().log.clear();
    run(&mut e, &clock, t0, 0, 200);
    assert!(e.surface().log.is_empty());
  }

  #[test]
  fn stop_mid_display_cancels_everything() {
    let mut e = engine(vec![line("one", 0.0, 10.0), line("two", 10.0, 20.0)]);
    let clock = ManualClock::playing_at(0.0);
    let t0 = Instant::now();
    e.start_sync(t0);
    run(&mut e, &clock, t0, 0, 20);
    assert!(e.pending_tasks() > 1, "poll and disappear are pending");

    let stop_at = t0 + Duration::from_millis(2050);
    e.stop_sync(stop_at);
    let log = &e.surface().log;
    assert!(matches!(log[log.len() - 2], LyricsMutation::Dismiss { id: 0, .. }));
    assert_eq!(log.last(), Some(&LyricsMutation::ZoneActive(false)));
    assert!(!e.is_active());
    assert_eq!(e.current_index(), None);

    e.surface_mut().log.clear();
    run(&mut e, &clock, t0, 21, 250);
    assert!(e.surface().log.is_empty());
  }

  #[test]
  fn restart_shows_lines_again() {
    let mut e = engine(vec![line("one", 0.0, 5.0)]);
    let clock = ManualClock::playing_at(1.0);
    let t0 = Instant::now();
    e.start_sync(t0);
    e.tick(t0 + Duration::from_millis(100), &clock);
    e.tick(t0 + Duration::from_millis(200), &clock);
    e.stop_sync(t0 + Duration::from_millis(250));
    e.start_sync(t0 + Duration::from_millis(300));
    e.tick(t0 + Duration::from_millis(400), &clock);
    e.tick(t0 + Duration::from_millis(500), &clock);
    assert_eq!(e.surface().mounted_texts(), vec!["one", "one"]);
  }

  #[test]
  fn paused_audio_is_not_matched() {
    let mut e = engine(vec![line("one", 0.0, 2.0)]);
    let clock = ManualClock::playing_at(1.0);
    clock.playing.set(false);
    let t0 = Instant::now();
    e.start_sync(t0);
    for step in 1..20 {
      e.tick(t0 + Duration::from_millis(step * 100), &clock);
    }
    assert!(e.surface().mounted_texts().is_empty());
    assert!(e.is_active(), "polling continues while paused");
  }

  #[test]
  fn late_tick_does_not_burst_polls() {
    let mut e = engine(vec![line("one", 0.0, 2.0), line("two", 2.0, 4.0)]);
    let clock = ManualClock::playing_at(3.0);
    let t0 = Instant::now();
    e.start_sync(t0);
    e.tick(t0 + Duration::from_secs(5), &clock);
    // One poll ran; the next one is a full interval away.
    assert_eq!(e.current_index(), Some(1));
    assert!(e.next_deadline().is_some_and(|d| d <= t0 + Duration::from_millis(5100)));
  }

  #[test]
  fn custom_load_replaces_wholesale() {
    let mut e = engine(vec![line("old", 0.0, 1.0)]);
    assert_eq!(e.load_custom(r#"[{"text":"new","startTime":0,"endTime":1}]"#).unwrap(), 1);
    assert_eq!(e.lines()[0].text, "new");
    assert!(e.load_custom("nope").is_err());
    assert_eq!(e.lines()[0].text, "new", "failed load keeps the previous lines");
  }

  use std::cell::Cell;

  struct CountingSource {
    calls: Cell<usize>,
    result: fn() -> Result<Vec<LyricLine>, LyricsFormatError>,
  }

  impl LyricsSource for CountingSource {
    async fn fetch(&self) -> Result<Vec<LyricLine>, LyricsFormatError> {
      self.calls.set(self.calls.get() + 1);
      (self.result)()
    }
  }

  #[tokio::test]
  async fn load_is_idempotent_after_success() {
    let source = CountingSource { calls: Cell::new(0), result: || Ok(vec![line("x", 0.0, 1.0)]) };
    let mut e = LyricsEngine::new(RecordingSurface::default(), timing());
    e.load(&source).await;
    e.load(&source).await;
    assert_eq!(source.calls.get(), 1);
    assert_eq!(e.lines().len(), 1);
  }

  #[tokio::test]
  async fn failed_load_leaves_lines_empty() {
    let source = CountingSource { calls: Cell::new(0), result: || Err(LyricsFormatError::Empty) };
    let mut e = LyricsEngine::new(RecordingSurface::default(), timing());
    e.load(&source).await;
    assert!(e.lines().is_empty());
    e.load(&source).await;
    assert_eq!(source.calls.get(), 2, "a failed load may be retried");
  }

  #[tokio::test]
  async fn file_source_reads_json_and_lrc() {
    let dir = std::env::temp_dir().join(format!("webbash-lyrics-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let json = dir.join("l.json");
    std::fs::write(&json, r#"[{"text":"a","startTime":0,"endTime":1}]"#).unwrap();
    let lrc = dir.join("l.lrc");
    std::fs::write(&lrc, "[00:01.00]a\n[00:02.50]b\n").unwrap();

    assert_eq!(FileLyrics { path: json }.fetch().await.unwrap().len(), 1);
    let from_lrc = FileLyrics { path: lrc }.fetch().await.unwrap();
    assert_eq!(from_lrc[0].end_time, 2.5);
    assert!(matches!(FileLyrics { path: dir.join("missing.json") }.fetch().await, Err(LyricsFormatError::Io(_))));
    let _ = std::fs::remove_dir_all(&dir);
  }
}
