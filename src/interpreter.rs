//! Orchestrates one terminal session: submit lines, run handlers, and drive
//! playback events, lyrics and deferred effects from the tick.

use std::rc::Rc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use tracing::{debug, info, warn};

use crate::audio::AudioBackend;
use crate::codec::escape_markup;
use crate::commands::{self, CommandId, CommandTable, Context, Effect, LineKind, OutputLine, Resolution};
use crate::constants::constants;
use crate::error::{CommandError, RemoteError};
use crate::events::Subscription;
use crate::lyrics::{LyricsEngine, LyricsSource, LyricsSurface};
use crate::playback::{PlaybackController, PlaybackEvent};
use crate::remote::{ProfileClient, Transport};
use crate::session::{Session, Transcript};

const WAIT_FRAMES: [&str; 4] = ["Please wait", "Please wait.", "Please wait..", "Please wait..."];

/// An in-flight `myip`.
struct IpLookup {
  result: LocalBoxFuture<'static, Result<String, RemoteError>>,
  frame: Option<usize>,
  next_frame: Instant,
}

pub struct Interpreter<T: Transport + 'static, A: AudioBackend, S: LyricsSurface> {
  pub session: Session,
  pub transcript: Transcript,
  pub table: CommandTable,
  pub playback: PlaybackController<A>,
  pub lyrics: LyricsEngine<S>,
  remote: Rc<ProfileClient<T>>,
  playback_events: Subscription<PlaybackEvent>,
  username: String,
  /// Window of the running `fun` effect.
  fun: Option<(Instant, Instant)>,
  /// In-flight `myip` lookups, oldest first. Each reports on its own.
  ip_lookups: Vec<IpLookup>,
}

impl<T: Transport + 'static, A: AudioBackend, S: LyricsSurface> Interpreter<T, A, S> {
  pub fn new(
    remote: ProfileClient<T>,
    mut playback: PlaybackController<A>,
    lyrics: LyricsEngine<S>,
    username: impl Into<String>,
  ) -> Self {
    let playback_events = playback.subscribe();
    let mut transcript = Transcript::default();
    transcript.push(OutputLine::output("Type \"help\" to see available commands."));
    transcript.push(OutputLine::blank());
    Self {
      session: Session::new(),
      transcript,
      table: CommandTable::new(),
      playback,
      lyrics,
      remote: Rc::new(remote),
      playback_events,
      username: username.into(),
      fun: None,
      ip_lookups: Vec::new(),
    }
  }

  pub fn username(&self) -> &str {
    &self.username
  }

  pub async fn load_lyrics(&mut self, source: &impl LyricsSource) {
    self.lyrics.load(source).await;
  }

  /// The cycling `myip` placeholders, drawn after the transcript, one row
  /// each. The last one is left open like the line it stands in for.
  pub fn pending_lines(&self) -> Vec<OutputLine> {
    let mut lines: Vec<OutputLine> = self
      .ip_lookups
      .iter()
      .filter_map(|lookup| lookup.frame)
      .map(|frame| OutputLine::prompt(WAIT_FRAMES[frame]))
      .collect();
    if let Some(last) = lines.pop() {
      lines.push(last.inline());
    }
    lines
  }

  /// How far through the `fun` effect `now` is, in `0.0..1.0`; `None` when
  /// it is not running.
  pub fn fun_progress(&self, now: Instant) -> Option<f64> {
    let (start, until) = self.fun?;
    if now >= until {
      return None;
    }
    let total = until.saturating_duration_since(start).as_secs_f64();
    let elapsed = now.saturating_duration_since(start).as_secs_f64();
    Some(if total > 0.0 { elapsed / total } else { 0.0 })
  }

  fn prompt_line(&self, command: &str) -> OutputLine {
    let user = escape_markup(&self.username);
    OutputLine {
      kind: LineKind::Prompt,
      text: format!("<blue>{user}</blue>@<pink>{user}</pink>:~$ <green>{}</green>", escape_markup(command)),
      markup: true,
      suppress_newline: false,
    }
  }

  /// Execute whatever is in the input line.
  pub async fn submit(&mut self, now: Instant) {
    if self.session.paused {
      return;
    }
    let Some(command) = self.session.take_submission() else {
      return;
    };
    info!(command = %command, "interpreter: submit");
    let prompt = self.prompt_line(&command);
    self.transcript.push(prompt);

    match self.table.resolve(&command) {
      Resolution::Empty => {}
      Resolution::Found { id: CommandId::Clear, .. } => self.transcript.clear(),
      Resolution::Unknown(name) => {
        debug!(name = %name, "interpreter: unknown command");
        self.transcript.push(OutputLine::error(CommandError::NotFound(name).to_string()));
      }
      Resolution::Found { id, args } => self.dispatch(id, &args, now).await,
    }

    self.transcript.push(OutputLine::blank());
  }

  async fn dispatch(&mut self, id: CommandId, args: &[String], now: Instant) {
    let mut ctx =
      Context { table: &self.table, remote: &self.remote, playback: &mut self.playback, lyrics: &mut self.lyrics, now };
    match commands::execute(id, args, &mut ctx).await {
      Ok(reply) => {
        self.transcript.extend(reply.lines);
        if let Some(effect) = reply.effect {
          self.begin_effect(effect, now);
        }
      }
      Err(e) => {
        warn!(command = ?id, err = %e, "interpreter: command failed");
        self.transcript.push(OutputLine::error(e.to_string()));
      }
    }
  }

  fn begin_effect(&mut self, effect: Effect, now: Instant) {
    let c = constants();
    match effect {
      Effect::Fun => {
        self.session.paused = true;
        self.fun = Some((now, now + Duration::from_millis(c.fun_duration_ms)));
      }
      Effect::LookupIp => {
        let remote = Rc::clone(&self.remote);
        self.ip_lookups.push(IpLookup {
          result: async move { remote.public_ip().await }.boxed_local(),
          frame: None,
          next_frame: now + Duration::from_millis(c.myip_frame_ms),
        });
      }
    }
  }

  /// `Ctrl+L`: same as the `clear` command, without the prompt echo.
  pub fn clear_screen(&mut self) {
    self.transcript.clear();
  }

  /// Advance everything time-driven. Called every loop iteration.
  pub fn tick(&mut self, now: Instant) {
    self.playback.poll();
    for event in self.playback_events.drain() {
      match event {
        PlaybackEvent::Started => {
          if !self.lyrics.lines().is_empty() && !self.lyrics.is_active() {
            self.lyrics.start_sync(now);
          }
        }
        PlaybackEvent::Ended => {
          if self.lyrics.is_active() {
            self.lyrics.stop_sync(now);
          }
        }
        PlaybackEvent::Failed(message) => self.transcript.push(OutputLine::error(message)),
      }
    }

    self.lyrics.tick(now, &self.playback);

    if self.fun.is_some_and(|(_, until)| now >= until) {
      self.fun = None;
      self.session.paused = false;
      self.transcript.push(OutputLine::output("Done!"));
    }

    self.tick_ip_lookups(now);
  }

  fn tick_ip_lookups(&mut self, now: Instant) {
    let frame_ms = Duration::from_millis(constants().myip_frame_ms);
    let mut finished = Vec::new();

    self.ip_lookups.retain_mut(|lookup| {
      if let Some(result) = (&mut lookup.result).now_or_never() {
        finished.push(result);
        return false;
      }
      if now >= lookup.next_frame {
        lookup.frame = Some(lookup.frame.map_or(0, |f| (f + 1) % WAIT_FRAMES.len()));
        lookup.next_frame += frame_ms;
        if lookup.next_frame <= now {
          lookup.next_frame = now + frame_ms;
        }
      }
      true
    });

    for result in finished {
      let text = match result {
        Ok(ip) => ip,
        Err(e) => {
          warn!(err = %e, "interpreter: ip lookup failed");
          format!("Error: {}", e)
        }
      };
      self.transcript.push(OutputLine::prompt(text));
    }
  }

  /// First key press: start the soundtrack if autoplay allows it.
  pub async fn first_interaction(&mut self) {
    if self.playback.autostart().await {
      debug!("interpreter: autoplay started");
    }
  }

  /// Terminal lost focus.
  pub async fn suspend(&mut self) {
    self.playback.suspend().await;
  }

  /// Terminal regained focus.
  pub async fn resume(&mut self) {
    self.playback.resume().await;
  }

  pub async fn shutdown(&mut self, now: Instant) {
    if self.lyrics.is_active() {
      self.lyrics.stop_sync(now);
    }
    self.ip_lookups.clear();
    self.playback.shutdown().await;
    self.playback.unsubscribe(self.playback_events.id);
  }
}
