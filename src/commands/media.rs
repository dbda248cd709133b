//! Soundtrack and lyrics commands.

use std::time::Instant;

use tracing::debug;

use super::{OutputLine, Reply};
use crate::audio::AudioBackend;
use crate::error::CommandError;
use crate::lyrics::{LyricsEngine, LyricsSurface};
use crate::playback::{PlaybackController, StartOutcome};

pub async fn play<A: AudioBackend>(playback: &mut PlaybackController<A>) -> Reply {
  playback.start().await;
  Reply::line(OutputLine::output("The music was turned on. To stop playback enter 'stop'"))
}

pub async fn stop<A: AudioBackend>(playback: &mut PlaybackController<A>) -> Reply {
  playback.stop().await;
  Reply::line(OutputLine::output("The music was turned off. To continue playing please enter 'play'"))
}

pub async fn start<A: AudioBackend>(playback: &mut PlaybackController<A>) -> Reply {
  match playback.execute_start().await {
    StartOutcome::AlreadyRunning => Reply::line(OutputLine::output(
      "Terminal autoplay is already running. Wait for it to complete or type 'stop' first.",
    )),
    outcome => {
      debug!(?outcome, "commands: start");
      Reply::none()
    }
  }
}

/// Begin syncing only while audio plays and no session is running.
pub fn lyrics<A: AudioBackend, S: LyricsSurface>(
  playback: &PlaybackController<A>,
  lyrics: &mut LyricsEngine<S>,
  now: Instant,
) -> Reply {
  if playback.is_playing() && !lyrics.is_active() {
    lyrics.start_sync(now);
  }
  Reply::none()
}

pub fn lyrics_stop<S: LyricsSurface>(lyrics: &mut LyricsEngine<S>, now: Instant) -> Reply {
  lyrics.stop_sync(now);
  Reply::none()
}

/// With no argument, print the current lines as JSON; otherwise replace
/// them with the JSON given.
pub fn lyrics_load<S: LyricsSurface>(args: &[String], lyrics: &mut LyricsEngine<S>) -> Result<Reply, CommandError> {
  if args.is_empty() {
    return Ok(Reply::line(OutputLine::output(lyrics.to_pretty_json())));
  }
  lyrics
    .load_custom(&args.join(" "))
    .map(|_| Reply::none())
    .map_err(|e| CommandError::Handler { command: "lyrics-load", message: e.to_string() })
}

#[cfg(test)]
mod tests {
  use std::path::PathBuf;

  use super::*;
  use crate::lyrics::LyricsTiming;
  use crate::lyrics::fake::RecordingSurface;
  use crate::playback::fake::FakeAudio;

  fn controller() -> PlaybackController<FakeAudio> {
    PlaybackController::new(FakeAudio::new(), PathBuf::from("assets/hope.mp3"), 12)
  }

  fn engine() -> LyricsEngine<RecordingSurface> {
    LyricsEngine::new(RecordingSurface::default(), LyricsTiming::default())
  }

  #[tokio::test]
  async fn play_and_stop_print_confirmations() {
    let mut p = controller();
    assert_eq!(play(&mut p).await.lines[0].text, "The music was turned on. To stop playback enter 'stop'");
    assert!(p.is_playing());
    assert!(stop(&mut p).await.lines[0].text.starts_with("The music was turned off."));
    assert!(!p.is_playing());
  }

  #[tokio::test]
  async fn start_twice_reports_already_running() {
    let mut p = controller();
    assert!(start(&mut p).await.lines.is_empty());
    let second = start(&mut p).await;
    assert!(second.lines[0].text.starts_with("Terminal autoplay is already running."));
  }

  #[tokio::test]
  async fn lyrics_requires_playing_audio() {
    let mut p = controller();
    let mut l = engine();
    let now = Instant::now();
    lyrics(&p, &mut l, now);
    assert!(!l.is_active());

    p.start().await;
    lyrics(&p, &mut l, now);
    assert!(l.is_active());
    let mutations = l.surface().log.len();
    lyrics(&p, &mut l, now);
    assert_eq!(l.surface().log.len(), mutations, "second call is a no-op");

    lyrics_stop(&mut l, now);
    assert!(!l.is_active());
  }

  #[test]
  fn lyrics_load_prints_or_replaces() {
    let mut l = engine();
    assert_eq!(lyrics_load(&[], &mut l).unwrap().lines[0].text, "[]");

    let json = vec![r#"[{"text":"hi","startTime":0,"endTime":1}]"#.to_string()];
    assert!(lyrics_load(&json, &mut l).unwrap().lines.is_empty());
    assert!(lyrics_load(&[], &mut l).unwrap().lines[0].text.contains("\"startTime\": 0.0"));

    let err = lyrics_load(&["{oops".to_string()], &mut l).unwrap_err();
    assert!(err.to_string().starts_with("lyrics-load: invalid JSON"));
    assert_eq!(l.lines().len(), 1);
  }
}
