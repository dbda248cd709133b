mod app;
mod audio;
mod codec;
mod commands;
mod config;
mod constants;
mod error;
mod events;
mod input;
mod interpreter;
mod lrc;
mod lyrics;
mod markup;
mod panel;
mod playback;
mod remote;
mod schedule;
mod session;
mod theme;
mod ui;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use ratatui::{
  DefaultTerminal,
  crossterm::{
    event::{self, DisableFocusChange, EnableFocusChange, Event, KeyEventKind},
    execute,
  },
};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use app::App;
use audio::MpvAudio;
use config::Config;
use constants::constants;
use input::handle_key_event;
use interpreter::Interpreter;
use lyrics::{FileLyrics, LyricsEngine, LyricsTiming};
use panel::LyricsPanel;
use playback::PlaybackController;
use remote::{HttpTransport, ProfileClient};

// --- CLI ---

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Args {
  #[command(subcommand)]
  command: Option<Command>,

  /// Soundtrack to play (default: the bundled track)
  #[arg(long)]
  audio: Option<PathBuf>,

  /// Lyrics file, JSON or .lrc (default: the bundled lyrics)
  #[arg(long)]
  lyrics: Option<PathBuf>,

  /// Name shown in the prompt
  #[arg(short, long)]
  user: Option<String>,

  /// Don't start the soundtrack on the first key press
  #[arg(long)]
  no_autoplay: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Convert an LRC file to lyrics JSON and print it
  ConvertLrc { file: PathBuf },
}

// --- Logging ---

/// Log to a daily file; the terminal belongs to the UI.
fn init_logging() -> Result<WorkerGuard> {
  let log_dir = config::project_dirs()
    .map(|dirs| dirs.data_dir().join("logs"))
    .unwrap_or_else(|| std::env::temp_dir().join("webbash-logs"));
  std::fs::create_dir_all(&log_dir).with_context(|| format!("Failed to create log dir {}", log_dir.display()))?;

  let file_appender = tracing_appender::rolling::daily(&log_dir, "webbash.log");
  let (writer, guard) = tracing_appender::non_blocking(file_appender);
  let filter = EnvFilter::try_from_env("WEBBASH_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

  tracing_subscriber::fmt()
    .with_writer(writer)
    .with_ansi(false)
    .with_target(false)
    .with_env_filter(filter)
    .try_init()
    .map_err(|e| anyhow!("Failed to install log subscriber: {e}"))?;
  Ok(guard)
}

// --- Commands ---

fn convert_lrc(file: &Path) -> Result<()> {
  let content = std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;
  let lines = lrc::parse_lrc(&content);
  if lines.is_empty() {
    bail!("{} has no timed lyric lines", file.display());
  }
  let lines = lyrics::validate(lines).context("Converted lyrics are invalid")?;
  println!("{}", serde_json::to_string_pretty(&lines)?);
  Ok(())
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  if let Some(Command::ConvertLrc { file }) = &args.command {
    return convert_lrc(file);
  }

  let _log_guard = init_logging()?;
  let mut app = build_app(&args).await?;

  let default_hook = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |info| {
    let _ = execute!(std::io::stdout(), DisableFocusChange);
    ratatui::restore();
    default_hook(info);
  }));

  let mut terminal = ratatui::init();
  if let Err(e) = execute!(std::io::stdout(), EnableFocusChange) {
    warn!(err = %e, "main: focus reporting unavailable");
  }
  let result = run(&mut terminal, &mut app).await;
  app.shutdown().await;
  let _ = execute!(std::io::stdout(), DisableFocusChange);
  ratatui::restore();
  result
}

async fn build_app(args: &Args) -> Result<App> {
  let c = constants();
  let config = Config::load();

  let username = args.user.clone().or_else(|| config.username.clone()).unwrap_or_else(|| c.default_username.clone());
  let audio_path = args.audio.clone().unwrap_or_else(|| PathBuf::from(&c.audio_path));
  let lyrics_path = args.lyrics.clone().unwrap_or_else(|| PathBuf::from(&c.lyrics_path));
  let autoplay = !args.no_autoplay && config.autoplay.unwrap_or(true);
  info!(user = %username, audio = %audio_path.display(), lyrics = %lyrics_path.display(), autoplay, "main: starting");

  let transport = HttpTransport::new().context("Failed to build HTTP client")?;
  let remote = ProfileClient::new(transport, c.github_api_base.as_str(), c.github_api_user.as_str());

  let mut playback = PlaybackController::new(MpvAudio::new(), audio_path, c.audio_volume);
  playback.set_autoplay(autoplay);

  let timing = LyricsTiming::from_constants();
  let lyrics = LyricsEngine::new(LyricsPanel::new(timing), timing);

  let mut interpreter = Interpreter::new(remote, playback, lyrics, username);
  interpreter.load_lyrics(&FileLyrics { path: lyrics_path }).await;

  Ok(App::new(interpreter, config))
}

async fn run(terminal: &mut DefaultTerminal, app: &mut App) -> Result<()> {
  loop {
    app.tick(Instant::now());

    terminal.draw(|frame| ui::ui(frame, app))?;

    if event::poll(Duration::from_millis(100))? {
      match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => handle_key_event(app, key).await,
        Event::FocusLost => app.focus_lost().await,
        Event::FocusGained => app.focus_gained().await,
        _ => {}
      }
    }

    if app.should_quit {
      break;
    }
  }
  Ok(())
}
