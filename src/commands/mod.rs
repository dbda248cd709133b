//! Command catalog, resolution and dispatch.
//!
//! The catalog is a fixed table sorted by name. `resolve` turns a raw line
//! into a [`CommandId`] plus arguments; `execute` runs the handler and
//! returns the lines it printed plus any deferred effect the interpreter
//! has to drive over later ticks.

pub mod info;
pub mod media;
pub mod utility;

use std::time::Instant;

use crate::audio::AudioBackend;
use crate::constants::constants;
use crate::error::CommandError;
use crate::lyrics::{LyricsEngine, LyricsSurface};
use crate::playback::PlaybackController;
use crate::remote::{ProfileClient, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandId {
  B64,
  Banner,
  Clear,
  Db64,
  Echo,
  Email,
  Fun,
  Help,
  Info,
  Lyrics,
  LyricsLoad,
  LyricsStop,
  MyIp,
  Play,
  Projects,
  Random,
  Repo,
  Social,
  Start,
  Stop,
  Whoami,
}

#[derive(Debug, Clone)]
pub struct CommandEntry {
  pub id: CommandId,
  pub name: &'static str,
  /// Usage form shown by `help`, e.g. `echo [arg ...]`.
  pub display: &'static str,
  pub description: &'static str,
  pub icon: String,
}

const CATALOG: [(CommandId, &str, &str, &str); 21] = [
  (CommandId::Help, "help", "help", "List all available commands"),
  (CommandId::Info, "info", "info", "Get info about me"),
  (CommandId::Whoami, "whoami", "whoami", "Display logged-in user."),
  (CommandId::Projects, "projects", "projects", "Display a list of my major projects."),
  (CommandId::Repo, "repo", "repo", "Open repository link."),
  (CommandId::Social, "social", "social", "Show social links."),
  (CommandId::Email, "email", "email", "Show contact email."),
  (CommandId::Banner, "banner", "banner", "Print the banner."),
  (CommandId::Echo, "echo", "echo [arg ...]", "Write arguments to the standard output."),
  (
    CommandId::Random,
    "random",
    "random <num>",
    "Return a pseudo-random number between 0 and 1, or you can try to predict the result!",
  ),
  (CommandId::Clear, "clear", "clear", "Clear the terminal screen."),
  (CommandId::Fun, "fun", "fun", "Try it and see"),
  (CommandId::Play, "play", "play", "Play soundtrack (mp3)"),
  (CommandId::Stop, "stop", "stop", "Stop soundtrack"),
  (CommandId::MyIp, "myip", "myip", "Return your IPv4"),
  (CommandId::B64, "b64", "b64 [string]", "Encode to Base64 format"),
  (CommandId::Db64, "db64", "db64 [base64]", "Decode from Base64 format"),
  (CommandId::Lyrics, "lyrics", "lyrics", "Show synced lyrics with audio"),
  (CommandId::LyricsStop, "lyrics-stop", "lyrics-stop", "Stop lyrics display"),
  (CommandId::LyricsLoad, "lyrics-load", "lyrics-load [json]", "Load custom lyrics"),
  (CommandId::Start, "start", "start", "Start/restart terminal autoplay demo"),
];

/// Single-level aliases applied after lower-casing.
const ALIASES: [(&str, &str); 1] = [("about", "info")];

/// Outcome of parsing one submitted line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
  Empty,
  Unknown(String),
  Found { id: CommandId, args: Vec<String> },
}

pub struct CommandTable {
  commands: Vec<CommandEntry>,
}

impl CommandTable {
  pub fn new() -> Self {
    let icons = &constants().icons;
    let mut commands: Vec<CommandEntry> = CATALOG
      .iter()
      .map(|&(id, name, display, description)| CommandEntry {
        id,
        name,
        display,
        description,
        icon: icons.get(name).cloned().unwrap_or_else(|| "·".to_string()),
      })
      .collect();
    commands.sort_by(|a, b| a.name.cmp(b.name));
    Self { commands }
  }

  pub fn commands(&self) -> &[CommandEntry] {
    &self.commands
  }

  pub fn find(&self, name: &str) -> Option<&CommandEntry> {
    self.commands.iter().find(|c| c.name == name)
  }

  /// First command (alphabetically) whose name starts with `prefix`.
  pub fn find_by_prefix(&self, prefix: &str) -> Option<&CommandEntry> {
    self.commands.iter().find(|c| c.name.starts_with(prefix))
  }

  pub fn resolve(&self, raw: &str) -> Resolution {
    let mut tokens = raw.split_whitespace();
    let Some(first) = tokens.next() else {
      return Resolution::Empty;
    };
    let lower = first.to_lowercase();
    let name = ALIASES.iter().find(|(alias, _)| *alias == lower).map_or(lower.as_str(), |(_, target)| *target);
    match self.find(name) {
      Some(entry) => Resolution::Found { id: entry.id, args: tokens.map(str::to_string).collect() },
      None => Resolution::Unknown(name.to_string()),
    }
  }
}

impl Default for CommandTable {
  fn default() -> Self {
    Self::new()
  }
}

// --- Output ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
  Prompt,
  Output,
  Error,
}

/// One transcript entry. `markup` lines are rendered through the markup
/// parser; everything else is shown verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
  pub kind: LineKind,
  pub text: String,
  pub markup: bool,
  /// Render on the same row as the following line.
  pub suppress_newline: bool,
}

impl OutputLine {
  pub fn output(text: impl Into<String>) -> Self {
    Self { kind: LineKind::Output, text: text.into(), markup: false, suppress_newline: false }
  }

  pub fn markup(text: impl Into<String>) -> Self {
    Self { kind: LineKind::Output, text: text.into(), markup: true, suppress_newline: false }
  }

  pub fn error(text: impl Into<String>) -> Self {
    Self { kind: LineKind::Error, text: text.into(), markup: false, suppress_newline: false }
  }

  pub fn prompt(text: impl Into<String>) -> Self {
    Self { kind: LineKind::Prompt, text: text.into(), markup: false, suppress_newline: false }
  }

  pub fn blank() -> Self {
    Self::output("")
  }

  pub fn inline(mut self) -> Self {
    self.suppress_newline = true;
    self
  }
}

/// Work that outlives the handler call and is advanced from `tick`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
  /// Pause input, then print `Done!`.
  Fun,
  /// Animated placeholder until the public IP lookup resolves.
  LookupIp,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Reply {
  pub lines: Vec<OutputLine>,
  pub effect: Option<Effect>,
}

impl Reply {
  pub fn none() -> Self {
    Self::default()
  }

  pub fn lines(lines: Vec<OutputLine>) -> Self {
    Self { lines, effect: None }
  }

  pub fn line(line: OutputLine) -> Self {
    Self::lines(vec![line])
  }

  pub fn effect(effect: Effect) -> Self {
    Self { lines: Vec::new(), effect: Some(effect) }
  }
}

/// Everything a handler may touch.
pub struct Context<'a, T: Transport, A: AudioBackend, S: LyricsSurface> {
  pub table: &'a CommandTable,
  pub remote: &'a ProfileClient<T>,
  pub playback: &'a mut PlaybackController<A>,
  pub lyrics: &'a mut LyricsEngine<S>,
  pub now: Instant,
}

pub async fn execute<T: Transport, A: AudioBackend, S: LyricsSurface>(
  id: CommandId,
  args: &[String],
  ctx: &mut Context<'_, T, A, S>,
) -> Result<Reply, CommandError> {
  match id {
    CommandId::Help => Ok(info::help(ctx.table)),
    CommandId::Info => Ok(info::info(ctx.remote).await),
    CommandId::Whoami => Ok(info::whoami()),
    CommandId::Repo => Ok(info::repo()),
    CommandId::Social => Ok(info::social()),
    CommandId::Email => Ok(info::email()),
    CommandId::Banner => Ok(info::banner()),
    CommandId::Projects => Ok(info::projects(ctx.remote).await),

    CommandId::Echo => Ok(utility::echo(args)),
    CommandId::B64 => Ok(utility::b64(args)),
    CommandId::Db64 => Ok(utility::db64(args)),
    CommandId::Random => Ok(utility::random(args, &mut rand::thread_rng())),
    CommandId::Fun => Ok(Reply::effect(Effect::Fun)),
    CommandId::MyIp => Ok(Reply::effect(Effect::LookupIp)),
    // Handled by the interpreter before dispatch.
    CommandId::Clear => Ok(Reply::none()),

    CommandId::Play => Ok(media::play(ctx.playback).await),
    CommandId::Stop => Ok(media::stop(ctx.playback).await),
    CommandId::Start => Ok(media::start(ctx.playback).await),
    CommandId::Lyrics => Ok(media::lyrics(ctx.playback, ctx.lyrics, ctx.now)),
    CommandId::LyricsStop => Ok(media::lyrics_stop(ctx.lyrics, ctx.now)),
    CommandId::LyricsLoad => media::lyrics_load(args, ctx.lyrics),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn catalog_is_sorted_and_unique() {
    let table = CommandTable::new();
    let names: Vec<_> = table.commands().iter().map(|c| c.name).collect();
    let mut sorted = names.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(names, sorted);
    assert_eq!(names.len(), 21);
    assert_eq!(names[0], "b64");
  }

  #[test]
  fn every_command_has_an_icon() {
    let table = CommandTable::new();
    assert!(table.commands().iter().all(|c| !c.icon.is_empty()));
    assert_eq!(table.find("help").map(|c| c.icon.as_str()), Some("?"));
  }

  #[test]
  fn prefix_lookup() {
    let table = CommandTable::new();
    assert_eq!(table.find_by_prefix("").map(|c| c.name), Some("b64"));
    assert_eq!(table.find_by_prefix("h").map(|c| c.name), Some("help"));
    assert_eq!(table.find_by_prefix("lyrics-").map(|c| c.name), Some("lyrics-load"));
    assert_eq!(table.find_by_prefix("st").map(|c| c.name), Some("start"));
    assert!(table.find_by_prefix("zz").is_none());
  }

  #[test]
  fn resolve_lowercases_and_splits() {
    let table = CommandTable::new();
    assert_eq!(
      table.resolve("ECHO  hello   world"),
      Resolution::Found { id: CommandId::Echo, args: vec!["hello".into(), "world".into()] }
    );
    assert_eq!(table.resolve("   "), Resolution::Empty);
    assert_eq!(table.resolve("nope x"), Resolution::Unknown("nope".into()));
  }

  #[test]
  fn alias_resolves_once() {
    let table = CommandTable::new();
    assert_eq!(table.resolve("About"), Resolution::Found { id: CommandId::Info, args: vec![] });
  }

  #[test]
  fn reply_builders() {
    let r = Reply::line(OutputLine::error("x"));
    assert_eq!(r.lines[0].kind, LineKind::Error);
    assert!(r.effect.is_none());
    assert!(OutputLine::prompt("p").inline().suppress_newline);
  }
}
