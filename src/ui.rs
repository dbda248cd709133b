use std::time::Instant;

use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, BorderType, Padding, Paragraph, Wrap},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::app::App;
use crate::audio::AudioBackend;
use crate::codec::format_clock;
use crate::commands::{LineKind, OutputLine};
use crate::markup;
use crate::panel::LineView;
use crate::playback::PlaybackPhase;
use crate::remote::Transport;
use crate::theme::{THEMES, Theme};

// --- Helpers ---

/// Compute the display width of the first `n` chars (accounting for double-width CJK).
pub fn display_width(s: &str, n: usize) -> usize {
  s.chars().take(n).map(|c| c.width().unwrap_or(0)).sum()
}

fn line_width(line: &Line) -> usize {
  line.spans.iter().map(|s| UnicodeWidthStr::width(s.content.as_ref())).sum()
}

/// Fold transcript entries into screen rows. An entry with `suppress_newline`
/// leaves its last row open for the next entry.
pub fn transcript_rows<'a>(entries: impl IntoIterator<Item = &'a OutputLine>, theme: &Theme) -> Vec<Line<'static>> {
  let mut rows: Vec<Line<'static>> = Vec::new();
  let mut open: Option<Line<'static>> = None;

  for entry in entries {
    let base = match entry.kind {
      LineKind::Prompt => Style::default().fg(theme.fg),
      LineKind::Output => Style::default().fg(theme.subtext),
      LineKind::Error => Style::default().fg(theme.error),
    };
    let mut rendered = markup::render(&entry.text, entry.markup, base, theme).into_iter();
    let first = rendered.next().unwrap_or_default();
    let first = match open.take() {
      Some(mut row) => {
        row.spans.extend(first.spans);
        row
      }
      None => first,
    };

    let rest: Vec<_> = rendered.collect();
    if rest.is_empty() {
      if entry.suppress_newline {
        open = Some(first);
      } else {
        rows.push(first);
      }
      continue;
    }

    rows.push(first);
    let last_idx = rest.len() - 1;
    for (i, row) in rest.into_iter().enumerate() {
      if i == last_idx && entry.suppress_newline {
        open = Some(row);
      } else {
        rows.push(row);
      }
    }
  }
  rows.extend(open);
  rows
}

/// Colour for a lyric at `opacity`, stepped between the theme's text tones.
fn fade(theme: &Theme, opacity: f64) -> Color {
  if opacity >= 0.67 {
    theme.accent
  } else if opacity >= 0.34 {
    theme.subtext
  } else {
    theme.muted
  }
}

/// Palette for the frame. While `fun` runs the whole screen cycles through
/// every theme, starting from the current one.
fn effect_theme(base: usize, progress: Option<f64>) -> &'static Theme {
  let shift = progress.map_or(0, |p| (p.clamp(0.0, 1.0) * FUN_PALETTE_STEPS as f64) as usize);
  &THEMES[(base + shift) % THEMES.len()]
}

const FUN_PALETTE_STEPS: usize = 12;

/// Lyrics panel title: position of the current line when one is known.
fn lyrics_title(current: Option<usize>, total: usize) -> String {
  match current {
    Some(i) if total > 0 => format!(" ♪ {}/{} ", i + 1, total),
    _ => " ♪ ".to_string(),
  }
}

/// Right side of the footer.
fn playback_label(phase: PlaybackPhase, position: f64, theme: &Theme) -> (String, Color) {
  match phase {
    PlaybackPhase::Playing => (format!("♪ {}  {} ", format_clock(position), theme.name), theme.status),
    PlaybackPhase::Stopped => (format!("■ {}  {} ", format_clock(position), theme.name), theme.muted),
    PlaybackPhase::Ended => (format!("↺ start  {} ", theme.name), theme.muted),
    PlaybackPhase::Idle => (format!("{} ", theme.name), theme.muted),
  }
}

// --- UI Rendering ---

pub fn ui<T: Transport + 'static, A: AudioBackend>(frame: &mut Frame, app: &mut App<T, A>) {
  let now = Instant::now();
  let theme = effect_theme(app.theme_index, app.interpreter.fun_progress(now));

  frame.render_widget(Block::default().style(Style::default().bg(theme.bg)), frame.area());

  let lyrics_h = if app.interpreter.lyrics.surface().is_visible() { 3 } else { 0 };
  let [header_area, transcript_area, lyrics_area, input_area, footer_area] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Min(3),
    Constraint::Length(lyrics_h),
    Constraint::Length(3),
    Constraint::Length(1),
  ])
  .areas(frame.area());

  render_header(frame, theme, header_area);
  render_transcript(frame, theme, app, transcript_area);
  if lyrics_h > 0 {
    let lyrics = &app.interpreter.lyrics;
    let title = lyrics_title(lyrics.current_index(), lyrics.lines().len());
    render_lyrics(frame, theme, &title, lyrics.surface().view(now), lyrics_area);
  }
  render_input(frame, theme, app, input_area);
  render_footer(frame, theme, app, footer_area);
}

fn render_header(frame: &mut Frame, theme: &Theme, area: Rect) {
  let left = Line::from(Span::styled(" ▶ webbash ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)));
  frame.render_widget(left, area);

  let version = format!("v{} ", env!("CARGO_PKG_VERSION"));
  let right = Line::from(Span::styled(&version, Style::default().fg(theme.muted)));
  let right_area =
    Rect { x: area.x + area.width.saturating_sub(version.len() as u16), width: version.len() as u16, ..area };
  frame.render_widget(right, right_area);
}

fn render_transcript<T: Transport + 'static, A: AudioBackend>(
  frame: &mut Frame,
  theme: &Theme,
  app: &mut App<T, A>,
  area: Rect,
) {
  let block = Block::bordered()
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(theme.border))
    .padding(Padding::horizontal(1));
  let inner = block.inner(area);

  let pending = app.interpreter.pending_lines();
  let rows = transcript_rows(app.interpreter.transcript.lines().iter().chain(&pending), theme);

  // Rows after wrapping, so the newest output stays at the bottom.
  let width = (inner.width as usize).max(1);
  let total: usize = rows.iter().map(|r| line_width(r).div_ceil(width).max(1)).sum();
  let max_back = total.saturating_sub(inner.height as usize);
  app.scroll_back = app.scroll_back.min(max_back);
  let offset = (max_back - app.scroll_back).min(u16::MAX as usize) as u16;

  let paragraph = Paragraph::new(rows).wrap(Wrap { trim: false }).scroll((offset, 0)).block(block);
  frame.render_widget(paragraph, area);
}

fn render_lyrics(frame: &mut Frame, theme: &Theme, title: &str, view: Option<LineView>, area: Rect) {
  let block = Block::bordered()
    .title(title)
    .title_style(Style::default().fg(theme.muted))
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(theme.border));

  let line = match view {
    Some(v) if v.opacity > 0.0 => {
      let shown: String = v.text.chars().take(v.revealed).collect();
      Line::from(Span::styled(
        shown,
        Style::default().fg(fade(theme, v.opacity)).add_modifier(Modifier::ITALIC | Modifier::BOLD),
      ))
    }
    _ => Line::from(""),
  };
  frame.render_widget(Paragraph::new(line).alignment(Alignment::Center).block(block), area);
}

fn render_input<T: Transport + 'static, A: AudioBackend>(
  frame: &mut Frame,
  theme: &Theme,
  app: &mut App<T, A>,
  area: Rect,
) {
  let paused = app.interpreter.session.paused;
  let border_color = if paused { theme.border } else { theme.accent };
  let input_block = Block::bordered()
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(border_color))
    .padding(Padding::horizontal(1));

  let user = app.interpreter.username().to_string();
  let prompt = vec![
    Span::styled(user.clone(), Style::default().fg(theme.blue)),
    Span::styled("@", Style::default().fg(theme.fg)),
    Span::styled(user, Style::default().fg(theme.pink)),
    Span::styled(":~$ ", Style::default().fg(theme.fg)),
  ];
  let prompt_w: usize = prompt.iter().map(|s| UnicodeWidthStr::width(s.content.as_ref())).sum();

  let session = &app.interpreter.session;
  let inner_w = (area.width.saturating_sub(4) as usize).saturating_sub(prompt_w).max(1);
  let cursor_col = display_width(&session.input, session.cursor);

  if cursor_col < app.input_scroll {
    app.input_scroll = cursor_col;
  } else if cursor_col >= app.input_scroll + inner_w {
    app.input_scroll = cursor_col.saturating_sub(inner_w) + 1;
  }
  let scroll = app.input_scroll;

  let visible: String = session
    .input
    .chars()
    .scan(0usize, |col, c| {
      let w = c.width().unwrap_or(0);
      let start = *col;
      *col += w;
      Some((start, *col, c))
    })
    .skip_while(|(_, end, _)| *end <= scroll)
    .take_while(|(start, _, _)| *start < scroll + inner_w)
    .map(|(_, _, c)| c)
    .collect();

  let mut spans = prompt;
  spans.push(Span::styled(visible, Style::default().fg(theme.fg)));
  if scroll == 0
    && let Some(suggestion) = session.suggestion(&app.interpreter.table)
  {
    let room = inner_w.saturating_sub(suggestion.offset as usize);
    let tail: String = suggestion.remainder.chars().take(room).collect();
    spans.push(Span::styled(tail, Style::default().fg(theme.muted)));
  }

  frame.render_widget(Paragraph::new(Line::from(spans)).block(input_block), area);

  if !paused {
    let cursor_x = area.x + 2 + (prompt_w + cursor_col - scroll) as u16;
    frame.set_cursor_position((cursor_x, area.y + 1));
  }
}

fn render_footer<T: Transport + 'static, A: AudioBackend>(
  frame: &mut Frame,
  theme: &Theme,
  app: &App<T, A>,
  area: Rect,
) {
  let keys: Vec<(&str, &str)> = if app.interpreter.session.paused {
    vec![("^c", "Quit")]
  } else {
    vec![("Enter", "Run"), ("Tab", "Complete"), ("↑↓", "History"), ("^l", "Clear"), ("^t", "Theme"), ("^c", "Quit")]
  };

  let spans: Vec<Span> = keys
    .iter()
    .enumerate()
    .flat_map(|(i, (key, action))| {
      let mut s = vec![
        Span::styled(format!(" {} ", key), Style::default().fg(theme.key_fg).bg(theme.key_bg)),
        Span::styled(format!(" {} ", action), Style::default().fg(theme.muted)),
      ];
      if i < keys.len() - 1 {
        s.push(Span::raw("  "));
      }
      s
    })
    .collect();

  frame.render_widget(Line::from(spans), area);

  let playback = &app.interpreter.playback;
  let (label, color) = playback_label(playback.state().phase(), playback.position(), theme);
  let label_w = UnicodeWidthStr::width(label.as_str()) as u16;
  let right = Line::from(Span::styled(label, Style::default().fg(color)));
  let right_area = Rect { x: area.x + area.width.saturating_sub(label_w), width: label_w.min(area.width), ..area };
  frame.render_widget(right, right_area);
}

#[cfg(test)]
mod tests {
  use super::*;

  fn texts(rows: &[Line]) -> Vec<String> {
    rows.iter().map(|r| r.spans.iter().map(|s| s.content.as_ref()).collect()).collect()
  }

  #[test]
  fn display_width_cjk() {
    assert_eq!(display_width("a日b", 2), 3);
    assert_eq!(display_width("abc", 10), 3);
  }

  #[test]
  fn inline_entries_share_a_row() {
    let entries =
      [OutputLine::output("a"), OutputLine::prompt("Please wait").inline(), OutputLine::output("1.2.3.4")];
    let rows = transcript_rows(entries.iter(), &THEMES[0]);
    assert_eq!(texts(&rows), vec!["a", "Please wait1.2.3.4"]);
  }

  #[test]
  fn trailing_inline_entry_is_still_drawn() {
    let entries = [OutputLine::output("x"), OutputLine::prompt("Please wait..").inline()];
    let rows = transcript_rows(entries.iter(), &THEMES[0]);
    assert_eq!(texts(&rows), vec!["x", "Please wait.."]);
  }

  #[test]
  fn multiline_markup_expands_to_rows() {
    let entries = [OutputLine::markup("<b>one</b>\ntwo"), OutputLine::error("bad")];
    let rows = transcript_rows(entries.iter(), &THEMES[0]);
    assert_eq!(texts(&rows), vec!["one", "two", "bad"]);
    assert_eq!(rows[2].spans[0].style.fg, Some(THEMES[0].error));
  }

  #[test]
  fn fade_steps_down_with_opacity() {
    let theme = &THEMES[0];
    assert_eq!(fade(theme, 1.0), theme.accent);
    assert_eq!(fade(theme, 0.5), theme.subtext);
    assert_eq!(fade(theme, 0.1), theme.muted);
  }

  #[test]
  fn effect_theme_cycles_only_while_running() {
    assert_eq!(effect_theme(2, None).name, THEMES[2].name);
    assert_eq!(effect_theme(2, Some(0.0)).name, THEMES[2].name);

    let names: Vec<_> = (0..12).map(|step| effect_theme(0, Some(step as f64 / 12.0)).name).collect();
    assert_eq!(names[..5], [THEMES[0].name, THEMES[1].name, THEMES[2].name, THEMES[3].name, THEMES[0].name]);
  }

  #[test]
  fn lyrics_title_counts_from_one() {
    assert_eq!(lyrics_title(Some(0), 14), " ♪ 1/14 ");
    assert_eq!(lyrics_title(None, 14), " ♪ ");
    assert_eq!(lyrics_title(Some(0), 0), " ♪ ");
  }

  #[test]
  fn footer_label_follows_playback_phase() {
    let theme = &THEMES[0];
    let (playing, color) = playback_label(PlaybackPhase::Playing, 65.0, theme);
    assert!(playing.starts_with("♪ 01:05"), "{playing}");
    assert_eq!(color, theme.status);
    assert_eq!(playback_label(PlaybackPhase::Idle, 0.0, theme).0, format!("{} ", theme.name));
    assert!(playback_label(PlaybackPhase::Ended, 0.0, theme).0.starts_with("↺ start"));
  }
}
