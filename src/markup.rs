//! Minimal inline markup for transcript lines.
//!
//! Supported tags: `<green> <blue> <red> <pink> <dim> <b> <i> <u>`, each
//! closed by its `</name>`. Text between tags may use the entities produced
//! by [`escape_markup`](crate::codec::escape_markup). Anything else that
//! looks like a tag is shown literally.

use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};

use crate::codec::unescape_markup;
use crate::theme::Theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
  Green,
  Blue,
  Red,
  Pink,
  Dim,
  Bold,
  Italic,
  Underline,
}

impl Tag {
  fn from_name(name: &str) -> Option<Self> {
    Some(match name {
      "green" => Tag::Green,
      "blue" => Tag::Blue,
      "red" => Tag::Red,
      "pink" => Tag::Pink,
      "dim" => Tag::Dim,
      "b" => Tag::Bold,
      "i" => Tag::Italic,
      "u" => Tag::Underline,
      _ => return None,
    })
  }

  fn apply(self, style: Style, theme: &Theme) -> Style {
    match self {
      Tag::Green => style.fg(theme.green),
      Tag::Blue => style.fg(theme.blue),
      Tag::Red => style.fg(theme.red),
      Tag::Pink => style.fg(theme.pink),
      Tag::Dim => style.fg(theme.muted),
      Tag::Bold => style.add_modifier(Modifier::BOLD),
      Tag::Italic => style.add_modifier(Modifier::ITALIC),
      Tag::Underline => style.add_modifier(Modifier::UNDERLINED),
    }
  }
}

#[derive(Debug, PartialEq)]
enum Token<'a> {
  Text(&'a str),
  Open(Tag),
  Close(Tag),
  Newline,
}

fn tokenize<'a>(text: &'a str) -> Vec<Token<'a>> {
  let mut tokens = Vec::new();
  let mut rest = text;
  let mut literal_start = 0usize;
  let mut pos = 0usize;

  let flush = |tokens: &mut Vec<Token<'a>>, from: usize, to: usize| {
    if to > from {
      tokens.push(Token::Text(&text[from..to]));
    }
  };

  while let Some(c) = rest.chars().next() {
    match c {
      '\n' => {
        flush(&mut tokens, literal_start, pos);
        tokens.push(Token::Newline);
        literal_start = pos + 1;
      }
      '<' => {
        if let Some(end) = rest.find('>') {
          let inner = &rest[1..end];
          let (closing, name) = match inner.strip_prefix('/') {
            Some(name) => (true, name),
            None => (false, inner),
          };
          if let Some(tag) = Tag::from_name(name) {
            flush(&mut tokens, literal_start, pos);
            tokens.push(if closing { Token::Close(tag) } else { Token::Open(tag) });
            pos += end + 1;
            rest = &rest[end + 1..];
            literal_start = pos;
            continue;
          }
        }
      }
      _ => {}
    }
    pos += c.len_utf8();
    rest = &rest[c.len_utf8()..];
  }
  flush(&mut tokens, literal_start, pos);
  tokens
}

/// Render `text` as styled lines. Plain text is only split on newlines.
pub fn render(text: &str, markup: bool, base: Style, theme: &Theme) -> Vec<Line<'static>> {
  if !markup {
    return text.split('\n').map(|l| Line::from(Span::styled(l.to_string(), base))).collect();
  }

  let mut lines = Vec::new();
  let mut spans: Vec<Span<'static>> = Vec::new();
  let mut stack: Vec<Tag> = Vec::new();

  for token in tokenize(text) {
    match token {
      Token::Text(t) => {
        let style = stack.iter().fold(base, |s, tag| tag.apply(s, theme));
        spans.push(Span::styled(unescape_markup(t), style));
      }
      Token::Open(tag) => stack.push(tag),
      Token::Close(tag) => {
        if let Some(i) = stack.iter().rposition(|t| *t == tag) {
          stack.remove(i);
        }
      }
      Token::Newline => lines.push(Line::from(std::mem::take(&mut spans))),
    }
  }
  lines.push(Line::from(spans));
  lines
}

/// Plain text of a markup string (tags dropped, entities decoded).
#[cfg(test)]
pub fn plain_text(text: &str) -> String {
  tokenize(text)
    .into_iter()
    .map(|t| match t {
      Token::Text(s) => unescape_markup(s),
      Token::Newline => "\n".to_string(),
      _ => String::new(),
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::theme::THEMES;

  fn one_line(text: &str) -> Line<'static> {
    let mut lines = render(text, true, Style::default(), &THEMES[0]);
    assert_eq!(lines.len(), 1);
    lines.remove(0)
  }

  #[test]
  fn tokenizes_known_tags_only() {
    assert_eq!(
      tokenize("a<b>x</b><span>"),
      vec![Token::Text("a"), Token::Open(Tag::Bold), Token::Text("x"), Token::Close(Tag::Bold), Token::Text("<span>")]
    );
  }

  #[test]
  fn nested_styles_accumulate() {
    let line = one_line("<b>bold <green>both</green></b> plain");
    let theme = &THEMES[0];
    assert_eq!(line.spans.len(), 3);
    assert!(line.spans[0].style.add_modifier.contains(Modifier::BOLD));
    assert_eq!(line.spans[1].style.fg, Some(theme.green));
    assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
    assert_eq!(line.spans[2].style, Style::default());
  }

  #[test]
  fn entities_are_decoded_after_parsing() {
    let line = one_line("<green>&lt;b&gt; &amp; co</green>");
    assert_eq!(line.spans[0].content, "<b> & co");
  }

  #[test]
  fn stray_close_is_ignored() {
    let line = one_line("x</u>y");
    let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
    assert_eq!(text, "xy");
  }

  #[test]
  fn unclosed_angle_is_literal() {
    assert_eq!(plain_text("1 < 2"), "1 < 2");
  }

  #[test]
  fn newlines_split_lines_and_keep_style() {
    let lines = render("<red>a\nb</red>", true, Style::default(), &THEMES[0]);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1].spans[0].style.fg, Some(THEMES[0].red));
  }

  #[test]
  fn plain_mode_is_verbatim() {
    let lines = render("<b>x</b>\ny", false, Style::default(), &THEMES[0]);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].spans[0].content, "<b>x</b>");
  }

  #[test]
  fn plain_text_strips_tags() {
    assert_eq!(plain_text("<blue>reina</blue>@x:~$ <green>echo &lt;hi&gt;</green>"), "reina@x:~$ echo <hi>");
  }
}
