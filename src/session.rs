//! Input line, history, inline suggestion and the transcript.

use unicode_width::UnicodeWidthStr;

use crate::commands::{CommandTable, OutputLine};

// --- Helpers ---

/// Convert a char index to a byte offset within the string.
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
  s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}

/// Dimmed completion drawn after the typed command name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
  /// Characters still missing from the command name.
  pub remainder: String,
  /// Display column (from the start of the input) where `remainder` begins.
  pub offset: u16,
}

// --- Session ---

#[derive(Debug, Default)]
pub struct Session {
  pub input: String,
  /// Caret position as a char index into `input`.
  pub cursor: usize,
  history: Vec<String>,
  /// `None` means "past the newest entry".
  history_cursor: Option<usize>,
  /// Set while an effect owns the terminal; keys are ignored.
  pub paused: bool,
}

impl Session {
  pub fn new() -> Self {
    Self::default()
  }

  #[cfg(test)]
  pub fn history(&self) -> &[String] {
    &self.history
  }

  fn len(&self) -> usize {
    self.input.chars().count()
  }

  pub fn caret_at_end(&self) -> bool {
    self.cursor == self.len()
  }

  pub fn set_input(&mut self, text: impl Into<String>) {
    self.input = text.into();
    self.cursor = self.len();
  }

  pub fn clear_input(&mut self) {
    self.input.clear();
    self.cursor = 0;
  }

  pub fn insert_char(&mut self, c: char) {
    let byte_idx = char_to_byte_index(&self.input, self.cursor);
    self.input.insert(byte_idx, c);
    self.cursor += 1;
  }

  pub fn backspace(&mut self) {
    if self.cursor > 0 {
      self.cursor -= 1;
      let byte_idx = char_to_byte_index(&self.input, self.cursor);
      self.input.remove(byte_idx);
    }
  }

  pub fn delete(&mut self) {
    if self.cursor < self.len() {
      let byte_idx = char_to_byte_index(&self.input, self.cursor);
      self.input.remove(byte_idx);
    }
  }

  pub fn move_left(&mut self) {
    self.cursor = self.cursor.saturating_sub(1);
  }

  pub fn move_right(&mut self) {
    if self.cursor < self.len() {
      self.cursor += 1;
    }
  }

  pub fn move_home(&mut self) {
    self.cursor = 0;
  }

  pub fn move_end(&mut self) {
    self.cursor = self.len();
  }

  /// Take the trimmed input for execution. Blank input is left untouched and
  /// yields `None`; anything else is recorded in history and the line cleared.
  pub fn take_submission(&mut self) -> Option<String> {
    let command = self.input.trim().to_string();
    if command.is_empty() {
      return None;
    }
    self.clear_input();
    self.history.push(command.clone());
    self.history_cursor = None;
    Some(command)
  }

  /// Step back through history; stays on the oldest entry.
  pub fn history_up(&mut self) {
    let target = match self.history_cursor {
      None if self.history.is_empty() => return,
      None => self.history.len() - 1,
      Some(0) => return,
      Some(i) => i - 1,
    };
    self.history_cursor = Some(target);
    self.set_input(self.history[target].clone());
  }

  /// Step forward; moving past the newest entry clears the line.
  pub fn history_down(&mut self) {
    match self.history_cursor {
      None => {}
      Some(i) if i + 1 < self.history.len() => {
        self.history_cursor = Some(i + 1);
        self.set_input(self.history[i + 1].clone());
      }
      Some(_) => {
        self.history_cursor = None;
        self.clear_input();
      }
    }
  }

  /// Completion for the first token, if the caret is at the end, nothing
  /// past the token has been typed, and the token is a strict prefix of a
  /// command name.
  pub fn suggestion(&self, table: &CommandTable) -> Option<Suggestion> {
    if self.paused || !self.caret_at_end() {
      return None;
    }
    let leading = self.input.len() - self.input.trim_start_matches(' ').len();
    let token = &self.input[leading..];
    if token.is_empty() || token.contains(char::is_whitespace) {
      return None;
    }
    let lower = token.to_lowercase();
    let entry = table.find_by_prefix(&lower)?;
    if entry.name == lower {
      return None;
    }
    let offset = UnicodeWidthStr::width(&self.input[..leading]) + UnicodeWidthStr::width(token);
    Some(Suggestion { remainder: entry.name[lower.len()..].to_string(), offset: offset as u16 })
  }

  /// Replace the input with the suggested command. Returns whether it did.
  pub fn accept_suggestion(&mut self, table: &CommandTable) -> bool {
    if self.suggestion(table).is_none() {
      return false;
    }
    let lower = self.input.trim_start().to_lowercase();
    match table.find_by_prefix(&lower) {
      Some(entry) => {
        self.set_input(entry.name);
        true
      }
      None => false,
    }
  }
}

// --- Transcript ---

/// Append-only output log; only `clear` removes lines.
#[derive(Debug, Default)]
pub struct Transcript {
  lines: Vec<OutputLine>,
}

impl Transcript {
  pub fn push(&mut self, line: OutputLine) {
    self.lines.push(line);
  }

  pub fn extend(&mut self, lines: impl IntoIterator<Item = OutputLine>) {
    self.lines.extend(lines);
  }

  pub fn clear(&mut self) {
    self.lines.clear();
  }

  pub fn lines(&self) -> &[OutputLine] {
    &self.lines
  }

  #[cfg(test)]
  pub fn len(&self) -> usize {
    self.lines.len()
  }

  #[cfg(test)]
  pub fn is_empty(&self) -> bool {
    self.lines.is_empty()
  }
}
