use std::time::Instant;

use ratatui::crossterm::event::{self, KeyCode, KeyModifiers};

use crate::app::App;
use crate::audio::AudioBackend;
use crate::remote::Transport;

const PAGE_ROWS: usize = 10;

// --- Event Handling ---

pub async fn handle_key_event<T: Transport + 'static, A: AudioBackend>(app: &mut App<T, A>, key: event::KeyEvent) {
  app.note_interaction().await;

  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
    app.should_quit = true;
    return;
  }

  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('t') {
    app.next_theme();
    return;
  }

  if app.interpreter.session.paused {
    return;
  }

  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('l') {
    app.interpreter.clear_screen();
    app.scroll_back = 0;
    return;
  }

  let session = &mut app.interpreter.session;
  match key.code {
    KeyCode::Enter => {
      app.interpreter.submit(Instant::now()).await;
      app.scroll_back = 0;
      app.input_scroll = 0;
    }
    KeyCode::Up => session.history_up(),
    KeyCode::Down => session.history_down(),
    KeyCode::Right | KeyCode::Tab => {
      if !session.accept_suggestion(&app.interpreter.table) {
        session.move_right();
      }
    }
    KeyCode::Left => session.move_left(),
    KeyCode::Home => session.move_home(),
    KeyCode::End => session.move_end(),
    KeyCode::Backspace => session.backspace(),
    KeyCode::Delete => session.delete(),
    KeyCode::Esc => {
      session.clear_input();
      app.input_scroll = 0;
    }
    KeyCode::PageUp => app.scroll_up(PAGE_ROWS),
    KeyCode::PageDown => app.scroll_down(PAGE_ROWS),
    KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => session.insert_char(c),
    _ => {}
  }
}
