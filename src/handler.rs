use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use crate::app::{App, InputMode, Screen};
use crate::tui::AppEvent;

const MOUSE_SCROLL_LINES: u16 = 3;

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => app.sync_scroll(),
        AppEvent::Tick => app.tick_animation(),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.screen {
        Screen::Landing => handle_landing(app, key),
        Screen::Chat => match app.input_mode {
            InputMode::Normal => handle_chat_normal(app, key),
            InputMode::Editing => handle_chat_editing(app, key),
        },
    }
}

fn handle_landing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter | KeyCode::Char('c') | KeyCode::Char(' ') => app.open_chat(),
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
        _ => {}
    }
}

fn handle_chat_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.leave_chat(),

        KeyCode::Char('i') | KeyCode::Tab | KeyCode::Enter => {
            app.input_mode = InputMode::Editing;
            app.chat.cursor_end();
        }

        KeyCode::Char('r') => app.reprocess(),

        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_down((app.chat_height / 2).max(1));
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_up((app.chat_height / 2).max(1));
        }
        KeyCode::PageDown => app.scroll_down(app.chat_height.max(1)),
        KeyCode::PageUp => app.scroll_up(app.chat_height.max(1)),
        KeyCode::Char('g') | KeyCode::Home => app.scroll_to_top(),
        KeyCode::Char('G') | KeyCode::End => app.scroll_to_bottom(),

        _ => {}
    }
}

fn handle_chat_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        // Shift+Enter is kept free for multi-line input
        KeyCode::Enter if key.modifiers.contains(KeyModifiers::SHIFT) => {}
        KeyCode::Enter => app.submit(),
        KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => app.reprocess(),
        KeyCode::Backspace => app.chat.backspace(),
        KeyCode::Delete => app.chat.delete(),
        KeyCode::Left => app.chat.cursor_left(),
        KeyCode::Right => app.chat.cursor_right(),
        KeyCode::Home => app.chat.cursor_home(),
        KeyCode::End => app.chat.cursor_end(),
        KeyCode::PageUp => app.scroll_up(app.chat_height.max(1)),
        KeyCode::PageDown => app.scroll_down(app.chat_height.max(1)),
        KeyCode::Char(c)
            if !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            app.chat.insert_char(c);
        }
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    if app.screen != Screen::Chat {
        return;
    }
    match mouse.kind {
        MouseEventKind::ScrollUp => app.scroll_up(MOUSE_SCROLL_LINES),
        MouseEventKind::ScrollDown => app.scroll_down(MOUSE_SCROLL_LINES),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::tests::FakeBackend;
    use crossterm::event::{KeyEventKind, KeyEventState};
    use std::sync::Arc;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> AppEvent {
        AppEvent::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn press(app: &mut App, code: KeyCode) {
        handle_event(app, key(code, KeyModifiers::NONE)).unwrap();
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn chat_app() -> App {
        let mut app = App::new(Arc::new(FakeBackend::replying("ok")), "http://localhost:8000");
        press(&mut app, KeyCode::Enter);
        app
    }

    #[test]
    fn test_landing_enter_opens_chat_with_focus() {
        let app = chat_app();
        assert_eq!(app.screen, Screen::Chat);
        assert_eq!(app.input_mode, InputMode::Editing);
    }

    #[test]
    fn test_landing_q_quits() {
        let mut app = App::new(Arc::new(FakeBackend::replying("")), "http://localhost:8000");
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);
    }

    #[test]
    fn test_ctrl_c_quits_from_chat() {
        let mut app = chat_app();
        handle_event(&mut app, key(KeyCode::Char('c'), KeyModifiers::CONTROL)).unwrap();
        assert!(app.should_quit);
        assert_eq!(app.chat.input(), "");
    }

    #[tokio::test]
    async fn test_enter_submits() {
        let mut app = chat_app();
        type_text(&mut app, "hello");
        press(&mut app, KeyCode::Enter);
        assert!(app.chat.is_loading());
        assert!(app.has_pending_tasks());
    }

    #[tokio::test]
    async fn test_shift_enter_does_not_submit() {
        let mut app = chat_app();
        type_text(&mut app, "hello");
        handle_event(&mut app, key(KeyCode::Enter, KeyModifiers::SHIFT)).unwrap();
        assert!(!app.chat.is_loading());
        assert!(!app.has_pending_tasks());
        assert_eq!(app.chat.input(), "hello");
    }

    #[tokio::test]
    async fn test_typing_ignored_while_sending() {
        let mut app = chat_app();
        type_text(&mut app, "hi");
        press(&mut app, KeyCode::Enter);
        type_text(&mut app, "more");
        press(&mut app, KeyCode::Backspace);
        assert_eq!(app.chat.input(), "hi");
    }

    #[tokio::test]
    async fn test_reprocess_keys() {
        let mut app = chat_app();
        handle_event(&mut app, key(KeyCode::Char('r'), KeyModifiers::CONTROL)).unwrap();
        assert!(app.chat.is_reprocessing());
        assert_eq!(app.chat.input(), "");

        let mut app = chat_app();
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.input_mode, InputMode::Normal);
        press(&mut app, KeyCode::Char('r'));
        assert!(app.chat.is_reprocessing());
    }

    #[test]
    fn test_plain_r_is_typed_while_editing() {
        let mut app = chat_app();
        press(&mut app, KeyCode::Char('r'));
        assert_eq!(app.chat.input(), "r");
        assert!(!app.chat.is_reprocessing());
    }

    #[test]
    fn test_escape_twice_returns_to_landing() {
        let mut app = chat_app();
        press(&mut app, KeyCode::Esc);
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.screen, Screen::Landing);
        assert!(!app.should_quit);
    }

    #[test]
    fn test_cursor_keys_edit_in_place() {
        let mut app = chat_app();
        type_text(&mut app, "fes");
        press(&mut app, KeyCode::Left);
        press(&mut app, KeyCode::Left);
        type_text(&mut app, "e");
        press(&mut app, KeyCode::End);
        type_text(&mut app, "?");
        assert_eq!(app.chat.input(), "fees?");
    }
}
