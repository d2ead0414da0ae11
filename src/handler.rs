use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};

use crate::api::ChatApi;
use crate::app::App;
use crate::tui::AppEvent;
use crate::widget::ChatView;

const WHEEL_LINES: u16 = 3;

pub fn handle_event<A: ChatApi + 'static>(app: &mut App<A>, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => handle_paste(app, &text),
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick_animation(),
    }
}

fn handle_key<A: ChatApi + 'static>(app: &mut App<A>, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    // Global keys that work in any mode
    if ctrl && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q')) {
        app.should_quit = true;
        return;
    }

    if app.confirm_clear {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => app.answer_clear(true),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.answer_clear(false),
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Char('l') if ctrl => app.request_clear(),
        KeyCode::F(5) => app.start_probe(),
        KeyCode::Esc => app.view_mut().focus_input(),

        // Transcript scrolling
        KeyCode::PageUp => app.scroll_up(app.page()),
        KeyCode::PageDown => app.scroll_down(app.page()),
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),

        // Input editing
        KeyCode::Enter => app.submit(),
        KeyCode::Backspace => app.view_mut().backspace(),
        KeyCode::Delete => app.view_mut().delete(),
        KeyCode::Left => app.view_mut().cursor_left(),
        KeyCode::Right => app.view_mut().cursor_right(),
        KeyCode::Home => app.view_mut().cursor_home(),
        KeyCode::End => app.view_mut().cursor_end(),
        KeyCode::Char(c) if !ctrl => {
            let view = app.view_mut();
            view.focus_input();
            view.insert_char(c);
        }
        _ => {}
    }
}

fn handle_paste<A: ChatApi + 'static>(app: &mut App<A>, text: &str) {
    if app.confirm_clear {
        return;
    }
    let view = app.view_mut();
    // The input box is a single line.
    for c in text.chars().map(|c| if c == '\n' || c == '\r' { ' ' } else { c }) {
        view.insert_char(c);
    }
}

fn handle_mouse<A: ChatApi + 'static>(app: &mut App<A>, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(WHEEL_LINES),
        MouseEventKind::ScrollUp => app.scroll_up(WHEEL_LINES),
        _ => {}
    }
}
