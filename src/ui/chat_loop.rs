//! Interactive event loop.
//!
//! Owns the terminal for the lifetime of the session: alternate screen and
//! raw mode on entry, restored on exit. Input is dispatched through an
//! explicit key binding table; replies arrive over the outcome channel and
//! are drained between input events, so a finished request always unblocks
//! the editor regardless of how it ended.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{
        self, DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste,
        EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout},
    text::Span,
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tui_textarea::TextArea;

use crate::core::session::{ChatSession, Outcome};
use crate::ui::render::{build_display_lines, input_area_height, max_scroll_offset};
use crate::ui::theme::Theme;
use crate::utils::input::sanitize_paste;

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const CHAT_TITLE: &str = "Chat - palaver";
const IDLE_INPUT_TITLE: &str = "Message (Enter sends, Shift+Enter for a new line)";
const PENDING_INPUT_TITLE: &str = "Waiting for reply\u{2026}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    Submit,
    InsertNewline,
    ScrollUp,
    ScrollDown,
    Quit,
    /// Anything unbound goes to the editor.
    Edit,
}

/// Pattern for matching key events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPattern {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyPattern {
    pub fn simple(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::NONE,
        }
    }

    pub fn ctrl(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::CONTROL,
        }
    }

    pub fn with_modifiers(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    pub fn matches(&self, key: &KeyEvent) -> bool {
        self.code == key.code && self.modifiers == key.modifiers
    }
}

/// The binding table, registered once at startup. First match wins.
/// Alt+Enter duplicates Shift+Enter because some terminals do not report
/// the Shift modifier together with Enter.
pub fn default_bindings() -> Vec<(KeyPattern, InputAction)> {
    vec![
        (
            KeyPattern::ctrl(KeyCode::Char('c')),
            InputAction::Quit,
        ),
        (
            KeyPattern::with_modifiers(KeyCode::Enter, KeyModifiers::SHIFT),
            InputAction::InsertNewline,
        ),
        (
            KeyPattern::with_modifiers(KeyCode::Enter, KeyModifiers::ALT),
            InputAction::InsertNewline,
        ),
        (KeyPattern::simple(KeyCode::Enter), InputAction::Submit),
        (KeyPattern::simple(KeyCode::Up), InputAction::ScrollUp),
        (KeyPattern::simple(KeyCode::Down), InputAction::ScrollDown),
    ]
}

pub fn action_for(bindings: &[(KeyPattern, InputAction)], key: &KeyEvent) -> InputAction {
    bindings
        .iter()
        .find(|(pattern, _)| pattern.matches(key))
        .map(|(_, action)| *action)
        .unwrap_or(InputAction::Edit)
}

struct ChatUi {
    textarea: TextArea<'static>,
    scroll_offset: u16,
    auto_scroll: bool,
    markdown: bool,
    theme: Theme,
}

impl ChatUi {
    fn new(markdown: bool, theme: Theme) -> Self {
        Self {
            textarea: fresh_textarea(&theme),
            scroll_offset: 0,
            auto_scroll: true,
            markdown,
            theme,
        }
    }

    fn reset_input(&mut self) {
        self.textarea = fresh_textarea(&self.theme);
    }

    fn input_text(&self) -> String {
        self.textarea.lines().join("\n")
    }

    fn scroll_up(&mut self, lines: u16) {
        self.auto_scroll = false;
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    fn scroll_down(&mut self, lines: u16) {
        // Clamped against the real maximum at draw time; hitting the bottom
        // re-engages auto-scroll there.
        self.scroll_offset = self.scroll_offset.saturating_add(lines);
    }
}

fn fresh_textarea(theme: &Theme) -> TextArea<'static> {
    let mut textarea = TextArea::default();
    textarea.set_style(theme.input_text_style);
    textarea.set_cursor_style(theme.input_cursor_style);
    textarea.set_cursor_line_style(theme.input_text_style);
    textarea
}

/// Run the interactive session until the user quits.
pub async fn run(
    mut session: ChatSession,
    mut outcomes: mpsc::UnboundedReceiver<Outcome>,
    markdown: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableBracketedPaste
    )?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut ui = ChatUi::new(markdown, Theme::dark_default());
    let result = event_loop(&mut terminal, &mut session, &mut outcomes, &mut ui);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableBracketedPaste
    )?;
    terminal.show_cursor()?;
    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    session: &mut ChatSession,
    outcomes: &mut mpsc::UnboundedReceiver<Outcome>,
    ui: &mut ChatUi,
) -> Result<(), Box<dyn std::error::Error>> {
    let bindings = default_bindings();

    loop {
        // Drain finished requests first so the editor is re-enabled before
        // the next frame is drawn.
        while let Ok(outcome) = outcomes.try_recv() {
            session.finish(outcome);
            ui.auto_scroll = true;
        }

        terminal.draw(|f| draw(f, session, ui))?;

        if !event::poll(POLL_INTERVAL)? {
            continue;
        }

        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                match action_for(&bindings, &key) {
                    InputAction::Quit => break,
                    InputAction::Submit => submit(session, ui),
                    InputAction::InsertNewline => {
                        if !session.is_pending() {
                            ui.textarea.insert_newline();
                        }
                    }
                    InputAction::ScrollUp => ui.scroll_up(1),
                    InputAction::ScrollDown => ui.scroll_down(1),
                    InputAction::Edit => {
                        if !session.is_pending() {
                            ui.textarea.input(key);
                        }
                    }
                }
            }
            Event::Paste(text) => {
                if !session.is_pending() {
                    ui.textarea.insert_str(&sanitize_paste(&text));
                }
            }
            Event::Mouse(mouse) => match mouse.kind {
                MouseEventKind::ScrollUp => ui.scroll_up(3),
                MouseEventKind::ScrollDown => ui.scroll_down(3),
                _ => {}
            },
            _ => {}
        }
    }

    Ok(())
}

fn submit(session: &mut ChatSession, ui: &mut ChatUi) {
    if session.submit(&ui.input_text()) {
        ui.reset_input();
        ui.auto_scroll = true;
    }
}

fn draw(f: &mut Frame, session: &ChatSession, ui: &mut ChatUi) {
    let frame = f.area();
    let input_height = input_area_height(ui.textarea.lines().len() as u16, frame.height);
    let chunks =
        Layout::vertical([Constraint::Min(1), Constraint::Length(input_height)]).split(frame);

    let lines = build_display_lines(
        session.messages(),
        session.is_pending(),
        ui.markdown,
        &ui.theme,
    );
    let viewport = chunks[0].height.saturating_sub(1);
    let max_offset = max_scroll_offset(lines.len() as u16, viewport);
    if ui.auto_scroll {
        ui.scroll_offset = max_offset;
    } else {
        ui.scroll_offset = ui.scroll_offset.min(max_offset);
        if ui.scroll_offset == max_offset {
            ui.auto_scroll = true;
        }
    }

    let chat = Paragraph::new(lines)
        .block(Block::default().title(Span::styled(CHAT_TITLE, ui.theme.title_style)))
        .wrap(Wrap { trim: false })
        .scroll((ui.scroll_offset, 0));
    f.render_widget(chat, chunks[0]);

    let (title, border_style) = if session.is_pending() {
        (PENDING_INPUT_TITLE, ui.theme.pending_style)
    } else {
        (IDLE_INPUT_TITLE, ui.theme.input_border_style)
    };
    ui.textarea.set_block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(Span::styled(title, ui.theme.input_title_style)),
    );
    f.render_widget(&ui.textarea, chunks[1]);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn enter_submits_and_shifted_enter_inserts_newline() {
        let bindings = default_bindings();
        assert_eq!(
            action_for(&bindings, &key(KeyCode::Enter, KeyModifiers::NONE)),
            InputAction::Submit
        );
        assert_eq!(
            action_for(&bindings, &key(KeyCode::Enter, KeyModifiers::SHIFT)),
            InputAction::InsertNewline
        );
        assert_eq!(
            action_for(&bindings, &key(KeyCode::Enter, KeyModifiers::ALT)),
            InputAction::InsertNewline
        );
    }

    #[test]
    fn unbound_keys_go_to_the_editor() {
        let bindings = default_bindings();
        assert_eq!(
            action_for(&bindings, &key(KeyCode::Char('a'), KeyModifiers::NONE)),
            InputAction::Edit
        );
        assert_eq!(
            action_for(&bindings, &key(KeyCode::Char('A'), KeyModifiers::SHIFT)),
            InputAction::Edit
        );
        assert_eq!(
            action_for(&bindings, &key(KeyCode::Backspace, KeyModifiers::NONE)),
            InputAction::Edit
        );
    }

    #[test]
    fn control_c_quits_and_arrows_scroll() {
        let bindings = default_bindings();
        assert_eq!(
            action_for(&bindings, &key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            InputAction::Quit
        );
        assert_eq!(
            action_for(&bindings, &key(KeyCode::Up, KeyModifiers::NONE)),
            InputAction::ScrollUp
        );
        assert_eq!(
            action_for(&bindings, &key(KeyCode::Down, KeyModifiers::NONE)),
            InputAction::ScrollDown
        );
    }

    #[test]
    fn editor_text_round_trips_and_resets() {
        let mut ui = ChatUi::new(true, Theme::dark_default());
        ui.textarea.insert_str("hello");
        ui.textarea.insert_newline();
        ui.textarea.insert_str("world");
        assert_eq!(ui.input_text(), "hello\nworld");
        assert_eq!(ui.textarea.lines().len(), 2);

        ui.reset_input();
        assert_eq!(ui.input_text(), "");
        assert_eq!(ui.textarea.lines().len(), 1);
    }

    #[test]
    fn manual_scrolling_disengages_auto_scroll() {
        let mut ui = ChatUi::new(true, Theme::dark_default());
        ui.scroll_offset = 10;
        ui.scroll_up(3);
        assert!(!ui.auto_scroll);
        assert_eq!(ui.scroll_offset, 7);

        ui.scroll_down(2);
        assert_eq!(ui.scroll_offset, 9);
    }
}
