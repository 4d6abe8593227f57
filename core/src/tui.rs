/// Terminal front-end drawn from a [`ViewState`]
use crate::history::HistorySource;
use crate::session::ChatSession;
use crate::types::Direction;
use crate::view::ViewState;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Alignment, Constraint, Direction as Axis, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

const SIDEBAR_WIDTH: u16 = 32;
const PAGE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Contacts,
    Composer,
}

/// Front-end-only state: focus and the contact cursor
#[derive(Debug, Clone)]
pub struct TuiState {
    pub focus: Focus,
    pub cursor: usize,
}

impl Default for TuiState {
    fn default() -> Self {
        Self {
            focus: Focus::Contacts,
            cursor: 0,
        }
    }
}

impl TuiState {
    /// Initial state for a view: composer focus when the sidebar starts hidden
    pub fn for_view(view: &ViewState) -> Self {
        let focus = if view.sidebar_toggle && !view.sidebar_visible {
            Focus::Composer
        } else {
            Focus::Contacts
        };
        Self { focus, cursor: 0 }
    }
}

/// Runs a terminal restore closure when dropped, including on early returns
pub struct RestoreOnDrop<F: FnOnce()> {
    restore: Option<F>,
}

impl<F: FnOnce()> RestoreOnDrop<F> {
    pub fn new(restore: F) -> Self {
        Self {
            restore: Some(restore),
        }
    }
}

impl<F: FnOnce()> Drop for RestoreOnDrop<F> {
    fn drop(&mut self) {
        if let Some(restore) = self.restore.take() {
            restore();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Apply one key press to the session
pub fn handle_key<H: HistorySource>(
    session: &mut ChatSession<ViewState, H>,
    ui: &mut TuiState,
    key: KeyEvent,
) -> Flow {
    if key.kind != KeyEventKind::Press {
        return Flow::Continue;
    }
    if key.code == KeyCode::Esc
        || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
    {
        return Flow::Quit;
    }

    match key.code {
        KeyCode::F(2) => {
            if session.view().sidebar_toggle {
                session.toggle_sidebar();
                ui.focus = if session.view().sidebar_visible {
                    Focus::Contacts
                } else {
                    Focus::Composer
                };
            }
        }
        KeyCode::Tab => {
            ui.focus = match ui.focus {
                Focus::Contacts => Focus::Composer,
                Focus::Composer if session.view().sidebar_visible => Focus::Contacts,
                Focus::Composer => Focus::Composer,
            };
        }
        KeyCode::PageUp => session.view_mut().scroll_up(PAGE),
        KeyCode::PageDown => session.view_mut().scroll_down(PAGE),
        _ => match ui.focus {
            Focus::Contacts => handle_contacts_key(session, ui, key.code),
            Focus::Composer => handle_composer_key(session, key.code),
        },
    }
    Flow::Continue
}

fn handle_contacts_key<H: HistorySource>(
    session: &mut ChatSession<ViewState, H>,
    ui: &mut TuiState,
    code: KeyCode,
) {
    let count = session.view().contacts.len();
    match code {
        KeyCode::Up => ui.cursor = ui.cursor.saturating_sub(1),
        KeyCode::Down if count > 0 => ui.cursor = (ui.cursor + 1).min(count - 1),
        KeyCode::Enter => {
            if session.select_at(ui.cursor) {
                ui.focus = Focus::Composer;
            }
        }
        _ => {}
    }
}

fn handle_composer_key<H: HistorySource>(
    session: &mut ChatSession<ViewState, H>,
    code: KeyCode,
) {
    if !session.view().composer_enabled {
        return;
    }
    match code {
        KeyCode::Enter => {
            session.send_message();
        }
        KeyCode::Backspace => {
            session.view_mut().input.pop();
        }
        KeyCode::Char(c) => session.view_mut().input.push(c),
        _ => {}
    }
}

pub fn draw(f: &mut Frame, view: &ViewState, ui: &TuiState) {
    let rows = Layout::default()
        .direction(Axis::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(3),
        ])
        .split(f.size());

    draw_header(f, rows[0], view);

    let body = rows[1];
    if view.sidebar_toggle {
        // Compact: the sidebar covers the thread while shown
        if view.sidebar_visible {
            draw_contacts(f, body, view, ui);
        } else {
            draw_thread(f, body, view);
        }
    } else {
        let cols = Layout::default()
            .direction(Axis::Horizontal)
            .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(10)])
            .split(body);
        draw_contacts(f, cols[0], view, ui);
        draw_thread(f, cols[1], view);
    }

    draw_composer(f, rows[2], view, ui);
}

fn draw_header(f: &mut Frame, area: Rect, view: &ViewState) {
    let mut spans = Vec::new();
    if view.sidebar_toggle {
        spans.push(Span::styled("[≡] ", Style::default().fg(Color::Yellow)));
    }
    match &view.header {
        Some(header) => {
            spans.push(Span::styled(
                header.name.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ));
            spans.push(Span::raw("  "));
            spans.push(Span::styled(
                header.status.clone(),
                Style::default().fg(Color::DarkGray),
            ));
        }
        None => spans.push(Span::styled(
            "Select a chat",
            Style::default().fg(Color::DarkGray),
        )),
    }
    let para = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(para, area);
}

fn draw_contacts(f: &mut Frame, area: Rect, view: &ViewState, ui: &TuiState) {
    let items: Vec<ListItem> = view
        .contacts
        .iter()
        .map(|c| {
            let name_style = if c.active {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default().add_modifier(Modifier::BOLD)
            };
            ListItem::new(vec![
                Line::from(vec![
                    Span::styled(c.display_name.clone(), name_style),
                    Span::raw(" "),
                    Span::styled(c.time.clone(), Style::default().fg(Color::DarkGray)),
                ]),
                Line::from(Span::styled(
                    c.last_message.clone(),
                    Style::default().fg(Color::Gray),
                )),
            ])
        })
        .collect();

    let border = if ui.focus == Focus::Contacts {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let list = List::new(items)
        .block(
            Block::default()
                .title("Chats")
                .borders(Borders::ALL)
                .border_style(border),
        )
        .highlight_symbol("> ")
        .highlight_style(Style::default().bg(Color::DarkGray));

    let mut state = ListState::default();
    if !view.contacts.is_empty() {
        state.select(Some(ui.cursor.min(view.contacts.len() - 1)));
    }
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_thread(f: &mut Frame, area: Rect, view: &ViewState) {
    let lines: Vec<Line> = view
        .thread
        .iter()
        .map(|b| {
            let (style, alignment) = match b.direction {
                Direction::Inbound => (Style::default(), Alignment::Left),
                Direction::Outbound => (Style::default().fg(Color::Green), Alignment::Right),
            };
            Line::from(vec![
                Span::styled(b.text.clone(), style),
                Span::raw("  "),
                Span::styled(b.time.clone(), Style::default().fg(Color::DarkGray)),
            ])
            .alignment(alignment)
        })
        .collect();

    let height = area.height.saturating_sub(2) as usize;
    let top = lines
        .len()
        .saturating_sub(height)
        .saturating_sub(view.scroll_back);
    let para = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL))
        .scroll((top.min(u16::MAX as usize) as u16, 0));
    f.render_widget(para, area);
}

fn draw_composer(f: &mut Frame, area: Rect, view: &ViewState, ui: &TuiState) {
    let (text, style) = if view.composer_enabled {
        (view.input.clone(), Style::default())
    } else {
        (
            "Select a chat to start messaging".to_string(),
            Style::default().fg(Color::DarkGray),
        )
    };
    let border = if ui.focus == Focus::Composer && view.composer_enabled {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let para = Paragraph::new(Span::styled(text, style)).block(
        Block::default()
            .title("Message (Enter to send)")
            .borders(Borders::ALL)
            .border_style(border),
    );
    f.render_widget(para, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{ChatController, ControllerOptions};
    use crate::push::PushSink;
    use crate::types::{ChatMessage, OutgoingMessage};
    use crate::view::{ChatHeader, ChatView, ContactEntry, MessageBubble};
    use ratatui::{backend::TestBackend, Terminal};
    use std::cell::Cell;
    use tokio::sync::mpsc;

    #[derive(Clone)]
    struct NoHistory;

    impl HistorySource for NoHistory {
        async fn fetch_all(&self) -> crate::Result<Vec<ChatMessage>> {
            Ok(Vec::new())
        }
    }

    #[derive(Clone)]
    struct NoSink;

    impl PushSink for NoSink {
        async fn emit(&self, _msg: OutgoingMessage) -> crate::Result<()> {
            Ok(())
        }
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn screen(view: &ViewState, ui: &TuiState, width: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, 12)).unwrap();
        terminal.draw(|f| draw(f, view, ui)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    fn sample_view() -> ViewState {
        let mut view = ViewState::new();
        view.render_contacts(vec![ContactEntry {
            conversation_id: "c1".to_string(),
            display_name: "Ana".to_string(),
            last_message: "hi".to_string(),
            platform: "WhatsApp".to_string(),
            time: "10:00".to_string(),
            active: true,
        }]);
        view.set_header(ChatHeader {
            name: "Ana".to_string(),
            status: "WhatsApp chat".to_string(),
        });
        view.append_message(MessageBubble {
            text: "hello there".to_string(),
            time: "10:00".to_string(),
            direction: Direction::Inbound,
        });
        view
    }

    #[test]
    fn test_draw_wide_shows_sidebar_and_thread() {
        let text = screen(&sample_view(), &TuiState::default(), 80);
        assert!(text.contains("Chats"));
        assert!(text.contains("WhatsApp chat"));
        assert!(text.contains("hello there"));
        assert!(!text.contains("[≡]"));
    }

    #[test]
    fn test_draw_compact_hides_sidebar() {
        let mut view = sample_view();
        view.show_sidebar_toggle();
        view.set_sidebar_visible(false);
        let text = screen(&view, &TuiState::default(), 60);
        assert!(text.contains("[≡]"));
        assert!(!text.contains("Chats"));
        assert!(text.contains("hello there"));
    }

    #[test]
    fn test_initial_focus_follows_sidebar() {
        let mut view = ViewState::new();
        assert_eq!(TuiState::for_view(&view).focus, Focus::Contacts);

        view.show_sidebar_toggle();
        view.set_sidebar_visible(false);
        assert_eq!(TuiState::for_view(&view).focus, Focus::Composer);

        view.set_sidebar_visible(true);
        assert_eq!(TuiState::for_view(&view).focus, Focus::Contacts);
    }

    #[test]
    fn test_restore_runs_on_early_return() {
        let restored = Cell::new(0);

        fn setup(restored: &Cell<u32>) -> std::io::Result<()> {
            let _guard = RestoreOnDrop::new(|| restored.set(restored.get() + 1));
            Err::<(), _>(std::io::Error::new(std::io::ErrorKind::Other, "no tty"))?;
            Ok(())
        }

        assert!(setup(&restored).is_err());
        assert_eq!(restored.get(), 1);

        {
            let _guard = RestoreOnDrop::new(|| restored.set(restored.get() + 1));
        }
        assert_eq!(restored.get(), 2);
    }

    #[tokio::test]
    async fn test_keys_select_type_and_send() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut controller = ChatController::new(ViewState::new(), ControllerOptions::default());
        controller.initialize(1280);
        controller.apply_history(Ok(vec![ChatMessage {
            conversation_id: "c1".to_string(),
            sender: "Ana".to_string(),
            text: "hi".to_string(),
            timestamp: "2024-01-01T10:00:00Z".to_string(),
            inbound: true,
            platform: None,
        }]));
        let mut session = ChatSession::new(controller, NoHistory, NoSink, tx);
        let mut ui = TuiState::default();

        // Composer is disabled until a chat is selected
        ui.focus = Focus::Composer;
        handle_key(&mut session, &mut ui, press(KeyCode::Char('x')));
        assert_eq!(session.view().input, "");

        ui.focus = Focus::Contacts;
        handle_key(&mut session, &mut ui, press(KeyCode::Enter));
        assert_eq!(ui.focus, Focus::Composer);
        assert!(session.view().composer_enabled);

        for c in "ok!".chars() {
            handle_key(&mut session, &mut ui, press(KeyCode::Char(c)));
        }
        handle_key(&mut session, &mut ui, press(KeyCode::Backspace));
        assert_eq!(session.view().input, "ok");

        handle_key(&mut session, &mut ui, press(KeyCode::Enter));
        assert_eq!(session.view().input, "");
        assert_eq!(session.view().thread.last().unwrap().text, "ok");

        assert_eq!(
            handle_key(&mut session, &mut ui, press(KeyCode::Esc)),
            Flow::Quit
        );
    }
}
