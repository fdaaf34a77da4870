//! Application State and Event Loop
//!
//! This module owns the terminal-side state of the chat widget:
//!
//! - The `Conversation` driven by the chat reducer
//! - The highlight of the active inline menu
//! - The text being typed and the transcript scroll offset
//!
//! Lookups never block the loop. Effects returned by the reducer are
//! spawned on the runtime and their completions are drained from a channel
//! before every frame, so the loading line keeps rendering meanwhile.

use crate::chat::{reduce, Conversation, EffectRunner, Event as ChatEvent, MenuChoice, MenuView};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{backend::CrosstermBackend, widgets::ListState, Terminal};
use std::io::Stdout;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

pub type AppResult<T> = Result<T>;

const SCROLL_STEP: u16 = 5;

pub struct App {
    pub conversation: Conversation,
    pub menu_state: ListState,
    pub input: String,
    /// Lines scrolled up from the bottom of the transcript.
    pub scroll: u16,
    pub running: bool,

    runner: EffectRunner,
    events_tx: mpsc::UnboundedSender<ChatEvent>,
    events_rx: mpsc::UnboundedReceiver<ChatEvent>,
    shown_menu: Option<MenuView>,
    shown_turns: usize,
}

impl App {
    pub fn new(runner: EffectRunner) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let conversation = Conversation::new(runner.timeline_enabled());
        let mut app = Self {
            conversation,
            menu_state: ListState::default(),
            input: String::new(),
            scroll: 0,
            running: true,
            runner,
            events_tx,
            events_rx,
            shown_menu: None,
            shown_turns: 0,
        };
        app.sync_view();
        app
    }

    /// Feeds one event through the reducer and starts the effects it asks for.
    pub fn dispatch(&mut self, event: ChatEvent) {
        let effects = reduce(&mut self.conversation, event);
        debug!(
            state = self.conversation.state.name(),
            item = ?self.conversation.selected_menu_item(),
            "event applied"
        );
        self.sync_view();
        for effect in effects {
            debug!(?effect, "spawning effect");
            self.runner.spawn(effect, self.events_tx.clone());
        }
    }

    /// Applies every lookup completion that has arrived since the last frame.
    pub fn drain_completions(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.dispatch(event);
        }
    }

    /// Resets the highlight when the menu is replaced and follows the
    /// transcript tail when a new turn arrives.
    fn sync_view(&mut self) {
        if self.shown_menu != self.conversation.active_menu {
            self.shown_menu = self.conversation.active_menu.clone();
            self.menu_state
                .select(self.shown_menu.as_ref().map(|_| 0));
        }
        if self.shown_turns != self.conversation.transcript.len() {
            self.shown_turns = self.conversation.transcript.len();
            self.scroll = 0;
        }
    }

    pub fn menu_entries(&self) -> Vec<(String, MenuChoice)> {
        self.conversation
            .active_menu
            .as_ref()
            .map(MenuView::entries)
            .unwrap_or_default()
    }

    pub fn highlighted_choice(&self) -> Option<MenuChoice> {
        let index = self.menu_state.selected()?;
        self.menu_entries()
            .into_iter()
            .nth(index)
            .map(|(_, choice)| choice)
    }

    pub fn select_next(&mut self) {
        let len = self.menu_entries().len();
        if let Some(i) = self.menu_state.selected() {
            if i + 1 < len {
                self.menu_state.select(Some(i + 1));
            }
        }
    }

    pub fn select_prev(&mut self) {
        if let Some(i) = self.menu_state.selected() {
            if i > 0 {
                self.menu_state.select(Some(i - 1));
            }
        }
    }

    /// Enter: send typed text, or pick the highlighted item when the input
    /// is empty.
    pub fn submit(&mut self) {
        if self.input.trim().is_empty() {
            self.input.clear();
            if let Some(choice) = self.highlighted_choice() {
                self.dispatch(ChatEvent::Choose(choice));
            }
        } else {
            let text = std::mem::take(&mut self.input);
            self.dispatch(ChatEvent::SubmitText(text));
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.running = false;
            return;
        }

        if !self.conversation.open {
            match key.code {
                KeyCode::Enter | KeyCode::Char(' ') => self.dispatch(ChatEvent::Open),
                KeyCode::Char('q') => self.running = false,
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Esc => self.dispatch(ChatEvent::Close),
            KeyCode::Enter => self.submit(),
            KeyCode::Down => self.select_next(),
            KeyCode::Up => self.select_prev(),
            KeyCode::PageUp => self.scroll = self.scroll.saturating_add(SCROLL_STEP),
            KeyCode::PageDown => self.scroll = self.scroll.saturating_sub(SCROLL_STEP),
            KeyCode::Char(c) => self.input.push(c),
            KeyCode::Backspace => {
                self.input.pop();
            }
            _ => {}
        }
    }
}

pub async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    mut app: App,
) -> AppResult<()> {
    loop {
        app.drain_completions();
        terminal.draw(|f| super::views::draw(f, &mut app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }

        if !app.running {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{
        Association, ChatSession, InvestedPlanRow, LookupResult, PlanLookup, PlanPhaseRow,
    };
    use crate::calendar::CalendarConverter;
    use crate::chat::menu::{ASK_NATIONAL_ID, MESSAGE_RECEIVED, ROOT_MENU};
    use crate::chat::state::ChatState;
    use async_trait::async_trait;
    use ratatui::backend::TestBackend;
    use std::sync::Arc;

    struct EmptyBackend;

    #[async_trait]
    impl PlanLookup for EmptyBackend {
        async fn fetch_invested_plans(&self, _: &str) -> LookupResult<Vec<InvestedPlanRow>> {
            LookupResult::ok(Vec::new(), "No data found for this national ID")
        }

        async fn fetch_plan_phases(&self, _: &str) -> LookupResult<Vec<PlanPhaseRow>> {
            LookupResult::ok(Vec::new(), "No plan phases found for this plan ID")
        }

        async fn create_session(&self) -> LookupResult<ChatSession> {
            LookupResult::ok(
                ChatSession {
                    chat_id: "1".into(),
                    created_at: "2024-01-15T06:26:40.000Z".into(),
                },
                "Chat created",
            )
        }

        async fn attach_national_id(&self, n: &str, s: &str) -> LookupResult<Association> {
            LookupResult::ok(
                Association {
                    chat_id: s.into(),
                    national_id: n.into(),
                },
                "ok",
            )
        }
    }

    fn app() -> App {
        App::new(EffectRunner::new(
            Arc::new(EmptyBackend),
            None,
            CalendarConverter::local_only(),
        ))
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[tokio::test]
    async fn closed_widget_opens_on_enter_and_quits_on_q() {
        let mut app = app();
        press(&mut app, KeyCode::Char('x'));
        assert!(!app.conversation.open);

        press(&mut app, KeyCode::Enter);
        assert!(app.conversation.open);

        press(&mut app, KeyCode::Esc);
        assert!(!app.conversation.open);
        press(&mut app, KeyCode::Char('q'));
        assert!(!app.running);
    }

    #[tokio::test]
    async fn enter_on_empty_input_picks_highlighted_item() {
        let mut app = app();
        press(&mut app, KeyCode::Char(' '));
        press(&mut app, KeyCode::Down);
        assert_eq!(app.highlighted_choice(), Some(MenuChoice::Root(1)));

        press(&mut app, KeyCode::Enter);
        let last = app.conversation.transcript.last().unwrap();
        assert_eq!(last.text, ASK_NATIONAL_ID);
        assert_eq!(app.conversation.selected_menu_item(), Some(ROOT_MENU[1].label));
        // The menu was replaced, so the highlight starts over.
        assert_eq!(app.menu_state.selected(), Some(0));
    }

    #[tokio::test]
    async fn typed_text_is_submitted_and_cleared() {
        let mut app = app();
        press(&mut app, KeyCode::Enter);
        type_text(&mut app, "hello!");
        press(&mut app, KeyCode::Backspace);
        assert_eq!(app.input, "hello");

        press(&mut app, KeyCode::Enter);
        assert!(app.input.is_empty());
        assert_eq!(app.conversation.transcript.last().unwrap().text, MESSAGE_RECEIVED);
    }

    #[tokio::test]
    async fn lookup_completion_arrives_through_channel() {
        let mut app = app();
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Enter); // first root item
        type_text(&mut app, "0012345678");
        press(&mut app, KeyCode::Enter);
        assert!(app.conversation.pending.is_some());

        for _ in 0..50 {
            app.drain_completions();
            if app.conversation.pending.is_none() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(app.conversation.pending.is_none());
        assert_eq!(app.conversation.state, ChatState::Menu);
    }

    #[tokio::test]
    async fn page_keys_scroll_and_new_turns_snap_back() {
        let mut app = app();
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::PageUp);
        press(&mut app, KeyCode::PageUp);
        assert_eq!(app.scroll, 2 * SCROLL_STEP);
        press(&mut app, KeyCode::PageDown);
        assert_eq!(app.scroll, SCROLL_STEP);

        type_text(&mut app, "hi");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.scroll, 0);
    }

    fn render(app: &mut App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal
            .draw(|f| super::super::views::draw(f, app))
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[tokio::test]
    async fn newest_turn_visible_after_long_words_wrap() {
        let mut app = app();
        press(&mut app, KeyCode::Enter);
        let long_words = vec!["abcdefghijklmnopqrs"; 10].join(" ");
        for _ in 0..3 {
            app.conversation.bot(long_words.clone());
        }
        app.conversation.bot("ENDMARK");

        assert!(render(&mut app, 40, 40).contains("ENDMARK"));

        press(&mut app, KeyCode::PageUp);
        render(&mut app, 40, 40);
        assert!(app.scroll > 0);
        press(&mut app, KeyCode::PageDown);
        press(&mut app, KeyCode::PageDown);
        assert!(render(&mut app, 40, 40).contains("ENDMARK"));
    }

    #[tokio::test]
    async fn very_long_input_keeps_cursor_inside_box() {
        let mut app = app();
        press(&mut app, KeyCode::Enter);
        app.input = "x".repeat(70_000);
        render(&mut app, 40, 20);
    }
}
