//! Conversation state, the events that drive it and the effects it asks
//! the runtime to perform.

use super::format::{PhaseView, TimelineView, UNKNOWN};
use super::menu::{LookupIntent, MenuChoice, MenuKind, MenuView, ROOT_MENU, WELCOME};
use crate::api::{Association, ChatSession, InvestedPlanRow, LookupResult};
use chrono::{DateTime, Local};
use std::collections::HashMap;

/// Where the conversation is. Drill-down menus (plans, phases, timeline)
/// are layered on `Menu`, not separate states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatState {
    Menu,
    WaitingForNationalId { intent: LookupIntent },
    SocialMediaMenu,
    WaitingForQuestion,
}

impl ChatState {
    /// Label of the root item being collected for. Only set while
    /// waiting for a national id.
    pub fn selected_menu_item(&self) -> Option<&'static str> {
        match self {
            ChatState::WaitingForNationalId { intent } => ROOT_MENU
                .iter()
                .find(|node| node.kind == MenuKind::CollectNationalId(*intent))
                .map(|node| node.label),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ChatState::Menu => "menu",
            ChatState::WaitingForNationalId { .. } => "waiting_for_national_id",
            ChatState::SocialMediaMenu => "social_media_menu",
            ChatState::WaitingForQuestion => "waiting_for_question",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    Bot,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub sender: Sender,
    pub text: String,
    pub at: DateTime<Local>,
}

/// A plan the user has invested in, kept for drill-down screens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanRecord {
    pub plan_id: String,
    pub title: String,
    pub symbol: String,
    pub invested_amount: Option<String>,
}

impl From<&InvestedPlanRow> for PlanRecord {
    fn from(row: &InvestedPlanRow) -> Self {
        Self {
            plan_id: row.resolved_plan_id().unwrap_or(UNKNOWN).to_string(),
            title: row.plan_title.clone().unwrap_or_else(|| UNKNOWN.to_string()),
            symbol: row.plan_symbol.clone().unwrap_or_else(|| UNKNOWN.to_string()),
            invested_amount: row.amount.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Plans,
    Phases,
    Timeline,
    Session,
}

/// An outstanding lookup the UI shows a loading line for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pending {
    pub kind: RequestKind,
    pub notice: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Open,
    Close,
    Choose(MenuChoice),
    SubmitText(String),
    PlansLoaded {
        token: u64,
        intent: LookupIntent,
        national_id: String,
        result: LookupResult<Vec<InvestedPlanRow>>,
    },
    PhasesLoaded {
        token: u64,
        result: LookupResult<Vec<PhaseView>>,
    },
    TimelineLoaded {
        token: u64,
        result: LookupResult<Vec<TimelineView>>,
    },
    SessionCreated {
        token: u64,
        result: LookupResult<ChatSession>,
    },
    Attached(LookupResult<Association>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    CreateSession {
        token: u64,
    },
    FetchPlans {
        token: u64,
        national_id: String,
        intent: LookupIntent,
    },
    FetchPhases {
        token: u64,
        plan_id: String,
    },
    FetchTimeline {
        token: u64,
        plan_ids: Vec<String>,
    },
    AttachNationalId {
        national_id: String,
        session_id: String,
    },
    OpenLink(String),
}

/// Everything the chat remembers while the process runs.
#[derive(Debug, Clone)]
pub struct Conversation {
    pub open: bool,
    pub state: ChatState,
    pub session: Option<ChatSession>,
    pub cached_plan_ids: Vec<String>,
    pub cached_plans: Vec<PlanRecord>,
    pub transcript: Vec<Turn>,
    /// Exactly one menu is live at a time; every transition replaces it.
    pub active_menu: Option<MenuView>,
    pub pending: Option<Pending>,
    pub timeline_enabled: bool,
    tokens: HashMap<RequestKind, u64>,
    next_token: u64,
}

impl Conversation {
    pub fn new(timeline_enabled: bool) -> Self {
        let mut conversation = Self {
            open: false,
            state: ChatState::Menu,
            session: None,
            cached_plan_ids: Vec::new(),
            cached_plans: Vec::new(),
            transcript: Vec::new(),
            active_menu: None,
            pending: None,
            timeline_enabled,
            tokens: HashMap::new(),
            next_token: 0,
        };
        conversation.bot(WELCOME);
        conversation.active_menu = Some(MenuView::Root);
        conversation
    }

    pub fn selected_menu_item(&self) -> Option<&'static str> {
        self.state.selected_menu_item()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.chat_id.as_str())
    }

    pub(crate) fn bot(&mut self, text: impl Into<String>) {
        self.push(Sender::Bot, text.into());
    }

    pub(crate) fn user(&mut self, text: impl Into<String>) {
        self.push(Sender::User, text.into());
    }

    fn push(&mut self, sender: Sender, text: String) {
        self.transcript.push(Turn {
            sender,
            text,
            at: Local::now(),
        });
    }

    /// Starts a request of `kind`, superseding any earlier one of the same
    /// kind.
    pub(crate) fn issue(&mut self, kind: RequestKind) -> u64 {
        self.next_token += 1;
        self.tokens.insert(kind, self.next_token);
        self.next_token
    }

    pub(crate) fn is_current(&self, kind: RequestKind, token: u64) -> bool {
        self.tokens.get(&kind) == Some(&token)
    }

    /// Marks `kind` as answered. Returns false for stale tokens.
    pub(crate) fn settle(&mut self, kind: RequestKind, token: u64) -> bool {
        if !self.is_current(kind, token) {
            return false;
        }
        self.tokens.remove(&kind);
        if self.pending.as_ref().map(|p| p.kind) == Some(kind) {
            self.pending = None;
        }
        true
    }

    pub(crate) fn in_flight(&self, kind: RequestKind) -> bool {
        self.tokens.contains_key(&kind)
    }

    /// Drops every outstanding user-facing request.
    pub(crate) fn invalidate_lookups(&mut self) {
        self.tokens.retain(|kind, _| *kind == RequestKind::Session);
        self.pending = None;
    }
}
