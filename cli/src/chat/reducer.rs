use super::format::{
    format_invested_plans, format_plan_phases, format_timeline, link_choice_echo, link_opened,
    phase_details_placeholder, plan_loading_notice, sort_timeline,
};
use super::menu::{
    LookupIntent, MenuChoice, MenuKind, MenuView, PlanChoice, ASK_NATIONAL_ID, CONNECTION_ERROR,
    MESSAGE_RECEIVED, NO_CACHED_PLANS, NO_DATA_FOR_NATIONAL_ID, NO_DATA_FOR_PLAN, NO_TIMELINE,
    PLAN_FETCH_ERROR, RETURN_TO_MENU, ROOT_MENU, SOCIAL_LINKS, TIMELINE_FETCH_ERROR,
    TIMELINE_LOADING, TIMELINE_UNAVAILABLE, VIEW_TIMELINE, WELCOME,
};
use super::state::{ChatState, Conversation, Effect, Event, Pending, PlanRecord, RequestKind};
use crate::api::{InvestedPlanRow, LookupResult};
use tracing::{debug, info, warn};

pub fn reduce(conversation: &mut Conversation, event: Event) -> Vec<Effect> {
    match event {
        Event::Open => open(conversation),
        Event::Close => {
            conversation.open = false;
            Vec::new()
        }
        Event::Choose(choice) => choose(conversation, choice),
        Event::SubmitText(text) => submit_text(conversation, text),
        Event::PlansLoaded {
            token,
            intent,
            national_id,
            result,
        } => {
            if !conversation.settle(RequestKind::Plans, token) {
                debug!(token, "dropping stale invested-plans response");
                return Vec::new();
            }
            plans_loaded(conversation, intent, national_id, result)
        }
        Event::PhasesLoaded { token, result } => {
            if !conversation.settle(RequestKind::Phases, token) {
                debug!(token, "dropping stale plan-phases response");
                return Vec::new();
            }
            match result.rows() {
                [] => {
                    let text = if is_network_failure(&result) {
                        PLAN_FETCH_ERROR
                    } else {
                        NO_DATA_FOR_PLAN
                    };
                    conversation.bot(text);
                    conversation.active_menu = Some(MenuView::ReturnOnly);
                }
                phases => {
                    conversation.bot(format_plan_phases(phases));
                    let titles = phases.iter().map(|p| p.title.clone()).collect();
                    conversation.active_menu = Some(MenuView::Phases(titles));
                }
            }
            Vec::new()
        }
        Event::TimelineLoaded { token, result } => {
            if !conversation.settle(RequestKind::Timeline, token) {
                debug!(token, "dropping stale timeline response");
                return Vec::new();
            }
            let text = if result.has_rows() {
                let mut entries = result.rows().to_vec();
                sort_timeline(&mut entries);
                format_timeline(&entries, &conversation.cached_plans)
            } else if is_network_failure(&result) {
                TIMELINE_FETCH_ERROR.to_string()
            } else {
                NO_TIMELINE.to_string()
            };
            conversation.bot(text);
            conversation.active_menu = Some(MenuView::ReturnOnly);
            Vec::new()
        }
        Event::SessionCreated { token, result } => {
            if !conversation.settle(RequestKind::Session, token) {
                return Vec::new();
            }
            match result.data {
                Some(session) if result.success => {
                    debug!(chat_id = %session.chat_id, "session stored on conversation");
                    conversation.session = Some(session);
                }
                _ => warn!(message = %result.message, "chat session creation failed"),
            }
            Vec::new()
        }
        Event::Attached(result) => {
            if result.success {
                info!("national id attached to chat session");
            } else {
                warn!(message = %result.message, "failed to attach national id");
            }
            Vec::new()
        }
    }
}

fn open(conversation: &mut Conversation) -> Vec<Effect> {
    conversation.open = true;
    if conversation.session.is_some() {
        debug!(chat_id = conversation.session_id(), "continuing chat session");
        return Vec::new();
    }
    if conversation.in_flight(RequestKind::Session) {
        return Vec::new();
    }
    let token = conversation.issue(RequestKind::Session);
    vec![Effect::CreateSession { token }]
}

fn choose(conversation: &mut Conversation, choice: MenuChoice) -> Vec<Effect> {
    let Some(menu) = conversation.active_menu.clone() else {
        return Vec::new();
    };
    if !menu.entries().iter().any(|(_, c)| *c == choice) {
        debug!(?choice, "choice is not on the active menu");
        return Vec::new();
    }

    match choice {
        MenuChoice::ReturnToMenu => {
            conversation.user(RETURN_TO_MENU);
            return_to_menu(conversation);
            Vec::new()
        }
        MenuChoice::Root(index) => {
            let Some(node) = ROOT_MENU.get(index) else {
                return Vec::new();
            };
            conversation.user(node.label);
            conversation.active_menu = Some(MenuView::ReturnOnly);
            match node.kind {
                MenuKind::CollectNationalId(intent) => {
                    conversation.state = ChatState::WaitingForNationalId { intent };
                    conversation.bot(ASK_NATIONAL_ID);
                }
                MenuKind::SocialLinks => {
                    conversation.state = ChatState::SocialMediaMenu;
                    conversation.bot(node.response_text.unwrap_or_default());
                    conversation.active_menu = Some(MenuView::Social);
                }
                MenuKind::FreeformQuestion => {
                    conversation.state = ChatState::WaitingForQuestion;
                    conversation.bot(node.response_text.unwrap_or_default());
                }
                MenuKind::Information => {
                    conversation.state = ChatState::Menu;
                    conversation.bot(node.response_text.unwrap_or_default());
                }
            }
            Vec::new()
        }
        MenuChoice::Social(index) => {
            let Some(link) = SOCIAL_LINKS.get(index) else {
                return Vec::new();
            };
            conversation.user(link_choice_echo(link.label));
            conversation.bot(link_opened(link.label));
            conversation.state = ChatState::Menu;
            conversation.active_menu = Some(MenuView::ReturnOnly);
            vec![Effect::OpenLink(link.url.to_string())]
        }
        MenuChoice::Plan(index) => {
            let MenuView::Plans(plans) = menu else {
                return Vec::new();
            };
            let Some(plan) = plans.get(index) else {
                return Vec::new();
            };
            conversation.user(plan.symbol.clone());
            conversation.active_menu = None;
            let token = conversation.issue(RequestKind::Phases);
            conversation.pending = Some(Pending {
                kind: RequestKind::Phases,
                notice: Some(plan_loading_notice(&plan.symbol)),
            });
            vec![Effect::FetchPhases {
                token,
                plan_id: plan.plan_id.clone(),
            }]
        }
        MenuChoice::Phase(index) => {
            let MenuView::Phases(titles) = menu else {
                return Vec::new();
            };
            let Some(title) = titles.get(index) else {
                return Vec::new();
            };
            conversation.user(title.clone());
            conversation.bot(phase_details_placeholder(title));
            conversation.state = ChatState::Menu;
            conversation.active_menu = Some(MenuView::ReturnOnly);
            Vec::new()
        }
        MenuChoice::ViewTimeline => view_timeline(conversation),
    }
}

fn view_timeline(conversation: &mut Conversation) -> Vec<Effect> {
    conversation.active_menu = Some(MenuView::ReturnOnly);
    if conversation.cached_plan_ids.is_empty() {
        conversation.bot(NO_CACHED_PLANS);
        return Vec::new();
    }

    conversation.user(VIEW_TIMELINE);
    if !conversation.timeline_enabled {
        conversation.bot(TIMELINE_UNAVAILABLE);
        return Vec::new();
    }

    conversation.active_menu = None;
    let token = conversation.issue(RequestKind::Timeline);
    conversation.pending = Some(Pending {
        kind: RequestKind::Timeline,
        notice: Some(TIMELINE_LOADING.to_string()),
    });
    vec![Effect::FetchTimeline {
        token,
        plan_ids: conversation.cached_plan_ids.clone(),
    }]
}

fn submit_text(conversation: &mut Conversation, text: String) -> Vec<Effect> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    if let Some(chat_id) = conversation.session_id() {
        debug!(chat_id, "message sent");
    }
    conversation.user(text);

    match conversation.state {
        ChatState::WaitingForNationalId { intent } => {
            conversation.active_menu = None;
            let token = conversation.issue(RequestKind::Plans);
            conversation.pending = Some(Pending {
                kind: RequestKind::Plans,
                notice: None,
            });
            vec![Effect::FetchPlans {
                token,
                national_id: text.to_string(),
                intent,
            }]
        }
        _ => {
            conversation.bot(MESSAGE_RECEIVED);
            conversation.state = ChatState::Menu;
            conversation.active_menu = Some(MenuView::ReturnOnly);
            Vec::new()
        }
    }
}

fn plans_loaded(
    conversation: &mut Conversation,
    intent: LookupIntent,
    national_id: String,
    result: LookupResult<Vec<InvestedPlanRow>>,
) -> Vec<Effect> {
    conversation.state = ChatState::Menu;

    let rows = result.rows();
    if rows.is_empty() {
        let text = if is_network_failure(&result) {
            CONNECTION_ERROR
        } else {
            NO_DATA_FOR_NATIONAL_ID
        };
        conversation.bot(text);
        conversation.active_menu = Some(MenuView::ReturnOnly);
        return Vec::new();
    }

    conversation.bot(format_invested_plans(rows));
    conversation.cached_plans = rows.iter().map(PlanRecord::from).collect();
    conversation.cached_plan_ids = rows
        .iter()
        .filter_map(|row| row.resolved_plan_id())
        .map(str::to_string)
        .collect();

    conversation.active_menu = Some(match intent {
        LookupIntent::TrackPayout => MenuView::Plans(
            conversation
                .cached_plans
                .iter()
                .map(|record| PlanChoice {
                    plan_id: record.plan_id.clone(),
                    symbol: record.symbol.clone(),
                })
                .collect(),
        ),
        LookupIntent::InvestedPlans => MenuView::Timeline,
    });

    match conversation.session_id() {
        Some(session_id) => vec![Effect::AttachNationalId {
            national_id,
            session_id: session_id.to_string(),
        }],
        None => {
            debug!("no chat session yet, skipping national id association");
            Vec::new()
        }
    }
}

fn return_to_menu(conversation: &mut Conversation) {
    conversation.invalidate_lookups();
    conversation.state = ChatState::Menu;
    conversation.bot(WELCOME);
    conversation.active_menu = Some(MenuView::Root);
}

fn is_network_failure<T>(result: &LookupResult<T>) -> bool {
    !result.success
        && result
            .error_detail
            .as_ref()
            .is_some_and(|detail| detail.kind == "Network")
}
