//! Executes reducer effects against the lookup capabilities and turns the
//! outcomes back into events.

use super::format::{PhaseView, TimelineView, UNKNOWN};
use super::state::{Effect, Event};
use crate::api::{LookupError, LookupResult, PlanLookup, PlanPhaseRow, TimelineLookup, TimelineRow};
use crate::calendar::CalendarConverter;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct EffectRunner {
    plans: Arc<dyn PlanLookup>,
    timeline: Option<Arc<dyn TimelineLookup>>,
    calendar: CalendarConverter,
}

impl EffectRunner {
    pub fn new(
        plans: Arc<dyn PlanLookup>,
        timeline: Option<Arc<dyn TimelineLookup>>,
        calendar: CalendarConverter,
    ) -> Self {
        Self {
            plans,
            timeline,
            calendar,
        }
    }

    pub fn timeline_enabled(&self) -> bool {
        self.timeline.is_some()
    }

    /// Runs `effect` on its own task; any resulting event is sent to `tx`.
    pub fn spawn(&self, effect: Effect, tx: mpsc::UnboundedSender<Event>) {
        let runner = self.clone();
        tokio::spawn(async move {
            if let Some(event) = runner.run(effect).await {
                // The receiver is gone once the UI has exited.
                let _ = tx.send(event);
            }
        });
    }

    pub async fn run(&self, effect: Effect) -> Option<Event> {
        match effect {
            Effect::CreateSession { token } => Some(Event::SessionCreated {
                token,
                result: self.plans.create_session().await,
            }),
            Effect::FetchPlans {
                token,
                national_id,
                intent,
            } => {
                let result = self.plans.fetch_invested_plans(&national_id).await;
                Some(Event::PlansLoaded {
                    token,
                    intent,
                    national_id,
                    result,
                })
            }
            Effect::FetchPhases { token, plan_id } => {
                let result = self.plans.fetch_plan_phases(&plan_id).await;
                let mut phases = Vec::with_capacity(result.rows().len());
                for row in result.rows() {
                    phases.push(self.phase_view(row).await);
                }
                Some(Event::PhasesLoaded {
                    token,
                    result: result.map(|_| phases),
                })
            }
            Effect::FetchTimeline { token, plan_ids } => {
                let Some(timeline) = &self.timeline else {
                    warn!("timeline requested without a timeline lookup");
                    return Some(Event::TimelineLoaded {
                        token,
                        result: LookupResult::failure(LookupError::InvalidInput(
                            "timeline lookup is not configured".into(),
                        )),
                    });
                };
                let result = timeline.fetch_plan_timeline(&plan_ids).await;
                let mut entries = Vec::with_capacity(result.rows().len());
                for row in result.rows() {
                    entries.push(self.timeline_view(row).await);
                }
                Some(Event::TimelineLoaded {
                    token,
                    result: result.map(|_| entries),
                })
            }
            Effect::AttachNationalId {
                national_id,
                session_id,
            } => Some(Event::Attached(
                self.plans
                    .attach_national_id(&national_id, &session_id)
                    .await,
            )),
            Effect::OpenLink(url) => {
                match open::that(&url) {
                    Ok(()) => debug!(%url, "opened link"),
                    Err(e) => warn!(%url, error = %e, "failed to open link"),
                }
                None
            }
        }
    }

    async fn solar(&self, start_date: Option<&str>) -> String {
        match start_date {
            Some(date) => self.calendar.convert(date).await,
            None => UNKNOWN.to_string(),
        }
    }

    async fn phase_view(&self, row: &PlanPhaseRow) -> PhaseView {
        PhaseView {
            title: row.title.clone().unwrap_or_else(|| UNKNOWN.to_string()),
            solar_date: self.solar(row.start_date.as_deref()).await,
            percent: row.percent.clone().unwrap_or_else(|| UNKNOWN.to_string()),
            status: row.status.clone(),
        }
    }

    async fn timeline_view(&self, row: &TimelineRow) -> TimelineView {
        TimelineView {
            plan_id: row.plan_id.clone(),
            start_date: row.start_date.clone(),
            title: row.title.clone().unwrap_or_else(|| UNKNOWN.to_string()),
            solar_date: self.solar(row.start_date.as_deref()).await,
            percent: row.percent.clone().unwrap_or_else(|| UNKNOWN.to_string()),
            status: row.status.clone(),
        }
    }
}
