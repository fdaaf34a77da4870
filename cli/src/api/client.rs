use super::rest::{RestRequest, RestResponse, Transport};
use super::session::{creation_timestamp, generate_chat_id};
use super::{
    Association, ChatSession, InvestedPlanRow, LookupError, LookupResult, PlanLookup,
    PlanPhaseRow, TimelineLookup, TimelineRow,
};
use crate::config::Config;
use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const INVESTED_PLANS_TABLE: &str = "invested_plans_by_users";
const PLAN_PHASE_TABLE: &str = "plan_phase";
const PLAN_TIMELINE_TABLE: &str = "plan_phase_timeline";
const CHATS_TABLE: &str = "chats";

/// Remote lookups against the hosted backend.
///
/// Every public operation returns a `LookupResult`; nothing here panics or
/// propagates an error to the caller.
#[derive(Clone)]
pub struct DataClient {
    transport: Arc<dyn Transport>,
    backend_url: String,
    api_server_url: String,
}

impl DataClient {
    pub fn new(transport: Arc<dyn Transport>, config: &Config) -> Self {
        Self {
            transport,
            backend_url: config.backend_url.trim_end_matches('/').to_string(),
            api_server_url: config.api_server_url.trim_end_matches('/').to_string(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.backend_url, table)
    }

    /// Sends `primary`; on a non-2xx answer sends `alternate` once.
    async fn query_with_retry<T: DeserializeOwned>(
        &self,
        primary: RestRequest,
        alternate: RestRequest,
    ) -> Result<Vec<T>, LookupError> {
        let response = self.transport.send(primary).await?;
        if response.is_success() {
            return parse_rows(&response);
        }

        warn!(
            status = response.status,
            body = %response.body,
            "primary query failed, retrying with alternate parameter order"
        );
        let response = self.transport.send(alternate).await?;
        if !response.is_success() {
            error!(status = response.status, body = %response.body, "alternate query also failed");
            return Err(LookupError::Protocol {
                status: response.status,
                body: response.body,
            });
        }
        parse_rows(&response)
    }

    /// Sends a write; empty or non-JSON success bodies are accepted.
    async fn write(&self, request: RestRequest) -> Result<Value, LookupError> {
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(LookupError::Protocol {
                status: response.status,
                body: response.body,
            });
        }

        let text = response.body.trim();
        if text.is_empty() {
            debug!("write response is empty, treating as successful");
            return Ok(json!({}));
        }
        Ok(serde_json::from_str(text).unwrap_or_else(|_| {
            warn!("write response is not valid JSON, treating as empty");
            json!({})
        }))
    }

    async fn invested_plans(&self, national_id: &str) -> Result<Vec<InvestedPlanRow>, LookupError> {
        let national_id = require_non_empty(national_id, "Invalid national ID provided")?;
        let filter = format!("eq.{}", national_id);
        let url = self.table_url(INVESTED_PLANS_TABLE);

        let primary = RestRequest::get(&url)
            .param("national_id", &filter)
            .param("select", "*");
        let alternate = RestRequest::get(&url)
            .param("select", "*")
            .param("national_id", &filter);
        self.query_with_retry(primary, alternate).await
    }

    async fn plan_phases(&self, plan_id: &str) -> Result<Vec<PlanPhaseRow>, LookupError> {
        let plan_id = require_non_empty(plan_id, "Invalid plan ID provided")?;
        let filter = format!("eq.{}", plan_id);
        let url = self.table_url(PLAN_PHASE_TABLE);

        let primary = RestRequest::get(&url)
            .param("plan_id", &filter)
            .param("select", "*");
        let alternate = RestRequest::get(&url)
            .param("select", "*")
            .param("plan_id", &filter);
        self.query_with_retry(primary, alternate).await
    }

    async fn plan_timeline(&self, plan_ids: &[String]) -> Result<Vec<TimelineRow>, LookupError> {
        let ids: Vec<&str> = plan_ids
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .collect();
        if ids.is_empty() {
            return Err(LookupError::InvalidInput(
                "Invalid plan_ids provided - must be a non-empty list".into(),
            ));
        }
        let url = self.table_url(PLAN_TIMELINE_TABLE);

        let mut primary = RestRequest::get(&url);
        for id in &ids {
            primary = primary.param("plan_id", format!("eq.{}", id));
        }
        let primary = primary.param("select", "*");

        let quoted: Vec<String> = ids.iter().map(|id| format!("\"{}\"", id)).collect();
        let alternate = RestRequest::get(&url)
            .param("plan_id", format!("in.({})", quoted.join(",")))
            .param("select", "*");

        self.query_with_retry(primary, alternate).await
    }

    async fn insert_chat(&self) -> Result<ChatSession, LookupError> {
        let now = Utc::now();
        let session = ChatSession {
            chat_id: generate_chat_id(now),
            created_at: creation_timestamp(now),
        };
        let body = json!({
            "chat_id": session.chat_id,
            "created_at": session.created_at,
        });
        self.write(RestRequest::post(self.table_url(CHATS_TABLE), body))
            .await?;
        Ok(session)
    }

    async fn associate(&self, national_id: &str, chat_id: &str) -> Result<Association, LookupError> {
        let national_id = require_non_empty(national_id, "Invalid national_id provided")?;
        let chat_id = require_non_empty(chat_id, "Invalid chat_id provided")?;
        let association = Association {
            chat_id: chat_id.to_string(),
            national_id: national_id.to_string(),
        };

        let url = format!("{}/api/insert_national_id", self.api_server_url);
        let body = json!({
            "national_id": association.national_id,
            "chat_id": association.chat_id,
        });
        self.write(RestRequest::post(url, body).unauthenticated())
            .await?;
        Ok(association)
    }
}

#[async_trait]
impl PlanLookup for DataClient {
    async fn fetch_invested_plans(&self, national_id: &str) -> LookupResult<Vec<InvestedPlanRow>> {
        info!("fetching invested plans");
        match self.invested_plans(national_id).await {
            Ok(rows) => {
                info!(rows = rows.len(), "invested plans fetched");
                let message = if rows.is_empty() {
                    "No data found for this national ID"
                } else {
                    "Data retrieved successfully"
                };
                LookupResult::ok(rows, message)
            }
            Err(e) => {
                error!(error = %e, "error fetching invested plans");
                LookupResult::failure(e)
            }
        }
    }

    async fn fetch_plan_phases(&self, plan_id: &str) -> LookupResult<Vec<PlanPhaseRow>> {
        info!(plan_id, "fetching plan phases");
        match self.plan_phases(plan_id).await {
            Ok(rows) => {
                let message = if rows.is_empty() {
                    "No plan phases found for this plan ID"
                } else {
                    "Plan phases retrieved successfully"
                };
                LookupResult::ok(rows, message)
            }
            Err(e) => {
                error!(error = %e, "error fetching plan phases");
                LookupResult::failure(e)
            }
        }
    }

    async fn create_session(&self) -> LookupResult<ChatSession> {
        match self.insert_chat().await {
            Ok(session) => {
                info!(chat_id = %session.chat_id, "chat session created");
                LookupResult::ok(session, "Chat ID generated and inserted successfully")
            }
            Err(e) => {
                error!(error = %e, "error inserting chat_id");
                LookupResult::failure(e)
            }
        }
    }

    async fn attach_national_id(
        &self,
        national_id: &str,
        session_id: &str,
    ) -> LookupResult<Association> {
        match self.associate(national_id, session_id).await {
            Ok(association) => LookupResult::ok(association, "National ID inserted successfully"),
            Err(e) => {
                error!(error = %e, "error inserting national_id");
                LookupResult::failure(e)
            }
        }
    }
}

#[async_trait]
impl TimelineLookup for DataClient {
    async fn fetch_plan_timeline(&self, plan_ids: &[String]) -> LookupResult<Vec<TimelineRow>> {
        info!(plans = plan_ids.len(), "fetching plan phase timeline");
        match self.plan_timeline(plan_ids).await {
            Ok(rows) => {
                let message = if rows.is_empty() {
                    "No plan phase timeline found for the provided plan IDs"
                } else {
                    "Plan phase timeline retrieved successfully"
                };
                LookupResult::ok(rows, message)
            }
            Err(e) => {
                error!(error = %e, "error fetching plan phase timeline");
                LookupResult::failure(e)
            }
        }
    }
}

fn require_non_empty<'a>(value: &'a str, message: &str) -> Result<&'a str, LookupError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LookupError::InvalidInput(message.to_string()));
    }
    Ok(trimmed)
}

fn parse_rows<T: DeserializeOwned>(response: &RestResponse) -> Result<Vec<T>, LookupError> {
    serde_json::from_str(&response.body).map_err(|e| LookupError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::rest::Method;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned responses and records every request it receives.
    #[derive(Default)]
    struct ScriptedTransport {
        responses: Mutex<VecDeque<Result<RestResponse, LookupError>>>,
        requests: Mutex<Vec<RestRequest>>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<Result<RestResponse, LookupError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<RestRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, request: RestRequest) -> Result<RestResponse, LookupError> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(LookupError::Network("no scripted response".into())))
        }
    }

    fn reply(status: u16, body: &str) -> Result<RestResponse, LookupError> {
        Ok(RestResponse {
            status,
            body: body.to_string(),
        })
    }

    fn client(transport: Arc<ScriptedTransport>) -> DataClient {
        let config = Config {
            backend_url: "https://backend.test/".into(),
            api_server_url: "http://api.test".into(),
            ..Config::default()
        };
        DataClient::new(transport, &config)
    }

    const TWO_PLANS: &str = r#"[
        {"first_name": "Sara", "last_name": "Ahmadi", "plans - plan_id": 1,
         "plans - plan_id → title": "Saffron", "plans - plan_id → persian_confirmed_symbol": "زعفران",
         "transactions → amount": "1000"},
        {"first_name": "Sara", "last_name": "Ahmadi", "plans - plan_id": 2,
         "plans - plan_id → title": "Dates", "plans - plan_id → persian_confirmed_symbol": "خرما",
         "transactions → amount": 2000}
    ]"#;

    #[tokio::test]
    async fn invested_plans_returns_all_rows() {
        let transport = ScriptedTransport::new(vec![reply(200, TWO_PLANS)]);
        let result = client(transport.clone())
            .fetch_invested_plans("  0012345678 ")
            .await;

        assert!(result.success);
        assert_eq!(result.rows().len(), 2);
        assert_eq!(result.message, "Data retrieved successfully");

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].url,
            "https://backend.test/rest/v1/invested_plans_by_users"
        );
        assert_eq!(requests[0].query[0], ("national_id".into(), "eq.0012345678".into()));
        assert_eq!(requests[0].query[1], ("select".into(), "*".into()));
    }

    #[tokio::test]
    async fn invested_plans_retries_once_with_alternate_order() {
        let transport = ScriptedTransport::new(vec![reply(400, "bad filter"), reply(200, "[]")]);
        let result = client(transport.clone()).fetch_invested_plans("42").await;

        assert!(result.success);
        assert!(!result.has_rows());
        assert_eq!(result.message, "No data found for this national ID");

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].query[0], ("select".into(), "*".into()));
        assert_eq!(requests[1].query[1], ("national_id".into(), "eq.42".into()));
    }

    #[tokio::test]
    async fn invested_plans_fails_after_alternate_fails() {
        let transport = ScriptedTransport::new(vec![reply(500, "down"), reply(503, "still down")]);
        let result = client(transport.clone()).fetch_invested_plans("42").await;

        assert!(!result.success);
        assert_eq!(
            result.message,
            "Error: HTTP error! status: 503, details: still down"
        );
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn blank_national_id_is_rejected_without_a_request() {
        let transport = ScriptedTransport::new(vec![]);
        let result = client(transport.clone()).fetch_invested_plans("   ").await;

        assert!(!result.success);
        assert_eq!(result.error_detail.unwrap().kind, "InvalidInput");
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn network_errors_are_not_retried() {
        let transport =
            ScriptedTransport::new(vec![Err(LookupError::Network("refused".into()))]);
        let result = client(transport.clone()).fetch_plan_phases("7").await;

        assert!(!result.success);
        assert_eq!(result.error_detail.unwrap().kind, "Network");
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn malformed_body_becomes_failure() {
        let transport = ScriptedTransport::new(vec![reply(200, "<html>")]);
        let result = client(transport).fetch_plan_phases("7").await;

        assert!(!result.success);
        assert_eq!(result.error_detail.unwrap().kind, "Malformed");
    }

    #[tokio::test]
    async fn plan_phases_trims_the_id() {
        let transport = ScriptedTransport::new(vec![reply(
            200,
            r#"[{"title": "Phase 1", "start_date": "2024-01-15", "percent": 10, "status": "done"}]"#,
        )]);
        let result = client(transport.clone()).fetch_plan_phases(" 7 ").await;

        assert_eq!(result.rows()[0].percent.as_deref(), Some("10"));
        assert_eq!(transport.requests()[0].query[0], ("plan_id".into(), "eq.7".into()));
    }

    #[tokio::test]
    async fn timeline_alternate_uses_in_operator() {
        let transport = ScriptedTransport::new(vec![reply(400, "nope"), reply(200, "[]")]);
        let ids = vec!["1".to_string(), " ".to_string(), "2".to_string()];
        let result = client(transport.clone()).fetch_plan_timeline(&ids).await;

        assert!(result.success);
        let requests = transport.requests();
        assert_eq!(
            requests[0].query,
            vec![
                ("plan_id".to_string(), "eq.1".to_string()),
                ("plan_id".to_string(), "eq.2".to_string()),
                ("select".to_string(), "*".to_string()),
            ]
        );
        assert_eq!(requests[1].query[0], ("plan_id".into(), "in.(\"1\",\"2\")".into()));
    }

    #[tokio::test]
    async fn timeline_rejects_empty_id_list() {
        let transport = ScriptedTransport::new(vec![]);
        let result = client(transport.clone()).fetch_plan_timeline(&[]).await;
        assert!(!result.success);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn create_session_posts_chat_record() {
        let transport = ScriptedTransport::new(vec![reply(201, "")]);
        let result = client(transport.clone()).create_session().await;

        assert!(result.success);
        let session = result.data.unwrap();
        let requests = transport.requests();
        assert_eq!(requests[0].method, Method::Post);
        assert_eq!(requests[0].url, "https://backend.test/rest/v1/chats");
        assert_eq!(
            requests[0].body.as_ref().unwrap()["chat_id"],
            json!(session.chat_id)
        );
    }

    #[tokio::test]
    async fn attach_posts_to_api_server_each_time() {
        let transport = ScriptedTransport::new(vec![reply(200, "not json"), reply(200, "{}")]);
        let client = client(transport.clone());

        assert!(client.attach_national_id("0012345678", "17053").await.success);
        assert!(client.attach_national_id("0012345678", "17053").await.success);

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].url, "http://api.test/api/insert_national_id");
        assert!(!requests[0].authenticated);
    }

    #[tokio::test]
    async fn attach_requires_both_ids() {
        let transport = ScriptedTransport::new(vec![]);
        let client = client(transport.clone());

        assert!(!client.attach_national_id("", "17053").await.success);
        assert!(!client.attach_national_id("0012345678", " ").await.success);
        assert!(transport.requests().is_empty());
    }
}
