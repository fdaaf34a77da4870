//! Data Access Client
//!
//! This module wraps every remote lookup the chat needs against the hosted
//! Zeema backend. It includes:
//!
//! - `LookupResult`: the uniform envelope every remote call returns
//! - `LookupError`: the failure taxonomy folded into that envelope
//! - Row types for invested plans, plan phases and timeline entries
//! - `PlanLookup` / `TimelineLookup`: the capability traits the chat
//!   state machine is built against
//!
//! Failures never cross this boundary as errors: callers branch on
//! `LookupResult::success` and the row count only.

mod client;
pub mod rest;
mod session;

pub use client::DataClient;
pub use rest::ReqwestTransport;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

pub const NETWORK_ERROR_TEXT: &str = "Network error - please check your internet connection";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    Network(String),
    #[error("HTTP error! status: {status}, details: {body}")]
    Protocol { status: u16, body: String },
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl LookupError {
    pub fn kind(&self) -> &'static str {
        match self {
            LookupError::InvalidInput(_) => "InvalidInput",
            LookupError::Network(_) => "Network",
            LookupError::Protocol { .. } => "Protocol",
            LookupError::Malformed(_) => "Malformed",
        }
    }

    /// Text shown after the `Error:` prefix of a failed envelope.
    fn human_message(&self) -> String {
        match self {
            LookupError::Network(_) => NETWORK_ERROR_TEXT.to_string(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail {
    pub kind: String,
    pub message: String,
}

/// Uniform result of a remote call.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: String,
    pub error_detail: Option<ErrorDetail>,
}

impl<T> LookupResult<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: message.into(),
            error_detail: None,
        }
    }

    pub fn failure(error: LookupError) -> Self {
        Self {
            success: false,
            data: None,
            message: format!("Error: {}", error.human_message()),
            error_detail: Some(ErrorDetail {
                kind: error.kind().to_string(),
                message: error.to_string(),
            }),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> LookupResult<U> {
        LookupResult {
            success: self.success,
            data: self.data.map(f),
            message: self.message,
            error_detail: self.error_detail,
        }
    }
}

impl<T> LookupResult<Vec<T>> {
    /// Rows of a successful lookup; empty for failures and empty results.
    pub fn rows(&self) -> &[T] {
        match (&self.data, self.success) {
            (Some(rows), true) => rows.as_slice(),
            _ => &[],
        }
    }

    pub fn has_rows(&self) -> bool {
        !self.rows().is_empty()
    }
}

// Row types

/// One invested-plan row: a transaction joined with its plan metadata.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InvestedPlanRow {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(rename = "plans - plan_id", default, deserialize_with = "loose_string")]
    pub plan_id: Option<String>,
    #[serde(
        rename = "transactions → plan_id",
        default,
        deserialize_with = "loose_string"
    )]
    pub transaction_plan_id: Option<String>,
    #[serde(rename = "plans - plan_id → title", default)]
    pub plan_title: Option<String>,
    #[serde(rename = "plans - plan_id → persian_confirmed_symbol", default)]
    pub plan_symbol: Option<String>,
    #[serde(
        rename = "transactions → amount",
        default,
        deserialize_with = "loose_string"
    )]
    pub amount: Option<String>,
}

impl InvestedPlanRow {
    pub fn resolved_plan_id(&self) -> Option<&str> {
        self.plan_id
            .as_deref()
            .or(self.transaction_plan_id.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PlanPhaseRow {
    #[serde(default, alias = "phase_name")]
    pub title: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default, alias = "percentage", deserialize_with = "loose_string")]
    pub percent: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TimelineRow {
    #[serde(default, deserialize_with = "loose_string")]
    pub plan_id: Option<String>,
    #[serde(default, alias = "phase_name")]
    pub title: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default, alias = "percentage", deserialize_with = "loose_string")]
    pub percent: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSession {
    pub chat_id: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Association {
    pub chat_id: String,
    pub national_id: String,
}

/// Accepts JSON strings and numbers; blanks and nulls become `None`.
fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

// Capability traits

/// Lookups every chat deployment has.
#[async_trait]
pub trait PlanLookup: Send + Sync {
    async fn fetch_invested_plans(&self, national_id: &str) -> LookupResult<Vec<InvestedPlanRow>>;

    async fn fetch_plan_phases(&self, plan_id: &str) -> LookupResult<Vec<PlanPhaseRow>>;

    async fn create_session(&self) -> LookupResult<ChatSession>;

    async fn attach_national_id(
        &self,
        national_id: &str,
        session_id: &str,
    ) -> LookupResult<Association>;
}

/// Optional payout-timeline lookup across several plans.
#[async_trait]
pub trait TimelineLookup: Send + Sync {
    async fn fetch_plan_timeline(&self, plan_ids: &[String]) -> LookupResult<Vec<TimelineRow>>;
}
