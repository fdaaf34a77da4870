//! Gregorian to Solar (Jalali) date conversion.
//!
//! The remote date service does the real calendar arithmetic. When it is
//! unreachable, rejects the input or answers with something unusable, the
//! converter falls back to `approximate_solar`, which only shifts the year
//! by 621 and keeps month and day as they are. That result can be off by
//! up to a year and does not remap months; it is a display fallback, not a
//! conversion.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Placeholder for dates that cannot be converted.
pub const UNKNOWN_DATE: &str = "نامشخص";

const SOLAR_YEAR_OFFSET: i32 = 621;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalendarError {
    #[error("date service unreachable: {0}")]
    Network(String),
    #[error("date service rejected the date: {0}")]
    Rejected(String),
    #[error("unexpected date service response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait SolarDateService: Send + Sync {
    async fn to_solar(&self, gregorian_date: &str) -> Result<String, CalendarError>;
}

#[derive(Debug, Deserialize)]
struct ConvertResponse {
    success: bool,
    #[serde(default)]
    solar_date: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Client for `GET /api/convert_date?date=YYYY-MM-DD`.
pub struct HttpSolarService {
    http: reqwest::Client,
    base_url: String,
}

impl HttpSolarService {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SolarDateService for HttpSolarService {
    async fn to_solar(&self, gregorian_date: &str) -> Result<String, CalendarError> {
        let url = format!("{}/api/convert_date", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("date", gregorian_date)])
            .send()
            .await
            .map_err(|e| CalendarError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CalendarError::Rejected(format!("status {}", status.as_u16())));
        }

        let body: ConvertResponse = response
            .json()
            .await
            .map_err(|e| CalendarError::Malformed(e.to_string()))?;
        read_response(body)
    }
}

fn read_response(body: ConvertResponse) -> Result<String, CalendarError> {
    match body {
        ConvertResponse {
            success: true,
            solar_date: Some(date),
            ..
        } if !date.trim().is_empty() => Ok(date),
        ConvertResponse { success: true, .. } => {
            Err(CalendarError::Malformed("missing solar_date".into()))
        }
        ConvertResponse { message, .. } => Err(CalendarError::Rejected(
            message.unwrap_or_else(|| "no message".into()),
        )),
    }
}

/// Remote-first converter. Never fails: the worst answer is `UNKNOWN_DATE`.
#[derive(Clone, Default)]
pub struct CalendarConverter {
    remote: Option<Arc<dyn SolarDateService>>,
}

impl CalendarConverter {
    pub fn new(remote: Arc<dyn SolarDateService>) -> Self {
        Self {
            remote: Some(remote),
        }
    }

    pub fn local_only() -> Self {
        Self { remote: None }
    }

    pub async fn convert(&self, gregorian_date: &str) -> String {
        match &self.remote {
            Some(remote) => match remote.to_solar(gregorian_date).await {
                Ok(solar) => {
                    debug!(gregorian_date, %solar, "converted by date service");
                    return solar;
                }
                Err(e) => {
                    warn!(gregorian_date, error = %e, "date service failed, using approximate conversion");
                }
            },
            None => warn!(gregorian_date, "no date service, using approximate conversion"),
        }
        approximate_solar(gregorian_date)
    }
}

/// Year minus 621, month and day unchanged, as `YYYY/MM/DD`.
pub fn approximate_solar(gregorian_date: &str) -> String {
    match parse_gregorian(gregorian_date) {
        Some(date) => format!(
            "{}/{:02}/{:02}",
            date.year() - SOLAR_YEAR_OFFSET,
            date.month(),
            date.day()
        ),
        None => UNKNOWN_DATE.to_string(),
    }
}

/// Reads the date part of `YYYY-MM-DD`, ISO-8601 and RFC 3339 strings.
pub fn parse_gregorian(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(input, format) {
            return Some(dt.date());
        }
    }
    // Timestamps with offsets chrono's RFC 3339 parser refuses, e.g. `+00`.
    let (date, rest) = (input.get(..10)?, input.get(10..)?);
    if rest.starts_with('T') || rest.starts_with(' ') {
        return NaiveDate::parse_from_str(date, "%Y-%m-%d").ok();
    }
    None
}

/// Full timestamp for ordering rows. Offsets are normalised to UTC and
/// plain dates sit at midnight.
pub fn parse_timestamp(input: &str) -> Option<NaiveDateTime> {
    let input = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.naive_utc());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(input, format) {
            return Some(dt);
        }
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f%#z", "%Y-%m-%d %H:%M:%S%.f%#z"] {
        if let Ok(dt) = DateTime::parse_from_str(input, format) {
            return Some(dt.naive_utc());
        }
    }
    parse_gregorian(input)?.and_hms_opt(0, 0, 0)
}
