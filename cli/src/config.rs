//! Runtime configuration shared by the data client, the calendar
//! converter and the chat runtime.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BACKEND_URL: &str = "https://woobghuekrbzilcdmijv.supabase.co";
pub const DEFAULT_API_SERVER_URL: &str = "http://localhost:8002";
pub const DEFAULT_DATE_SERVICE_URL: &str = "http://localhost:8001";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LOG_FILE: &str = "zeema-chat.log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub backend_url: String,
    pub api_key: String,
    pub api_server_url: String,
    /// `None` runs the converter on the local approximation only.
    pub date_service_url: Option<String>,
    pub timeline_enabled: bool,
    pub request_timeout: Duration,
    pub log_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            api_key: String::new(),
            api_server_url: DEFAULT_API_SERVER_URL.to_string(),
            date_service_url: Some(DEFAULT_DATE_SERVICE_URL.to_string()),
            timeline_enabled: true,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}
