//! HTTP transport for the hosted backend.
//!
//! `Transport` is the seam between request building (in `client`) and the
//! wire. `ReqwestTransport` speaks to the PostgREST-style backend; tests
//! swap in scripted fakes.

use super::LookupError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RestRequest {
    pub method: Method,
    pub url: String,
    /// Sent in this exact order.
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Whether to send the backend `apikey`/bearer headers.
    pub authenticated: bool,
}

impl RestRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            query: Vec::new(),
            body: None,
            authenticated: true,
        }
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            query: Vec::new(),
            body: Some(body),
            authenticated: true,
        }
    }

    pub fn param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn unauthenticated(mut self) -> Self {
        self.authenticated = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestResponse {
    pub status: u16,
    pub body: String,
}

impl RestResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Only connectivity problems are errors; any HTTP status is a response.
    async fn send(&self, request: RestRequest) -> Result<RestResponse, LookupError>;
}

pub struct ReqwestTransport {
    http: reqwest::Client,
    auth_headers: HeaderMap,
}

impl ReqwestTransport {
    pub fn new(api_key: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        let mut auth_headers = HeaderMap::new();
        auth_headers.insert("apikey", HeaderValue::from_str(api_key)?);
        auth_headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))?,
        );

        Ok(Self { http, auth_headers })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: RestRequest) -> Result<RestResponse, LookupError> {
        debug!(method = ?request.method, url = %request.url, query = ?request.query, "backend request");

        let builder = match request.method {
            Method::Get => self.http.get(&request.url),
            Method::Post => self.http.post(&request.url),
        };
        let mut builder = builder
            .query(&request.query)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json");
        if request.authenticated {
            builder = builder.headers(self.auth_headers.clone());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| LookupError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| LookupError::Network(e.to_string()))?;

        debug!(status, bytes = body.len(), "backend response");
        Ok(RestResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn params_keep_insertion_order() {
        let request = RestRequest::get("http://backend/rest/v1/plan_phase")
            .param("select", "*")
            .param("plan_id", "eq.7");
        assert_eq!(
            request.query,
            vec![
                ("select".to_string(), "*".to_string()),
                ("plan_id".to_string(), "eq.7".to_string()),
            ]
        );
        assert!(request.authenticated);
    }

    #[test]
    fn post_requests_carry_body() {
        let request =
            RestRequest::post("http://api/api/insert_national_id", json!({"a": 1})).unauthenticated();
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.body, Some(json!({"a": 1})));
        assert!(!request.authenticated);
    }

    #[test]
    fn only_2xx_is_success() {
        let ok = RestResponse { status: 201, body: String::new() };
        let not_found = RestResponse { status: 404, body: String::new() };
        assert!(ok.is_success());
        assert!(!not_found.is_success());
    }
}
