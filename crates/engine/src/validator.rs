//! HTML conformance checking against a Nu HTML Checker instance

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngineError, EngineResult};

pub const DEFAULT_VALIDATOR_URL: &str = "https://validator.w3.org/nu/";

/// One finding reported by the checker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationMessage {
    /// `error`, `info` or `non-document-error`
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, rename = "subType", skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,

    #[serde(default)]
    pub message: String,

    #[serde(default, rename = "lastLine", skip_serializing_if = "Option::is_none")]
    pub last_line: Option<u64>,
}

impl ValidationMessage {
    pub fn is_error(&self) -> bool {
        self.kind == "error"
    }
}

/// Number of `error` messages; a document is valid when this is zero.
pub fn error_count(messages: &[ValidationMessage]) -> usize {
    messages.iter().filter(|m| m.is_error()).count()
}

#[async_trait]
pub trait MarkupValidator: Send + Sync {
    async fn validate(&self, html: &str) -> EngineResult<Vec<ValidationMessage>>;
}

#[derive(Debug, Deserialize)]
struct NuResponse {
    #[serde(default)]
    messages: Vec<ValidationMessage>,
}

/// Client for the Nu HTML Checker JSON API
pub struct NuValidator {
    endpoint: String,
    client: reqwest::Client,
}

impl NuValidator {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> EngineResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("sitecheck/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }
}

#[async_trait]
impl MarkupValidator for NuValidator {
    async fn validate(&self, html: &str) -> EngineResult<Vec<ValidationMessage>> {
        debug!("Validating {} bytes of markup at {}", html.len(), self.endpoint);

        let resp = self
            .client
            .post(&self.endpoint)
            .query(&[("out", "json")])
            .header(reqwest::header::CONTENT_TYPE, "text/html; charset=utf-8")
            .body(html.to_string())
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(EngineError::Validator(format!(
                "checker returned {}",
                resp.status()
            )));
        }

        let body: NuResponse = resp.json().await?;
        Ok(body.messages)
    }
}
