//! Source-of-record (CRM) access.
//!
//! The CRM is only ever asked one question: which of these events are
//! published right now. An id missing from the answer means "not published".

use crate::cms::{classify, TransportError};
use crate::config::CrmConfig;
use catalog_sync_engine::{EntityId, SourceEntity};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::future::Future;

/// Answers "which of these events are currently published".
pub trait SourceOfRecord: Send + Sync {
    fn fetch_published(
        &self,
        ids: &[EntityId],
    ) -> impl Future<Output = Result<Vec<SourceEntity>, SourceError>> + Send;
}

/// A failed source-of-record query.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("CRM request timed out")]
    Timeout,

    #[error("CRM responded {status}: {body}")]
    Http { status: u16, body: String },

    #[error("CRM network error: {0}")]
    Network(String),

    #[error("unexpected CRM response: {0}")]
    Parse(String),
}

impl From<TransportError> for SourceError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout => SourceError::Timeout,
            TransportError::Network(msg) => SourceError::Network(msg),
        }
    }
}

/// `value` is required: an answer without it is not "nothing published".
#[derive(Debug, Deserialize)]
struct QueryResponse {
    value: Vec<SourceEntity>,
}

/// HTTP client for the CRM event query endpoint.
#[derive(Debug, Clone)]
pub struct CrmClient {
    query_url: String,
    api_token: String,
    http: Client,
}

impl CrmClient {
    pub fn new(config: &CrmConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("catalog-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            query_url: format!("{}/events/query", config.base_url.trim_end_matches('/')),
            api_token: config.api_token.clone(),
            http,
        })
    }
}

impl SourceOfRecord for CrmClient {
    async fn fetch_published(&self, ids: &[EntityId]) -> Result<Vec<SourceEntity>, SourceError> {
        tracing::debug!(count = ids.len(), "querying CRM");

        let response = self
            .http
            .post(&self.query_url)
            .bearer_auth(&self.api_token)
            .json(&json!({ "eventIds": ids }))
            .send()
            .await
            .map_err(|e| SourceError::from(classify(e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SourceError::from(classify(e)))?;
        if !status.is_success() {
            return Err(SourceError::Http {
                status: status.as_u16(),
                body,
            });
        }

        parse_query_response(&body)
    }
}

fn parse_query_response(body: &str) -> Result<Vec<SourceEntity>, SourceError> {
    serde_json::from_str::<QueryResponse>(body)
        .map(|response| response.value)
        .map_err(|e| SourceError::Parse(format!("{e}; body: {body}")))
}
