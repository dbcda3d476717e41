//! HTTP client for the roster collection endpoint.
//!
//! Mirrors what the roster page does: fetch the whole document, change it
//! locally, send the whole document back.

use reqwest::{header, StatusCode};
use serde_json::Value;
use thiserror::Error;

use crate::types::Roster;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A fetched document plus the `ETag` the server sent with it.
#[derive(Debug, Clone)]
pub struct Fetched<T> {
    pub value: T,
    pub etag: Option<String>,
}

#[derive(Clone)]
pub struct CollectionClient {
    http: reqwest::Client,
    endpoint: String,
}

impl CollectionClient {
    /// `base_url` like `http://127.0.0.1:3000`, `api_prefix` like `/api`.
    pub fn new(base_url: &str, api_prefix: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, api_prefix)
    }

    pub fn with_client(http: reqwest::Client, base_url: &str, api_prefix: &str) -> Self {
        let endpoint = format!("{}{}", base_url.trim_end_matches('/'), api_prefix);
        Self { http, endpoint }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn fetch_document(&self) -> Result<Fetched<Value>, ClientError> {
        let res = self.http.get(&self.endpoint).send().await?;
        let res = ensure_success(res).await?;
        let etag = etag_of(&res);
        let bytes = res.bytes().await?;
        let value = serde_json::from_slice(&bytes)?;
        Ok(Fetched { value, etag })
    }

    /// Replace the whole document. With `if_match`, the server rejects the
    /// write when the stored document changed since that `ETag` was issued.
    /// Returns the new `ETag`.
    pub async fn replace_document(
        &self,
        doc: &Value,
        if_match: Option<&str>,
    ) -> Result<Option<String>, ClientError> {
        let mut req = self.http.post(&self.endpoint).json(doc);
        if let Some(tag) = if_match {
            req = req.header(header::IF_MATCH, tag);
        }
        let res = ensure_success(req.send().await?).await?;
        Ok(etag_of(&res))
    }

    pub async fn fetch_roster(&self) -> Result<Fetched<Roster>, ClientError> {
        let fetched = self.fetch_document().await?;
        let value = serde_json::from_value(fetched.value)?;
        Ok(Fetched { value, etag: fetched.etag })
    }

    pub async fn save_roster(
        &self,
        roster: &Roster,
        if_match: Option<&str>,
    ) -> Result<Option<String>, ClientError> {
        let doc = serde_json::to_value(roster)?;
        self.replace_document(&doc, if_match).await
    }

    /// Fetch, append one student, save conditionally on the fetched `ETag`.
    pub async fn add_student(&self, name: &str) -> Result<Roster, ClientError> {
        let Fetched { value: mut roster, etag } = self.fetch_roster().await?;
        if roster.add_student(name) {
            self.save_roster(&roster, etag.as_deref()).await?;
        }
        Ok(roster)
    }
}

async fn ensure_success(res: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().await.unwrap_or_default();
    Err(ClientError::Status { status, body })
}

fn etag_of(res: &reqwest::Response) -> Option<String> {
    res.headers()
        .get(header::ETAG)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
