//! Thin wrapper over `reqwest` shared by the routing providers and the
//! freight broker client.
//!
//! Responses are handed back as status plus raw body text: providers keep
//! the raw payload for diagnostics and decide themselves what a failure is.

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{debug, trace, warn};

#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// First characters of the body, for log lines.
    pub fn preview(&self) -> &str {
        let mut end = self.body.len().min(200);
        while !self.body.is_char_boundary(end) {
            end -= 1;
        }
        &self.body[..end]
    }
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GET with query parameters encoded by reqwest.
    pub async fn get_with_params<P: Serialize + ?Sized>(
        &self,
        url: &str,
        params: &P,
    ) -> Result<RawResponse, String> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| describe_error(&e))?;
        read_body(response).await
    }

    /// GET on a url whose query string is already encoded.
    pub async fn get_url(&self, url: &str) -> Result<RawResponse, String> {
        trace!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| describe_error(&e))?;
        read_body(response).await
    }

    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        headers: HeaderMap,
    ) -> Result<RawResponse, String> {
        debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(body)
            .send()
            .await
            .map_err(|e| describe_error(&e))?;
        read_body(response).await
    }
}

async fn read_body(response: reqwest::Response) -> Result<RawResponse, String> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| format!("failed to read response body: {}", e))?;
    debug!("Received response: HTTP {} ({} bytes)", status, body.len());
    if !status.is_success() {
        warn!(
            "HTTP {}: {}",
            status,
            status.canonical_reason().unwrap_or("Unknown")
        );
    }
    Ok(RawResponse { status, body })
}

fn describe_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("request timed out: {}", err)
    } else if err.is_connect() {
        format!("connection failed: {}", err)
    } else {
        format!("request failed: {}", err)
    }
}
