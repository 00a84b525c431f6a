//! HTTP client for the Host control plane
//!
//! One-shot requests return loosely typed JSON; `subscribe` opens an SSE
//! endpoint and hands back the raw byte stream after the status check, so
//! the watch engine owns all framing decisions.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use reqwest::header::ACCEPT;
use reqwest::{Method, RequestBuilder};
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::{ApiError, Result};

/// Query parameters for a request
pub type Params = Vec<(String, String)>;

/// Client for the Host API
#[derive(Debug, Clone)]
pub struct ApiClient {
    config: ClientConfig,
    http: reqwest::Client,
}

impl ApiClient {
    /// Create a client from resolved configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        url::Url::parse(&config.base_url).map_err(|e| ApiError::InvalidUrl {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;

        let http = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .user_agent(concat!("planectl/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { config, http })
    }

    /// Base URL this client talks to.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Issue a request and decode the response body.
    ///
    /// Returns `Value::Null` for empty bodies and the raw text as a JSON
    /// string when the body is not valid JSON.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        params: &Params,
        body: Option<&Value>,
    ) -> Result<Value> {
        let mut builder = self
            .authorize(self.http.request(method.clone(), self.join(path)))
            .header(ACCEPT, "application/json")
            .timeout(self.config.timeout);
        if !params.is_empty() {
            builder = builder.query(params);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        tracing::debug!(%method, path, "request");
        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::from_body(status.as_u16(), text));
        }
        if text.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }

    pub async fn get(&self, path: &str, params: &Params) -> Result<Value> {
        self.request(Method::GET, path, params, None).await
    }

    pub async fn post(&self, path: &str, body: Option<&Value>) -> Result<Value> {
        self.request(Method::POST, path, &Vec::new(), body).await
    }

    pub async fn patch(&self, path: &str, body: Option<&Value>) -> Result<Value> {
        self.request(Method::PATCH, path, &Vec::new(), body).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value> {
        self.request(Method::DELETE, path, &Vec::new(), None).await
    }

    /// Open an SSE subscription.
    ///
    /// Fails with `ApiError::Status` before yielding anything when the
    /// server answers non-2xx. No timeout is applied to the body: the
    /// stream stays open until the server closes it or the subscription
    /// is dropped, which releases the connection.
    pub async fn subscribe(&self, path: &str, params: &Params) -> Result<EventSubscription> {
        let mut builder = self
            .authorize(self.http.get(self.join(path)))
            .header(ACCEPT, "text/event-stream");
        if !params.is_empty() {
            builder = builder.query(params);
        }

        tracing::debug!(path, "subscribe");
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::from_body(status.as_u16(), text));
        }
        Ok(EventSubscription {
            inner: Box::pin(response.bytes_stream()),
        })
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.config.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn join(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// An open SSE channel: raw byte chunks from one stream endpoint.
pub struct EventSubscription {
    inner: Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>,
}

impl std::fmt::Debug for EventSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSubscription").finish_non_exhaustive()
    }
}

impl Stream for EventSubscription {
    type Item = reqwest::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}
