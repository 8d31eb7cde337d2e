//! Outbound HTTP transport
//!
//! The client talks to the network only through the [`HttpClient`] trait so
//! that tests can substitute a mock and assert on the exact requests sent.
//! [`ReqwestHttpClient`] is the production implementation.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use log::debug;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::clients::errors::HttpError;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("artistfeed/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Bytes>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        HttpRequest {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn bearer_token(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {token}"))
    }

    #[must_use]
    pub fn basic_auth(self, username: &str, password: &str) -> Self {
        let encoded = STANDARD.encode(format!("{username}:{password}"));
        self.header("Authorization", format!("Basic {encoded}"))
    }

    /// Sets an `application/x-www-form-urlencoded` body
    pub fn form<T: Serialize + ?Sized>(mut self, form: &T) -> Result<Self, HttpError> {
        let encoded = serde_urlencoded::to_string(form)
            .map_err(|e| HttpError::Transport(format!("form encoding failed: {e}")))?;
        self.body = Some(Bytes::from(encoded));
        Ok(self.header("Content-Type", "application/x-www-form-urlencoded"))
    }

    #[must_use]
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        HttpResponse {
            status,
            body: body.into(),
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Async HTTP transport.
///
/// Implementations return every response that arrived, whatever its status.
/// Only failures to obtain a response are errors.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

/// Reqwest-based transport with connection pooling and rustls
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Result<Self, HttpError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, HttpError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| HttpError::Transport(e.to_string()))?;
        Ok(ReqwestHttpClient { client })
    }

    pub fn with_client(client: Client) -> Self {
        ReqwestHttpClient { client }
    }

    fn build_request(&self, request: HttpRequest) -> reqwest::RequestBuilder {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        };
        let mut req = self.client.request(method, &request.url);
        for (key, value) in request.headers {
            req = req.header(key, value);
        }
        if let Some(body) = request.body {
            req = req.body(body);
        }
        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }
        req
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        debug!("{:?} {}", request.method, request.url);
        let response = self
            .build_request(request)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        debug!("Received status {status} ({} bytes)", body.len());
        Ok(HttpResponse { status, body })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> HttpError {
    if err.is_timeout() {
        HttpError::Timeout
    } else {
        HttpError::Transport(err.to_string())
    }
}
