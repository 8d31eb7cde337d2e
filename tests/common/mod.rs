#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use artistfeed::ClientBuilder;
use artistfeed::clients::{
    ClientCredentials, ErrorMode, SpotifyClient, StateStore, StateValue,
    clock::FixedClock,
    credentials::{CredentialCache, DEFAULT_TOKEN_URL},
    errors::{HttpError, StoreError},
    http::{HttpClient, HttpRequest, HttpResponse},
    spotify::DEFAULT_API_URL,
};
use async_trait::async_trait;
use mockall::mock;

pub const NOW: i64 = 1_700_000_000;
pub const BASIC_AUTH: &str = "Basic Y2xpZW50LWlkOmNsaWVudC1zZWNyZXQ=";
pub const TOKEN_RESPONSE: &str =
    r#"{"access_token":"fresh-token","token_type":"Bearer","expires_in":3600}"#;

mock! {
    pub Http {}

    #[async_trait]
    impl HttpClient for Http {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Get(String),
    Set(String, StateValue),
}

/// In-memory store that records every operation and can be told to fail writes to one key
#[derive(Default)]
pub struct RecordingStore {
    values: Mutex<HashMap<String, StateValue>>,
    ops: Mutex<Vec<StoreOp>>,
    failing_key: Mutex<Option<String>>,
}

impl RecordingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_credential(token: &str, expires_at: i64) -> Arc<Self> {
        let store = Self::default();
        {
            let mut values = store.values.lock().unwrap();
            values.insert("token".into(), StateValue::Text(token.into()));
            values.insert("expires".into(), StateValue::Integer(expires_at));
        }
        Arc::new(store)
    }

    pub fn fail_writes_to(&self, key: &str) {
        *self.failing_key.lock().unwrap() = Some(key.to_string());
    }

    pub fn value(&self, key: &str) -> Option<StateValue> {
        self.values.lock().unwrap().get(key).cloned()
    }

    pub fn writes(&self) -> Vec<StoreOp> {
        self.ops
            .lock()
            .unwrap()
            .iter()
            .filter(|op| matches!(op, StoreOp::Set(..)))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl StateStore for RecordingStore {
    async fn get(&self, key: &str) -> Result<Option<StateValue>, StoreError> {
        self.ops.lock().unwrap().push(StoreOp::Get(key.to_string()));
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: StateValue) -> Result<(), StoreError> {
        if self.failing_key.lock().unwrap().as_deref() == Some(key) {
            return Err(StoreError::new(key, "disk full"));
        }
        self.ops
            .lock()
            .unwrap()
            .push(StoreOp::Set(key.to_string(), value.clone()));
        self.values.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }
}

/// Token endpoint fake that takes a while to answer and counts calls
pub struct SlowTokenEndpoint {
    pub calls: AtomicUsize,
    pub delay: Duration,
}

impl SlowTokenEndpoint {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(SlowTokenEndpoint {
            calls: AtomicUsize::new(0),
            delay,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpClient for SlowTokenEndpoint {
    async fn execute(&self, _request: HttpRequest) -> Result<HttpResponse, HttpError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(HttpResponse::new(200, TOKEN_RESPONSE))
    }
}

pub fn credentials() -> ClientCredentials {
    ClientCredentials::new("client-id", "client-secret")
}

pub fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::at(NOW).unwrap())
}

pub fn cache(http: Arc<dyn HttpClient>, store: Arc<dyn StateStore>) -> CredentialCache {
    CredentialCache::new(http, store, credentials())
        .with_token_url(DEFAULT_TOKEN_URL)
        .with_clock(clock())
}

pub fn client(
    http: Arc<dyn HttpClient>,
    store: Arc<dyn StateStore>,
    mode: ErrorMode,
) -> SpotifyClient {
    ClientBuilder::new()
        .http(http)
        .store(store)
        .clock(clock())
        .credentials(credentials())
        .token_url(DEFAULT_TOKEN_URL)
        .api_url(DEFAULT_API_URL)
        .error_mode(mode)
        .build()
        .unwrap()
}

pub fn is_token_request(request: &HttpRequest) -> bool {
    request.url == DEFAULT_TOKEN_URL
}

/// Wraps a store so that the first read returns its value only after a delay,
/// letting another caller's writes land in between two reads of the same lookup
pub struct SlowFirstReadStore {
    pub inner: Arc<RecordingStore>,
    delay: Duration,
    first_read: AtomicBool,
}

impl SlowFirstReadStore {
    pub fn new(inner: Arc<RecordingStore>, delay: Duration) -> Arc<Self> {
        Arc::new(SlowFirstReadStore {
            inner,
            delay,
            first_read: AtomicBool::new(true),
        })
    }
}

#[async_trait]
impl StateStore for SlowFirstReadStore {
    async fn get(&self, key: &str) -> Result<Option<StateValue>, StoreError> {
        let value = self.inner.get(key).await?;
        if self.first_read.swap(false, Ordering::SeqCst) {
            tokio::time::sleep(self.delay).await;
        }
        Ok(value)
    }

    async fn set(&self, key: &str, value: StateValue) -> Result<(), StoreError> {
        self.inner.set(key, value).await
    }
}
