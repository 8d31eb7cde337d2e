use std::sync::Arc;
use std::time::Duration;

use log::debug;

use crate::clients::{
    clock::Clock,
    credentials::{ClientCredentials, CredentialCache, DEFAULT_TOKEN_URL},
    errors::{Error, Result},
    http::{DEFAULT_TIMEOUT, HttpClient, ReqwestHttpClient},
    spotify::{DEFAULT_API_URL, ErrorMode, SpotifyClient},
    state::{MemoryStateStore, StateKeys, StateStore},
};

/// Environment variable overriding the accounts service base url
pub const ACCOUNTS_URL_VAR: &str = "SPOTIFY_ACCOUNTS_URL";
/// Environment variable overriding the Web API base url
pub const API_URL_VAR: &str = "SPOTIFY_API_URL";

/// Assembles a [`SpotifyClient`]. Anything left unset is filled from the
/// environment or a default when [`ClientBuilder::build`] runs.
#[derive(Default)]
pub struct ClientBuilder {
    http: Option<Arc<dyn HttpClient>>,
    store: Option<Arc<dyn StateStore>>,
    clock: Option<Arc<dyn Clock>>,
    credentials: Option<ClientCredentials>,
    token_url: Option<String>,
    api_url: Option<String>,
    keys: Option<StateKeys>,
    timeout: Option<Duration>,
    error_mode: Option<ErrorMode>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn http(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    #[must_use]
    pub fn store(mut self, store: Arc<dyn StateStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    #[must_use]
    pub fn credentials(mut self, credentials: ClientCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    #[must_use]
    pub fn token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = Some(token_url.into());
        self
    }

    #[must_use]
    pub fn api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = Some(api_url.into());
        self
    }

    #[must_use]
    pub fn keys(mut self, keys: StateKeys) -> Self {
        self.keys = Some(keys);
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = Some(mode);
        self
    }

    pub fn build(self) -> Result<SpotifyClient> {
        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        let http: Arc<dyn HttpClient> = match self.http {
            Some(h) => h,
            None => Arc::new(
                ReqwestHttpClient::with_timeout(timeout)
                    .map_err(|e| Error::ConfigurationError(e.to_string()))?,
            ),
        };
        let store: Arc<dyn StateStore> = match self.store {
            Some(s) => s,
            None => Arc::new(MemoryStateStore::new()),
        };
        let credentials = match self.credentials {
            Some(c) => c,
            None => ClientCredentials::from_env()?,
        };
        let token_url = match self.token_url {
            Some(u) => u,
            None => env_override(ACCOUNTS_URL_VAR)
                .map_or_else(|| DEFAULT_TOKEN_URL.to_string(), |base| {
                    format!("{}/api/token", base.trim_end_matches('/'))
                }),
        };
        let api_url = self
            .api_url
            .or_else(|| env_override(API_URL_VAR))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let error_mode = self.error_mode.unwrap_or_default();

        debug!("Token endpoint: {token_url}, API: {api_url}, error mode: {error_mode:?}");

        let mut cache = CredentialCache::new(http.clone(), store, credentials)
            .with_token_url(token_url)
            .with_keys(self.keys.unwrap_or_default())
            .with_timeout(timeout);
        if let Some(clock) = self.clock {
            cache = cache.with_clock(clock);
        }

        Ok(SpotifyClient::new(http, cache)
            .with_api_url(api_url)
            .with_error_mode(error_mode)
            .with_timeout(timeout))
    }
}

fn env_override(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_parts_need_no_environment() {
        let client = ClientBuilder::new()
            .credentials(ClientCredentials::new("id", "secret"))
            .api_url("http://localhost:1")
            .token_url("http://localhost:1/api/token")
            .error_mode(ErrorMode::Strict)
            .build()
            .unwrap();
        assert_eq!(client.error_mode(), ErrorMode::Strict);
    }
}
