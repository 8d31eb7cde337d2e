//! Client-credentials token cache
//!
//! A bearer token is obtained from the accounts service with the OAuth2
//! client-credentials grant and kept in the injected [`StateStore`] under two
//! entries (token and expiry). A stored token is reused, without any network
//! I/O, until its expiry passes.
//!
//! The two entries are written one after the other. If the second write fails
//! the first has already been applied, so the store may briefly pair a new
//! token with the previous expiry. Callers that need stronger guarantees must
//! supply a store that makes this impossible.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::clients::clock::{Clock, SystemClock};
use crate::clients::errors::{AuthError, Error};
use crate::clients::http::{DEFAULT_TIMEOUT, HttpClient, HttpRequest};
use crate::clients::state::{StateKeys, StateStore, StateValue};

/// Default token endpoint
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Application id and secret used for the client-credentials grant
#[derive(Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    client_secret: String,
}

impl ClientCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        ClientCredentials {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    // Read credentials from SPOTIFY_CLIENT_ID / SPOTIFY_CLIENT_SECRET or raise a configuration error
    pub fn from_env() -> Result<Self, Error> {
        let client_id = std::env::var("SPOTIFY_CLIENT_ID")
            .map_err(|e| Error::ConfigurationError(format!("SPOTIFY_CLIENT_ID: {e}")))?;
        let client_secret = std::env::var("SPOTIFY_CLIENT_SECRET")
            .map_err(|e| Error::ConfigurationError(format!("SPOTIFY_CLIENT_SECRET: {e}")))?;
        if client_id.is_empty() || client_secret.is_empty() {
            return Err(Error::ConfigurationError(
                "Spotify client id and secret must not be empty".into(),
            ));
        }
        Ok(Self::new(client_id, client_secret))
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// A bearer token and the Unix time (seconds) at which it stops being valid
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub expires_at: i64,
}

impl Credential {
    pub fn is_valid_at(&self, now: i64) -> bool {
        self.expires_at > now
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

pub struct CredentialCache {
    http: Arc<dyn HttpClient>,
    store: Arc<dyn StateStore>,
    clock: Arc<dyn Clock>,
    credentials: ClientCredentials,
    token_url: String,
    keys: StateKeys,
    timeout: Duration,
    // At most one token exchange in flight per cache
    refresh_lock: Mutex<()>,
}

impl CredentialCache {
    pub fn new(
        http: Arc<dyn HttpClient>,
        store: Arc<dyn StateStore>,
        credentials: ClientCredentials,
    ) -> Self {
        CredentialCache {
            http,
            store,
            clock: Arc::new(SystemClock),
            credentials,
            token_url: DEFAULT_TOKEN_URL.to_string(),
            keys: StateKeys::default(),
            timeout: DEFAULT_TIMEOUT,
            refresh_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    #[must_use]
    pub fn with_keys(mut self, keys: StateKeys) -> Self {
        self.keys = keys;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns a valid bearer token, exchanging client credentials if the
    /// stored one is missing or expired.
    pub async fn get_token(&self, cancel: &CancellationToken) -> Result<String, AuthError> {
        if let Some(credential) = self.cached_credential().await? {
            debug!("Using cached access token");
            return Ok(credential.access_token);
        }

        let _guard = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(AuthError::Cancelled),
            guard = self.refresh_lock.lock() => guard,
        };

        // Another caller may have refreshed while we waited for the lock
        if let Some(credential) = self.cached_credential().await? {
            debug!("Using access token refreshed by a concurrent caller");
            return Ok(credential.access_token);
        }

        let credential = self.exchange(cancel).await?;
        self.persist(&credential).await?;
        Ok(credential.access_token)
    }

    /// The stored credential, if present and not yet expired. Never touches the network.
    pub async fn cached_credential(&self) -> Result<Option<Credential>, AuthError> {
        // Reverse of the write order: a new expiry implies the new token is already stored
        let expires = self.store.get(&self.keys.expires).await?;
        let token = self.store.get(&self.keys.token).await?;

        let (Some(StateValue::Text(access_token)), Some(StateValue::Integer(expires_at))) =
            (token, expires)
        else {
            return Ok(None);
        };
        if access_token.is_empty() {
            return Ok(None);
        }

        let credential = Credential {
            access_token,
            expires_at,
        };
        if credential.is_valid_at(self.clock.unix_timestamp()) {
            Ok(Some(credential))
        } else {
            debug!("Cached access token expired at {expires_at}");
            Ok(None)
        }
    }

    async fn exchange(&self, cancel: &CancellationToken) -> Result<Credential, AuthError> {
        debug!(
            "Requesting access token for client {}",
            self.credentials.client_id
        );
        let request = HttpRequest::post(&self.token_url)
            .basic_auth(&self.credentials.client_id, &self.credentials.client_secret)
            .form(&[("grant_type", "client_credentials")])?
            .timeout(self.timeout);

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(AuthError::Cancelled),
            response = self.http.execute(request) => response?,
        };

        if response.status != 200 {
            warn!("Token endpoint returned status {}", response.status);
            return Err(AuthError::Status {
                status: response.status,
            });
        }

        let body: TokenResponse = response.json()?;
        let expires_at = self.clock.unix_timestamp().saturating_add(body.expires_in);
        Ok(Credential {
            access_token: body.access_token,
            expires_at,
        })
    }

    async fn persist(&self, credential: &Credential) -> Result<(), AuthError> {
        self.store
            .set(
                &self.keys.token,
                StateValue::Text(credential.access_token.clone()),
            )
            .await?;
        self.store
            .set(
                &self.keys.expires,
                StateValue::Integer(credential.expires_at),
            )
            .await?;
        info!(
            "Stored new access token, expires at {}",
            credential.expires_at
        );
        Ok(())
    }
}
