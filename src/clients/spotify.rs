use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::clients::{
    credentials::CredentialCache,
    entities::{ArtistId, ArtistRecord, RelatedArtistsResult, RelatedLimit},
    errors::{ApiError, Error, Result},
    http::{DEFAULT_TIMEOUT, HttpClient, HttpRequest},
};

/// Default Web API base
pub const DEFAULT_API_URL: &str = "https://api.spotify.com";

/// What a failed resource lookup turns into
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorMode {
    /// Log the failure and hand back an empty result
    #[default]
    Lenient,
    /// Return the `ApiError` to the caller
    Strict,
}

pub struct SpotifyClient {
    http: Arc<dyn HttpClient>,
    credentials: CredentialCache,
    api_url: String,
    mode: ErrorMode,
    timeout: Duration,
}

impl SpotifyClient {
    pub fn new(http: Arc<dyn HttpClient>, credentials: CredentialCache) -> Self {
        SpotifyClient {
            http,
            credentials,
            api_url: DEFAULT_API_URL.to_string(),
            mode: ErrorMode::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    #[must_use]
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn credentials(&self) -> &CredentialCache {
        &self.credentials
    }

    pub fn error_mode(&self) -> ErrorMode {
        self.mode
    }

    // Fetch a single artist: GET /v1/artists/{id}
    pub async fn get_artist(
        &self,
        artist: &ArtistId,
        cancel: &CancellationToken,
    ) -> Result<ArtistRecord> {
        let token = self.credentials.get_token(cancel).await?;
        let url = self.resource_url(&["v1", "artists", artist.as_str()], None)?;

        match self.fetch::<ArtistRecord>(url, &token, cancel).await {
            Ok(record) => Ok(record),
            Err(e) => self.recover(e, "artist data", ArtistRecord::empty),
        }
    }

    // Fetch artists similar to the given one: GET /v1/artists/{id}/related-artists?limit=n
    pub async fn get_related_artists(
        &self,
        artist: &ArtistId,
        limit: RelatedLimit,
        cancel: &CancellationToken,
    ) -> Result<RelatedArtistsResult> {
        let token = self.credentials.get_token(cancel).await?;
        let url = self.resource_url(
            &["v1", "artists", artist.as_str(), "related-artists"],
            Some(("limit", limit.get().to_string())),
        )?;

        match self.fetch::<RelatedArtistsResult>(url, &token, cancel).await {
            Ok(related) => Ok(related),
            Err(e) => self.recover(e, "related artists", RelatedArtistsResult::empty),
        }
    }

    fn resource_url(&self, segments: &[&str], query: Option<(&str, String)>) -> Result<Url> {
        let mut url = Url::parse(&self.api_url)
            .map_err(|e| Error::ConfigurationError(format!("Invalid API url: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| Error::ConfigurationError("API url cannot be a base".into()))?
            .pop_if_empty()
            .extend(segments);
        if let Some((key, value)) = query {
            url.query_pairs_mut().append_pair(key, &value);
        }
        Ok(url)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        url: Url,
        token: &str,
        cancel: &CancellationToken,
    ) -> std::result::Result<T, ApiError> {
        let request = HttpRequest::get(url.as_str())
            .bearer_token(token)
            .timeout(self.timeout);

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ApiError::Cancelled),
            response = self.http.execute(request) => response?,
        };

        if response.status != 200 {
            if response.status == 401 {
                debug!("Access token rejected by the API, it stays cached until it expires");
            }
            return Err(ApiError::Status {
                status: response.status,
                url: url.to_string(),
            });
        }

        Ok(response.json()?)
    }

    fn recover<T>(&self, err: ApiError, what: &str, empty: impl FnOnce() -> T) -> Result<T> {
        match (self.mode, err) {
            (_, ApiError::Cancelled) => Err(Error::Api(ApiError::Cancelled)),
            (ErrorMode::Strict, err) => Err(Error::Api(err)),
            (ErrorMode::Lenient, err) => {
                warn!("Unable to get {what}: {err}");
                Ok(empty())
            }
        }
    }
}
