use thiserror::Error;

/// Result alias used throughout the client
pub type Result<T> = std::result::Result<T, Error>;

/// Transport-level failure: the request never produced an HTTP response
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HttpError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timed out")]
    Timeout,
}

/// Failure of the injected key-value state store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("State store error on '{key}': {reason}")]
pub struct StoreError {
    pub key: String,
    pub reason: String,
}

impl StoreError {
    pub fn new(key: impl Into<String>, reason: impl Into<String>) -> Self {
        StoreError {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Token could not be obtained. Always fatal to the calling operation.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Token endpoint returned status {status}")]
    Status { status: u16 },

    #[error("Token endpoint unreachable: {0}")]
    Transport(#[from] HttpError),

    #[error("Token response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Credential storage failed: {0}")]
    Storage(#[from] StoreError),

    #[error("Token request cancelled")]
    Cancelled,
}

/// Resource lookup failed. Recoverable at the boundary in lenient mode.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Catalog API returned status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Catalog API unreachable: {0}")]
    Transport(#[from] HttpError),

    #[error("Catalog API response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Catalog request cancelled")]
    Cancelled,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Authorization error: {0}")]
    Auth(#[from] AuthError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Artist id must not be empty")]
    InvalidArtistId,

    #[error("Limit {0} is out of range, expected 1..=20")]
    InvalidLimit(i64),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] StoreError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl From<std::env::VarError> for Error {
    fn from(err: std::env::VarError) -> Self {
        Error::ConfigurationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_status_is_reported_with_code() {
        let err = Error::from(AuthError::Status { status: 500 });
        assert_eq!(
            err.to_string(),
            "Authorization error: Token endpoint returned status 500"
        );
    }

    #[test]
    fn missing_env_var_is_a_configuration_error() {
        let err = Error::from(std::env::VarError::NotPresent);
        assert!(matches!(err, Error::ConfigurationError(_)));
    }
}
