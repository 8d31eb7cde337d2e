//! Artistfeed - token-caching client for Spotify artist metadata
//!
//! This library obtains a bearer token with the client-credentials grant,
//! caches it in an injectable key-value store and uses it to look up artist
//! details and related artists.

/// Client modules for interacting with the catalog API and local state
pub mod clients;
/// Builder wiring the client from explicit parts and the environment
pub mod config;

pub use clients::errors::{Error, Result};
pub use config::ClientBuilder;
