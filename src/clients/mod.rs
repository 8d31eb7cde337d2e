/// Injectable time source
pub mod clock;
/// Client-credentials token cache
pub mod credentials;
/// Artist identifiers and records
pub mod entities;
/// Error types and result aliases
pub mod errors;
/// HTTP transport abstraction and reqwest implementation
pub mod http;
/// Local storage using `DuckDB`
#[cfg(feature = "persistent-state")]
pub mod local_storage;
/// Spotify Web API client
pub mod spotify;
/// Key-value state store abstraction
pub mod state;

pub use credentials::{ClientCredentials, CredentialCache};
pub use entities::{ArtistId, ArtistRecord, RelatedArtistsResult, RelatedLimit};
#[cfg(feature = "persistent-state")]
pub use local_storage::LocalStorage;
pub use spotify::{ErrorMode, SpotifyClient};
pub use state::{MemoryStateStore, StateStore, StateValue};
