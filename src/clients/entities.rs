use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::clients::errors::Error;

/// Spotify artist identifier. Opaque, only required to be non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtistId(String);

impl ArtistId {
    pub fn new(id: impl Into<String>) -> Result<Self, Error> {
        let id = id.into();
        if id.is_empty() {
            return Err(Error::InvalidArtistId);
        }
        Ok(ArtistId(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for ArtistId {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        ArtistId::new(value)
    }
}

/// Number of related artists to request, always within `1..=20`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelatedLimit(u8);

impl RelatedLimit {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 20;

    /// Rejects values outside `1..=20` rather than clamping them
    pub fn new(limit: i64) -> Result<Self, Error> {
        match u8::try_from(limit) {
            Ok(l) if (Self::MIN..=Self::MAX).contains(&l) => Ok(RelatedLimit(l)),
            _ => Err(Error::InvalidLimit(limit)),
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for RelatedLimit {
    fn default() -> Self {
        RelatedLimit(10)
    }
}

/// Artist object exactly as returned by the catalog API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtistRecord(Map<String, Value>);

impl ArtistRecord {
    /// The sentinel returned when a lookup fails in lenient mode
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(Value::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for ArtistRecord {
    fn from(map: Map<String, Value>) -> Self {
        ArtistRecord(map)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelatedArtistsResult {
    #[serde(default)]
    pub artists: Vec<ArtistRecord>,
}

impl RelatedArtistsResult {
    /// The sentinel returned when a lookup fails in lenient mode
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.artists.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artist_id_rejects_only_empty() {
        assert!(matches!(ArtistId::new(""), Err(Error::InvalidArtistId)));
        // Passed through untouched, upstream decides what it means
        assert_eq!(ArtistId::new("  ").unwrap().as_str(), "  ");
        assert_eq!(ArtistId::new("abc123").unwrap().as_str(), "abc123");
    }

    #[test]
    fn limit_bounds_are_inclusive() {
        assert_eq!(RelatedLimit::new(1).unwrap().get(), 1);
        assert_eq!(RelatedLimit::new(20).unwrap().get(), 20);
        assert!(matches!(RelatedLimit::new(0), Err(Error::InvalidLimit(0))));
        assert!(matches!(RelatedLimit::new(21), Err(Error::InvalidLimit(21))));
        assert!(matches!(RelatedLimit::new(-3), Err(Error::InvalidLimit(-3))));
        assert!(matches!(
            RelatedLimit::new(300),
            Err(Error::InvalidLimit(300))
        ));
    }

    #[test]
    fn artist_record_keeps_unknown_fields() {
        let record: ArtistRecord =
            serde_json::from_str(r#"{"id":"x","name":"N","popularity":42}"#).unwrap();
        assert_eq!(record.id(), Some("x"));
        assert_eq!(record.name(), Some("N"));
        assert_eq!(record.get("popularity"), Some(&Value::from(42)));
    }

    #[test]
    fn artist_record_requires_an_object() {
        assert!(serde_json::from_str::<ArtistRecord>("[1,2]").is_err());
    }

    #[test]
    fn related_result_defaults_missing_artists() {
        let result: RelatedArtistsResult = serde_json::from_str("{}").unwrap();
        assert!(result.is_empty());
        assert!(serde_json::from_str::<RelatedArtistsResult>(r#"{"artists":[1]}"#).is_err());
    }
}
