use std::path::{Path, PathBuf};

use async_duckdb::ClientBuilder;
use async_duckdb::duckdb::OptionalExt;
use async_duckdb::duckdb::params;
use async_trait::async_trait;
use log::debug;

use crate::clients::errors::{Error, StoreError};
use crate::clients::state::{StateStore, StateValue};

const STATE_TABLE: &str = "client_state";

/// `StateStore` persisted in a local `DuckDB` file, so a cached token
/// survives process restarts
pub struct LocalStorage {
    client: async_duckdb::Client,
}

impl LocalStorage {
    pub fn new(client: async_duckdb::Client) -> Self {
        LocalStorage { client }
    }

    pub async fn open(db_path: &Path) -> Result<Self, Error> {
        let client = ClientBuilder::new()
            .path(db_path)
            .open()
            .await
            .map_err(|e| StoreError::new(db_path.display().to_string(), e.to_string()))?;
        debug!("Opened local storage database at {db_path:?}");
        let storage = LocalStorage { client };
        storage.init_db().await?;
        Ok(storage)
    }

    pub async fn try_default() -> Result<Self, Error> {
        let db_path = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp")) // Fallback to /tmp if cache directory can't be determined
            .join(".artistfeed_state.duckdb");
        Self::open(&db_path).await
    }

    pub async fn init_db(&self) -> Result<(), Error> {
        let table_query = format!(
            "
            CREATE TABLE IF NOT EXISTS {STATE_TABLE} (
                key TEXT PRIMARY KEY,
                text_value TEXT,
                int_value BIGINT
            );
        "
        );
        self.client
            .conn(move |conn| conn.execute_batch(&table_query))
            .await
            .map_err(|e| StoreError::new(STATE_TABLE, e.to_string()))?;

        debug!("Successfully initialized local storage database");
        Ok(())
    }
}

#[async_trait]
impl StateStore for LocalStorage {
    async fn get(&self, key: &str) -> Result<Option<StateValue>, StoreError> {
        let query = format!("SELECT text_value, int_value FROM {STATE_TABLE} WHERE key = ?1;");
        let key_owned = key.to_string();

        let row = self
            .client
            .conn(move |conn| {
                conn.query_row(&query, [key_owned], |row| {
                    Ok((row.get::<_, Option<String>>(0)?, row.get::<_, Option<i64>>(1)?))
                })
                .optional()
            })
            .await
            .map_err(|e| StoreError::new(key, e.to_string()))?;

        Ok(match row {
            Some((Some(text), _)) => Some(StateValue::Text(text)),
            Some((None, Some(int))) => Some(StateValue::Integer(int)),
            _ => None,
        })
    }

    async fn set(&self, key: &str, value: StateValue) -> Result<(), StoreError> {
        let query = format!(
            "INSERT OR REPLACE INTO {STATE_TABLE} (key, text_value, int_value) VALUES (?1, ?2, ?3);"
        );
        let key_owned = key.to_string();
        let (text, int) = match value {
            StateValue::Text(s) => (Some(s), None),
            StateValue::Integer(i) => (None, Some(i)),
        };

        self.client
            .conn(move |conn| conn.execute(&query, params![key_owned, text, int]))
            .await
            .map_err(|e| StoreError::new(key, e.to_string()))?;

        debug!("Stored state entry '{key}'");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn values_are_overwritten_per_key() {
        let db_path = std::env::temp_dir().join(format!(
            "artistfeed-state-{}-{}.duckdb",
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        let storage = LocalStorage::open(&db_path).await.unwrap();

        storage
            .set("token", StateValue::Text("abc".into()))
            .await
            .unwrap();
        storage
            .set("expires", StateValue::Integer(1_700_000_000))
            .await
            .unwrap();
        storage
            .set("expires", StateValue::Integer(1_800_000_000))
            .await
            .unwrap();

        assert_eq!(
            storage.get("token").await.unwrap(),
            Some(StateValue::Text("abc".into()))
        );
        assert_eq!(
            storage.get("expires").await.unwrap(),
            Some(StateValue::Integer(1_800_000_000))
        );
        assert_eq!(storage.get("missing").await.unwrap(), None);
    }
}
