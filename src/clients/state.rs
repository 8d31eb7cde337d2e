//! Key-value state used to persist the cached credential

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::clients::errors::StoreError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateValue {
    Text(String),
    Integer(i64),
}

impl StateValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            StateValue::Text(s) => Some(s),
            StateValue::Integer(_) => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            StateValue::Integer(i) => Some(*i),
            StateValue::Text(_) => None,
        }
    }
}

/// Generic get/set store supplied by the embedding application.
///
/// Writes are independent: the store offers no transaction across keys.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<StateValue>, StoreError>;

    async fn set(&self, key: &str, value: StateValue) -> Result<(), StoreError>;
}

/// Names of the two entries holding the credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateKeys {
    pub token: String,
    pub expires: String,
}

impl Default for StateKeys {
    fn default() -> Self {
        StateKeys {
            token: "token".to_string(),
            expires: "expires".to_string(),
        }
    }
}

/// In-memory store, lives as long as the process
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    values: RwLock<HashMap<String, StateValue>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get(&self, key: &str) -> Result<Option<StateValue>, StoreError> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: StateValue) -> Result<(), StoreError> {
        self.values.write().await.insert(key.to_string(), value);
        Ok(())
    }
}
