//! Local record store.
//!
//! A durable key-value store holding one JSON document per collection. Every
//! operation is asynchronous and is durable once it returns `Ok`.

mod libsql_store;
mod memory;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

pub use libsql_store::LibSqlStore;
pub use memory::MemoryStore;

/// Key holding the note collection
pub const NOTES_KEY: &str = "notes";
/// Key holding the message log
pub const MESSAGES_KEY: &str = "messages";
/// Key holding the exported API session cookie
pub const SESSION_KEY: &str = "session";

/// Trait for durable key-value storage
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the raw value stored under `key`
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`; removing a missing key is not an error
    async fn delete(&self, key: &str) -> Result<()>;

    /// Remove every key
    async fn clear(&self) -> Result<()>;
}

/// Read and decode the JSON document stored under `key`.
pub async fn get_json<T>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>>
where
    T: DeserializeOwned,
{
    match store.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Encode `value` as JSON and store it under `key`.
pub async fn set_json<T>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<()>
where
    T: Serialize + ?Sized + Sync,
{
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw).await
}
