//! Storage backends.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use async_trait::async_trait;
use defs_core::error::Result;

/// A flat key/value store of byte strings.
///
/// Writes to a single key are atomic; there are no multi-key transactions.
#[async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// Read the value under `key`, `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write `data` under `key`, replacing any previous value.
    async fn set(&self, key: &str, data: &[u8]) -> Result<()>;

    /// Delete `key`. Deleting an absent key succeeds.
    async fn remove(&self, key: &str) -> Result<()>;

    /// List every key starting with `prefix`, sorted.
    async fn keys(&self, prefix: &str) -> Result<Vec<String>>;
}
