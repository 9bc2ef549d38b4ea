// Key-value store trait backing the vehicle history cache
use async_trait::async_trait;
use bytes::Bytes;

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Raw stored value for `key`, or None when nothing was stored yet
    async fn get(&self, key: &str) -> anyhow::Result<Option<Bytes>>;

    /// Stores `value` under `key`, replacing any previous value
    async fn put(&self, key: &str, value: Bytes) -> anyhow::Result<()>;
}
