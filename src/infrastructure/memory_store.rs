// In-memory history store
use crate::application::history_store::HistoryStore;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    entries: RwLock<HashMap<String, Bytes>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Bytes>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Bytes) -> anyhow::Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_overwrites() {
        let store = MemoryHistoryStore::new();
        assert!(store.get("A1").await.unwrap().is_none());

        store.put("A1", Bytes::from_static(b"first")).await.unwrap();
        store.put("A1", Bytes::from_static(b"second")).await.unwrap();
        assert_eq!(store.get("A1").await.unwrap(), Some(Bytes::from_static(b"second")));
    }
}
