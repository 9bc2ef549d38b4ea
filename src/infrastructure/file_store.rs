// File-backed history store - One JSON document per vehicle
use crate::application::history_store::HistoryStore;
use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct FileHistoryStore {
    directory: PathBuf,
}

impl FileHistoryStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // keys are vehicle ids; keep them from escaping the cache directory
        let file_name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.directory.join(format!("{file_name}.json"))
    }
}

#[async_trait]
impl HistoryStore for FileHistoryStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Bytes>> {
        let path = self.path_for(key);
        match tokio::fs::read(&path).await {
            Ok(contents) => Ok(Some(Bytes::from(contents))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    async fn put(&self, key: &str, value: Bytes) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.directory)
            .await
            .with_context(|| format!("Failed to create {}", self.directory.display()))?;

        // write-then-rename so readers never see a half written record
        let path = self.path_for(key);
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, &value)
            .await
            .with_context(|| format!("Failed to write {}", staging.display()))?;
        tokio::fs::rename(&staging, &path)
            .await
            .with_context(|| format!("Failed to replace {}", path.display()))?;

        Ok(())
    }
}
