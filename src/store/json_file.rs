use anyhow::{Context, Result};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

use super::{Filter, Record, Repository};

/// Stores all records of one type as a pretty-printed JSON array.
///
/// A missing file reads as an empty store. Writes go to a sibling temp file
/// that is renamed over the original, and are serialized within the process.
pub struct JsonFileStore<T> {
    path: PathBuf,
    write_lock: Mutex<()>,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> JsonFileStore<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
            _record: PhantomData,
        }
    }

    /// Store at `<dir>/<kind>s.json`, e.g. `data/submissions.json`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(format!("{}s.json", T::KIND)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<T>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to read {}", self.path.display()));
            }
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {} records in {}", T::KIND, self.path.display()))
    }

    async fn save(&self, records: &[T]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let body = serde_json::to_vec_pretty(records)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body)
            .await
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("failed to replace {}", self.path.display()))?;

        debug!(path = %self.path.display(), count = records.len(), kind = T::KIND, "Store saved");
        Ok(())
    }
}

#[async_trait::async_trait]
impl<T: Record> Repository<T> for JsonFileStore<T> {
    async fn get(&self, id: &str) -> Result<Option<T>> {
        Ok(self.load().await?.into_iter().find(|r| r.id() == id))
    }

    async fn list(&self, filter: Filter<'_, T>) -> Result<Vec<T>> {
        Ok(self
            .load()
            .await?
            .into_iter()
            .filter(|r| filter(r))
            .collect())
    }

    async fn put(&self, record: T) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.load().await?;
        match records.iter_mut().find(|r| r.id() == record.id()) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }

        self.save(&records).await
    }

    async fn insert(&self, record: T) -> Result<bool> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.load().await?;
        if records.iter().any(|r| r.id() == record.id()) {
            return Ok(false);
        }
        records.push(record);

        self.save(&records).await?;
        Ok(true)
    }
}
