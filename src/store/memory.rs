use anyhow::Result;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use tokio::sync::RwLock;

use super::{Filter, Record, Repository};

/// In-process store ordered by record id.
pub struct MemoryStore<T> {
    records: RwLock<BTreeMap<String, T>>,
}

impl<T: Record> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
        }
    }

    /// Creates a store pre-filled with `records`.
    pub fn with_records(records: impl IntoIterator<Item = T>) -> Self {
        Self {
            records: RwLock::new(
                records
                    .into_iter()
                    .map(|r| (r.id().to_string(), r))
                    .collect(),
            ),
        }
    }
}

impl<T: Record> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl<T: Record> Repository<T> for MemoryStore<T> {
    async fn get(&self, id: &str) -> Result<Option<T>> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn list(&self, filter: Filter<'_, T>) -> Result<Vec<T>> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|r| filter(r))
            .cloned()
            .collect())
    }

    async fn put(&self, record: T) -> Result<()> {
        self.records
            .write()
            .await
            .insert(record.id().to_string(), record);
        Ok(())
    }

    async fn insert(&self, record: T) -> Result<bool> {
        match self.records.write().await.entry(record.id().to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grading::types::Assignment;
    use crate::store::all;
    use chrono::Utc;

    fn assignment(id: &str, total: f64) -> Assignment {
        Assignment::new(id, total, Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let store = MemoryStore::new();
        store.put(assignment("a1", 10.0)).await.unwrap();

        let got = store.get("a1").await.unwrap().unwrap();
        assert_eq!(got.total_marks(), 10.0);
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_replaces() {
        let store = MemoryStore::with_records([assignment("a1", 10.0)]);
        store.put(assignment("a1", 20.0)).await.unwrap();

        let all_records = store.list(&all::<Assignment>).await.unwrap();
        assert_eq!(all_records.len(), 1);
        assert_eq!(all_records[0].total_marks(), 20.0);
    }

    #[tokio::test]
    async fn test_list_filters() {
        let store = MemoryStore::with_records([
            assignment("a1", 10.0),
            assignment("a2", 50.0),
            assignment("a3", 100.0),
        ]);
        let big = store.list(&|a: &Assignment| a.total_marks() >= 50.0).await.unwrap();
        let ids: Vec<_> = big.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a2", "a3"]);
    }

    #[tokio::test]
    async fn test_insert_keeps_existing_record() {
        let store = MemoryStore::new();
        assert!(store.insert(assignment("a1", 10.0)).await.unwrap());
        assert!(!store.insert(assignment("a1", 20.0)).await.unwrap());

        let got = store.get("a1").await.unwrap().unwrap();
        assert_eq!(got.total_marks(), 10.0);
    }

    #[tokio::test]
    async fn test_concurrent_inserts_admit_one() {
        let store = MemoryStore::new();
        let (first, second) = tokio::join!(
            store.insert(assignment("a1", 10.0)),
            store.insert(assignment("a1", 20.0)),
        );

        let admitted = [first.unwrap(), second.unwrap()];
        assert_eq!(admitted.iter().filter(|ok| **ok).count(), 1);
        assert_eq!(store.list(&all::<Assignment>).await.unwrap().len(), 1);
    }
}
