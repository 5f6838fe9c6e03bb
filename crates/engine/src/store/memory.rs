use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{EngineError, ResultEngine, TargetRecord};

use super::{RecordStore, WriteOutcome};

/// In-process record store. Clones share the same records.
#[derive(Clone, Debug, Default)]
pub struct MemoryRecordStore {
    records: Arc<Mutex<HashMap<Uuid, TargetRecord>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, record: TargetRecord) -> ResultEngine<()> {
        let mut records = self.records.lock().await;
        if records.contains_key(&record.id) {
            return Err(EngineError::ExistingKey(record.id.to_string()));
        }
        records.insert(record.id, record);
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get(&self, id: Uuid) -> ResultEngine<Option<TargetRecord>> {
        Ok(self.records.lock().await.get(&id).cloned())
    }

    async fn list(&self, module: Option<&str>) -> ResultEngine<Vec<TargetRecord>> {
        let records = self.records.lock().await;
        let mut list: Vec<TargetRecord> = records
            .values()
            .filter(|r| module.is_none_or(|m| r.module == m))
            .cloned()
            .collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(list)
    }

    async fn update_notes(
        &self,
        id: Uuid,
        expected_version: i64,
        notes: &str,
    ) -> ResultEngine<WriteOutcome> {
        let mut records = self.records.lock().await;
        let record = records
            .get_mut(&id)
            .ok_or_else(|| EngineError::KeyNotFound("record not exists".to_string()))?;
        if record.version != expected_version {
            return Ok(WriteOutcome::Stale);
        }
        record.notes = Some(notes.to_string());
        record.version += 1;
        record.updated_at = Utc::now();
        Ok(WriteOutcome::Written)
    }
}

#[cfg(test)]
mod tests {
    use crate::Money;

    use super::*;

    #[tokio::test]
    async fn stale_version_is_rejected() {
        let store = MemoryRecordStore::new();
        let record = TargetRecord::new("targets", "Car".to_string(), Money::major(10), None);
        let id = record.id;
        store.insert(record).await.unwrap();

        assert_eq!(store.update_notes(id, 0, "{}").await.unwrap(), WriteOutcome::Written);
        assert_eq!(store.update_notes(id, 0, "{\"x\":1}").await.unwrap(), WriteOutcome::Stale);

        let stored = store.get(id).await.unwrap().unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.notes.as_deref(), Some("{}"));
        assert_eq!(stored.name, "Car");
    }

    #[tokio::test]
    async fn list_filters_by_module() {
        let store = MemoryRecordStore::new();
        store
            .insert(TargetRecord::new("targets", "A".to_string(), Money::ZERO, None))
            .await
            .unwrap();
        store
            .insert(TargetRecord::new("loan-ledger", "B".to_string(), Money::ZERO, None))
            .await
            .unwrap();
        assert_eq!(store.list(Some("targets")).await.unwrap().len(), 1);
        assert_eq!(store.list(None).await.unwrap().len(), 2);
    }
}
