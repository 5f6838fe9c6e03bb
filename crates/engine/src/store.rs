//! Storage contract for target records.
//!
//! Propagation only needs three operations from a module's store: fetch by
//! id, list, and a conditional notes update. The update is a compare-and-swap
//! on the record's `version` so two sessions appending to the same record
//! cannot overwrite each other.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{ResultEngine, TargetRecord};

pub use db::DbRecordStore;
pub use memory::MemoryRecordStore;

mod db;
mod memory;

/// Result of a conditional write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The notes were replaced and the version bumped.
    Written,
    /// The stored version moved on since the record was read.
    Stale,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, id: Uuid) -> ResultEngine<Option<TargetRecord>>;

    /// Records of one module (all modules when `None`), oldest first.
    async fn list(&self, module: Option<&str>) -> ResultEngine<Vec<TargetRecord>>;

    /// Replace the notes of `id` if its version is still `expected_version`.
    /// Every other field of the record is left as it is.
    async fn update_notes(
        &self,
        id: Uuid,
        expected_version: i64,
        notes: &str,
    ) -> ResultEngine<WriteOutcome>;
}
