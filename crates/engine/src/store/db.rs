use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{DatabaseConnection, QueryFilter, QueryOrder, prelude::*, sea_query::Expr};
use uuid::Uuid;

use crate::{ResultEngine, TargetRecord, records};

use super::{RecordStore, WriteOutcome};

/// Record store backed by the `target_records` table.
#[derive(Clone, Debug)]
pub struct DbRecordStore {
    database: DatabaseConnection,
}

impl DbRecordStore {
    pub fn new(database: DatabaseConnection) -> Self {
        Self { database }
    }
}

#[async_trait]
impl RecordStore for DbRecordStore {
    async fn get(&self, id: Uuid) -> ResultEngine<Option<TargetRecord>> {
        records::Entity::find_by_id(id.to_string())
            .one(&self.database)
            .await?
            .map(TargetRecord::try_from)
            .transpose()
    }

    async fn list(&self, module: Option<&str>) -> ResultEngine<Vec<TargetRecord>> {
        let mut query = records::Entity::find();
        if let Some(module) = module {
            query = query.filter(records::Column::Module.eq(module));
        }
        query
            .order_by_asc(records::Column::CreatedAt)
            .order_by_asc(records::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(TargetRecord::try_from)
            .collect()
    }

    async fn update_notes(
        &self,
        id: Uuid,
        expected_version: i64,
        notes: &str,
    ) -> ResultEngine<WriteOutcome> {
        let result = records::Entity::update_many()
            .col_expr(records::Column::Notes, Expr::value(notes.to_string()))
            .col_expr(
                records::Column::Version,
                Expr::col(records::Column::Version).add(1),
            )
            .col_expr(records::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(records::Column::Id.eq(id.to_string()))
            .filter(records::Column::Version.eq(expected_version))
            .exec(&self.database)
            .await?;

        Ok(if result.rows_affected == 1 {
            WriteOutcome::Written
        } else {
            WriteOutcome::Stale
        })
    }
}
