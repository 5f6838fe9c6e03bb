use chrono::Utc;
use uuid::Uuid;

use sea_orm::{QueryFilter, TransactionTrait, prelude::*, sea_query::Expr};

use crate::{
    EngineError, Module, NewRecord, RecordUpdate, ResultEngine, TargetRecord,
    notes::NotesPayload,
    records,
    store::RecordStore,
    util::normalize_required_name,
};

use super::{Engine, with_tx};

fn record_not_found() -> EngineError {
    EngineError::KeyNotFound("record not exists".to_string())
}

impl Engine {
    /// Create a target record. Initial notes must fit the module's schema;
    /// their derived fields are filled in from the principal.
    pub async fn new_record(&self, cmd: NewRecord) -> ResultEngine<TargetRecord> {
        let module = Module::try_from(cmd.module.as_str())?;
        let name = normalize_required_name(&cmd.name, "record")?;
        let notes = cmd
            .notes
            .map(|value| {
                let mut payload = NotesPayload::parse(module, value)?;
                payload.refresh(cmd.principal)?;
                payload.encode()
            })
            .transpose()?;

        let record = TargetRecord::new(module.as_str(), name, cmd.principal, notes);
        records::ActiveModel::from(&record)
            .insert(&self.database)
            .await?;
        tracing::info!("{module} record {} created", record.id);
        Ok(record)
    }

    pub async fn record(&self, record_id: Uuid) -> ResultEngine<TargetRecord> {
        self.record_store()
            .get(record_id)
            .await?
            .ok_or_else(record_not_found)
    }

    /// Records of one module, or of every module when `module` is `None`.
    pub async fn records(&self, module: Option<&str>) -> ResultEngine<Vec<TargetRecord>> {
        let module = module.map(Module::try_from).transpose()?;
        self.record_store()
            .list(module.map(Module::as_str))
            .await
    }

    /// Apply a user edit, provided nobody wrote the record since the user read
    /// it. A changed principal refreshes the derived fields of the notes.
    pub async fn update_record(
        &self,
        record_id: Uuid,
        update: RecordUpdate,
    ) -> ResultEngine<TargetRecord> {
        let name = update
            .name
            .as_deref()
            .map(|name| normalize_required_name(name, "record"))
            .transpose()?;

        with_tx!(self, |db_tx| {
            let model = records::Entity::find_by_id(record_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(record_not_found)?;
            let mut record = TargetRecord::try_from(model)?;
            if record.version != update.expected_version {
                return Err(stale_edit(record_id, record.version));
            }
            let module = Module::try_from(record.module.as_str())?;

            if let Some(name) = name {
                record.name = name;
            }
            if let Some(principal) = update.principal {
                record.principal = principal;
            }
            let payload = match update.notes {
                Some(value) => Some(NotesPayload::parse(module, value)?),
                None if update.principal.is_some() && record.notes.is_some() => {
                    Some(NotesPayload::decode(module, record.notes.as_deref()))
                }
                None => None,
            };
            if let Some(mut payload) = payload {
                payload.refresh(record.principal)?;
                record.notes = Some(payload.encode()?);
            }

            let now = Utc::now();
            let result = records::Entity::update_many()
                .col_expr(records::Column::Name, Expr::value(record.name.clone()))
                .col_expr(
                    records::Column::PrincipalMinor,
                    Expr::value(record.principal.minor()),
                )
                .col_expr(records::Column::Notes, Expr::value(record.notes.clone()))
                .col_expr(
                    records::Column::Version,
                    Expr::col(records::Column::Version).add(1),
                )
                .col_expr(records::Column::UpdatedAt, Expr::value(now))
                .filter(records::Column::Id.eq(record_id.to_string()))
                .filter(records::Column::Version.eq(update.expected_version))
                .exec(&db_tx)
                .await?;
            if result.rows_affected != 1 {
                return Err(stale_edit(record_id, update.expected_version));
            }

            record.version = update.expected_version + 1;
            record.updated_at = now;
            Ok(record)
        })
    }
}

fn stale_edit(record_id: Uuid, version: i64) -> EngineError {
    EngineError::Conflict(format!(
        "record {record_id} changed since version {version}, reload it"
    ))
}
