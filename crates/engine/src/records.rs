//! Target records: loans, savings targets, investments, deposits, bills and
//! the other records a transaction can pay toward.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, ResultEngine, util::parse_uuid};

/// A record owned by one of the target modules.
///
/// `notes` holds the module's JSON accumulator (see [`crate::notes`]).
/// `version` grows by one on every write and guards concurrent
/// read-modify-write cycles.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRecord {
    pub id: Uuid,
    pub module: String,
    pub name: String,
    /// Loan principal, target amount, bill amount... depending on the module.
    pub principal: Money,
    pub notes: Option<String>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TargetRecord {
    pub fn new(module: &str, name: String, principal: Money, notes: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            module: module.to_string(),
            name,
            principal,
            notes,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "target_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub module: String,
    pub name: String,
    pub principal_minor: i64,
    pub notes: Option<String>,
    pub version: i64,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&TargetRecord> for ActiveModel {
    fn from(value: &TargetRecord) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            module: ActiveValue::Set(value.module.clone()),
            name: ActiveValue::Set(value.name.clone()),
            principal_minor: ActiveValue::Set(value.principal.minor()),
            notes: ActiveValue::Set(value.notes.clone()),
            version: ActiveValue::Set(value.version),
            created_at: ActiveValue::Set(value.created_at),
            updated_at: ActiveValue::Set(value.updated_at),
        }
    }
}

impl TryFrom<Model> for TargetRecord {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: parse_uuid(&model.id, "record")?,
            module: model.module,
            name: model.name,
            principal: Money::new(model.principal_minor),
            notes: model.notes,
            version: model.version,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
