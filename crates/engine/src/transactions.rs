//! Transaction primitives.
//!
//! A `Transaction` belongs to one account and moves its balance in the
//! direction given by its type tag (see [`crate::ledger`]). The amount is
//! always positive.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, Money, ResultEngine,
    util::{ensure_positive_amount, normalize_optional_text, normalize_type_tag, parse_uuid},
};

/// Pointer from a transaction to the record in another module the
/// transaction pays toward.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayingFor {
    pub module: String,
    pub reference_id: String,
}

impl PayingFor {
    pub fn new(module: impl Into<String>, reference_id: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            reference_id: reference_id.into(),
        }
    }

    /// A reference with a blank module name points nowhere.
    pub fn is_empty(&self) -> bool {
        self.module.trim().is_empty()
    }
}

/// Free-text fields shared by every transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxMeta {
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub merchant: Option<String>,
    pub description: Option<String>,
    /// How the money moved (`upi`, `cash`, `cheque`, ...).
    pub payment_mode: Option<String>,
}

impl TxMeta {
    fn normalized(self) -> Self {
        Self {
            category: normalize_optional_text(self.category.as_deref()),
            sub_category: normalize_optional_text(self.sub_category.as_deref()),
            merchant: normalize_optional_text(self.merchant.as_deref()),
            description: normalize_optional_text(self.description.as_deref()),
            payment_mode: normalize_optional_text(self.payment_mode.as_deref()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub account_id: Uuid,
    /// Lowercase type tag (`income`, `expense`, `credit`, ...).
    pub kind: String,
    pub amount: Money,
    pub date: NaiveDate,
    pub meta: TxMeta,
    pub paying_for: Option<PayingFor>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        account_id: Uuid,
        kind: &str,
        amount: Money,
        date: NaiveDate,
        meta: TxMeta,
        paying_for: Option<PayingFor>,
    ) -> ResultEngine<Self> {
        ensure_positive_amount(amount)?;
        Ok(Self {
            id: Uuid::new_v4(),
            account_id,
            kind: normalize_type_tag(kind)?,
            amount,
            date,
            meta: meta.normalized(),
            paying_for: paying_for.filter(|p| !p.is_empty()),
            created_at: Utc::now(),
        })
    }

    /// Label recorded in a target record's payment history.
    pub fn source(&self) -> &str {
        self.meta
            .merchant
            .as_deref()
            .or(self.meta.description.as_deref())
            .unwrap_or_default()
    }
}

/// Fields a user may change on an existing transaction. `None` keeps the
/// stored value.
#[derive(Clone, Debug, Default)]
pub struct TransactionUpdate {
    pub kind: Option<String>,
    pub amount: Option<Money>,
    pub date: Option<NaiveDate>,
    pub meta: Option<TxMeta>,
    pub paying_for: Option<PayingFor>,
}

impl Transaction {
    pub(crate) fn apply_update(&mut self, update: TransactionUpdate) -> ResultEngine<()> {
        if let Some(kind) = update.kind {
            self.kind = normalize_type_tag(&kind)?;
        }
        if let Some(amount) = update.amount {
            ensure_positive_amount(amount)?;
            self.amount = amount;
        }
        if let Some(date) = update.date {
            self.date = date;
        }
        if let Some(meta) = update.meta {
            self.meta = meta.normalized();
        }
        if let Some(paying_for) = update.paying_for {
            self.paying_for = Some(paying_for).filter(|p| !p.is_empty());
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub account_id: String,
    pub kind: String,
    pub amount_minor: i64,
    pub date: Date,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub merchant: Option<String>,
    pub description: Option<String>,
    pub payment_mode: Option<String>,
    pub paying_for_module: Option<String>,
    pub paying_for_id: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Accounts,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        let (module, reference) = match &tx.paying_for {
            Some(p) => (Some(p.module.clone()), Some(p.reference_id.clone())),
            None => (None, None),
        };
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            account_id: ActiveValue::Set(tx.account_id.to_string()),
            kind: ActiveValue::Set(tx.kind.clone()),
            amount_minor: ActiveValue::Set(tx.amount.minor()),
            date: ActiveValue::Set(tx.date),
            category: ActiveValue::Set(tx.meta.category.clone()),
            sub_category: ActiveValue::Set(tx.meta.sub_category.clone()),
            merchant: ActiveValue::Set(tx.meta.merchant.clone()),
            description: ActiveValue::Set(tx.meta.description.clone()),
            payment_mode: ActiveValue::Set(tx.meta.payment_mode.clone()),
            paying_for_module: ActiveValue::Set(module),
            paying_for_id: ActiveValue::Set(reference),
            created_at: ActiveValue::Set(tx.created_at),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let paying_for = match (model.paying_for_module, model.paying_for_id) {
            (Some(module), Some(reference_id)) => Some(PayingFor {
                module,
                reference_id,
            }),
            _ => None,
        };
        Ok(Self {
            id: parse_uuid(&model.id, "transaction")?,
            account_id: parse_uuid(&model.account_id, "account")?,
            kind: model.kind,
            amount: Money::new(model.amount_minor),
            date: model.date,
            meta: TxMeta {
                category: model.category,
                sub_category: model.sub_category,
                merchant: model.merchant,
                description: model.description,
                payment_mode: model.payment_mode,
            },
            paying_for: paying_for.filter(|p| !p.is_empty()),
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()
    }

    #[test]
    fn new_rejects_non_positive_amounts() {
        let account = Uuid::new_v4();
        let err = Transaction::new(account, "expense", Money::ZERO, date(), TxMeta::default(), None)
            .unwrap_err();
        assert_eq!(err, EngineError::InvalidAmount("amount must be > 0".to_string()));
        assert!(
            Transaction::new(account, "expense", Money::new(-5), date(), TxMeta::default(), None)
                .is_err()
        );
    }

    #[test]
    fn new_normalizes_tag_and_drops_blank_reference() {
        let tx = Transaction::new(
            Uuid::new_v4(),
            "  Income ",
            Money::major(10),
            date(),
            TxMeta::default(),
            Some(PayingFor::new("", "abc")),
        )
        .unwrap();
        assert_eq!(tx.kind, "income");
        assert!(tx.paying_for.is_none());
    }

    #[test]
    fn source_prefers_merchant_then_description() {
        let mut tx = Transaction::new(
            Uuid::new_v4(),
            "expense",
            Money::major(10),
            date(),
            TxMeta {
                description: Some("EMI April".to_string()),
                ..TxMeta::default()
            },
            None,
        )
        .unwrap();
        assert_eq!(tx.source(), "EMI April");
        tx.meta.merchant = Some("HDFC".to_string());
        assert_eq!(tx.source(), "HDFC");
    }

    #[test]
    fn update_keeps_untouched_fields() {
        let mut tx = Transaction::new(
            Uuid::new_v4(),
            "expense",
            Money::major(10),
            date(),
            TxMeta::default(),
            None,
        )
        .unwrap();
        tx.apply_update(TransactionUpdate {
            amount: Some(Money::major(25)),
            ..TransactionUpdate::default()
        })
        .unwrap();
        assert_eq!(tx.amount, Money::major(25));
        assert_eq!(tx.kind, "expense");
        assert_eq!(tx.date, date());
    }
}
