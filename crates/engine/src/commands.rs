//! Command structs for engine operations.
//!
//! These types group parameters for write operations, keeping call sites
//! readable and avoiding long argument lists.

use chrono::NaiveDate;
use serde_json::Value;
use uuid::Uuid;

use crate::{AccountKind, Currency, Money, PayingFor, TxMeta};

/// Create an account.
#[derive(Clone, Debug)]
pub struct NewAccount {
    pub name: String,
    pub kind: AccountKind,
    pub currency: Currency,
    pub baseline: Money,
    pub owner: Option<String>,
}

impl NewAccount {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: AccountKind) -> Self {
        Self {
            name: name.into(),
            kind,
            currency: Currency::default(),
            baseline: Money::ZERO,
            owner: None,
        }
    }

    #[must_use]
    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    #[must_use]
    pub fn baseline(mut self, baseline: Money) -> Self {
        self.baseline = baseline;
        self
    }

    #[must_use]
    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }
}

/// Edit an account. `None` keeps the stored value.
#[derive(Clone, Debug, Default)]
pub struct AccountUpdate {
    pub name: Option<String>,
    pub owner: Option<String>,
    pub baseline: Option<Money>,
}

/// Record a transaction on an account.
#[derive(Clone, Debug)]
pub struct TransactionCmd {
    pub account_id: Uuid,
    /// Type tag, matched case-insensitively.
    pub kind: String,
    pub amount: Money,
    pub date: NaiveDate,
    pub meta: TxMeta,
    pub paying_for: Option<PayingFor>,
}

impl TransactionCmd {
    #[must_use]
    pub fn new(account_id: Uuid, kind: impl Into<String>, amount: Money, date: NaiveDate) -> Self {
        Self {
            account_id,
            kind: kind.into(),
            amount,
            date,
            meta: TxMeta::default(),
            paying_for: None,
        }
    }

    #[must_use]
    pub fn meta(mut self, meta: TxMeta) -> Self {
        self.meta = meta;
        self
    }

    #[must_use]
    pub fn paying_for(mut self, module: impl Into<String>, reference_id: impl Into<String>) -> Self {
        self.paying_for = Some(PayingFor::new(module, reference_id));
        self
    }
}

/// Create a target record.
#[derive(Clone, Debug)]
pub struct NewRecord {
    pub module: String,
    pub name: String,
    pub principal: Money,
    /// Initial notes. Must fit the module's schema.
    pub notes: Option<Value>,
}

impl NewRecord {
    #[must_use]
    pub fn new(module: impl Into<String>, name: impl Into<String>, principal: Money) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
            principal,
            notes: None,
        }
    }

    #[must_use]
    pub fn notes(mut self, notes: Value) -> Self {
        self.notes = Some(notes);
        self
    }
}

/// A user edit of a target record. Applied only if the record is still at
/// `expected_version`.
#[derive(Clone, Debug)]
pub struct RecordUpdate {
    pub expected_version: i64,
    pub name: Option<String>,
    pub principal: Option<Money>,
    /// Replaces the whole notes payload.
    pub notes: Option<Value>,
}

impl RecordUpdate {
    #[must_use]
    pub fn new(expected_version: i64) -> Self {
        Self {
            expected_version,
            name: None,
            principal: None,
            notes: None,
        }
    }
}
