//! Request and response bodies of the REST API.
//!
//! Amounts travel as integer minor units (`amount_minor`, paise for INR).
//! Notes payloads are sent and returned as JSON objects in the same
//! camelCase format they are stored in.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Inr,
    Usd,
    Eur,
    Gbp,
}

impl Currency {
    pub fn code(self) -> &'static str {
        match self {
            Self::Inr => "INR",
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
        }
    }
}

pub mod account {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum AccountKind {
        Cash,
        Card,
        Bank,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountNew {
        pub name: String,
        pub kind: AccountKind,
        pub currency: Option<Currency>,
        /// Opening balance, or the credit limit of a card.
        #[serde(default)]
        pub baseline_minor: i64,
        pub owner: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct AccountUpdate {
        pub name: Option<String>,
        pub owner: Option<String>,
        pub baseline_minor: Option<i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Account {
        pub id: Uuid,
        pub name: String,
        pub kind: AccountKind,
        pub currency: Currency,
        pub baseline_minor: i64,
        pub owner: Option<String>,
    }
}

pub mod transaction {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PayingFor {
        pub module: String,
        pub reference_id: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionNew {
        pub account_id: Uuid,
        /// Type tag: `income`, `expense`, `credit`, `debit`, ...
        pub kind: String,
        pub amount_minor: i64,
        pub date: NaiveDate,
        pub category: Option<String>,
        pub sub_category: Option<String>,
        pub merchant: Option<String>,
        pub description: Option<String>,
        pub payment_mode: Option<String>,
        pub paying_for: Option<PayingFor>,
    }

    /// Absent fields keep their stored value.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionUpdate {
        pub kind: Option<String>,
        pub amount_minor: Option<i64>,
        pub date: Option<NaiveDate>,
        pub category: Option<String>,
        pub sub_category: Option<String>,
        pub merchant: Option<String>,
        pub description: Option<String>,
        pub payment_mode: Option<String>,
        pub paying_for: Option<PayingFor>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Transaction {
        pub id: Uuid,
        pub account_id: Uuid,
        pub kind: String,
        pub amount_minor: i64,
        pub date: NaiveDate,
        pub category: Option<String>,
        pub sub_category: Option<String>,
        pub merchant: Option<String>,
        pub description: Option<String>,
        pub payment_mode: Option<String>,
        pub paying_for: Option<PayingFor>,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum PropagationStatus {
        /// Nothing to propagate.
        Skipped,
        /// The linked record was updated.
        Applied,
        /// The linked record already held this transaction.
        AlreadyApplied,
        /// No handler for the module.
        Unsupported,
        /// The transaction is saved but the linked record was not updated.
        Failed,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PropagationReport {
        pub status: PropagationStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub module: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub record_id: Option<Uuid>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub linked_record_id: Option<Uuid>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub warning: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionSaved {
        pub id: Uuid,
        pub propagation: PropagationReport,
    }
}

pub mod record {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RecordNew {
        pub module: String,
        pub name: String,
        /// Loan principal, target amount, bill amount...
        #[serde(default)]
        pub principal_minor: i64,
        pub notes: Option<Value>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RecordUpdate {
        /// Version the edit was made against.
        pub version: i64,
        pub name: Option<String>,
        pub principal_minor: Option<i64>,
        pub notes: Option<Value>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct RecordList {
        pub module: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Record {
        pub id: Uuid,
        pub module: String,
        pub name: String,
        pub principal_minor: i64,
        /// Decoded notes payload. Unreadable notes come back as `{}`.
        pub notes: Value,
        pub version: i64,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }
}

pub mod ledger {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Effect {
        Increase,
        Decrease,
        Informational,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct StatementRow {
        pub transaction: transaction::Transaction,
        pub effect: Effect,
        pub running_balance_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Statement {
        pub account: account::Account,
        pub rows: Vec<StatementRow>,
        pub current_balance_minor: i64,
    }

    /// A row to reconcile without saving it. `amount` is in major units and
    /// may be a number or a string; unreadable amounts have no effect.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct PreviewRow {
        #[serde(rename = "type")]
        pub type_tag: String,
        #[serde(default)]
        pub amount: Value,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PreviewRequest {
        pub kind: account::AccountKind,
        #[serde(default)]
        pub baseline_minor: i64,
        pub rows: Vec<PreviewRow>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PreviewResponse {
        pub current_balance_minor: i64,
        pub running_balance_minor: Vec<i64>,
    }
}

pub mod import {
    use super::*;

    /// Already-parsed spreadsheet rows: header → cell.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ImportRequest {
        pub rows: Vec<serde_json::Map<String, Value>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ImportResponse {
        pub imported: usize,
        pub skipped: usize,
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
