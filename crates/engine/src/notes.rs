//! Notes payload codec.
//!
//! Target records keep their payment history as a JSON document in a text
//! column. Every reader and writer of that column goes through this module:
//!
//! - [`decode_object`] / [`decode`] never fail. Missing, empty or malformed
//!   payloads read as the empty payload.
//! - [`encode`] is plain `serde_json` serialization.
//!
//! Each module has its own typed payload (see [`NotesPayload`]). All of them
//! share the same accumulator shape: an append-only list of
//! [`PaymentEntry`] plus a running total. Fields a payload does not know
//! about are kept in `extra` and written back untouched.

use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::{EngineError, Module, Money, ResultEngine};

/// Version stamped on every payload this engine writes. Payloads without a
/// `schemaVersion` predate it and read as version 0.
pub const SCHEMA_VERSION: u32 = 1;

/// Decode a raw payload as a JSON object.
pub fn decode_object(raw: Option<&str>) -> Map<String, Value> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Map::new();
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            tracing::debug!("notes payload is not an object ({other}), using empty payload");
            Map::new()
        }
        Err(err) => {
            tracing::debug!("notes payload is not valid JSON ({err}), using empty payload");
            Map::new()
        }
    }
}

/// Decode a raw payload into a typed payload, falling back to the default.
pub fn decode<T: DeserializeOwned + Default>(raw: Option<&str>) -> T {
    let object = decode_object(raw);
    if object.is_empty() {
        return T::default();
    }
    serde_json::from_value(Value::Object(object)).unwrap_or_else(|err| {
        tracing::debug!("notes payload does not fit its schema ({err}), using empty payload");
        T::default()
    })
}

pub fn encode<T: Serialize + ?Sized>(value: &T) -> ResultEngine<String> {
    serde_json::to_string(value).map_err(|err| EngineError::InvalidNotes(err.to_string()))
}

fn money_or_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Money, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(Money::from_json(&value).unwrap_or_default())
}

fn text_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Optional fields written by older clients may hold anything; unreadable
/// values read as absent instead of discarding the whole payload.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// One payment, contribution, purchase or deposit.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentEntry {
    /// `YYYY-MM-DD` for entries written by the engine.
    #[serde(deserialize_with = "text_or_empty")]
    pub date: String,
    #[serde(deserialize_with = "money_or_zero")]
    pub amount: Money,
    #[serde(deserialize_with = "text_or_empty")]
    pub source: String,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Shared behaviour of the typed payloads.
pub trait Accumulator: Serialize + DeserializeOwned + Default {
    fn entries(&self) -> &[PaymentEntry];
    fn entries_mut(&mut self) -> &mut Vec<PaymentEntry>;
    fn total(&self) -> Money;
    fn set_total(&mut self, total: Money);
    fn set_schema_version(&mut self, version: u32);

    /// Whether a transaction already has an entry in this payload.
    fn records(&self, transaction_id: &str) -> bool {
        self.entries()
            .iter()
            .any(|entry| entry.transaction_id.as_deref() == Some(transaction_id))
    }

    /// Append one entry and carry the total forward. Returns the new total.
    /// A total that no longer fits is rejected and the payload is left as it
    /// was.
    fn push(&mut self, entry: PaymentEntry) -> ResultEngine<Money> {
        let total = self
            .total()
            .checked_add(entry.amount)
            .ok_or_else(|| EngineError::InvalidAmount("running total overflows".to_string()))?;
        self.entries_mut().push(entry);
        self.set_total(total);
        self.set_schema_version(SCHEMA_VERSION);
        Ok(total)
    }
}

/// Declares a typed payload with its list field, its total field and any
/// module-specific optional fields.
macro_rules! accumulator {
    (
        $(#[$meta:meta])*
        $name:ident {
            entries: $entries:ident,
            total: $total:ident
            $(, $(#[$fmeta:meta])* $field:ident: $ty:ty)* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase", default)]
        pub struct $name {
            pub schema_version: u32,
            pub $entries: Vec<PaymentEntry>,
            #[serde(deserialize_with = "money_or_zero")]
            pub $total: Money,
            $(
                $(#[$fmeta])*
                #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
                pub $field: Option<$ty>,
            )*
            #[serde(flatten)]
            pub extra: Map<String, Value>,
        }

        impl Accumulator for $name {
            fn entries(&self) -> &[PaymentEntry] {
                &self.$entries
            }

            fn entries_mut(&mut self) -> &mut Vec<PaymentEntry> {
                &mut self.$entries
            }

            fn total(&self) -> Money {
                self.$total
            }

            fn set_total(&mut self, total: Money) {
                self.$total = total;
            }

            fn set_schema_version(&mut self, version: u32) {
                self.schema_version = version;
            }
        }
    };
}

accumulator!(
    /// Plain payment history (`project-expense`, `cheque-register`, `daily-cash`).
    PaymentLedger {
        entries: payments,
        total: total_paid,
    }
);

accumulator!(
    /// `loan-ledger`: `balanceAmount` is what is still owed.
    LoanNotes {
        entries: payments,
        total: total_paid,
        balance_amount: Money,
    }
);

accumulator!(
    /// `targets`: `remaining` is what is left to reach the target.
    TargetNotes {
        entries: payments,
        total: total_paid,
        remaining: Money,
    }
);

accumulator!(
    /// `nps-investments`.
    ContributionNotes {
        entries: contributions,
        total: total_contributed,
    }
);

accumulator!(
    /// `gold-investments`.
    PurchaseNotes {
        entries: purchases,
        total: total_invested,
    }
);

accumulator!(
    /// `rd-fd-deposits`.
    DepositNotes {
        entries: deposits,
        total: total_deposited,
    }
);

accumulator!(
    /// `manage-finance` scheduled expense.
    ScheduledExpenseNotes {
        entries: payments,
        total: total_paid,
        paid: bool,
        paid_date: String,
        paid_amount: Money,
        payment_method: String,
    }
);

accumulator!(
    /// `bill-dates` checklist entry. `manageFinanceId` links the bill to the
    /// scheduled expense it settles.
    BillNotes {
        entries: payments,
        total: total_paid,
        status: BillStatus,
        manage_finance_id: String,
    }
);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillStatus {
    /// Never written by propagation; accepted from stored or user-edited
    /// payloads.
    Pending,
    Partial,
    Paid,
}

/// What is left of `principal` after `paid`. Overpayment goes negative.
pub fn outstanding(principal: Money, paid: Money) -> ResultEngine<Money> {
    principal
        .checked_sub(paid)
        .ok_or_else(|| EngineError::InvalidAmount("outstanding amount overflows".to_string()))
}

pub fn bill_status(total_paid: Money, bill_amount: Money) -> BillStatus {
    if total_paid >= bill_amount {
        BillStatus::Paid
    } else {
        BillStatus::Partial
    }
}

/// The typed payload of any module.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NotesPayload {
    Payments(PaymentLedger),
    Loan(LoanNotes),
    Target(TargetNotes),
    Contributions(ContributionNotes),
    Purchases(PurchaseNotes),
    Deposits(DepositNotes),
    ScheduledExpense(ScheduledExpenseNotes),
    Bill(BillNotes),
}

macro_rules! each_payload {
    ($payload:expr, $notes:ident => $body:expr) => {
        match $payload {
            NotesPayload::Payments($notes) => $body,
            NotesPayload::Loan($notes) => $body,
            NotesPayload::Target($notes) => $body,
            NotesPayload::Contributions($notes) => $body,
            NotesPayload::Purchases($notes) => $body,
            NotesPayload::Deposits($notes) => $body,
            NotesPayload::ScheduledExpense($notes) => $body,
            NotesPayload::Bill($notes) => $body,
        }
    };
}

impl NotesPayload {
    /// Decode a stored payload with the schema of `module`. Never fails.
    pub fn decode(module: Module, raw: Option<&str>) -> Self {
        match module {
            Module::LoanLedger => Self::Loan(decode(raw)),
            Module::Targets => Self::Target(decode(raw)),
            Module::NpsInvestments => Self::Contributions(decode(raw)),
            Module::GoldInvestments => Self::Purchases(decode(raw)),
            Module::RdFdDeposits => Self::Deposits(decode(raw)),
            Module::ManageFinance => Self::ScheduledExpense(decode(raw)),
            Module::BillDates => Self::Bill(decode(raw)),
            Module::ProjectExpense | Module::ChequeRegister | Module::DailyCash => {
                Self::Payments(decode(raw))
            }
        }
    }

    /// Strictly parse a payload typed in by a user. Unlike [`Self::decode`]
    /// this reports a payload that does not fit the module's schema.
    pub fn parse(module: Module, value: Value) -> ResultEngine<Self> {
        fn strict<T: DeserializeOwned>(value: Value) -> ResultEngine<T> {
            if !value.is_object() {
                return Err(EngineError::InvalidNotes(
                    "notes must be a JSON object".to_string(),
                ));
            }
            serde_json::from_value(value).map_err(|err| EngineError::InvalidNotes(err.to_string()))
        }

        let mut payload = match module {
            Module::LoanLedger => Self::Loan(strict(value)?),
            Module::Targets => Self::Target(strict(value)?),
            Module::NpsInvestments => Self::Contributions(strict(value)?),
            Module::GoldInvestments => Self::Purchases(strict(value)?),
            Module::RdFdDeposits => Self::Deposits(strict(value)?),
            Module::ManageFinance => Self::ScheduledExpense(strict(value)?),
            Module::BillDates => Self::Bill(strict(value)?),
            Module::ProjectExpense | Module::ChequeRegister | Module::DailyCash => {
                Self::Payments(strict(value)?)
            }
        };
        each_payload!(&mut payload, notes => notes.set_schema_version(SCHEMA_VERSION));
        Ok(payload)
    }

    /// Recompute the fields derived from the record's principal.
    pub fn refresh(&mut self, principal: Money) -> ResultEngine<()> {
        match self {
            Self::Loan(notes) => {
                notes.balance_amount = Some(outstanding(principal, notes.total_paid)?);
            }
            Self::Target(notes) => {
                notes.remaining = Some(outstanding(principal, notes.total_paid)?);
            }
            Self::Bill(notes) if !notes.payments.is_empty() => {
                notes.status = Some(bill_status(notes.total_paid, principal));
            }
            _ => {}
        }
        Ok(())
    }

    pub fn entries(&self) -> &[PaymentEntry] {
        each_payload!(self, notes => notes.entries())
    }

    pub fn total(&self) -> Money {
        each_payload!(self, notes => notes.total())
    }

    pub fn encode(&self) -> ResultEngine<String> {
        encode(self)
    }

    pub fn to_value(&self) -> Value {
        each_payload!(self, notes => serde_json::to_value(notes).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn empty_and_garbage_decode_to_empty_object() {
        assert!(decode_object(None).is_empty());
        assert!(decode_object(Some("")).is_empty());
        assert!(decode_object(Some("   ")).is_empty());
        assert!(decode_object(Some("not json")).is_empty());
        assert!(decode_object(Some("[1, 2, 3]")).is_empty());
        assert!(decode_object(Some("null")).is_empty());
    }

    #[test]
    fn raw_object_survives_reencoding() {
        let raw = r#"{"payments":[{"amount":300,"date":"2024-04-01"}],"totalPaid":300,"memo":"x"}"#;
        let first = decode_object(Some(raw));
        let again = decode_object(Some(&encode(&first).unwrap()));
        assert_eq!(first, again);
    }

    #[test]
    fn typed_decode_is_idempotent_on_legacy_payloads() {
        let raw = r#"{"payments":[{"amount":"1,200","date":"01/04/2024","by":"cash"}],"totalPaid":"1200","remaining":8800,"lender":"SBI"}"#;
        let first: TargetNotes = decode(Some(raw));
        assert_eq!(first.schema_version, 0);
        assert_eq!(first.total_paid, Money::major(1200));
        assert_eq!(first.payments[0].amount, Money::major(1200));
        assert_eq!(first.payments[0].extra.get("by"), Some(&json!("cash")));
        assert_eq!(first.extra.get("lender"), Some(&json!("SBI")));

        let second: TargetNotes = decode(Some(&encode(&first).unwrap()));
        assert_eq!(first, second);
    }

    #[test]
    fn unreadable_optional_fields_do_not_wipe_history() {
        let raw = r#"{"payments":[{"amount":50}],"totalPaid":50,"status":"overdue","paid":"yes"}"#;
        let bill: BillNotes = decode(Some(raw));
        assert_eq!(bill.payments.len(), 1);
        assert_eq!(bill.status, None);
    }

    #[test]
    fn push_carries_prior_total() {
        let mut notes = TargetNotes {
            total_paid: Money::major(2000),
            ..TargetNotes::default()
        };
        let total = notes
            .push(PaymentEntry {
                date: "2024-04-01".to_string(),
                amount: Money::major(300),
                source: "salary".to_string(),
                transaction_id: Some("t1".to_string()),
                extra: Map::new(),
            })
            .unwrap();
        assert_eq!(total, Money::major(2300));
        assert_eq!(notes.schema_version, SCHEMA_VERSION);
        assert!(notes.records("t1"));
        assert!(!notes.records("t2"));
    }

    #[test]
    fn payload_uses_module_field_names() {
        let mut notes = DepositNotes::default();
        notes
            .push(PaymentEntry {
                amount: Money::major(5000),
                ..PaymentEntry::default()
            })
            .unwrap();
        let value: Value = serde_json::from_str(&encode(&notes).unwrap()).unwrap();
        assert_eq!(value["totalDeposited"], json!(5000));
        assert_eq!(value["deposits"][0]["amount"], json!(5000));
        assert_eq!(value["schemaVersion"], json!(1));
    }

    #[test]
    fn strict_parse_rejects_wrong_shapes() {
        assert!(NotesPayload::parse(Module::Targets, json!("text")).is_err());
        assert!(NotesPayload::parse(Module::Targets, json!({"payments": 12})).is_err());

        let parsed = NotesPayload::parse(Module::RdFdDeposits, json!({"bank": "SBI"})).unwrap();
        assert_eq!(parsed.to_value()["schemaVersion"], json!(1));
        assert_eq!(parsed.total(), Money::ZERO);
    }

    #[test]
    fn refresh_follows_principal() {
        let mut payload = NotesPayload::decode(Module::Targets, Some(r#"{"totalPaid":2000}"#));
        payload.refresh(Money::major(5000)).unwrap();
        assert_eq!(payload.to_value()["remaining"], json!(3000));

        let mut bill = NotesPayload::decode(Module::BillDates, None);
        bill.refresh(Money::major(100)).unwrap();
        assert_eq!(bill.to_value().get("status"), None);
    }

    #[test]
    fn push_rejects_a_total_that_overflows() {
        let mut notes: TargetNotes = decode(Some(r#"{"totalPaid":92233720368547000}"#));
        let err = notes
            .push(PaymentEntry {
                amount: Money::major(10_000),
                ..PaymentEntry::default()
            })
            .unwrap_err();
        assert_eq!(err, EngineError::InvalidAmount("running total overflows".to_string()));
        assert!(notes.payments.is_empty());
        assert_eq!(notes.schema_version, 0);
    }

    #[test]
    fn stored_pending_status_reads_back() {
        let bill: BillNotes = decode(Some(r#"{"status":"pending"}"#));
        assert_eq!(bill.status, Some(BillStatus::Pending));
    }

    #[test]
    fn outstanding_reports_overflow() {
        assert_eq!(
            outstanding(Money::major(100), Money::major(30)).unwrap(),
            Money::major(70)
        );
        assert!(outstanding(Money::new(i64::MIN), Money::major(1)).is_err());
    }

    #[test]
    fn module_decode_selects_schema() {
        let payload = NotesPayload::decode(
            Module::NpsInvestments,
            Some(r#"{"contributions":[{"amount":100}],"totalContributed":100}"#),
        );
        assert!(matches!(payload, NotesPayload::Contributions(_)));
        assert_eq!(payload.entries().len(), 1);
        assert_eq!(payload.total(), Money::major(100));
    }
}
