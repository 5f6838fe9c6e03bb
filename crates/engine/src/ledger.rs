//! Running-balance reconciliation.
//!
//! The balance shown for an account is never read from storage: it is
//! replayed from the account's baseline and its transactions every time.
//! Each transaction moves the balance up or down according to its type tag,
//! looked up in [`EFFECT_TABLE`].
//!
//! Cash accounts understand the full vocabulary of tags. Bank and card
//! statements only speak `credit`/`debit`; anything else on those accounts
//! is informational and leaves the balance alone.

use serde::{Deserialize, Serialize};

use crate::{Account, AccountKind, Money, Transaction};

/// How a transaction moves its account's balance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    Increase,
    Decrease,
    Informational,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Scope {
    AllAccounts,
    CashOnly,
}

impl Scope {
    fn covers(self, kind: AccountKind) -> bool {
        match self {
            Scope::AllAccounts => true,
            Scope::CashOnly => kind == AccountKind::Cash,
        }
    }
}

const EFFECT_TABLE: &[(&str, Effect, Scope)] = &[
    ("credit", Effect::Increase, Scope::AllAccounts),
    ("debit", Effect::Decrease, Scope::AllAccounts),
    ("income", Effect::Increase, Scope::CashOnly),
    ("deposit", Effect::Increase, Scope::CashOnly),
    ("refund", Effect::Increase, Scope::CashOnly),
    ("interest", Effect::Increase, Scope::CashOnly),
    ("expense", Effect::Decrease, Scope::CashOnly),
    ("withdrawal", Effect::Decrease, Scope::CashOnly),
    ("purchase", Effect::Decrease, Scope::CashOnly),
    ("payment", Effect::Decrease, Scope::CashOnly),
    ("transfer", Effect::Decrease, Scope::CashOnly),
    ("fee", Effect::Decrease, Scope::CashOnly),
];

/// Classify a type tag for an account kind. Matching ignores case and
/// surrounding whitespace.
pub fn classify(kind: AccountKind, tag: &str) -> Effect {
    let tag = tag.trim();
    EFFECT_TABLE
        .iter()
        .find(|(name, _, scope)| scope.covers(kind) && name.eq_ignore_ascii_case(tag))
        .map(|(_, effect, _)| *effect)
        .unwrap_or(Effect::Informational)
}

/// Anything the ledger can replay.
pub trait LedgerRow {
    fn type_tag(&self) -> &str;

    /// `None` when the stored amount cannot be read. Such rows have no effect.
    fn amount(&self) -> Option<Money>;
}

impl LedgerRow for Transaction {
    fn type_tag(&self) -> &str {
        &self.kind
    }

    fn amount(&self) -> Option<Money> {
        Some(self.amount)
    }
}

/// A loosely typed row (imported or sent by a client for preview).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LooseRow {
    pub type_tag: String,
    pub amount: Option<Money>,
}

impl LooseRow {
    pub fn from_json(type_tag: &str, amount: &serde_json::Value) -> Self {
        Self {
            type_tag: type_tag.to_string(),
            amount: Money::from_json(amount),
        }
    }
}

impl LedgerRow for LooseRow {
    fn type_tag(&self) -> &str {
        &self.type_tag
    }

    fn amount(&self) -> Option<Money> {
        self.amount
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balances {
    pub current: Money,
    /// Balance after each row, in input order.
    pub running: Vec<Money>,
}

/// Replay `rows` (already in display order) on top of `baseline`.
///
/// Never fails: informational tags, unreadable amounts and amounts that
/// would overflow leave the balance where it was.
pub fn compute_balances<R: LedgerRow>(kind: AccountKind, baseline: Money, rows: &[R]) -> Balances {
    let mut current = baseline;
    let mut running = Vec::with_capacity(rows.len());

    for row in rows {
        let next = match (classify(kind, row.type_tag()), row.amount()) {
            (Effect::Increase, Some(amount)) => current.checked_add(amount.abs()),
            (Effect::Decrease, Some(amount)) => current.checked_sub(amount.abs()),
            _ => None,
        };
        if let Some(next) = next {
            current = next;
        }
        running.push(current);
    }

    Balances { current, running }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatementRow {
    pub transaction: Transaction,
    pub effect: Effect,
    pub running_balance: Money,
}

/// An account with its transactions and the balance after each of them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AccountStatement {
    pub account: Account,
    pub rows: Vec<StatementRow>,
    pub current_balance: Money,
}

/// Build the statement of `account` from `transactions`, taken in the order
/// given.
pub fn statement(account: Account, transactions: Vec<Transaction>) -> AccountStatement {
    let balances = compute_balances(account.kind, account.baseline, &transactions);
    let rows = transactions
        .into_iter()
        .zip(balances.running)
        .map(|(transaction, running_balance)| StatementRow {
            effect: classify(account.kind, &transaction.kind),
            transaction,
            running_balance,
        })
        .collect();

    AccountStatement {
        account,
        rows,
        current_balance: balances.current,
    }
}
