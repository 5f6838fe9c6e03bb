//! One pure function per target module.
//!
//! A handler receives the record as it was read and the transaction paying
//! toward it, and returns the new notes payload. It never touches a store:
//! reading, writing and retrying belong to [`super::Propagator`].

use std::collections::HashMap;

use serde_json::Map;

use crate::{
    Module, Money, ResultEngine, TargetRecord, Transaction,
    notes::{
        self, Accumulator, BillNotes, ContributionNotes, DepositNotes, LoanNotes, PaymentEntry,
        PaymentLedger, PurchaseNotes, ScheduledExpenseNotes, TargetNotes, bill_status,
        outstanding,
    },
};

pub(crate) struct Payment<'a> {
    pub record: &'a TargetRecord,
    pub tx: &'a Transaction,
}

/// A record the engine must update next, once the current write succeeded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct FollowUp {
    pub module: Module,
    pub reference_id: String,
}

#[derive(Debug)]
pub(crate) enum Outcome {
    /// The transaction already has an entry in the record. The follow-up is
    /// still reported: a previous attempt may have stopped before it.
    AlreadyRecorded { follow_up: Option<FollowUp> },
    Write {
        notes: String,
        total: Money,
        follow_up: Option<FollowUp>,
    },
}

pub(crate) type Handler = fn(&Payment<'_>) -> ResultEngine<Outcome>;

/// Module name → handler, built once when the propagator is created.
#[derive(Debug)]
pub(crate) struct Registry {
    handlers: HashMap<&'static str, (Module, Handler)>,
}

impl Registry {
    pub(crate) fn standard() -> Self {
        let table: [(Module, Handler); 10] = [
            (Module::LoanLedger, loan_ledger),
            (Module::Targets, targets),
            (Module::NpsInvestments, nps_investments),
            (Module::GoldInvestments, gold_investments),
            (Module::RdFdDeposits, rd_fd_deposits),
            (Module::ProjectExpense, payment_ledger),
            (Module::ManageFinance, manage_finance),
            (Module::BillDates, bill_dates),
            (Module::ChequeRegister, payment_ledger),
            (Module::DailyCash, payment_ledger),
        ];
        Self {
            handlers: table
                .into_iter()
                .map(|(module, handler)| (module.as_str(), (module, handler)))
                .collect(),
        }
    }

    pub(crate) fn lookup(&self, name: &str) -> Option<(Module, Handler)> {
        self.handlers
            .get(Module::normalize_name(name).as_str())
            .copied()
    }
}

fn entry_for(tx: &Transaction) -> PaymentEntry {
    PaymentEntry {
        date: tx.date.format("%Y-%m-%d").to_string(),
        amount: tx.amount,
        source: tx.source().to_string(),
        transaction_id: Some(tx.id.to_string()),
        extra: Map::new(),
    }
}

/// Decode, append, let the module adjust its own fields, encode.
fn accumulate<A, F>(payment: &Payment<'_>, finish: F) -> ResultEngine<Outcome>
where
    A: Accumulator,
    F: FnOnce(&mut A, &Payment<'_>) -> ResultEngine<Option<FollowUp>>,
{
    let mut notes: A = notes::decode(payment.record.notes.as_deref());
    if notes.records(&payment.tx.id.to_string()) {
        let follow_up = finish(&mut notes, payment)?;
        return Ok(Outcome::AlreadyRecorded { follow_up });
    }
    let total = notes.push(entry_for(payment.tx))?;
    let follow_up = finish(&mut notes, payment)?;
    Ok(Outcome::Write {
        notes: notes::encode(&notes)?,
        total,
        follow_up,
    })
}

fn payment_ledger(payment: &Payment<'_>) -> ResultEngine<Outcome> {
    accumulate(payment, |_: &mut PaymentLedger, _| Ok(None))
}

fn loan_ledger(payment: &Payment<'_>) -> ResultEngine<Outcome> {
    accumulate(payment, |notes: &mut LoanNotes, p| {
        notes.balance_amount = Some(outstanding(p.record.principal, notes.total_paid)?);
        Ok(None)
    })
}

fn targets(payment: &Payment<'_>) -> ResultEngine<Outcome> {
    accumulate(payment, |notes: &mut TargetNotes, p| {
        notes.remaining = Some(outstanding(p.record.principal, notes.total_paid)?);
        Ok(None)
    })
}

fn nps_investments(payment: &Payment<'_>) -> ResultEngine<Outcome> {
    accumulate(payment, |_: &mut ContributionNotes, _| Ok(None))
}

fn gold_investments(payment: &Payment<'_>) -> ResultEngine<Outcome> {
    accumulate(payment, |_: &mut PurchaseNotes, _| Ok(None))
}

fn rd_fd_deposits(payment: &Payment<'_>) -> ResultEngine<Outcome> {
    accumulate(payment, |_: &mut DepositNotes, _| Ok(None))
}

fn manage_finance(payment: &Payment<'_>) -> ResultEngine<Outcome> {
    accumulate(payment, |notes: &mut ScheduledExpenseNotes, p| {
        notes.paid = Some(true);
        notes.paid_date = Some(p.tx.date.format("%Y-%m-%d").to_string());
        notes.paid_amount = Some(p.tx.amount);
        if let Some(mode) = &p.tx.meta.payment_mode {
            notes.payment_method = Some(mode.clone());
        }
        Ok(None)
    })
}

fn bill_dates(payment: &Payment<'_>) -> ResultEngine<Outcome> {
    accumulate(payment, |notes: &mut BillNotes, p| {
        notes.status = Some(bill_status(notes.total_paid, p.record.principal));
        Ok(notes
            .manage_finance_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| FollowUp {
                module: Module::ManageFinance,
                reference_id: id.to_string(),
            }))
    })
}
