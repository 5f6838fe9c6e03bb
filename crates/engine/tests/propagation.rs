use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{Value, json};
use uuid::Uuid;

use engine::{
    EngineError, MemoryRecordStore, Module, Money, PayingFor, Propagation, Propagator,
    RecordStore, ResultEngine, TargetRecord, Transaction, TxMeta, WriteOutcome,
};

fn payment(amount: i64, merchant: &str) -> Transaction {
    Transaction::new(
        Uuid::new_v4(),
        "expense",
        Money::major(amount),
        NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
        TxMeta {
            merchant: Some(merchant.to_string()),
            ..TxMeta::default()
        },
        None,
    )
    .unwrap()
}

async fn stored(store: &MemoryRecordStore, module: Module, principal: i64, notes: Option<&str>) -> TargetRecord {
    let record = TargetRecord::new(
        module.as_str(),
        "record".to_string(),
        Money::major(principal),
        notes.map(str::to_string),
    );
    store.insert(record.clone()).await.unwrap();
    record
}

async fn notes_of(store: &impl RecordStore, id: Uuid) -> Value {
    let record = store.get(id).await.unwrap().unwrap();
    serde_json::from_str(record.notes.as_deref().unwrap()).unwrap()
}

#[tokio::test]
async fn payment_toward_a_target() {
    let store = MemoryRecordStore::new();
    let record = stored(&store, Module::Targets, 10_000, Some(r#"{"totalPaid":2000}"#)).await;
    let propagator = Propagator::new(store.clone());

    let tx = payment(300, "Bank transfer");
    let outcome = propagator
        .propagate(&tx, Some(&PayingFor::new("targets", record.id.to_string())))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        Propagation::Applied {
            module: Module::Targets,
            record_id: record.id,
            total: Money::major(2300),
            linked: None,
        }
    );
    let notes = notes_of(&store, record.id).await;
    assert_eq!(notes["totalPaid"], json!(2300));
    assert_eq!(notes["remaining"], json!(7700));
    assert_eq!(notes["schemaVersion"], json!(1));
    assert_eq!(notes["payments"].as_array().map(Vec::len), Some(1));

    let after = store.get(record.id).await.unwrap().unwrap();
    assert_eq!(after.version, 1);
    assert_eq!(after.name, record.name);
    assert_eq!(after.principal, record.principal);
}

#[tokio::test]
async fn blank_module_is_a_no_op() {
    let store = MemoryRecordStore::new();
    let record = stored(&store, Module::Targets, 100, None).await;
    let propagator = Propagator::new(store.clone());
    let tx = payment(10, "x");

    for paying_for in [None, Some(PayingFor::new("", record.id.to_string())), Some(PayingFor::new("   ", "x"))] {
        let outcome = propagator.propagate(&tx, paying_for.as_ref()).await.unwrap();
        assert_eq!(outcome, Propagation::Skipped);
    }
    assert_eq!(store.get(record.id).await.unwrap().unwrap().version, 0);
}

#[tokio::test]
async fn unknown_module_is_reported_not_failed() {
    let propagator = Propagator::new(MemoryRecordStore::new());
    let outcome = propagator
        .propagate(&payment(10, "x"), Some(&PayingFor::new("mobile-records", Uuid::new_v4().to_string())))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        Propagation::UnsupportedModule {
            module: "mobile-records".to_string()
        }
    );
}

#[tokio::test]
async fn missing_or_foreign_record_is_not_found() {
    let store = MemoryRecordStore::new();
    let loan = stored(&store, Module::LoanLedger, 100, None).await;
    let propagator = Propagator::new(store.clone());
    let tx = payment(10, "x");
    let not_found = || Err(EngineError::KeyNotFound("record not exists".to_string()));

    let missing = PayingFor::new("targets", Uuid::new_v4().to_string());
    assert_eq!(propagator.propagate(&tx, Some(&missing)).await, not_found());

    let garbage = PayingFor::new("targets", "not-an-id");
    assert_eq!(propagator.propagate(&tx, Some(&garbage)).await, not_found());

    let wrong_module = PayingFor::new("targets", loan.id.to_string());
    assert_eq!(propagator.propagate(&tx, Some(&wrong_module)).await, not_found());
    assert_eq!(store.get(loan.id).await.unwrap().unwrap().version, 0);
}

#[tokio::test]
async fn resubmitting_a_transaction_counts_it_once() {
    let store = MemoryRecordStore::new();
    let record = stored(&store, Module::ProjectExpense, 0, None).await;
    let propagator = Propagator::new(store.clone());
    let tx = payment(250, "Tiles");
    let paying_for = PayingFor::new("project-expense", record.id.to_string());

    propagator.propagate(&tx, Some(&paying_for)).await.unwrap();
    let again = propagator.propagate(&tx, Some(&paying_for)).await.unwrap();

    assert_eq!(
        again,
        Propagation::AlreadyApplied {
            module: Module::ProjectExpense,
            record_id: record.id,
            linked: None,
        }
    );
    assert_eq!(notes_of(&store, record.id).await["totalPaid"], json!(250));
}

#[tokio::test]
async fn bill_payment_settles_the_linked_scheduled_expense() {
    let store = MemoryRecordStore::new();
    let expense = stored(&store, Module::ManageFinance, 1_500, Some(r#"{"dueDay":5}"#)).await;
    let bill_notes = format!(r#"{{"manageFinanceId":"{}"}}"#, expense.id);
    let bill = stored(&store, Module::BillDates, 1_500, Some(&bill_notes)).await;
    let propagator = Propagator::new(store.clone());

    let tx = payment(1_500, "Electricity board");
    let outcome = propagator
        .propagate(&tx, Some(&PayingFor::new("bill-dates", bill.id.to_string())))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        Propagation::Applied {
            module: Module::BillDates,
            record_id: bill.id,
            total: Money::major(1_500),
            linked: Some(expense.id),
        }
    );
    assert_eq!(notes_of(&store, bill.id).await["status"], json!("paid"));

    let linked = notes_of(&store, expense.id).await;
    assert_eq!(linked["paid"], json!(true));
    assert_eq!(linked["paidDate"], json!("2024-04-01"));
    assert_eq!(linked["paidAmount"], json!(1_500));
    assert_eq!(linked["dueDay"], json!(5));
}

#[tokio::test]
async fn broken_link_is_reported_after_the_bill_is_written() {
    let store = MemoryRecordStore::new();
    let bill_notes = format!(r#"{{"manageFinanceId":"{}"}}"#, Uuid::new_v4());
    let bill = stored(&store, Module::BillDates, 1_000, Some(&bill_notes)).await;
    let propagator = Propagator::new(store.clone());

    let result = propagator
        .propagate(&payment(400, "x"), Some(&PayingFor::new("bill-dates", bill.id.to_string())))
        .await;

    assert!(matches!(result, Err(EngineError::KeyNotFound(_))));
    assert_eq!(notes_of(&store, bill.id).await["status"], json!("partial"));
}

/// Fails the first read of one record, as a dropped connection would.
struct FlakyStore {
    inner: MemoryRecordStore,
    flaky: Uuid,
    failures: AtomicUsize,
}

#[async_trait]
impl RecordStore for FlakyStore {
    async fn get(&self, id: Uuid) -> ResultEngine<Option<TargetRecord>> {
        if id == self.flaky && self.failures.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(EngineError::Conflict("connection reset".to_string()));
        }
        self.inner.get(id).await
    }

    async fn list(&self, module: Option<&str>) -> ResultEngine<Vec<TargetRecord>> {
        self.inner.list(module).await
    }

    async fn update_notes(
        &self,
        id: Uuid,
        expected_version: i64,
        notes: &str,
    ) -> ResultEngine<WriteOutcome> {
        self.inner.update_notes(id, expected_version, notes).await
    }
}

#[tokio::test]
async fn retry_settles_the_expense_a_failed_link_missed() {
    let inner = MemoryRecordStore::new();
    let expense = stored(&inner, Module::ManageFinance, 800, None).await;
    let bill_notes = format!(r#"{{"manageFinanceId":"{}"}}"#, expense.id);
    let bill = stored(&inner, Module::BillDates, 800, Some(&bill_notes)).await;
    let propagator = Propagator::new(FlakyStore {
        inner: inner.clone(),
        flaky: expense.id,
        failures: AtomicUsize::new(0),
    });
    let tx = payment(800, "Gas agency");
    let paying_for = PayingFor::new("bill-dates", bill.id.to_string());

    let first = propagator.propagate(&tx, Some(&paying_for)).await;
    assert!(matches!(first, Err(EngineError::Conflict(_))));
    assert_eq!(notes_of(&inner, bill.id).await["totalPaid"], json!(800));
    assert!(inner.get(expense.id).await.unwrap().unwrap().notes.is_none());

    let retry = propagator.propagate(&tx, Some(&paying_for)).await.unwrap();
    assert_eq!(
        retry,
        Propagation::AlreadyApplied {
            module: Module::BillDates,
            record_id: bill.id,
            linked: Some(expense.id),
        }
    );
    let settled = notes_of(&inner, expense.id).await;
    assert_eq!(settled["paid"], json!(true));
    assert_eq!(settled["paidAmount"], json!(800));

    let bill_after = notes_of(&inner, bill.id).await;
    assert_eq!(bill_after["payments"].as_array().map(Vec::len), Some(1));

    // The expense already holds the payment: a third run writes nothing new.
    propagator.propagate(&tx, Some(&paying_for)).await.unwrap();
    assert_eq!(notes_of(&inner, expense.id).await["payments"].as_array().map(Vec::len), Some(1));
    assert_eq!(inner.get(expense.id).await.unwrap().unwrap().version, 1);
}

#[tokio::test]
async fn overflowing_total_is_reported_and_leaves_the_record() {
    let store = MemoryRecordStore::new();
    let record = stored(&store, Module::Targets, 10_000, Some(r#"{"totalPaid":92233720368547000}"#)).await;
    let propagator = Propagator::new(store.clone());

    let result = propagator
        .propagate(&payment(10_000, "salary"), Some(&PayingFor::new("targets", record.id.to_string())))
        .await;

    assert!(matches!(result, Err(EngineError::InvalidAmount(_))));
    let after = store.get(record.id).await.unwrap().unwrap();
    assert_eq!(after.version, 0);
    assert_eq!(after.notes, record.notes);
}

/// Lets another writer slip in before the first `races` conditional writes.
struct RacingStore {
    inner: MemoryRecordStore,
    races: usize,
    seen: AtomicUsize,
}

#[async_trait]
impl RecordStore for RacingStore {
    async fn get(&self, id: Uuid) -> ResultEngine<Option<TargetRecord>> {
        self.inner.get(id).await
    }

    async fn list(&self, module: Option<&str>) -> ResultEngine<Vec<TargetRecord>> {
        self.inner.list(module).await
    }

    async fn update_notes(
        &self,
        id: Uuid,
        expected_version: i64,
        notes: &str,
    ) -> ResultEngine<WriteOutcome> {
        if self.seen.fetch_add(1, Ordering::SeqCst) < self.races {
            let rival = Propagator::new(self.inner.clone());
            let tx = payment(100, "rival");
            rival
                .propagate(&tx, Some(&PayingFor::new("targets", id.to_string())))
                .await?;
        }
        self.inner.update_notes(id, expected_version, notes).await
    }
}

#[tokio::test]
async fn losing_writer_retries_and_both_payments_land() {
    let inner = MemoryRecordStore::new();
    let record = stored(&inner, Module::Targets, 1_000, None).await;
    let propagator = Propagator::new(RacingStore {
        inner: inner.clone(),
        races: 1,
        seen: AtomicUsize::new(0),
    });

    let outcome = propagator
        .propagate(&payment(300, "mine"), Some(&PayingFor::new("targets", record.id.to_string())))
        .await
        .unwrap();

    assert!(matches!(outcome, Propagation::Applied { total, .. } if total == Money::major(400)));
    let notes = notes_of(&inner, record.id).await;
    assert_eq!(notes["totalPaid"], json!(400));
    assert_eq!(notes["remaining"], json!(600));
    assert_eq!(notes["payments"].as_array().map(Vec::len), Some(2));
    assert_eq!(inner.get(record.id).await.unwrap().unwrap().version, 2);
}

#[tokio::test]
async fn gives_up_after_max_attempts() {
    let inner = MemoryRecordStore::new();
    let record = stored(&inner, Module::Targets, 1_000, None).await;
    let propagator = Propagator::new(RacingStore {
        inner: inner.clone(),
        races: usize::MAX,
        seen: AtomicUsize::new(0),
    })
    .with_max_attempts(3);

    let result = propagator
        .propagate(&payment(300, "mine"), Some(&PayingFor::new("targets", record.id.to_string())))
        .await;

    assert!(matches!(result, Err(EngineError::Conflict(_))));
    let notes = notes_of(&inner, record.id).await;
    assert_eq!(notes["totalPaid"], json!(300));
    assert_eq!(notes["payments"][0]["source"], json!("rival"));
}

#[tokio::test]
async fn concurrent_payments_on_one_record_are_all_kept() {
    let store = MemoryRecordStore::new();
    let record = stored(&store, Module::LoanLedger, 10_000, None).await;
    let propagator = Arc::new(Propagator::new(store.clone()));
    let paying_for = PayingFor::new("loan-ledger", record.id.to_string());

    let mut handles = Vec::new();
    for amount in [100, 200, 300, 400] {
        let propagator = Arc::clone(&propagator);
        let paying_for = paying_for.clone();
        handles.push(tokio::spawn(async move {
            propagator
                .propagate(&payment(amount, "emi"), Some(&paying_for))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let notes = notes_of(&store, record.id).await;
    assert_eq!(notes["totalPaid"], json!(1_000));
    assert_eq!(notes["balanceAmount"], json!(9_000));
    assert_eq!(notes["payments"].as_array().map(Vec::len), Some(4));
}
