//! Core of the Kosh finance service.
//!
//! - [`ledger`] replays an account's transactions on top of its baseline.
//! - [`propagation`] pushes a transaction into the notes of the target record
//!   it pays toward.
//! - [`notes`] is the codec for those notes payloads.
//!
//! [`Engine`] ties them to a sea-orm database.

pub use accounts::{Account, AccountKind};
pub use commands::{AccountUpdate, NewAccount, NewRecord, RecordUpdate, TransactionCmd};
pub use currency::Currency;
pub use error::EngineError;
pub use import::{ImportRow, ImportSummary, read_csv_rows};
pub use ledger::{
    AccountStatement, Balances, Effect, LedgerRow, LooseRow, StatementRow, compute_balances,
};
pub use modules::Module;
pub use money::Money;
pub use ops::{Engine, EngineBuilder, Recorded};
pub use propagation::{Propagation, Propagator};
pub use records::TargetRecord;
pub use store::{DbRecordStore, MemoryRecordStore, RecordStore, WriteOutcome};
pub use transactions::{PayingFor, Transaction, TransactionUpdate, TxMeta};

mod accounts;
mod commands;
mod currency;
mod error;
pub mod import;
pub mod ledger;
mod modules;
mod money;
pub mod notes;
mod ops;
pub mod propagation;
mod records;
pub mod store;
mod transactions;
mod util;

pub type ResultEngine<T> = Result<T, EngineError>;
