use sea_orm::DatabaseConnection;

use crate::{
    ResultEngine,
    propagation::Propagator,
    store::DbRecordStore,
};

mod accounts;
mod import;
mod ledger;
mod propagation;
mod records;
mod transactions;

pub use transactions::Recorded;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// Accounts, transactions and target records over one database, with the
/// propagator wired to the same database.
#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    propagator: Propagator<DbRecordStore>,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    max_attempts: Option<u32>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Retries of a propagation that keeps losing the race on a record.
    pub fn max_attempts(mut self, max_attempts: u32) -> EngineBuilder {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        let mut propagator = Propagator::new(DbRecordStore::new(self.database.clone()));
        if let Some(max_attempts) = self.max_attempts {
            propagator = propagator.with_max_attempts(max_attempts);
        }
        Ok(Engine {
            database: self.database,
            propagator,
        })
    }
}
