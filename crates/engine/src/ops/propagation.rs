use crate::{Propagation, ResultEngine, Transaction, store::DbRecordStore};

use super::Engine;

impl Engine {
    /// Propagate a saved transaction to the record its paying-for reference
    /// points at.
    pub async fn propagate(&self, tx: &Transaction) -> ResultEngine<Propagation> {
        self.propagator.propagate(tx, tx.paying_for.as_ref()).await
    }

    /// The record store the propagator writes through.
    pub fn record_store(&self) -> &DbRecordStore {
        self.propagator.store()
    }
}
