//! Payment propagation.
//!
//! When a saved transaction says it pays for a record in another module, the
//! [`Propagator`] appends the payment to that record's notes payload and
//! recomputes its totals.
//!
//! Propagation always runs after the transaction has been committed and never
//! undoes it: a failure here is reported to the caller, who tells the user
//! the transaction was saved but the linked record was not updated.
//!
//! Writes are optimistic. The record is read, the module handler computes the
//! new notes, and the store swaps them in only if the record's version did
//! not move. On a stale version the whole cycle starts over, up to
//! `max_attempts` times.

use serde::Serialize;
use uuid::Uuid;

use crate::{
    EngineError, Module, Money, PayingFor, ResultEngine, Transaction,
    store::{RecordStore, WriteOutcome},
};

use handlers::{FollowUp, Handler, Outcome, Payment, Registry};

mod handlers;

/// What a propagation did.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Propagation {
    /// No reference, or a reference with a blank module.
    Skipped,
    /// No handler for the module. Logged, not an error.
    UnsupportedModule { module: String },
    /// The record already holds an entry for this transaction.
    AlreadyApplied {
        module: Module,
        record_id: Uuid,
        /// Linked record brought up to date on this attempt.
        linked: Option<Uuid>,
    },
    Applied {
        module: Module,
        record_id: Uuid,
        /// The record's running total after the payment.
        total: Money,
        /// Scheduled expense updated through a bill's back-reference.
        linked: Option<Uuid>,
    },
}

enum Step {
    AlreadyRecorded {
        follow_up: Option<FollowUp>,
    },
    Written {
        total: Money,
        follow_up: Option<FollowUp>,
    },
}

#[derive(Debug)]
pub struct Propagator<S> {
    store: S,
    registry: Registry,
    max_attempts: u32,
}

impl<S: RecordStore> Propagator<S> {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

    pub fn new(store: S) -> Self {
        Self {
            store,
            registry: Registry::standard(),
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Number of read-modify-write cycles tried before giving up on a record
    /// that keeps changing. At least one.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Propagate `tx` to the record `paying_for` points at.
    pub async fn propagate(
        &self,
        tx: &Transaction,
        paying_for: Option<&PayingFor>,
    ) -> ResultEngine<Propagation> {
        let Some(paying_for) = paying_for.filter(|p| !p.is_empty()) else {
            return Ok(Propagation::Skipped);
        };

        let Some((module, handler)) = self.registry.lookup(&paying_for.module) else {
            tracing::warn!(
                "no propagation handler for module '{}', transaction {} left unlinked",
                paying_for.module,
                tx.id
            );
            return Ok(Propagation::UnsupportedModule {
                module: paying_for.module.trim().to_string(),
            });
        };

        let record_id = parse_reference(&paying_for.reference_id)?;
        match self.apply(module, handler, record_id, tx).await? {
            Step::AlreadyRecorded { follow_up } => {
                tracing::debug!("transaction {} already recorded on {module} {record_id}", tx.id);
                let linked = match follow_up {
                    Some(follow_up) => Some(self.follow(follow_up, tx).await?),
                    None => None,
                };
                Ok(Propagation::AlreadyApplied {
                    module,
                    record_id,
                    linked,
                })
            }
            Step::Written { total, follow_up } => {
                let linked = match follow_up {
                    Some(follow_up) => Some(self.follow(follow_up, tx).await?),
                    None => None,
                };
                tracing::info!("transaction {} propagated to {module} {record_id}", tx.id);
                Ok(Propagation::Applied {
                    module,
                    record_id,
                    total,
                    linked,
                })
            }
        }
    }

    /// Apply the follow-up of a handler. The follow-up's own follow-ups are
    /// ignored, so a chain of links is never walked past the first hop.
    async fn follow(&self, follow_up: FollowUp, tx: &Transaction) -> ResultEngine<Uuid> {
        let (module, handler) = self
            .registry
            .lookup(follow_up.module.as_str())
            .ok_or_else(|| EngineError::InvalidModule(follow_up.module.to_string()))?;
        let record_id = parse_reference(&follow_up.reference_id)?;
        if let Err(err) = self.apply(module, handler, record_id, tx).await {
            tracing::error!("linked {module} {record_id} not updated for transaction {}: {err}", tx.id);
            return Err(err);
        }
        Ok(record_id)
    }

    async fn apply(
        &self,
        module: Module,
        handler: Handler,
        record_id: Uuid,
        tx: &Transaction,
    ) -> ResultEngine<Step> {
        for attempt in 1..=self.max_attempts {
            let record = self
                .store
                .get(record_id)
                .await?
                .filter(|record| Module::normalize_name(&record.module) == module.as_str())
                .ok_or_else(record_not_found)?;

            let (notes, total, follow_up) = match handler(&Payment {
                record: &record,
                tx,
            })? {
                Outcome::AlreadyRecorded { follow_up } => {
                    return Ok(Step::AlreadyRecorded { follow_up });
                }
                Outcome::Write {
                    notes,
                    total,
                    follow_up,
                } => (notes, total, follow_up),
            };

            match self
                .store
                .update_notes(record.id, record.version, &notes)
                .await?
            {
                WriteOutcome::Written => return Ok(Step::Written { total, follow_up }),
                WriteOutcome::Stale => {
                    tracing::debug!("{module} {record_id} changed during attempt {attempt}, retrying");
                }
            }
        }

        Err(EngineError::Conflict(format!(
            "{module} {record_id} kept changing after {} attempts",
            self.max_attempts
        )))
    }
}

fn record_not_found() -> EngineError {
    EngineError::KeyNotFound("record not exists".to_string())
}

/// A reference that is not a record id cannot point at an existing record.
fn parse_reference(reference_id: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(reference_id.trim()).map_err(|_| record_not_found())
}
