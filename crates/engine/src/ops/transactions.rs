use uuid::Uuid;

use sea_orm::{QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{
    EngineError, Propagation, ResultEngine, Transaction, TransactionCmd, TransactionUpdate,
    accounts, transactions,
};

use super::{Engine, accounts::account_not_found, with_tx};

/// A saved transaction and what happened to the record it pays toward.
#[derive(Debug)]
pub struct Recorded {
    pub transaction: Transaction,
    /// An error here means the transaction is saved but the linked record was
    /// not updated.
    pub propagation: ResultEngine<Propagation>,
}

fn transaction_not_found() -> EngineError {
    EngineError::KeyNotFound("transaction not exists".to_string())
}

impl Engine {
    /// Save a transaction, then propagate it to the record it pays toward.
    pub async fn create_transaction(&self, cmd: TransactionCmd) -> ResultEngine<Recorded> {
        let tx = Transaction::new(
            cmd.account_id,
            &cmd.kind,
            cmd.amount,
            cmd.date,
            cmd.meta,
            cmd.paying_for,
        )?;

        with_tx!(self, |db_tx| {
            accounts::Entity::find_by_id(tx.account_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(account_not_found)?;
            transactions::ActiveModel::from(&tx).insert(&db_tx).await?;
            Ok::<_, EngineError>(())
        })?;
        tracing::debug!("transaction {} saved on account {}", tx.id, tx.account_id);

        let propagation = self.propagate_saved(&tx).await;
        Ok(Recorded {
            transaction: tx,
            propagation,
        })
    }

    pub async fn transaction(&self, transaction_id: Uuid) -> ResultEngine<Transaction> {
        transactions::Entity::find_by_id(transaction_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(transaction_not_found)
            .and_then(Transaction::try_from)
    }

    /// Edit a transaction. It is propagated again only when the edit carries a
    /// paying-for reference; a record that already holds this transaction is
    /// left as it is.
    pub async fn update_transaction(
        &self,
        transaction_id: Uuid,
        update: TransactionUpdate,
    ) -> ResultEngine<Recorded> {
        let relink = update.paying_for.as_ref().is_some_and(|p| !p.is_empty());

        let tx = with_tx!(self, |db_tx| {
            let model = transactions::Entity::find_by_id(transaction_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(transaction_not_found)?;
            let mut tx = Transaction::try_from(model)?;
            tx.apply_update(update)?;
            transactions::ActiveModel::from(&tx).update(&db_tx).await?;
            Ok::<_, EngineError>(tx)
        })?;

        let propagation = if relink {
            self.propagate_saved(&tx).await
        } else {
            Ok(Propagation::Skipped)
        };
        Ok(Recorded {
            transaction: tx,
            propagation,
        })
    }

    /// Delete a transaction. Payment entries it left on target records stay.
    pub async fn delete_transaction(&self, transaction_id: Uuid) -> ResultEngine<()> {
        let result = transactions::Entity::delete_by_id(transaction_id.to_string())
            .exec(&self.database)
            .await?;
        if result.rows_affected == 0 {
            return Err(transaction_not_found());
        }
        Ok(())
    }

    /// Transactions of an account, oldest first (date, then creation time).
    pub async fn transactions_for_account(
        &self,
        account_id: Uuid,
    ) -> ResultEngine<Vec<Transaction>> {
        with_tx!(self, |db_tx| {
            accounts::Entity::find_by_id(account_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(account_not_found)?;
            transactions::Entity::find()
                .filter(transactions::Column::AccountId.eq(account_id.to_string()))
                .order_by_asc(transactions::Column::Date)
                .order_by_asc(transactions::Column::CreatedAt)
                .order_by_asc(transactions::Column::Id)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Transaction::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }

    async fn propagate_saved(&self, tx: &Transaction) -> ResultEngine<Propagation> {
        let result = self.propagate(tx).await;
        if let Err(err) = &result {
            tracing::warn!("transaction {} saved; linked-record update failed: {err}", tx.id);
        }
        result
    }
}
