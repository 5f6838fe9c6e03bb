use chrono::Utc;
use uuid::Uuid;

use sea_orm::{TransactionTrait, prelude::*};

use crate::{
    ImportRow, ImportSummary, ResultEngine, accounts, import::transactions_from_rows,
    transactions,
};

use super::{Engine, accounts::account_not_found, with_tx};

impl Engine {
    /// Import spreadsheet rows into an account. Valid rows are saved together
    /// or not at all; imported transactions never propagate.
    pub async fn import_transactions(
        &self,
        account_id: Uuid,
        rows: &[ImportRow],
    ) -> ResultEngine<ImportSummary> {
        let today = Utc::now().date_naive();
        let (parsed, skipped) = transactions_from_rows(account_id, rows, today);

        with_tx!(self, |db_tx| {
            accounts::Entity::find_by_id(account_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(account_not_found)?;
            for tx in &parsed {
                transactions::ActiveModel::from(tx).insert(&db_tx).await?;
            }
            tracing::info!(
                "imported {} rows into account {account_id}, skipped {skipped}",
                parsed.len()
            );
            Ok(ImportSummary {
                imported: parsed.len(),
                skipped,
            })
        })
    }
}
