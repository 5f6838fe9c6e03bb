use uuid::Uuid;

use crate::{AccountStatement, ResultEngine, ledger};

use super::Engine;

impl Engine {
    /// Statement of an account, balances recomputed from the baseline.
    pub async fn account_ledger(&self, account_id: Uuid) -> ResultEngine<AccountStatement> {
        let account = self.account(account_id).await?;
        let transactions = self.transactions_for_account(account_id).await?;
        Ok(ledger::statement(account, transactions))
    }
}
