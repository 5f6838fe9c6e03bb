use uuid::Uuid;

use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*, sea_query::Expr};

use crate::{
    Account, AccountUpdate, EngineError, NewAccount, ResultEngine, accounts,
    util::{normalize_optional_text, normalize_required_name},
};

use super::{Engine, with_tx};

pub(super) fn account_not_found() -> EngineError {
    EngineError::KeyNotFound("account not exists".to_string())
}

impl Engine {
    /// Add a new account. Names are unique, ignoring case.
    pub async fn new_account(&self, cmd: NewAccount) -> ResultEngine<Account> {
        let name = normalize_required_name(&cmd.name, "account")?;
        let owner = normalize_optional_text(cmd.owner.as_deref());
        with_tx!(self, |db_tx| {
            let exists = accounts::Entity::find()
                .filter(Expr::cust("LOWER(name)").eq(name.to_lowercase()))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(name));
            }

            let account = Account::new(name, cmd.kind, cmd.currency, cmd.baseline, owner);
            accounts::ActiveModel::from(&account).insert(&db_tx).await?;
            tracing::info!("account {} created", account.id);
            Ok(account)
        })
    }

    pub async fn account(&self, account_id: Uuid) -> ResultEngine<Account> {
        accounts::Entity::find_by_id(account_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(account_not_found)
            .and_then(Account::try_from)
    }

    /// All accounts, by name.
    pub async fn accounts(&self) -> ResultEngine<Vec<Account>> {
        accounts::Entity::find()
            .order_by_asc(accounts::Column::Name)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Account::try_from)
            .collect()
    }

    /// Edit name, owner or baseline. This is the only write that changes a
    /// baseline.
    pub async fn update_account(
        &self,
        account_id: Uuid,
        update: AccountUpdate,
    ) -> ResultEngine<Account> {
        let name = update
            .name
            .as_deref()
            .map(|name| normalize_required_name(name, "account"))
            .transpose()?;
        with_tx!(self, |db_tx| {
            let model = accounts::Entity::find_by_id(account_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(account_not_found)?;

            if let Some(name) = &name {
                let taken = accounts::Entity::find()
                    .filter(Expr::cust("LOWER(name)").eq(name.to_lowercase()))
                    .filter(accounts::Column::Id.ne(model.id.clone()))
                    .one(&db_tx)
                    .await?
                    .is_some();
                if taken {
                    return Err(EngineError::ExistingKey(name.clone()));
                }
            }

            let mut active: accounts::ActiveModel = model.into();
            if let Some(name) = name {
                active.name = ActiveValue::Set(name);
            }
            if let Some(owner) = update.owner {
                active.owner = ActiveValue::Set(normalize_optional_text(Some(&owner)));
            }
            if let Some(baseline) = update.baseline {
                active.baseline_minor = ActiveValue::Set(baseline.minor());
            }
            let model = active.update(&db_tx).await?;
            Account::try_from(model)
        })
    }

    /// Delete an account together with its transactions. Target records the
    /// transactions paid toward keep their payment history.
    pub async fn delete_account(&self, account_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            crate::transactions::Entity::delete_many()
                .filter(crate::transactions::Column::AccountId.eq(account_id.to_string()))
                .exec(&db_tx)
                .await?;
            let result = accounts::Entity::delete_by_id(account_id.to_string())
                .exec(&db_tx)
                .await?;
            if result.rows_affected == 0 {
                return Err(account_not_found());
            }
            tracing::info!("account {account_id} deleted");
            Ok(())
        })
    }
}
