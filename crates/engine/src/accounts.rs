//! The module contains the `Account` struct and its storage model.

use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, Money, ResultEngine, util::parse_uuid};

/// Kind of account. Selects which effect table the ledger applies to the
/// account's transactions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    /// A family member's cash in hand.
    Cash,
    /// A credit card. The baseline is the credit limit.
    Card,
    Bank,
}

impl AccountKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Card => "card",
            Self::Bank => "bank",
        }
    }
}

impl TryFrom<&str> for AccountKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(Self::Cash),
            "card" => Ok(Self::Card),
            "bank" => Ok(Self::Bank),
            other => Err(EngineError::InvalidAccount(format!(
                "invalid account kind: {other}"
            ))),
        }
    }
}

/// An account.
///
/// The `baseline` is the balance the user typed in when creating or editing
/// the account. Transactions never change it: the current balance is always
/// recomputed by the ledger from the baseline and the transaction list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub kind: AccountKind,
    pub currency: Currency,
    pub baseline: Money,
    /// Family member owning the account.
    pub owner: Option<String>,
}

impl Account {
    pub fn new(
        name: String,
        kind: AccountKind,
        currency: Currency,
        baseline: Money,
        owner: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            kind,
            currency,
            baseline,
            owner,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub kind: String,
    pub currency: String,
    pub baseline_minor: i64,
    pub owner: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Account> for ActiveModel {
    fn from(value: &Account) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            name: ActiveValue::Set(value.name.clone()),
            kind: ActiveValue::Set(value.kind.as_str().to_string()),
            currency: ActiveValue::Set(value.currency.code().to_string()),
            baseline_minor: ActiveValue::Set(value.baseline.minor()),
            owner: ActiveValue::Set(value.owner.clone()),
        }
    }
}

impl TryFrom<Model> for Account {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: parse_uuid(&model.id, "account")?,
            name: model.name,
            kind: AccountKind::try_from(model.kind.as_str())?,
            currency: Currency::try_from(model.currency.as_str())?,
            baseline: Money::new(model.baseline_minor),
            owner: model.owner,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parsing_is_case_insensitive() {
        assert_eq!(AccountKind::try_from(" Bank ").unwrap(), AccountKind::Bank);
        assert_eq!(AccountKind::try_from("CARD").unwrap(), AccountKind::Card);
        assert!(AccountKind::try_from("wallet").is_err());
    }

    #[test]
    fn model_round_trip() {
        let account = Account::new(
            "Savings".to_string(),
            AccountKind::Bank,
            Currency::Inr,
            Money::major(1000),
            Some("Asha".to_string()),
        );
        let model = Model {
            id: account.id.to_string(),
            name: account.name.clone(),
            kind: "bank".to_string(),
            currency: "INR".to_string(),
            baseline_minor: 100_000,
            owner: account.owner.clone(),
        };
        assert_eq!(Account::try_from(model).unwrap(), account);
    }
}
