//! Accounts API endpoints

use api_types::account::{Account, AccountKind, AccountNew, AccountUpdate};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

pub(crate) fn map_kind(kind: engine::AccountKind) -> AccountKind {
    match kind {
        engine::AccountKind::Cash => AccountKind::Cash,
        engine::AccountKind::Card => AccountKind::Card,
        engine::AccountKind::Bank => AccountKind::Bank,
    }
}

pub(crate) fn engine_kind(kind: AccountKind) -> engine::AccountKind {
    match kind {
        AccountKind::Cash => engine::AccountKind::Cash,
        AccountKind::Card => engine::AccountKind::Card,
        AccountKind::Bank => engine::AccountKind::Bank,
    }
}

fn map_currency(currency: engine::Currency) -> api_types::Currency {
    match currency {
        engine::Currency::Inr => api_types::Currency::Inr,
        engine::Currency::Usd => api_types::Currency::Usd,
        engine::Currency::Eur => api_types::Currency::Eur,
        engine::Currency::Gbp => api_types::Currency::Gbp,
    }
}

fn engine_currency(currency: api_types::Currency) -> engine::Currency {
    match currency {
        api_types::Currency::Inr => engine::Currency::Inr,
        api_types::Currency::Usd => engine::Currency::Usd,
        api_types::Currency::Eur => engine::Currency::Eur,
        api_types::Currency::Gbp => engine::Currency::Gbp,
    }
}

pub(crate) fn account_view(account: engine::Account) -> Account {
    Account {
        id: account.id,
        name: account.name,
        kind: map_kind(account.kind),
        currency: map_currency(account.currency),
        baseline_minor: account.baseline.minor(),
        owner: account.owner,
    }
}

/// Handle requests for creating a new account
pub async fn account_new(
    State(state): State<ServerState>,
    Json(payload): Json<AccountNew>,
) -> Result<(StatusCode, Json<Account>), ServerError> {
    let mut cmd = engine::NewAccount::new(payload.name, engine_kind(payload.kind))
        .currency(engine_currency(payload.currency.unwrap_or_default()))
        .baseline(engine::Money::new(payload.baseline_minor));
    if let Some(owner) = payload.owner {
        cmd = cmd.owner(owner);
    }
    let account = state.engine.new_account(cmd).await?;

    Ok((StatusCode::CREATED, Json(account_view(account))))
}

pub async fn list(State(state): State<ServerState>) -> Result<Json<Vec<Account>>, ServerError> {
    let accounts = state.engine.accounts().await?;
    Ok(Json(accounts.into_iter().map(account_view).collect()))
}

pub async fn get(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Account>, ServerError> {
    let account = state.engine.account(id).await?;
    Ok(Json(account_view(account)))
}

/// Edit name, owner or baseline
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AccountUpdate>,
) -> Result<Json<Account>, ServerError> {
    if payload.name.is_none() && payload.owner.is_none() && payload.baseline_minor.is_none() {
        return Err(ServerError::Generic("nothing to update".to_string()));
    }

    let account = state
        .engine
        .update_account(
            id,
            engine::AccountUpdate {
                name: payload.name,
                owner: payload.owner,
                baseline: payload.baseline_minor.map(engine::Money::new),
            },
        )
        .await?;

    Ok(Json(account_view(account)))
}

pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_account(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
