//! Ledger API endpoints

use api_types::ledger::{Effect, PreviewRequest, PreviewResponse, Statement, StatementRow};
use axum::{
    Json,
    extract::{Path, State},
};
use uuid::Uuid;

use crate::{
    ServerError,
    accounts::{account_view, engine_kind},
    server::ServerState,
    transactions::transaction_view,
};

fn map_effect(effect: engine::Effect) -> Effect {
    match effect {
        engine::Effect::Increase => Effect::Increase,
        engine::Effect::Decrease => Effect::Decrease,
        engine::Effect::Informational => Effect::Informational,
    }
}

/// Statement of an account with the balance after every transaction.
pub async fn statement(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Statement>, ServerError> {
    let statement = state.engine.account_ledger(id).await?;

    Ok(Json(Statement {
        account: account_view(statement.account),
        rows: statement
            .rows
            .into_iter()
            .map(|row| StatementRow {
                transaction: transaction_view(row.transaction),
                effect: map_effect(row.effect),
                running_balance_minor: row.running_balance.minor(),
            })
            .collect(),
        current_balance_minor: statement.current_balance.minor(),
    }))
}

/// Reconcile rows without saving anything.
pub async fn preview(Json(payload): Json<PreviewRequest>) -> Json<PreviewResponse> {
    let rows: Vec<engine::LooseRow> = payload
        .rows
        .iter()
        .map(|row| engine::LooseRow::from_json(&row.type_tag, &row.amount))
        .collect();
    let balances = engine::compute_balances(
        engine_kind(payload.kind),
        engine::Money::new(payload.baseline_minor),
        &rows,
    );

    Json(PreviewResponse {
        current_balance_minor: balances.current.minor(),
        running_balance_minor: balances.running.iter().map(|m| m.minor()).collect(),
    })
}
