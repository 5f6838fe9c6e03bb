//! Transactions API endpoints

use api_types::{
    import::{ImportRequest, ImportResponse},
    transaction::{
        PayingFor, PropagationReport, PropagationStatus, Transaction, TransactionNew,
        TransactionSaved, TransactionUpdate,
    },
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, message_for_engine_error, server::ServerState};

pub(crate) fn transaction_view(tx: engine::Transaction) -> Transaction {
    Transaction {
        id: tx.id,
        account_id: tx.account_id,
        kind: tx.kind,
        amount_minor: tx.amount.minor(),
        date: tx.date,
        category: tx.meta.category,
        sub_category: tx.meta.sub_category,
        merchant: tx.meta.merchant,
        description: tx.meta.description,
        payment_mode: tx.meta.payment_mode,
        paying_for: tx.paying_for.map(|p| PayingFor {
            module: p.module,
            reference_id: p.reference_id,
        }),
        created_at: tx.created_at,
    }
}

fn report(propagation: Result<engine::Propagation, engine::EngineError>) -> PropagationReport {
    let empty = |status| PropagationReport {
        status,
        module: None,
        record_id: None,
        linked_record_id: None,
        warning: None,
    };

    match propagation {
        Ok(engine::Propagation::Skipped) => empty(PropagationStatus::Skipped),
        Ok(engine::Propagation::UnsupportedModule { module }) => PropagationReport {
            warning: Some(format!("no linked-record support for module '{module}'")),
            module: Some(module),
            ..empty(PropagationStatus::Unsupported)
        },
        Ok(engine::Propagation::AlreadyApplied {
            module,
            record_id,
            linked,
        }) => PropagationReport {
            module: Some(module.to_string()),
            record_id: Some(record_id),
            linked_record_id: linked,
            ..empty(PropagationStatus::AlreadyApplied)
        },
        Ok(engine::Propagation::Applied {
            module,
            record_id,
            linked,
            ..
        }) => PropagationReport {
            module: Some(module.to_string()),
            record_id: Some(record_id),
            linked_record_id: linked,
            ..empty(PropagationStatus::Applied)
        },
        Err(err) => PropagationReport {
            warning: Some(format!(
                "transaction saved; linked-record update failed: {}",
                message_for_engine_error(err)
            )),
            ..empty(PropagationStatus::Failed)
        },
    }
}

fn meta(
    category: Option<String>,
    sub_category: Option<String>,
    merchant: Option<String>,
    description: Option<String>,
    payment_mode: Option<String>,
) -> engine::TxMeta {
    engine::TxMeta {
        category,
        sub_category,
        merchant,
        description,
        payment_mode,
    }
}

/// Save a transaction, then update the record it pays toward.
///
/// A failed propagation does not change the status: the transaction is saved
/// and the failure is reported in the `propagation` field.
pub async fn transaction_new(
    State(state): State<ServerState>,
    Json(payload): Json<TransactionNew>,
) -> Result<(StatusCode, Json<TransactionSaved>), ServerError> {
    let mut cmd = engine::TransactionCmd::new(
        payload.account_id,
        payload.kind,
        engine::Money::new(payload.amount_minor),
        payload.date,
    )
    .meta(meta(
        payload.category,
        payload.sub_category,
        payload.merchant,
        payload.description,
        payload.payment_mode,
    ));
    if let Some(paying_for) = payload.paying_for {
        cmd = cmd.paying_for(paying_for.module, paying_for.reference_id);
    }

    let recorded = state.engine.create_transaction(cmd).await?;

    Ok((
        StatusCode::CREATED,
        Json(TransactionSaved {
            id: recorded.transaction.id,
            propagation: report(recorded.propagation),
        }),
    ))
}

pub async fn get(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Transaction>, ServerError> {
    let tx = state.engine.transaction(id).await?;
    Ok(Json(transaction_view(tx)))
}

pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransactionUpdate>,
) -> Result<Json<TransactionSaved>, ServerError> {
    let touches_meta = payload.category.is_some()
        || payload.sub_category.is_some()
        || payload.merchant.is_some()
        || payload.description.is_some()
        || payload.payment_mode.is_some();

    let mut update = engine::TransactionUpdate {
        kind: payload.kind,
        amount: payload.amount_minor.map(engine::Money::new),
        date: payload.date,
        meta: None,
        paying_for: payload
            .paying_for
            .map(|p| engine::PayingFor::new(p.module, p.reference_id)),
    };
    if touches_meta {
        // Fields left out of the request keep their stored value.
        let current = state.engine.transaction(id).await?.meta;
        update.meta = Some(meta(
            payload.category.or(current.category),
            payload.sub_category.or(current.sub_category),
            payload.merchant.or(current.merchant),
            payload.description.or(current.description),
            payload.payment_mode.or(current.payment_mode),
        ));
    }

    let recorded = state.engine.update_transaction(id, update).await?;

    Ok(Json(TransactionSaved {
        id: recorded.transaction.id,
        propagation: report(recorded.propagation),
    }))
}

pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_transaction(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Import already-parsed spreadsheet rows into an account
pub async fn import(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ImportRequest>,
) -> Result<Json<ImportResponse>, ServerError> {
    if payload.rows.is_empty() {
        return Err(ServerError::Generic("no rows to import".to_string()));
    }
    let summary = state.engine.import_transactions(id, &payload.rows).await?;

    Ok(Json(ImportResponse {
        imported: summary.imported,
        skipped: summary.skipped,
    }))
}
