//! Target records API endpoints

use api_types::record::{Record, RecordList, RecordNew, RecordUpdate};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde_json::Value;
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

fn record_view(record: engine::TargetRecord) -> Record {
    Record {
        notes: Value::Object(engine::notes::decode_object(record.notes.as_deref())),
        id: record.id,
        module: record.module,
        name: record.name,
        principal_minor: record.principal.minor(),
        version: record.version,
        created_at: record.created_at,
        updated_at: record.updated_at,
    }
}

pub async fn record_new(
    State(state): State<ServerState>,
    Json(payload): Json<RecordNew>,
) -> Result<(StatusCode, Json<Record>), ServerError> {
    let mut cmd = engine::NewRecord::new(
        payload.module,
        payload.name,
        engine::Money::new(payload.principal_minor),
    );
    if let Some(notes) = payload.notes {
        cmd = cmd.notes(notes);
    }
    let record = state.engine.new_record(cmd).await?;

    Ok((StatusCode::CREATED, Json(record_view(record))))
}

/// List records, optionally of one module (`?module=targets`)
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<RecordList>,
) -> Result<Json<Vec<Record>>, ServerError> {
    let module = query.module.as_deref().filter(|m| !m.trim().is_empty());
    let records = state.engine.records(module).await?;
    Ok(Json(records.into_iter().map(record_view).collect()))
}

pub async fn get(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Record>, ServerError> {
    let record = state.engine.record(id).await?;
    Ok(Json(record_view(record)))
}

/// User edit of a record. Rejected with 409 if the record changed since the
/// client read `version`.
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecordUpdate>,
) -> Result<Json<Record>, ServerError> {
    let mut update = engine::RecordUpdate::new(payload.version);
    update.name = payload.name;
    update.principal = payload.principal_minor.map(engine::Money::new);
    update.notes = payload.notes;

    let record = state.engine.update_record(id, update).await?;
    Ok(Json(record_view(record)))
}
