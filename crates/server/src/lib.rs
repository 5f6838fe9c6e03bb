use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use api_types::ErrorBody;
pub use server::{ServerState, router, run, run_with_listener, spawn_with_listener};

mod accounts;
mod ledger;
mod records;
mod server;
mod transactions;

pub mod types {
    pub mod account {
        pub use api_types::account::{Account, AccountKind, AccountNew, AccountUpdate};
    }

    pub mod transaction {
        pub use api_types::transaction::{
            PayingFor, PropagationReport, PropagationStatus, Transaction, TransactionNew,
            TransactionSaved, TransactionUpdate,
        };
    }

    pub mod record {
        pub use api_types::record::{Record, RecordList, RecordNew, RecordUpdate};
    }

    pub mod ledger {
        pub use api_types::ledger::{
            Effect, PreviewRequest, PreviewResponse, PreviewRow, Statement, StatementRow,
        };
    }

    pub mod import {
        pub use api_types::import::{ImportRequest, ImportResponse};
    }
}

pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::ExistingKey(_) | EngineError::Conflict(_) => StatusCode::CONFLICT,
        EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::InvalidAmount(_)
        | EngineError::InvalidId(_)
        | EngineError::InvalidName(_)
        | EngineError::InvalidTransaction(_)
        | EngineError::InvalidAccount(_)
        | EngineError::InvalidModule(_)
        | EngineError::InvalidNotes(_)
        | EngineError::InvalidImport(_)
        | EngineError::InvalidCurrency(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

/// Client-facing message. Database details are logged, never returned.
pub(crate) fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), message_for_engine_error(err)),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(ErrorBody { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_not_found_maps_to_404() {
        let res = ServerError::from(EngineError::KeyNotFound("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn engine_existing_key_maps_to_409() {
        let res = ServerError::from(EngineError::ExistingKey("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn engine_conflict_maps_to_409() {
        let res = ServerError::from(EngineError::Conflict("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn engine_validation_maps_to_422() {
        for err in [
            EngineError::InvalidAmount("x".to_string()),
            EngineError::InvalidModule("x".to_string()),
            EngineError::InvalidNotes("x".to_string()),
        ] {
            let res = ServerError::from(err).into_response();
            assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        }
    }

    #[test]
    fn database_errors_are_masked() {
        let err = EngineError::Database(sea_orm::DbErr::Custom("disk I/O error".to_string()));
        assert_eq!(status_for_engine_error(&err), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message_for_engine_error(err), "internal server error");
    }

    #[test]
    fn generic_maps_to_400() {
        let res = ServerError::Generic("bad".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
