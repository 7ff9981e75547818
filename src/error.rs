use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::{DbErr, RuntimeErr};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::response::{ApiResponse, Meta};

const EXCLUSION_VIOLATION: &str = "23P01";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Bad Request {0}")]
    BadRequest(String),

    #[error("Unauthorized {0}")]
    Unauthorized(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Time slot conflicts with screening {screening_id}")]
    ScheduleConflict { screening_id: Uuid },

    #[error("One or more selected seats are already reserved")]
    SeatUnavailable { seat_ids: Vec<Uuid> },

    #[error("Screening has already started")]
    PastScreening,

    #[error("Screening has {active} active reservation(s)")]
    ScreeningHasReservations { active: u64 },

    #[error("Database error")]
    DbError(#[from] sqlx::Error),

    #[error("ORM error")]
    OrmError(#[from] DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::PastScreening => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::ScheduleConflict { .. }
            | AppError::SeatUnavailable { .. }
            | AppError::ScreeningHasReservations { .. } => StatusCode::CONFLICT,
            AppError::DbError(_) | AppError::OrmError(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::ScheduleConflict { screening_id } => {
                Some(serde_json::json!({ "conflicting_screening_id": screening_id }))
            }
            AppError::SeatUnavailable { seat_ids } => {
                Some(serde_json::json!({ "seat_ids": seat_ids }))
            }
            AppError::ScreeningHasReservations { active } => {
                Some(serde_json::json!({ "active_reservations": active }))
            }
            _ => None,
        }
    }
}

/// Driver-level database error behind `err`, if any.
fn database_error(err: &DbErr) -> Option<&(dyn sqlx::error::DatabaseError + 'static)> {
    let runtime = match err {
        DbErr::Exec(runtime) | DbErr::Query(runtime) | DbErr::Conn(runtime) => runtime,
        _ => return None,
    };
    match runtime {
        RuntimeErr::SqlxError(sqlx_err) => sqlx_err.as_database_error(),
        _ => None,
    }
}

/// SQLSTATE of the database error behind `err`, if any.
pub fn sqlstate(err: &DbErr) -> Option<String> {
    database_error(err)
        .and_then(|db| db.code())
        .map(|code| code.into_owned())
}

pub fn is_unique_violation(err: &DbErr) -> bool {
    database_error(err).is_some_and(|db| db.is_unique_violation())
}

// sqlx has no `ErrorKind` for exclusion constraints, so match the SQLSTATE.
pub fn is_exclusion_violation(err: &DbErr) -> bool {
    sqlstate(err).as_deref() == Some(EXCLUSION_VIOLATION)
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }

        let body = ApiResponse {
            message: self.to_string(),
            data: Some(ErrorData {
                error: self.to_string(),
                details: self.details(),
            }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_errors_map_to_409() {
        let seat = AppError::SeatUnavailable {
            seat_ids: vec![Uuid::nil()],
        };
        assert_eq!(seat.status(), StatusCode::CONFLICT);

        let schedule = AppError::ScheduleConflict {
            screening_id: Uuid::nil(),
        };
        assert_eq!(schedule.status(), StatusCode::CONFLICT);
        assert_eq!(AppError::PastScreening.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn seat_conflict_details_list_colliding_seats() {
        let id = Uuid::new_v4();
        let err = AppError::SeatUnavailable { seat_ids: vec![id] };
        let details = err.details().expect("details");
        assert_eq!(details["seat_ids"][0], serde_json::json!(id));
    }

    #[test]
    fn non_database_errors_have_no_sqlstate() {
        let err = DbErr::RecordNotFound("missing".into());
        assert!(sqlstate(&err).is_none());
        assert!(!is_unique_violation(&err));
        assert!(!is_exclusion_violation(&err));
    }
}
