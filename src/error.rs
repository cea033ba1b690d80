use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

use crate::cost_matrix::SessionError;
use crate::rides::RideError;
use crate::utils::validation::FieldErrors;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self {
        AppError::Validation(errors)
    }
}

impl From<SessionError> for AppError {
    fn from(error: SessionError) -> Self {
        match error {
            SessionError::Invalid(errors) => AppError::Validation(errors),
            SessionError::NotReady => AppError::BadRequest(
                "City needs at least two locations before costs can be set".to_string(),
            ),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

impl From<RideError> for AppError {
    fn from(error: RideError) -> Self {
        match error {
            RideError::InvalidTransition { .. } => AppError::Conflict(error.to_string()),
            _ => AppError::BadRequest(error.to_string()),
        }
    }
}

impl AppError {
    /// A unique-constraint failure becomes a conflict; any other database error is kept.
    pub fn conflict_on_duplicate(error: DbErr, message: &str) -> Self {
        match error.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => AppError::Conflict(message.to_string()),
            _ => AppError::Database(error),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            // Details stay in the logs
            tracing::error!(error = %self, "Request failed with internal error");
        }

        let body = match self {
            AppError::Validation(errors) => serde_json::json!({
                "message": "Validation failed",
                "errors": errors,
            }),
            AppError::Internal(_) | AppError::Database(_) => {
                serde_json::json!({ "message": "Internal server error" })
            }
            other => serde_json::json!({ "message": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (AppError::Validation(FieldErrors::new()), StatusCode::UNPROCESSABLE_ENTITY),
            (AppError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (AppError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::Conflict("x".into()), StatusCode::CONFLICT),
            (AppError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn test_session_errors_map_to_client_errors() {
        let mut errors = FieldErrors::new();
        errors.add("locationCosts.1.cost", "Cost must be a number");

        let cases = [
            (SessionError::Invalid(errors), StatusCode::UNPROCESSABLE_ENTITY),
            (SessionError::NotReady, StatusCode::BAD_REQUEST),
            (SessionError::RowLocked(0), StatusCode::BAD_REQUEST),
        ];

        for (error, expected) in cases {
            assert_eq!(AppError::from(error).into_response().status(), expected);
        }
    }

    #[test]
    fn test_ride_errors() {
        let transition = AppError::from(RideError::InvalidTransition {
            current: crate::entities::ride_ticket::TicketStatus::Completed,
            action: "started",
        });
        assert_eq!(transition.to_string(), "Ticket is Completed, it cannot be started");
        assert_eq!(transition.into_response().status(), StatusCode::CONFLICT);

        assert_eq!(
            AppError::from(RideError::OtpMismatch).into_response().status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_other_database_errors_are_not_conflicts() {
        let error = AppError::conflict_on_duplicate(
            DbErr::RecordNotFound("location_cost".into()),
            "Location costs already exist for this city",
        );

        assert!(matches!(error, AppError::Database(_)));
    }
}
