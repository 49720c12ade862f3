use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use shop_types::domain::order::{DeliveryOption, OrderStatus, TransitionError};
use shop_types::domain::placement::{FieldError, ValidationErrors};
use shop_types::ports::order_repository::RepoError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid order: {}", .0.messages().join("; "))]
    Validation(#[from] ValidationErrors),

    #[error("Order not found: {0}")]
    NotFound(String),

    #[error("Order is {0}; this change is no longer allowed")]
    TerminalState(OrderStatus),

    #[error("Order can no longer be cancelled: delivery is {}", .0.label())]
    CancellationWindowClosed(DeliveryOption),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

impl From<TransitionError> for AppError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::TerminalState(status) => AppError::TerminalState(status),
            TransitionError::CancellationWindowClosed(option) => {
                AppError::CancellationWindowClosed(option)
            }
        }
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound(id) => AppError::NotFound(format!("order {id}")),
            e @ RepoError::Conflict { .. } => AppError::Conflict(e.to_string()),
            e @ RepoError::DbError(_) => AppError::Internal(anyhow::anyhow!(e)),
        }
    }
}

/// A body that is not JSON, or whose fields have the wrong type, is reported
/// the same way as a body that fails the order checks.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(ValidationErrors(vec![FieldError {
            field: "body".into(),
            message: rejection.body_text(),
        }]))
    }
}

impl AppError {
    /// Stable machine-readable tag sent alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "bad_request",
            AppError::Validation(_) => "validation",
            AppError::NotFound(_) => "not_found",
            AppError::TerminalState(_) => "terminal_state",
            AppError::CancellationWindowClosed(_) => "cancellation_window_closed",
            AppError::Conflict(_) => "conflict",
            AppError::Internal(_) => "internal",
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    details: Vec<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::TerminalState(_)
            | AppError::CancellationWindowClosed(_)
            | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(e) => {
                tracing::error!(error = %e, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = ErrorBody {
            error: match &self {
                AppError::Validation(_) => "invalid request".into(),
                AppError::Internal(_) => "internal error".into(),
                other => other.to_string(),
            },
            code: self.code(),
            details: match &self {
                AppError::Validation(errors) => errors.messages(),
                _ => Vec::new(),
            },
        };

        let body = serde_json::to_string(&body)
            .unwrap_or_else(|_| "{\"error\":\"internal serialization\"}".into());
        (status, [("content-type", "application/json")], body).into_response()
    }
}
