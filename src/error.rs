use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing required fields: {0}")]
    MissingFields(String),

    #[error("{0}")]
    Validation(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    Unauthorized(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("OAuth provider error: {0}")]
    Provider(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("storage error: {0}")]
    Storage(StoreError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => AppError::NotFound(what),
            StoreError::Conflict(msg) => AppError::Conflict(msg),
            StoreError::Invalid(msg) => AppError::Validation(msg),
            other => AppError::Storage(other),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingFields(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Provider(_) => StatusCode::BAD_GATEWAY,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the client. Server-side failures stay generic.
    fn public_message(&self) -> String {
        match self {
            AppError::Storage(_) | AppError::Internal(_) => "Internal error".into(),
            AppError::Provider(_) => "OAuth provider error".into(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::Storage(e) => error!(error = %e, "storage failure"),
            AppError::Internal(e) => error!(error = ?e, "internal failure"),
            AppError::Provider(e) => error!(error = %e, "oauth provider failure"),
            _ => {}
        }

        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_client_facing_variants() {
        let e: AppError = StoreError::NotFound("user".into()).into();
        assert_eq!(e.status(), StatusCode::NOT_FOUND);

        let e: AppError = StoreError::Conflict("Email already registered".into()).into();
        assert_eq!(e.status(), StatusCode::CONFLICT);

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let e: AppError = StoreError::Io(io).into();
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn internal_details_are_hidden_from_clients() {
        let e = AppError::Internal(anyhow::anyhow!("disk on fire at /var/data"));
        assert_eq!(e.public_message(), "Internal error");

        let e = AppError::Provider("google returned 500".into());
        assert_eq!(e.public_message(), "OAuth provider error");
    }

    #[test]
    fn credential_failures_share_one_message() {
        assert_eq!(
            AppError::InvalidCredentials.to_string(),
            "Invalid email or password"
        );
    }
}
