use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::warn;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error("{0}")]
    Validation(String),

    #[error("template rendering failed: {0}")]
    Template(#[from] askama::Error),

    #[error("not found")]
    NotFound,
}

impl From<argon2::password_hash::Error> for ServerError {
    fn from(err: argon2::password_hash::Error) -> Self {
        ServerError::PasswordHash(err.to_string())
    }
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Database(sqlx::Error::RowNotFound) | ServerError::NotFound => {
                StatusCode::NOT_FOUND
            }
            ServerError::Database(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                StatusCode::CONFLICT
            }
            ServerError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match status {
            StatusCode::INTERNAL_SERVER_ERROR => {
                warn!("request failed: {self}");
                "internal error".to_string()
            }
            StatusCode::CONFLICT => "already exists".to_string(),
            _ => self.to_string(),
        };

        let body = Json(json!({
            "success": false,
            "error": message,
        }));

        (status, body).into_response()
    }
}
