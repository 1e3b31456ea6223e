// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ledgerbackend::errors::{AuthError, ResourceError};
use ledgercommon::{messages::ErrorResponse, validation::ValidationError};
use thiserror::Error;
use tracing::error;

/// Error answered to a REST request.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{message}: {error}")]
    Internal { message: &'static str, error: String },
}

impl ApiError {
    pub(crate) fn unauthorized() -> Self {
        Self::Unauthorized("Unauthorized")
    }

    pub(crate) fn internal(message: &'static str, error: impl ToString) -> Self {
        Self::Internal {
            message,
            error: error.to_string(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::BadRequest(message) | Self::NotFound(message) | Self::Conflict(message) => {
                ErrorResponse {
                    message,
                    error: None,
                }
            }
            Self::Unauthorized(message) => ErrorResponse {
                message: message.to_owned(),
                error: None,
            },
            Self::Internal { message, error } => {
                error!(%error, message, "Request failed");
                ErrorResponse {
                    message: message.to_owned(),
                    error: Some(error),
                }
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(error: ValidationError) -> Self {
        Self::BadRequest(error.to_string())
    }
}

impl From<ResourceError> for ApiError {
    fn from(error: ResourceError) -> Self {
        match error {
            ResourceError::NotFound(name) => Self::NotFound(format!("{name} not found")),
            ResourceError::Invalid(error) => error.into(),
            ResourceError::Storage(error) => Self::internal("Failed to access stored records", error),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Invalid(error) => error.into(),
            AuthError::UsernameTaken => Self::Conflict(error.to_string()),
            AuthError::InvalidCredentials => Self::Unauthorized("Invalid credentials"),
            AuthError::PasswordHash(_) | AuthError::Storage(_) => {
                Self::internal("Authentication failed", error)
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}
