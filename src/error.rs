use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::{
    auth::{jwt::TokenError, password::PasswordError},
    response::{ApiResponse, CODE_FAILED},
    users::repo::StoreError,
};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Unknown user, inactive user and wrong password all look the same.
    #[error("incorrect username or password")]
    BadCredentials,

    #[error("registration failed")]
    DuplicateUsername,

    #[error("invalid token")]
    InvalidToken,

    #[error("token expired")]
    ExpiredToken,

    #[error("could not validate credentials")]
    Unauthenticated,

    #[error("user not found")]
    UserNotFound,

    #[error("{0}")]
    Validation(String),

    #[error("user store unavailable")]
    StoreUnavailable(#[source] StoreError),

    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    /// HTTP status plus the envelope `code` for this error.
    pub fn status(&self) -> (StatusCode, i32) {
        match self {
            AppError::BadCredentials | AppError::DuplicateUsername => (StatusCode::OK, CODE_FAILED),
            AppError::InvalidToken | AppError::ExpiredToken | AppError::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, 401)
            }
            AppError::UserNotFound | AppError::Validation(_) => (StatusCode::BAD_REQUEST, 400),
            AppError::StoreUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, 503),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, 500),
        }
    }

    fn public_message(&self) -> String {
        match self {
            // Token failures all surface the same way.
            AppError::InvalidToken | AppError::ExpiredToken => {
                AppError::Unauthenticated.to_string()
            }
            AppError::StoreUnavailable(_) => "service unavailable".into(),
            AppError::Internal(_) => "internal server error".into(),
            other => other.to_string(),
        }
    }

    fn log(&self) {
        match self {
            AppError::StoreUnavailable(e) => error!(error = %e, "user store failure"),
            AppError::Internal(e) => error!(error = %e, "internal failure"),
            AppError::BadCredentials => warn!("rejected credentials"),
            _ => debug!(error = %self, "request failed"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();
        let (status, code) = self.status();
        let body = Json(ApiResponse::message(code, self.public_message()));
        if status == StatusCode::UNAUTHORIZED {
            (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateUsername => AppError::DuplicateUsername,
            other => AppError::StoreUnavailable(other),
        }
    }
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Invalid => AppError::InvalidToken,
            TokenError::Expired => AppError::ExpiredToken,
            TokenError::Signing(e) => AppError::Internal(e.into()),
        }
    }
}

impl From<PasswordError> for AppError {
    fn from(e: PasswordError) -> Self {
        match e {
            PasswordError::Empty => AppError::validation("password must not be empty"),
            other => AppError::Internal(other.into()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}
