use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use tracing::*;
use validator::ValidationErrors;

use crate::{auth::AuthError, files::FilesError, storage::StorageError, system::MetricsError};

pub type Result<T> = actix_web::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    MetricsUnavailable(String),

    #[error("{0}")]
    Filesystem(String),

    #[error("Not implemented")]
    NotImplemented,

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

/// Body of every error response
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MetricsUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Filesystem(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotImplemented => StatusCode::NOT_IMPLEMENTED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
        })
    }
}

impl From<MetricsError> for Error {
    fn from(error: MetricsError) -> Self {
        warn!("{error}");
        Self::MetricsUnavailable(error.to_string())
    }
}

impl From<FilesError> for Error {
    fn from(error: FilesError) -> Self {
        warn!("{error}");
        match error {
            FilesError::Read { .. } => Self::Filesystem(error.to_string()),
            FilesError::OutsideRoot(_) => Self::Forbidden(error.to_string()),
        }
    }
}

impl From<AuthError> for Error {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::MissingToken
            | AuthError::InvalidToken(_)
            | AuthError::InvalidCredentials => Self::Unauthorized(error.to_string()),
            AuthError::Issue(_) | AuthError::Hash(_) => {
                error!("{error}");
                Self::Internal(error.to_string())
            }
        }
    }
}

impl From<StorageError> for Error {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::Auth(error) => error.into(),
            StorageError::Database(error) => error.into(),
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(error: sqlx::Error) -> Self {
        error!("Database failure: {error}");
        Self::Internal("database failure".to_string())
    }
}

impl From<actix_web::error::BlockingError> for Error {
    fn from(error: actix_web::error::BlockingError) -> Self {
        Self::Internal(error.to_string())
    }
}

impl From<ValidationErrors> for Error {
    fn from(error: ValidationErrors) -> Self {
        Self::BadRequest(error.to_string())
    }
}
