use crate::{FormError, LinkError, batch::SubmitError, session::SessionError, sheets::StoreError};
use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Link(#[from] LinkError),

    #[error("session not found")]
    SessionNotFound,

    #[error("{0}")]
    Session(#[from] SessionError),

    #[error("{0}")]
    Form(#[from] FormError),

    #[error("{}", .0.body_text())]
    Payload(#[from] JsonRejection),

    #[error("{}", .0.body_text())]
    Path(#[from] PathRejection),

    #[error("error sending data to the spreadsheet: {0}")]
    Store(#[from] StoreError),
}

impl From<SubmitError> for AppError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Form(e) => AppError::Form(e),
            SubmitError::Store(e) => AppError::Store(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Link { .. } => StatusCode::FORBIDDEN,
            AppError::SessionNotFound => StatusCode::NOT_FOUND,
            AppError::Session { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Form { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Payload(rejection) => rejection.status(),
            AppError::Path(rejection) => rejection.status(),
            AppError::Store { .. } => StatusCode::BAD_GATEWAY,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
