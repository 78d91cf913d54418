use actix_multipart::MultipartError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::classifier::ModelError;
use crate::models::ErrorResponse;
use crate::preprocess::PreprocessError;

/// Everything that can go wrong serving `/predict`. Rendered as `{"error": ...}`.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("Model not loaded. Check server logs.")]
    ModelNotLoaded,
    #[error("No file uploaded")]
    NoFile,
    #[error("No file selected")]
    EmptyFilename,
    #[error("File too large (limit is {limit} bytes)")]
    TooLarge { limit: usize },
    #[error("{0}")]
    Multipart(String),
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("{0}")]
    Internal(String),
}

impl From<MultipartError> for PredictError {
    fn from(e: MultipartError) -> Self {
        match e {
            // Not a multipart body at all, so there is no file in it.
            MultipartError::NoContentType
            | MultipartError::ParseContentType
            | MultipartError::Boundary => PredictError::NoFile,
            other => PredictError::Multipart(other.to_string()),
        }
    }
}

impl From<actix_web::error::BlockingError> for PredictError {
    fn from(e: actix_web::error::BlockingError) -> Self {
        PredictError::Internal(e.to_string())
    }
}

impl ResponseError for PredictError {
    fn status_code(&self) -> StatusCode {
        match self {
            PredictError::NoFile | PredictError::EmptyFilename | PredictError::Multipart(_) => {
                StatusCode::BAD_REQUEST
            }
            PredictError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            PredictError::ModelNotLoaded
            | PredictError::Preprocess(_)
            | PredictError::Model(_)
            | PredictError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
        })
    }
}
